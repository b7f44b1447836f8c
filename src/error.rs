use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the external collaborators a summary job depends on.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Repository {0} not found or is private")]
    NotFound(String),

    #[error("GitHub API rate limit exceeded, try again later")]
    RateLimited,

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Collaborator panicked during {phase}: {message}")]
    Panicked { phase: String, message: String },
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("No summary job for repository {0}")]
    NoJobForRepository(String),

    #[error("Health service not found: {0}")]
    ServiceNotFound(String),

    #[error("Invalid repository: {0}")]
    InvalidRepository(String),

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Job store is at capacity")]
    StoreFull,

    #[error("Server is shutting down, not accepting new jobs")]
    Draining,

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Why a health probe produced no reading. Always reported as unhealthy.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Failed(String),

    #[error("Probe panicked: {0}")]
    Panicked(String),
}

impl From<CollaboratorError> for ProbeError {
    fn from(err: CollaboratorError) -> Self {
        ProbeError::Failed(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Job did not finish after {attempts} status checks; it may still be running")]
    PollTimeout { attempts: u32 },
}
