use std::net::SocketAddr;
use std::time::Duration;

/// Settings for the GitHub commit fetcher.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// Base URL of the GitHub REST API
    pub api_url: String,
    /// Personal access token. Unauthenticated requests get a much lower quota.
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Upper bound on commit pages fetched per job (100 commits per page)
    pub max_pages: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
            timeout: Duration::from_secs(10),
            max_pages: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub model_name: String,
    /// Maximum number of commit subjects listed as highlights
    pub max_highlights: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model_name: "weekly-digest-v1".to_string(),
            max_highlights: 5,
        }
    }
}

/// Health aggregation settings.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Deadline applied to each probe individually
    pub probe_timeout: Duration,
    /// Version string reported by `/health`
    pub version: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Summary job settings.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Commit lookback window for weekly summaries, in days
    pub lookback_days: u32,
    /// Maximum number of repositories tracked in the job store
    pub max_jobs: usize,
    /// Finished jobs older than this are pruned from the store
    pub retention: Duration,
    /// How often the pruning task runs
    pub prune_interval: Duration,
    /// How long shutdown waits for in-flight jobs
    pub shutdown_grace: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            max_jobs: 10_000,
            retention: Duration::from_secs(24 * 60 * 60),
            prune_interval: Duration::from_secs(10 * 60),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// Client-side polling policy for waiting on a summary job.
///
/// Exceeding `max_attempts` is a client timeout only; the job keeps running
/// on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

impl PollConfig {
    /// Total time the client is willing to wait.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub github: GithubConfig,
    pub summarizer: SummarizerConfig,
    pub health: HealthConfig,
    pub jobs: JobConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            github: GithubConfig::default(),
            summarizer: SummarizerConfig::default(),
            health: HealthConfig::default(),
            jobs: JobConfig::default(),
        }
    }
}
