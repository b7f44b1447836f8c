//! Background execution of summary jobs.
//!
//! A [`JobRunner`] takes one admitted job and advances it through
//! `fetching_commits` -> `generating_summary` -> `saving_summary`, calling the
//! collaborators in [`crate::services`] along the way. Any collaborator error
//! is terminal for the job; retries mean starting a new job.

pub mod runner;

pub use runner::JobRunner;
