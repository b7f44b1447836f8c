pub mod job;
pub mod manager;
pub mod store;

pub use job::{JobPhase, JobRecord, JobState, RepositoryRef};
pub use manager::{JobManager, StartOutcome};
pub use store::{Admission, JobStore};
