//! Dependency health checks.
//!
//! Each dependency is a [`HealthProbe`]. The [`HealthAggregator`] runs all of
//! them concurrently, each under its own timeout, and reports the worst
//! status seen: one unhealthy service makes the whole report unhealthy.

pub mod aggregator;
pub mod probe;
pub mod probes;

pub use aggregator::HealthAggregator;
pub use probe::{
    CompositeHealth, HealthDetails, HealthProbe, HealthReport, HealthStatus, ProbeReading,
    ReadinessReport,
};
pub use probes::{GithubProbe, SummarizerProbe, SummaryStoreProbe};
