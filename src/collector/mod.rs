//! Concurrent device profile collection.
//!
//! Probes run in parallel on the tokio blocking pool and their results are
//! merged into a single [`MergedDocument`](crate::models::MergedDocument).

pub mod aggregator;
pub mod probe;
pub mod probes;
pub mod profile;
pub mod queue;

pub use aggregator::Aggregator;
pub use probe::{FnProbe, Probe, ProbeExt, Reporter, StaticProbe, TimeoutProbe};
pub use probes::{BrowserProbe, HardwareProbe, NetworkProbe, PlatformProbe, TelephonyProbe};
pub use profile::ProfileCollector;
pub use queue::{CompletionQueue, Immediate, Job, MainLoop, MainQueue};
