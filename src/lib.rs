//! devprofile - concurrent device profile collection
//!
//! Runs a set of independent probes in parallel, merges their findings into
//! one document keyed by probe name, and delivers it exactly once after the
//! last probe reports. Alongside the collector live the small value types an
//! identity-platform client needs: server connection options, typed
//! attribute-input callbacks and the WebAuthn error table.
//!
//! ```no_run
//! use devprofile::collector::{Aggregator, ProfileCollector};
//!
//! # async fn demo() {
//! let profile = ProfileCollector::with_defaults(Aggregator::current())
//!     .collect()
//!     .await;
//! println!("{}", profile.to_json_pretty().unwrap());
//! # }
//! ```

pub mod models;

pub mod callback;
pub mod cli;
pub mod collector;
pub mod config;
pub mod options;
pub mod webauthn;

pub use collector::{Aggregator, Probe, ProfileCollector, Reporter};
pub use models::{MergedDocument, PartialDocument, Value};
