//! Diagnostics
//!
//! Error records and the bounded collector every pass reports into.

pub mod collector;
pub mod record;

pub use collector::ErrorCollector;
pub use record::{ErrorKind, ErrorRecord, Severity, UnitLink};
