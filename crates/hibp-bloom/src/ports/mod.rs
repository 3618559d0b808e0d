//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for external callers
//! - Driven Ports (outbound) - Storage and progress reporting

pub mod inbound;
pub mod outbound;

pub use inbound::{BuildOutcome, BuildReport, BuildRequest, FilterBuildApi};
pub use outbound::{FilterStore, NoOpProgress, ProgressSink};
