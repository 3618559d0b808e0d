//! Service Layer
//!
//! Contains the build orchestrator that drives the domain through the
//! counting, sizing, insertion and persistence stages via ports.

pub mod filter_builder;
pub mod handle;

pub use filter_builder::FilterBuilderService;
pub use handle::BuildHandle;
