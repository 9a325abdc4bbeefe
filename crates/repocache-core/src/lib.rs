//! # repocache-core
//!
//! Core types shared by every repocache crate: error enums, configuration,
//! the injectable clock, tracing setup, and the shared constants that
//! decide which files count as dependency manifests and documentation.

pub mod clock;
pub mod config;
pub mod constants;
pub mod errors;
pub mod tracing_setup;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
