pub mod build;
pub mod config;
pub mod distribute;
pub mod error;
pub mod pipeline;
pub mod repo;
pub mod runner;
pub mod ssh;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
