pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `update_package::config` instead of `update_package::core::config`
pub use core::*;
pub use utils::*;
