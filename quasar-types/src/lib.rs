pub mod config;
pub mod errors;
pub mod schema;
pub mod types;

#[cfg(test)]
mod tests;

// Re-exported so every downstream crate builds against one version of the stack.
pub use ahash;
pub use bincode;
pub use bytes;
pub use chrono;
pub use indexmap;
pub use log;
pub use ordered_float;
pub use parking_lot;
pub use serde;
pub use serde_json;
pub use serde_yaml;
pub use thiserror;
pub use tracing;
