//! UnsaidTalks Core - shared error, configuration, logging and trait definitions
//!
//! Everything the session layer and the fetch runtime agree on lives here:
//! the error taxonomy, the TOML configuration, logging setup and the
//! storage/data-service/clock seams.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
