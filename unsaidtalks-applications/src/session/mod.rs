//! Session Management Module
//!
//! Durable storage of the current session and the controller that owns its
//! state machine.

pub mod manager;
pub mod storage;
pub mod types;

pub use manager::SessionController;
pub use storage::{FileSlotStore, MemorySlotStore, SessionStore};
pub use types::*;
