//! Authentication and Authorization Module
//!
//! Role vocabulary, the session identity types and the authorization gate
//! that guards every protected view.

pub mod gate;
pub mod identity;

pub use gate::{AuthorizationGate, GateDecision, Protected, DEFAULT_LOGIN_PATH};
pub use identity::{Role, Session, SessionInput, SessionPatch};
