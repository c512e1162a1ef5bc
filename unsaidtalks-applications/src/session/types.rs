//! Session state machine types

use crate::auth::{Role, Session};

/// In-memory session state
///
/// `Hydrating` only exists between process start and the end of the first
/// hydration read.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Hydrating,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Hydrating)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.session().map(|s| s.role)
    }

    /// Exact membership test, no role hierarchy
    pub fn has_role<R: AsRef<[Role]>>(&self, roles: R) -> bool {
        self.role()
            .is_some_and(|current| roles.as_ref().contains(&current))
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Hydrating => "hydrating",
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated(_) => "authenticated",
        }
    }
}
