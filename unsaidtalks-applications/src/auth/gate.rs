//! Authorization Gate
//!
//! Declarative guard deciding what a protected view renders for the current
//! session state. Evaluation is pure; callers re-evaluate whenever the
//! session state or the gate configuration changes.

use super::{Role, Session};
use crate::session::SessionState;

/// Default login location for anonymous visitors
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Outcome of evaluating a gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session is still hydrating
    Loading,
    /// Nobody is logged in; go to `to` and come back to `from` afterwards
    Redirect { to: String, from: String },
    /// Render the protected content
    Allow,
    /// Role mismatch, caller supplied fallback content
    Fallback,
    /// Role mismatch without fallback
    Denied {
        current_role: Role,
        accepted: Vec<Role>,
    },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }

    /// Text for the denial view
    pub fn denial_message(&self) -> Option<String> {
        match self {
            GateDecision::Denied {
                current_role,
                accepted,
            } => Some(denial_text(*current_role, accepted)),
            _ => None,
        }
    }
}

/// What a guarded view produced
#[derive(Debug)]
pub enum Protected<V> {
    Loading,
    Redirect { to: String, from: String },
    Content(V),
    Fallback,
    Denied { message: String },
}

/// Role-based guard for one protected view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGate {
    required: Vec<Role>,
    redirect_to: String,
    has_fallback: bool,
}

impl Default for AuthorizationGate {
    fn default() -> Self {
        Self {
            required: Vec::new(),
            redirect_to: DEFAULT_LOGIN_PATH.to_string(),
            has_fallback: false,
        }
    }
}

impl AuthorizationGate {
    /// Gate that only requires an authenticated session
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate accepting exactly the listed roles
    pub fn with_roles<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        Self {
            required: roles.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn mentee_only() -> Self {
        Self::with_roles([Role::Mentee])
    }

    pub fn mentor_only() -> Self {
        Self::with_roles([Role::Mentor])
    }

    pub fn admin_only() -> Self {
        Self::with_roles([Role::Admin, Role::SuperAdmin])
    }

    pub fn super_admin_only() -> Self {
        Self::with_roles([Role::SuperAdmin])
    }

    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }

    pub fn with_fallback(mut self, has_fallback: bool) -> Self {
        self.has_fallback = has_fallback;
        self
    }

    pub fn required_roles(&self) -> &[Role] {
        &self.required
    }

    /// Decide what to render for `state` when `location` was requested
    pub fn evaluate(&self, state: &SessionState, location: &str) -> GateDecision {
        let session = match state {
            SessionState::Hydrating => return GateDecision::Loading,
            SessionState::Anonymous => {
                return GateDecision::Redirect {
                    to: self.redirect_to.clone(),
                    from: location.to_string(),
                }
            }
            SessionState::Authenticated(session) => session,
        };

        if self.required.is_empty() || self.required.contains(&session.role) {
            GateDecision::Allow
        } else if self.has_fallback {
            GateDecision::Fallback
        } else {
            GateDecision::Denied {
                current_role: session.role,
                accepted: self.required.clone(),
            }
        }
    }

    /// Evaluate and, only when allowed, build the protected view
    pub fn protect<V, F>(&self, state: &SessionState, location: &str, build: F) -> Protected<V>
    where
        F: FnOnce(&Session) -> V,
    {
        match self.evaluate(state, location) {
            GateDecision::Loading => Protected::Loading,
            GateDecision::Redirect { to, from } => Protected::Redirect { to, from },
            GateDecision::Fallback => Protected::Fallback,
            GateDecision::Denied {
                current_role,
                accepted,
            } => Protected::Denied {
                message: denial_text(current_role, &accepted),
            },
            GateDecision::Allow => match state.session() {
                Some(session) => Protected::Content(build(session)),
                None => Protected::Loading,
            },
        }
    }
}

fn denial_text(current_role: Role, accepted: &[Role]) -> String {
    let accepted = accepted
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Access denied: you don't have permission to access this page. \
         Your current role is {}. Required roles: {}",
        current_role, accepted
    )
}
