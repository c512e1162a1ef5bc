//! Session Controller - owns the process-wide session state machine
//!
//! `Hydrating -> {Anonymous, Authenticated}`, then `Anonymous <-> Authenticated`
//! through login/logout, and `Authenticated -> Authenticated` through
//! `update_user`. The controller is the only writer of the durable store.

use super::{SessionState, SessionStore};
use crate::auth::{Role, Session, SessionInput, SessionPatch};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use unsaidtalks_core::{Clock, DashboardResult, SystemClock};

/// Session controller, shared as `Arc<SessionController>`
pub struct SessionController {
    store: SessionStore,
    clock: Arc<dyn Clock>,
    state: watch::Sender<SessionState>,
    /// Serializes login/logout/update so memory and storage never diverge
    op_lock: Mutex<()>,
}

impl SessionController {
    /// Create a controller in the `Hydrating` state
    pub fn new(store: SessionStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: SessionStore, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(SessionState::Hydrating);
        Self {
            store,
            clock,
            state,
            op_lock: Mutex::new(()),
        }
    }

    /// Read the durable store once and settle into Anonymous or Authenticated
    pub fn hydrate(&self) -> SessionState {
        let _guard = self.op_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let next = match self.store.load() {
            Some(mut session) => {
                session.last_login = Some(self.clock.now());
                info!(user_id = %session.id, role = %session.role, "Restored session");
                SessionState::Authenticated(session)
            }
            None => {
                debug!("No stored session, starting anonymous");
                SessionState::Anonymous
            }
        };

        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next.clone();
            true
        });
        next
    }

    /// Authenticate `candidate`; on a persistence failure nothing changes
    pub fn login(&self, candidate: SessionInput) -> DashboardResult<Session> {
        candidate.validate()?;
        let _guard = self.op_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let session = candidate.into_session(self.clock.now());
        if let Err(e) = self.store.save(&session) {
            warn!(user_id = %session.id, error = %e, "Login failed to persist session");
            return Err(e);
        }

        info!(user_id = %session.id, role = %session.role, "User logged in");
        self.state
            .send_replace(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    /// Drop the session. Memory is cleared before storage, so a storage
    /// failure never leaves a stale Authenticated state visible.
    pub fn logout(&self) -> DashboardResult<()> {
        let _guard = self.op_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.state.send_replace(SessionState::Anonymous);
        if let Some(session) = previous.session() {
            info!(user_id = %session.id, "User logged out");
        }

        self.store.clear().inspect_err(|e| {
            warn!(error = %e, "Logout could not clear the stored session");
        })
    }

    /// Merge `patch` into the current session and re-persist it.
    /// No-op when nobody is logged in.
    pub fn update_user(&self, patch: SessionPatch) -> DashboardResult<()> {
        let _guard = self.op_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(mut updated) = self.current() else {
            debug!("Ignoring session update while anonymous");
            return Ok(());
        };
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        updated.apply(patch);
        self.store.save(&updated).inspect_err(|e| {
            warn!(user_id = %updated.id, error = %e, "Session update failed to persist");
        })?;

        debug!(user_id = %updated.id, "Session updated");
        self.state.send_replace(SessionState::Authenticated(updated));
        Ok(())
    }

    /// Exact role membership; false unless authenticated
    pub fn has_role<R: AsRef<[Role]>>(&self, roles: R) -> bool {
        self.state.borrow().has_role(roles)
    }

    pub fn is_mentee(&self) -> bool {
        self.has_role(Role::Mentee)
    }

    pub fn is_mentor(&self) -> bool {
        self.has_role(Role::Mentor)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin)
    }

    pub fn is_admin_or_above(&self) -> bool {
        self.has_role([Role::Admin, Role::SuperAdmin])
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receiver that observes every state transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySlotStore;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use unsaidtalks_core::{persistence_error, DashboardError, KeyValueSlot};

    /// Clock that advances one second per reading
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.0.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(secs, 0).single().unwrap()
        }
    }

    /// Memory slot whose writes can be made to fail
    #[derive(Default)]
    struct FlakySlot {
        inner: MemorySlotStore,
        fail_writes: AtomicBool,
    }

    impl KeyValueSlot for FlakySlot {
        fn get(&self, key: &str) -> DashboardResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> DashboardResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(persistence_error!("quota exceeded", "flaky_slot"));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> DashboardResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(persistence_error!("quota exceeded", "flaky_slot"));
            }
            self.inner.remove(key)
        }
    }

    /// Memory slot that records what subscribers see while it is read
    #[derive(Default)]
    struct WatchedSlot {
        inner: MemorySlotStore,
        observer: Mutex<Option<watch::Receiver<SessionState>>>,
        seen: Mutex<Vec<&'static str>>,
    }

    impl KeyValueSlot for WatchedSlot {
        fn get(&self, key: &str) -> DashboardResult<Option<String>> {
            if let Some(rx) = self.observer.lock().unwrap().as_ref() {
                self.seen.lock().unwrap().push(rx.borrow().label());
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> DashboardResult<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> DashboardResult<()> {
            self.inner.remove(key)
        }
    }

    fn controller() -> (Arc<FlakySlot>, SessionController) {
        let slot = Arc::new(FlakySlot::default());
        let store = SessionStore::new(slot.clone(), "unsaidtalks_user");
        let clock = Arc::new(TickingClock(AtomicI64::new(1_700_000_000)));
        (slot, SessionController::with_clock(store, clock))
    }

    fn mentor() -> SessionInput {
        SessionInput::new("m-1", "Meera", "meera@example.com", Role::Mentor)
    }

    #[test]
    fn test_starts_hydrating() {
        let (_, controller) = controller();
        assert!(controller.is_loading());
        assert!(!controller.is_authenticated());
        assert_eq!(controller.hydrate(), SessionState::Anonymous);
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_login_stamps_and_persists() {
        let (slot, controller) = controller();
        controller.hydrate();

        let session = controller.login(mentor()).unwrap();
        assert!(session.verified);
        assert!(session.last_login.is_some());
        assert_eq!(controller.current(), Some(session));
        assert!(slot.get("unsaidtalks_user").unwrap().is_some());
    }

    #[test]
    fn test_login_then_hydrate_refreshes_last_login_only() {
        let (slot, controller) = controller();
        controller.hydrate();
        let original = controller.login(mentor()).unwrap();

        let store = SessionStore::new(slot.clone(), "unsaidtalks_user");
        let restarted = SessionController::with_clock(
            store,
            Arc::new(TickingClock(AtomicI64::new(1_800_000_000))),
        );
        let restored = restarted.hydrate().session().cloned().unwrap();

        assert!(restored.last_login > original.last_login);
        assert_eq!(
            Session {
                last_login: original.last_login,
                ..restored
            },
            original
        );
    }

    #[test]
    fn test_hydrate_is_idempotent() {
        let (_, controller) = controller();
        controller.hydrate();
        controller.login(mentor()).unwrap();

        let first = controller.hydrate();
        let second = controller.hydrate();
        assert_eq!(first.label(), second.label());
        assert_eq!(
            first.session().map(|s| (&s.id, &s.email, s.role, s.verified)),
            second.session().map(|s| (&s.id, &s.email, s.role, s.verified))
        );

        controller.logout().unwrap();
        assert_eq!(controller.hydrate(), controller.hydrate());
    }

    #[test]
    fn test_rehydrate_keeps_authenticated_visible() {
        let slot = Arc::new(WatchedSlot::default());
        let controller = SessionController::new(SessionStore::new(slot.clone(), "unsaidtalks_user"));
        controller.hydrate();
        controller.login(mentor()).unwrap();

        *slot.observer.lock().unwrap() = Some(controller.subscribe());
        controller.hydrate();

        assert_eq!(*slot.seen.lock().unwrap(), vec!["authenticated"]);
        assert!(controller.is_authenticated());
    }

    #[test]
    fn test_failed_login_leaves_state_unchanged() {
        let (slot, controller) = controller();
        controller.hydrate();
        slot.fail_writes.store(true, Ordering::SeqCst);

        let result = controller.login(mentor());
        assert!(matches!(result, Err(DashboardError::Persistence { .. })));
        assert_eq!(controller.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_logout_is_anonymous_even_when_clear_fails() {
        let (slot, controller) = controller();
        controller.hydrate();
        controller.login(mentor()).unwrap();
        slot.fail_writes.store(true, Ordering::SeqCst);

        assert!(controller.logout().is_err());
        assert_eq!(controller.state(), SessionState::Anonymous);
        for role in Role::ALL {
            assert!(!controller.has_role(role));
        }
    }

    #[test]
    fn test_has_role_is_exact() {
        let (_, controller) = controller();
        controller.hydrate();
        for role in Role::ALL {
            assert!(!controller.has_role(role));
        }

        for role in Role::ALL {
            controller
                .login(SessionInput::new("u", "U", "u@example.com", role))
                .unwrap();
            for other in Role::ALL {
                assert_eq!(controller.has_role(other), other == role);
            }
            assert!(controller.has_role([Role::Mentee, role]));
            controller.logout().unwrap();
        }

        controller
            .login(SessionInput::new("a", "A", "a@example.com", Role::Admin))
            .unwrap();
        assert!(!controller.has_role(Role::SuperAdmin));
        assert!(controller.is_admin_or_above());
        assert!(controller.is_admin());
        assert!(!controller.is_super_admin());
    }

    #[test]
    fn test_update_user_merges_and_persists() {
        let (slot, controller) = controller();
        controller.hydrate();
        controller.login(mentor()).unwrap();

        controller
            .update_user(SessionPatch::default().name("Meera K").avatar("/a.png"))
            .unwrap();
        let current = controller.current().unwrap();
        assert_eq!(current.id, "m-1");
        assert_eq!(current.name, "Meera K");
        assert_eq!(current.role, Role::Mentor);

        let stored = SessionStore::new(slot.clone(), "unsaidtalks_user")
            .load()
            .unwrap();
        assert_eq!(stored.name, "Meera K");
        assert_eq!(stored.avatar, "/a.png");
    }

    #[test]
    fn test_update_user_anonymous_is_noop() {
        let (slot, controller) = controller();
        controller.hydrate();
        controller
            .update_user(SessionPatch::default().role(Role::Admin))
            .unwrap();
        controller
            .update_user(SessionPatch::default().email(""))
            .unwrap();
        assert_eq!(controller.state(), SessionState::Anonymous);
        assert_eq!(slot.get("unsaidtalks_user").unwrap(), None);
    }

    #[test]
    fn test_update_user_failure_keeps_previous_session() {
        let (slot, controller) = controller();
        controller.hydrate();
        let before = controller.login(mentor()).unwrap();
        slot.fail_writes.store(true, Ordering::SeqCst);

        let result = controller.update_user(SessionPatch::default().role(Role::Admin));
        assert!(result.is_err());
        assert_eq!(controller.current(), Some(before));
    }

    #[test]
    fn test_update_user_rejects_blank_email() {
        let (_, controller) = controller();
        controller.hydrate();
        controller.login(mentor()).unwrap();
        let result = controller.update_user(SessionPatch::default().email(""));
        assert!(matches!(result, Err(DashboardError::Validation { .. })));
        assert_eq!(controller.current().unwrap().email, "meera@example.com");
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let (_, controller) = controller();
        let mut rx = controller.subscribe();
        controller.hydrate();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Anonymous);

        controller.login(mentor()).unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());
    }
}
