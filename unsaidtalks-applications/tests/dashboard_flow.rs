//! End-to-end flows across the session, gate and fetch layers

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use unsaidtalks_applications::{
    json_producer, AuthorizationGate, DashboardError, DashboardResult, FileSlotStore,
    KeyedResource, MemorySlotStore, Mutation, Protected, ResourceFetch, Role, SessionController,
    SessionInput, SessionState, SessionStore,
};
use unsaidtalks_core::{DataService, WriteMethod, DEFAULT_SESSION_KEY};

/// In-memory stand-in for the mentorship API
#[derive(Default)]
struct MockApi {
    reads: AtomicUsize,
    read_notifications: Mutex<Vec<String>>,
}

#[async_trait]
impl DataService for MockApi {
    async fn get(&self, endpoint: &str) -> DashboardResult<Value> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match endpoint {
            "/api/dashboard/mentor/stats" => Ok(json!({"totalMentees": 12, "activeSessions": 3})),
            "/api/notifications" => Ok(json!({"notifications": [
                {"id": "n1", "title": "Session tomorrow", "read": false},
                {"id": "n2", "title": "New mentee", "read": false}
            ]})),
            other if other.starts_with("/api/sessions/") => {
                let id = other.trim_start_matches("/api/sessions/");
                Ok(json!({"id": id, "topic": format!("Topic {}", id)}))
            }
            _ => Err(DashboardError::fetch("API Error: 404 - Not Found")),
        }
    }

    async fn send(
        &self,
        method: WriteMethod,
        endpoint: &str,
        _body: Option<Value>,
    ) -> DashboardResult<Value> {
        match (method, endpoint.strip_prefix("/api/notifications/")) {
            (WriteMethod::Put, Some(rest)) if rest.ends_with("/read") => {
                let id = rest.trim_end_matches("/read").to_string();
                self.read_notifications.lock().unwrap().push(id);
                Ok(json!({"success": true}))
            }
            _ => Err(DashboardError::fetch("API Error: 405 - Method Not Allowed")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct MentorStats {
    total_mentees: u32,
    active_sessions: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct Notification {
    id: String,
    title: String,
    read: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct NotificationList {
    notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct SessionDetails {
    id: String,
    topic: String,
}

fn memory_controller() -> SessionController {
    SessionController::new(SessionStore::new(
        Arc::new(MemorySlotStore::new()),
        DEFAULT_SESSION_KEY,
    ))
}

fn mentor() -> SessionInput {
    SessionInput::new("m-1", "Priya", "priya@unsaidtalks.com", Role::Mentor)
}

#[tokio::test]
async fn test_protected_dashboard_lifecycle() {
    let api: Arc<dyn DataService> = Arc::new(MockApi::default());
    let controller = memory_controller();
    let gate = AuthorizationGate::mentor_only();

    assert_eq!(controller.hydrate(), SessionState::Anonymous);
    match gate.protect(&controller.state(), "/mentor/dashboard", |_| ()) {
        Protected::Redirect { to, from } => {
            assert_eq!(to, "/login");
            assert_eq!(from, "/mentor/dashboard");
        }
        other => panic!("expected redirect, got {:?}", other),
    }

    controller.login(mentor()).unwrap();
    let view = gate.protect(&controller.state(), "/mentor/dashboard", |_| {
        ResourceFetch::new(json_producer::<MentorStats>(
            api.clone(),
            "/api/dashboard/mentor/stats",
        ))
    });
    let Protected::Content(stats) = view else {
        panic!("mentor should see the dashboard");
    };

    let mut updates = stats.subscribe();
    stats.mount();
    let state = updates.wait_for(|s| !s.loading).await.unwrap().clone();
    assert_eq!(
        state.data,
        Some(MentorStats {
            total_mentees: 12,
            active_sessions: 3
        })
    );

    controller.logout().unwrap();
    assert!(!controller.has_role(Role::ALL));
    assert!(matches!(
        gate.evaluate(&controller.state(), "/mentor/dashboard"),
        unsaidtalks_applications::GateDecision::Redirect { .. }
    ));

    let frozen = stats.state();
    stats.dispose();
    stats.refetch();
    assert_eq!(stats.state(), frozen);
}

#[tokio::test]
async fn test_mentee_is_denied_mentor_views_without_fetching() {
    let api = Arc::new(MockApi::default());
    let controller = memory_controller();
    controller
        .login(SessionInput::new("u-7", "Sam", "sam@example.com", Role::Mentee))
        .unwrap();

    let view = AuthorizationGate::mentor_only().protect(&controller.state(), "/mentor", |_| {
        let fetch = ResourceFetch::new(json_producer::<MentorStats>(
            api.clone(),
            "/api/dashboard/mentor/stats",
        ));
        fetch.mount();
        fetch
    });

    match view {
        Protected::Denied { message } => {
            assert!(message.contains("Your current role is mentee"));
            assert!(message.contains("Required roles: mentor"));
        }
        _ => panic!("expected a denial"),
    }
    tokio::task::yield_now().await;
    assert_eq!(api.reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    let store = || {
        SessionStore::new(
            Arc::new(FileSlotStore::new(dir.path()).unwrap()),
            DEFAULT_SESSION_KEY,
        )
    };

    let first = SessionController::new(store());
    first.hydrate();
    let saved = first.login(mentor().with_avatar("/avatars/priya.png")).unwrap();

    let second = SessionController::new(store());
    let restored = match second.hydrate() {
        SessionState::Authenticated(session) => session,
        other => panic!("expected a restored session, got {:?}", other),
    };
    assert_eq!(restored.id, saved.id);
    assert_eq!(restored.email, saved.email);
    assert_eq!(restored.role, saved.role);
    assert_eq!(restored.avatar, saved.avatar);
    assert!(restored.last_login >= saved.last_login);
    assert!(second.is_mentor());
    assert_eq!(second.hydrate().session().map(|s| s.id.clone()), Some(saved.id));

    second.logout().unwrap();
    let third = SessionController::new(store());
    assert_eq!(third.hydrate(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_mark_notification_read_updates_list_in_place() {
    let mock = Arc::new(MockApi::default());
    let api: Arc<dyn DataService> = mock.clone();

    let list = ResourceFetch::new(json_producer::<NotificationList>(
        api.clone(),
        "/api/notifications",
    ));
    let mut updates = list.subscribe();
    list.mount();
    updates.wait_for(|s| s.data.is_some()).await.unwrap();

    let mark_read = Mutation::new("mark notification as read", {
        let api = api.clone();
        move |id: String| {
            let api = api.clone();
            async move {
                api.send(WriteMethod::Put, &format!("/api/notifications/{}/read", id), None)
                    .await
            }
        }
    });

    mark_read.invoke("n1".to_string()).await.unwrap();
    assert!(list.update_data(|list| {
        for n in list.notifications.iter_mut().filter(|n| n.id == "n1") {
            n.read = true;
        }
    }));

    let data = list.state().data.unwrap();
    let unread: Vec<&str> = data
        .notifications
        .iter()
        .filter(|n| !n.read)
        .map(|n| n.title.as_str())
        .collect();
    assert_eq!(unread, vec!["New mentee"]);
    assert_eq!(*mock.read_notifications.lock().unwrap(), vec!["n1".to_string()]);

    let err = Mutation::new("archive notification", {
        let api = api.clone();
        move |id: String| {
            let api = api.clone();
            async move {
                api.send(WriteMethod::Delete, &format!("/api/notifications/{}", id), None)
                    .await
            }
        }
    })
    .invoke("n2".to_string())
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "API Error: 405 - Method Not Allowed");
}

#[tokio::test]
async fn test_session_details_follow_selected_id() {
    let api: Arc<dyn DataService> = Arc::new(MockApi::default());
    let details = KeyedResource::new("session", move |id: String| {
        let api = api.clone();
        async move {
            let value = api.get(&format!("/api/sessions/{}", id)).await?;
            Ok::<_, DashboardError>(serde_json::from_value::<SessionDetails>(value)?)
        }
    });
    let mut updates = details.subscribe();

    details.mount(None);
    assert_eq!(
        details.state().error.as_deref(),
        Some("No session ID provided")
    );

    details.set_key(Some("s-42".to_string()));
    let state = updates.wait_for(|s| !s.loading).await.unwrap().clone();
    assert_eq!(
        state.data,
        Some(SessionDetails {
            id: "s-42".to_string(),
            topic: "Topic s-42".to_string()
        })
    );
    assert_eq!(state.error, None);
}
