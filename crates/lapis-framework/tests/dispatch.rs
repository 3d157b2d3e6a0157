//! End-to-end dispatch through router, hooks, handlers and rescuer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use lapis_core::codes;
use lapis_core::container::Container;
use lapis_core::foundation::{BufferedWriter, Connection, Outgoing, Request};
use lapis_core::scheduler::Prioritized;
use lapis_framework::{
    BodyHook, Dep, DispatchResult, Dispatcher, Handle, Hook, HttpError, Input, Params, Registrar,
    ResultHook, Router, Rules, SetUp, ValidationHook, Require, Wired, component,
};
use lapis_macros::Injectable;

// ─── Application types ───

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

trait UserStore: Send + Sync {
    fn find(&self, id: u64) -> Option<User>;
    fn insert(&self, name: String) -> User;
    fn count(&self) -> usize;
}

#[derive(Default)]
struct MemoryStore {
    users: Mutex<BTreeMap<u64, User>>,
}

impl MemoryStore {
    fn seeded() -> Self {
        let store = Self::default();
        store.insert("ada".to_string());
        store
    }
}

impl UserStore for MemoryStore {
    fn find(&self, id: u64) -> Option<User> {
        self.users.lock().get(&id).cloned()
    }

    fn insert(&self, name: String) -> User {
        let mut users = self.users.lock();
        let user = User {
            id: users.len() as u64 + 42,
            name,
        };
        users.insert(user.id, user.clone());
        user
    }

    fn count(&self) -> usize {
        self.users.lock().len()
    }
}

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

// ─── Handlers ───

async fn show_user(
    Dep(store): Dep<dyn UserStore>,
    Params(params): Params,
) -> Result<User, HttpError> {
    let id = params
        .get_str("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| HttpError::bad_request("invalid id"))?;
    store
        .find(id)
        .ok_or_else(|| HttpError::not_found(format!("user {id} not found")))
}

async fn create_user(
    Dep(store): Dep<dyn UserStore>,
    Input(new): Input<NewUser>,
) -> Result<User, HttpError> {
    Ok(store.insert(new.name))
}

#[derive(Default, Injectable)]
struct CountUsers {
    #[inject]
    store: Option<Arc<dyn UserStore>>,
    label: String,
}

#[async_trait]
impl Handle for CountUsers {
    type Output = serde_json::Value;

    async fn handle(&self, _conn: &Connection) -> DispatchResult<serde_json::Value> {
        let count = self.store.as_ref().map_or(0, |s| s.count());
        Ok(json!({ "count": count, "label": self.label }))
    }
}

async fn count_wired(Wired(counter): Wired<CountUsers>) -> Result<serde_json::Value, HttpError> {
    let count = counter.store.as_ref().map_or(0, |s| s.count());
    Ok(json!({ "count": count, "wired": counter.store.is_some() }))
}

// ─── Hooks ───

struct Recorder {
    name: &'static str,
    priority: i32,
    delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SetUp for Recorder {
    async fn set_up(&self, _conn: &Connection) -> DispatchResult<()> {
        self.log.lock().push(format!("start {}", self.name));
        tokio::time::sleep(self.delay).await;
        self.log.lock().push(format!("end {}", self.name));
        Ok(())
    }
}

impl Prioritized for Recorder {
    fn priority(&self) -> i32 {
        self.priority
    }
}

impl Hook for Recorder {
    fn as_set_up(&self) -> Option<&dyn SetUp> {
        Some(self)
    }
}

// ─── Harness ───

fn app() -> Dispatcher {
    let container = Arc::new(Container::new());
    container
        .singleton::<dyn UserStore>(Arc::new(MemoryStore::seeded()))
        .unwrap();

    let mut router = Router::new();
    router.get(r"/users/<id:\d+>", show_user).name("users.show");
    router
        .post("/users", create_user)
        .hook(BodyHook::new())
        .hook(ValidationHook::new(Rules::new().with("name", Require)));
    router.get("/users/count", component::<CountUsers>());
    router.get("/users/wired", count_wired);
    router.get("/strict/<id:\\d+>", show_user).hook(ResultHook::new());

    container.freeze();
    Dispatcher::new(router.freeze().unwrap(), container)
}

async fn send(dispatcher: &Dispatcher, request: Request) -> Outgoing {
    let writer = Arc::new(BufferedWriter::new());
    dispatcher.dispatch(request, writer.clone()).await.unwrap();
    assert_eq!(writer.writes(), 1);
    writer.take().unwrap()
}

// ─── Tests ───

#[tokio::test]
async fn test_route_with_numeric_id() {
    let dispatcher = app();

    let outgoing = send(&dispatcher, Request::new("GET", "/users/42")).await;
    assert_eq!(outgoing.status, 200);
    assert_eq!(outgoing.json(), Some(json!({"id": 42, "name": "ada"})));
    assert_eq!(
        outgoing.headers.get("Content-Type"),
        Some("application/json; charset=utf-8")
    );
}

#[tokio::test]
async fn test_non_numeric_id_is_not_found() {
    let dispatcher = app();

    let outgoing = send(&dispatcher, Request::new("GET", "/users/abc")).await;
    assert_eq!(outgoing.status, 404);

    let body = outgoing.json().unwrap();
    assert_eq!(body["code"], json!(codes::HTTP_NOT_FOUND));
    assert!(body["message"].is_string());
    assert_eq!(body.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_handler_error_status() {
    let dispatcher = app();

    let outgoing = send(&dispatcher, Request::new("GET", "/users/7")).await;
    assert_eq!(outgoing.status, 404);
    assert_eq!(
        outgoing.json(),
        Some(json!({"code": codes::HTTP_NOT_FOUND, "message": "user 7 not found"}))
    );

    let outgoing = send(&dispatcher, Request::new("GET", "/strict/7")).await;
    assert_eq!(outgoing.status, 404);
    assert_eq!(
        outgoing.json(),
        Some(json!({"errors": [{"code": codes::HTTP_NOT_FOUND, "message": "user 7 not found"}]}))
    );
}

#[tokio::test]
async fn test_create_with_body_and_validation() {
    let dispatcher = app();

    let created = send(
        &dispatcher,
        Request::new("POST", "/users")
            .with_content_type("application/json")
            .with_body(r#"{"name":"grace"}"#),
    )
    .await;
    assert_eq!(created.status, 200);
    assert_eq!(created.json(), Some(json!({"id": 43, "name": "grace"})));

    let rejected = send(
        &dispatcher,
        Request::new("POST", "/users").with_body(r#"{"nickname":"x"}"#),
    )
    .await;
    assert_eq!(rejected.status, 400);
    assert_eq!(
        rejected.json(),
        Some(json!({"errors": [{"code": codes::HTTP_BAD_REQUEST, "message": "name is required"}]}))
    );

    let malformed = send(&dispatcher, Request::new("POST", "/users").with_body("{")).await;
    assert_eq!(malformed.status, 400);
}

#[tokio::test]
async fn test_component_handler_is_wired() {
    let dispatcher = app();

    let outgoing = send(&dispatcher, Request::new("GET", "/users/count")).await;
    assert_eq!(outgoing.json(), Some(json!({"count": 1, "label": ""})));
}

#[tokio::test]
async fn test_wired_extractor_builds_per_request() {
    let dispatcher = app();

    let outgoing = send(&dispatcher, Request::new("GET", "/users/wired")).await;
    assert_eq!(outgoing.status, 200);
    assert_eq!(outgoing.json(), Some(json!({"count": 1, "wired": true})));

    send(
        &dispatcher,
        Request::new("POST", "/users").with_body(r#"{"name":"grace"}"#),
    )
    .await;
    let outgoing = send(&dispatcher, Request::new("GET", "/users/wired")).await;
    assert_eq!(outgoing.json(), Some(json!({"count": 2, "wired": true})));
}

#[tokio::test]
async fn test_method_mismatch_is_not_found() {
    let dispatcher = app();

    let outgoing = send(&dispatcher, Request::new("DELETE", "/users/42")).await;
    assert_eq!(outgoing.status, 404);
}

#[tokio::test]
async fn test_hook_tiers_run_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let hook = |name, priority, delay_ms| Recorder {
        name,
        priority,
        delay: Duration::from_millis(delay_ms),
        log: Arc::clone(&log),
    };

    let mut router = Router::new();
    router
        .get("/traced", || async { Ok::<_, HttpError>("done") })
        .hook(hook("c", 5, 0))
        .hook(hook("a", 0, 30))
        .hook(hook("b", 0, 10));
    let dispatcher = Dispatcher::new(router.freeze().unwrap(), Arc::new(Container::new()));

    let outgoing = send(&dispatcher, Request::new("GET", "/traced")).await;
    assert_eq!(outgoing.text(), Some("done"));

    let log = log.lock().clone();
    let position = |entry: &str| log.iter().position(|e| e == entry).unwrap();
    assert!(position("end a") < position("start c"));
    assert!(position("end b") < position("start c"));
    assert!(position("start b") < position("end a"));
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let dispatcher = Arc::new(app());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                let uri = if i % 2 == 0 { "/users/42" } else { "/users/abc" };
                send(&dispatcher, Request::new("GET", uri)).await.status
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let status = task.await.unwrap();
        assert_eq!(status, if i % 2 == 0 { 200 } else { 404 });
    }
}
