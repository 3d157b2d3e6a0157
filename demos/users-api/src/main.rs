//! Users API demo
//!
//! Boots a small users service on the Lapis runtime and pushes requests
//! through its kernel, printing each response. No socket is opened: the
//! kernel is driven the way a transport would drive it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package users-api
//! cargo run --package users-api -- "GET /users/1" "POST /users {\"name\":\"grace\"}"
//! cargo run --package users-api -- --config demos/users-api/lapis.toml --verbose
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::Parser;
use lapis::prelude::*;
use lapis::runtime::logging::{LoggingBuilder, SpanEvents};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{Level, info};

// ============================================================================
// Domain
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

trait UserStore: Send + Sync {
    fn find(&self, id: u64) -> Option<User>;
    fn list(&self) -> Vec<User>;
    fn create(&self, name: String) -> User;
    fn delete(&self, id: u64) -> bool;
}

#[derive(Default)]
struct MemoryStore {
    users: RwLock<BTreeMap<u64, User>>,
}

impl UserStore for MemoryStore {
    fn find(&self, id: u64) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    fn list(&self) -> Vec<User> {
        self.users.read().values().cloned().collect()
    }

    fn create(&self, name: String) -> User {
        let mut users = self.users.write();
        let id = users.keys().next_back().map_or(1, |last| last + 1);
        let user = User { id, name };
        users.insert(id, user.clone());
        user
    }

    fn delete(&self, id: u64) -> bool {
        self.users.write().remove(&id).is_some()
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn user_id(params: &ParamBag) -> Result<u64, HttpError> {
    params
        .get_str("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| HttpError::bad_request("id must be a positive integer"))
}

async fn list_users(Dep(store): Dep<dyn UserStore>) -> Result<Vec<User>, HttpError> {
    Ok(store.list())
}

async fn show_user(
    Dep(store): Dep<dyn UserStore>,
    Params(params): Params,
) -> Result<User, HttpError> {
    let id = user_id(&params)?;
    store
        .find(id)
        .ok_or_else(|| HttpError::not_found(format!("user {id} not found")))
}

async fn create_user(
    Dep(store): Dep<dyn UserStore>,
    Input(new): Input<NewUser>,
) -> Result<User, HttpError> {
    let user = store.create(new.name);
    info!(id = user.id, "User created");
    Ok(user)
}

async fn delete_user(
    Dep(store): Dep<dyn UserStore>,
    Params(params): Params,
) -> Result<serde_json::Value, HttpError> {
    let id = user_id(&params)?;
    if store.delete(id) {
        Ok(serde_json::json!({ "deleted": id }))
    } else {
        Err(HttpError::not_found(format!("user {id} not found")))
    }
}

/// A component handler: built from the container on every request.
#[derive(Default, Injectable)]
struct Stats {
    #[inject]
    store: Option<Arc<dyn UserStore>>,
}

#[async_trait]
impl Handle for Stats {
    type Output = serde_json::Value;

    async fn handle(&self, _conn: &Connection) -> DispatchResult<serde_json::Value> {
        let users = self.store.as_ref().map_or(0, |store| store.list().len());
        Ok(serde_json::json!({ "users": users }))
    }
}

async fn health() -> Result<&'static str, HttpError> {
    Ok("ok")
}

// ============================================================================
// Loaders
// ============================================================================

/// Binds the store before any route is registered.
struct StoreLoader;

impl Prioritized for StoreLoader {
    fn priority(&self) -> i32 {
        -10
    }
}

#[async_trait]
impl Loader for StoreLoader {
    fn name(&self) -> &str {
        "store"
    }

    async fn load(&self, app: &App) -> Result<(), BoxError> {
        let store = MemoryStore::default();
        store.create("ada".to_string());
        store.create("linus".to_string());
        app.container().singleton::<dyn UserStore>(Arc::new(store))?;
        Ok(())
    }
}

struct RoutesLoader;

impl Prioritized for RoutesLoader {}

#[async_trait]
impl Loader for RoutesLoader {
    fn name(&self) -> &str {
        "routes"
    }

    async fn load(&self, app: &App) -> Result<(), BoxError> {
        app.routes(|router| {
            router.hook(ResultHook::new()).tag("api");
            router.get("/health", health).name("health");
            router.get("/stats", component::<Stats>()).name("stats");

            let mut users = router.group("/users");
            users.get("", list_users).name("users.list");
            users.get(r"/<id:\d+>", show_user).name("users.show");
            users.delete(r"/<id:\d+>", delete_user).name("users.delete");
            users
                .post("", create_user)
                .name("users.create")
                .hook(BodyHook::new())
                .hook(ValidationHook::new(Rules::new().with("name", Require)));
        });
        Ok(())
    }
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(name = "users-api")]
#[command(about = "Drive the users API through the Lapis dispatcher", long_about = None)]
struct Cli {
    /// Configuration file (defaults to lapis.toml in the current directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,

    /// Log every dispatch span at debug level.
    #[arg(short, long)]
    verbose: bool,

    /// Requests as "METHOD PATH [BODY]". A tour of the API runs when omitted.
    requests: Vec<String>,
}

const TOUR: &[&str] = &[
    "GET /health",
    "GET /users",
    "GET /users/1",
    "GET /users/abc",
    "GET /users/99",
    r#"POST /users {"name":"grace"}"#,
    r#"POST /users {"nickname":"anon"}"#,
    "DELETE /users/2",
    "GET /stats",
];

fn parse_request(line: &str) -> Result<Request> {
    let mut parts = line.trim().splitn(3, ' ');
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        bail!("expected \"METHOD PATH [BODY]\", got {line:?}");
    };

    let request = Request::new(method, target);
    Ok(match parts.next() {
        Some(body) => request
            .with_content_type("application/json")
            .with_body(body.as_bytes().to_vec()),
        None => request,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = App::builder();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    if cli.verbose {
        LoggingBuilder::new()
            .with_level(Level::DEBUG)
            .span_events(SpanEvents::LIFECYCLE)
            .init();
        builder = builder.without_logging();
    }

    let app = builder
        .build()
        .context("failed to load configuration")?
        .with_loader(StoreLoader)
        .with_loader(RoutesLoader);
    let kernel = app.run().await.context("failed to boot application")?;

    let requests: Vec<String> = if cli.requests.is_empty() {
        TOUR.iter().map(|line| line.to_string()).collect()
    } else {
        cli.requests
    };

    for line in &requests {
        let request = parse_request(line)?;
        let outgoing = kernel.dispatch(request).await?;
        let body = String::from_utf8_lossy(&outgoing.body);
        println!("{line}\n  -> {} {body}", outgoing.status);
    }

    Ok(())
}
