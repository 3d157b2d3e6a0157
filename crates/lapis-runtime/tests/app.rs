//! Boot path: loaders, configuration and dispatch through the kernel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tower::BoxError;

use lapis_core::codes;
use lapis_core::container::Container;
use lapis_core::foundation::{BufferedWriter, Connection, Request};
use lapis_core::scheduler::Prioritized;
use lapis_framework::{
    Dep, DispatchError, HttpError, Registrar, RegistrationError, Rescuer, Unrescuable,
};
use lapis_runtime::{App, LapisConfig, Loader, RuntimeError};

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct Polite;

impl Greeter for Polite {
    fn greet(&self, name: &str) -> String {
        format!("hello, {name}")
    }
}

async fn greet(Dep(greeter): Dep<dyn Greeter>) -> Result<String, HttpError> {
    Ok(greeter.greet("ada"))
}

// ─── Loaders ───

struct BindGreeter {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Prioritized for BindGreeter {
    fn priority(&self) -> i32 {
        -10
    }
}

#[async_trait]
impl Loader for BindGreeter {
    async fn load(&self, app: &App) -> Result<(), BoxError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        app.container().singleton::<dyn Greeter>(Arc::new(Polite))?;
        self.log.lock().push("bind");
        Ok(())
    }
}

struct Routes {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Prioritized for Routes {}

#[async_trait]
impl Loader for Routes {
    fn name(&self) -> &str {
        "routes"
    }

    async fn load(&self, app: &App) -> Result<(), BoxError> {
        // The greeter must already be bound by the earlier tier.
        assert!(app.container().is_bound::<dyn Greeter>());
        app.routes(|router| {
            router.get("/greet", greet).name("greet");
        });
        self.log.lock().push("routes");
        Ok(())
    }
}

struct Failing;

impl Prioritized for Failing {}

#[async_trait]
impl Loader for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn load(&self, _app: &App) -> Result<(), BoxError> {
        Err("database unreachable".into())
    }
}

struct Never {
    ran: Arc<Mutex<bool>>,
}

impl Prioritized for Never {
    fn priority(&self) -> i32 {
        100
    }
}

#[async_trait]
impl Loader for Never {
    async fn load(&self, _app: &App) -> Result<(), BoxError> {
        *self.ran.lock() = true;
        Ok(())
    }
}

// ─── Tests ───

#[tokio::test]
async fn test_loaders_run_in_tiers() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let app = App::new()
        .with_loader(Routes {
            log: Arc::clone(&log),
        })
        .with_loader(BindGreeter {
            log: Arc::clone(&log),
        });

    let kernel = app.run().await.unwrap();
    assert_eq!(*log.lock(), ["bind", "routes"]);
    assert!(kernel.container().is_frozen());
    assert!(kernel.table().by_name("greet").is_some());

    let outgoing = kernel.dispatch(Request::new("GET", "/greet")).await.unwrap();
    assert_eq!(outgoing.status, 200);
    assert_eq!(outgoing.text(), Some("hello, ada"));
}

#[tokio::test]
async fn test_failing_loader_stops_boot() {
    let ran = Arc::new(Mutex::new(false));
    let app = App::new().with_loader(Failing).with_loader(Never {
        ran: Arc::clone(&ran),
    });

    let err = app.run().await.unwrap_err();
    match err {
        RuntimeError::Loader { name, source } => {
            assert_eq!(name, "failing");
            assert_eq!(source.to_string(), "database unreachable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!*ran.lock());
}

#[tokio::test]
async fn test_duplicate_route_name_fails_boot() {
    let app = App::new();
    app.routes(|router| {
        router.get("/a", || async { Ok::<_, HttpError>("a") }).name("same");
        router.get("/b", || async { Ok::<_, HttpError>("b") }).name("same");
    });

    let err = app.run().await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Registration(RegistrationError::DuplicateRouteName { ref name }) if name == "same"
    ));
}

#[tokio::test]
async fn test_config_shapes_responses() {
    let mut config = LapisConfig::default();
    config.app.charset = "iso-8859-1".into();
    config.app.freeze_container = false;

    let app = App::from_config(config);
    app.routes(|router| {
        router.get("/ping", || async { Ok::<_, HttpError>(json!({"pong": true})) });
    });
    let kernel = app.run().await.unwrap();

    assert!(!kernel.container().is_frozen());
    let outgoing = kernel.dispatch(Request::new("GET", "/ping")).await.unwrap();
    assert_eq!(
        outgoing.headers.get("Content-Type"),
        Some("application/json; charset=iso-8859-1")
    );

    let missing = kernel.dispatch(Request::new("GET", "/pong")).await.unwrap();
    assert_eq!(missing.status, 404);
    assert_eq!(missing.json().unwrap()["code"], json!(codes::HTTP_NOT_FOUND));
}

struct Refuse;

impl Rescuer for Refuse {
    fn rescue(&self, _: Option<&Connection>, err: DispatchError) -> Result<(), Unrescuable> {
        Err(err.into())
    }
}

#[tokio::test]
async fn test_unrescuable_surfaces_from_kernel() {
    let kernel = App::new().with_rescuer(Refuse).run().await.unwrap();

    let writer = Arc::new(BufferedWriter::new());
    let err = kernel
        .serve(Request::new("GET", "/anything"), writer.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Unrescuable(_)));
    assert_eq!(writer.writes(), 1);
}

#[test]
fn test_container_depth_from_config() {
    let mut config = LapisConfig::default();
    config.app.max_injection_depth = 3;
    let app = App::from_config(config);
    assert_eq!(app.container().max_depth(), 3);
    assert_eq!(Container::new().max_depth(), 32);
}
