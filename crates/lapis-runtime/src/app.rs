//! Application assembly and boot.
//!
//! An [`App`] collects the pieces of a Lapis application (configuration,
//! container, router, loaders, rescuer, codecs) and [`App::run`] turns them
//! into a [`Kernel`] that serves requests:
//!
//! ```text
//! App ──run──► loaders (tier by tier) ─► freeze container ─► freeze router ─► Kernel
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lapis_runtime::{App, Loader};
//!
//! let mut app = App::builder().config_file("lapis.toml").build()?;
//! app.loader(StoreLoader).loader(RoutesLoader);
//!
//! let kernel = app.run().await?;
//! let outgoing = kernel.dispatch(Request::new("GET", "/users/42")).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tower::{BoxError, ServiceExt};
use tracing::{debug, info};

use crate::config::{ConfigLoader, ConfigResult, LapisConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use lapis_core::codec::{Codec, CodecRegistry};
use lapis_core::container::Container;
use lapis_core::foundation::{Outgoing, Request, Response, ResponseWriter};
use lapis_core::scheduler::{Prioritized, Tiers, run_tiers};
use lapis_framework::{DispatchService, Dispatcher, Rescuer, RouteTable, Router};

// =============================================================================
// Loader
// =============================================================================

/// Startup work run once by [`App::run`], before the first request.
///
/// Loaders are grouped by [`Prioritized::priority`]: lower tiers finish
/// before higher ones start, loaders of one tier run concurrently. A loader
/// typically binds services into the container or registers routes.
#[async_trait]
pub trait Loader: Prioritized + Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn load(&self, app: &App) -> Result<(), BoxError>;
}

// =============================================================================
// App
// =============================================================================

/// An application under construction.
pub struct App {
    config: LapisConfig,
    container: Arc<Container>,
    router: Mutex<Router>,
    loaders: Tiers<Arc<dyn Loader>>,
    rescuer: Option<Arc<dyn Rescuer>>,
    codecs: CodecRegistry,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates an application with the default configuration.
    pub fn new() -> Self {
        Self::from_config(LapisConfig::default())
    }

    /// Creates a builder that loads configuration from files and the
    /// environment.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Creates an application from an already loaded configuration.
    pub fn from_config(config: LapisConfig) -> Self {
        let container = Arc::new(Container::with_max_depth(config.app.max_injection_depth));
        Self {
            config,
            container,
            router: Mutex::new(Router::new()),
            loaders: Tiers::new(),
            rescuer: None,
            codecs: CodecRegistry::with_defaults(),
        }
    }

    pub fn config(&self) -> &LapisConfig {
        &self.config
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Gives `f` exclusive access to the router.
    ///
    /// ```rust,ignore
    /// app.routes(|router| {
    ///     router.get("/users/<id:\\d+>", show_user).name("users.show");
    /// });
    /// ```
    pub fn routes<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Router) -> R,
    {
        f(&mut self.router.lock())
    }

    /// Adds a loader to the tier it asks for.
    pub fn loader<L: Loader + 'static>(&mut self, loader: L) -> &mut Self {
        debug!(loader = loader.name(), priority = loader.priority(), "Loader added");
        self.loaders.insert(Arc::new(loader));
        self
    }

    /// Adds a loader (builder pattern).
    pub fn with_loader<L: Loader + 'static>(mut self, loader: L) -> Self {
        self.loader(loader);
        self
    }

    /// Replaces the default rescuer (builder pattern).
    pub fn with_rescuer<R: Rescuer + 'static>(mut self, rescuer: R) -> Self {
        self.rescuer = Some(Arc::new(rescuer));
        self
    }

    /// Registers a body codec, replacing any codec for the same content type.
    pub fn codec<C: Codec + 'static>(&mut self, codec: C) -> &mut Self {
        self.codecs.register(codec);
        self
    }

    /// Registers a body codec (builder pattern).
    pub fn with_codec<C: Codec + 'static>(mut self, codec: C) -> Self {
        self.codec(codec);
        self
    }

    /// Runs every loader, freezes the application and returns its kernel.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Loader`] for the first failing loader of the first
    ///   failing tier.
    /// - [`RuntimeError::Registration`] when a route was registered with an
    ///   invalid pattern or a duplicate name.
    pub async fn run(self) -> RuntimeResult<Kernel> {
        info!(
            app = %self.config.app.name,
            loaders = self.loaders.len(),
            "Booting application"
        );

        let app = &self;
        run_tiers(&self.loaders, move |loader| async move {
            debug!(loader = loader.name(), "Running loader");
            loader.load(app).await.map_err(|source| RuntimeError::Loader {
                name: loader.name().to_string(),
                source,
            })
        })
        .await?;

        let Self {
            config,
            container,
            router,
            rescuer,
            codecs,
            ..
        } = self;

        if config.app.freeze_container {
            container.freeze();
        }
        let table = router.into_inner().freeze()?;

        let mut response = Response::new();
        response.set_content_type(config.app.default_content_type.as_str());
        response.set_charset(config.app.charset.as_str());

        let mut dispatcher = Dispatcher::new(table, container)
            .with_codecs(Arc::new(codecs))
            .with_default_response(response);
        if let Some(rescuer) = rescuer {
            dispatcher = dispatcher.with_rescuer(rescuer);
        }

        info!(
            app = %config.app.name,
            routes = dispatcher.table().len(),
            "Application ready"
        );

        Ok(Kernel {
            dispatcher: Arc::new(dispatcher),
            config,
        })
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.config.app.name)
            .field("container", &self.container)
            .field("routes", &self.router.lock().len())
            .field("loaders", &self.loaders.len())
            .finish()
    }
}

// =============================================================================
// AppBuilder
// =============================================================================

/// Loads configuration and creates an [`App`] from it.
///
/// ```rust,ignore
/// let app = App::builder()
///     .config_file("config/lapis.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct AppBuilder {
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            init_logging: true,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a configuration over every loaded source.
    pub fn merge(mut self, config: LapisConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Leaves the global subscriber alone; by default `build` installs one
    /// from the `logging` section.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads, validates and applies the configuration.
    pub fn build(self) -> ConfigResult<App> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        Ok(App::from_config(config))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Kernel
// =============================================================================

/// A booted application: the frozen route table, container and dispatcher.
///
/// Cheap to clone; every clone serves from the same dispatcher.
#[derive(Debug, Clone)]
pub struct Kernel {
    dispatcher: Arc<Dispatcher>,
    config: LapisConfig,
}

impl Kernel {
    /// Dispatches `request` and returns the encoded response.
    ///
    /// # Errors
    ///
    /// Only [`RuntimeError::Unrescuable`].
    pub async fn dispatch(&self, request: Request) -> RuntimeResult<Outgoing> {
        Ok(self.service().oneshot(request).await?)
    }

    /// Dispatches `request`, writing the response to `writer`.
    pub async fn serve(
        &self,
        request: Request,
        writer: Arc<dyn ResponseWriter>,
    ) -> RuntimeResult<()> {
        Ok(self.dispatcher.dispatch(request, writer).await?)
    }

    /// A tower service over this kernel's dispatcher.
    pub fn service(&self) -> DispatchService {
        DispatchService::new(Arc::clone(&self.dispatcher))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn container(&self) -> &Arc<Container> {
        self.dispatcher.container()
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        self.dispatcher.table()
    }

    pub fn config(&self) -> &LapisConfig {
        &self.config
    }
}
