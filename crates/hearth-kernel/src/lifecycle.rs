//! Host bootstrap and reload orchestration.
//!
//! `LifecycleController` drives Init and Reload as one ordered sequence over
//! the kernel's components. The ordering is a hard contract: logging is
//! reloaded before any step that logs through it, configuration is loaded
//! before parts are composed, parts are composed before the plugin fan-out,
//! and the plugin fan-out finishes before transport managers are rebuilt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::bus::{KernelNotification, NotificationBus};
use crate::codec::DocumentCodec;
use crate::composer::PluginComposer;
use crate::config::{HostOptions, ServerConfiguration};
use crate::context::KernelContext;
use crate::error::KernelError;
use crate::logging::LogManager;
use crate::modules::{ComposedParts, ModuleRegistry};
use crate::paths::ApplicationPaths;
use crate::restart::{RestartCoordinator, RestartHost};
use crate::store::ConfigStore;
use crate::stub::{NullDirectoryWatcher, NullItemRepository, NullRestartHost, StubTransportManager};
use crate::transport::{TransportManager, TransportRegistry};
use crate::watch::DirectoryWatcher;
use crate::write_guard::{FileWriteGuard, ItemRepository};

/// Extension seams invoked at fixed points of the reload sequence.
///
/// Hook errors abort the reload; plugin failures, by contrast, are isolated
/// by the composer and never reach these seams.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Runs once the configuration generation is loaded, before parts are
    /// composed.
    async fn on_configuration_loaded(&self, _ctx: &Arc<KernelContext>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after parts are composed and plugins initialized, before the
    /// TCP-facing manager is rebuilt.
    async fn on_parts_composed(
        &self,
        _ctx: &Arc<KernelContext>,
        _parts: &ComposedParts,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

struct NoopHooks;

#[async_trait]
impl LifecycleHooks for NoopHooks {}

pub type HttpManagerFactory =
    Box<dyn Fn(Arc<ServerConfiguration>) -> Arc<dyn TransportManager> + Send + Sync>;
pub type TcpManagerFactory =
    Box<dyn Fn(Arc<ServerConfiguration>, &ComposedParts) -> Arc<dyn TransportManager> + Send + Sync>;

pub struct LifecycleBuilder {
    paths: Arc<ApplicationPaths>,
    options: HostOptions,
    registry: Arc<ModuleRegistry>,
    watcher: Arc<dyn DirectoryWatcher>,
    items: Arc<dyn ItemRepository>,
    restart_host: Arc<dyn RestartHost>,
    hooks: Arc<dyn LifecycleHooks>,
    http_factory: HttpManagerFactory,
    tcp_factory: TcpManagerFactory,
    logging: LogManager,
}

impl LifecycleBuilder {
    /// Defaults wire the stub collaborators; production hosts replace the
    /// watcher, restart host, and transport factories.
    pub fn new(paths: ApplicationPaths, options: HostOptions) -> Self {
        Self {
            paths: Arc::new(paths),
            options,
            registry: Arc::new(ModuleRegistry::new()),
            watcher: Arc::new(NullDirectoryWatcher),
            items: Arc::new(NullItemRepository),
            restart_host: Arc::new(NullRestartHost),
            hooks: Arc::new(NoopHooks),
            http_factory: Box::new(|_config| {
                Arc::new(StubTransportManager::new("http-stub")) as Arc<dyn TransportManager>
            }),
            tcp_factory: Box::new(|_config, _parts| {
                Arc::new(StubTransportManager::new("tcp-stub")) as Arc<dyn TransportManager>
            }),
            logging: LogManager::disabled(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<ModuleRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_watcher(mut self, watcher: Arc<dyn DirectoryWatcher>) -> Self {
        self.watcher = watcher;
        self
    }

    pub fn with_item_repository(mut self, items: Arc<dyn ItemRepository>) -> Self {
        self.items = items;
        self
    }

    pub fn with_restart_host(mut self, host: Arc<dyn RestartHost>) -> Self {
        self.restart_host = host;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_http_manager_factory(mut self, factory: HttpManagerFactory) -> Self {
        self.http_factory = factory;
        self
    }

    pub fn with_tcp_manager_factory(mut self, factory: TcpManagerFactory) -> Self {
        self.tcp_factory = factory;
        self
    }

    pub fn with_log_manager(mut self, logging: LogManager) -> Self {
        self.logging = logging;
        self
    }

    pub fn build(self) -> LifecycleController {
        let codec = DocumentCodec;
        let bus = Arc::new(NotificationBus::new());
        let transports = Arc::new(TransportRegistry::new());
        let config = Arc::new(ConfigStore::new(
            self.paths.clone(),
            codec,
            bus.clone(),
            transports.clone(),
        ));
        let write_guard = Arc::new(FileWriteGuard::new(self.watcher, self.items));
        let failed_modules = Arc::new(StdRwLock::new(Vec::new()));
        let ctx = Arc::new(KernelContext {
            paths: self.paths,
            options: self.options,
            codec,
            bus,
            transports,
            config,
            write_guard,
            restart: RestartCoordinator::new(self.restart_host),
            failed_modules: failed_modules.clone(),
        });
        let composer = PluginComposer::new(self.registry.clone(), failed_modules);
        LifecycleController {
            ctx,
            registry: self.registry,
            composer,
            hooks: self.hooks,
            http_factory: self.http_factory,
            tcp_factory: self.tcp_factory,
            logging: self.logging,
            parts: RwLock::new(ComposedParts::default()),
            first_run: AtomicBool::new(false),
        }
    }
}

pub struct LifecycleController {
    ctx: Arc<KernelContext>,
    registry: Arc<ModuleRegistry>,
    composer: PluginComposer,
    hooks: Arc<dyn LifecycleHooks>,
    http_factory: HttpManagerFactory,
    tcp_factory: TcpManagerFactory,
    logging: LogManager,
    parts: RwLock<ComposedParts>,
    first_run: AtomicBool,
}

impl LifecycleController {
    pub fn ctx(&self) -> &Arc<KernelContext> {
        &self.ctx
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Whether `init` found no prior configuration file. A reported fact,
    /// not a branch: the reload sequence is identical either way.
    pub fn is_first_run(&self) -> bool {
        self.first_run.load(Ordering::SeqCst)
    }

    /// Plugin-module failures recorded by the latest fan-out.
    pub fn failed_modules(&self) -> Vec<String> {
        self.composer.failed_modules()
    }

    /// The parts composed by the latest reload.
    pub async fn composed_parts(&self) -> ComposedParts {
        self.parts.read().await.clone()
    }

    /// Bootstrap the host: record whether this is a first run, then execute
    /// the full reload sequence.
    pub async fn init(&self) -> Result<(), KernelError> {
        let first_run = !self.ctx.config().config_file_exists().await?;
        self.first_run.store(first_run, Ordering::SeqCst);
        if first_run {
            tracing::info!("no configuration file found; this is a first run");
        }
        self.reload().await
    }

    /// Execute the ordered reload sequence.
    ///
    /// Not reentrant: callers must serialize invocations. Once started, the
    /// sequence runs to completion or returns the first error.
    pub async fn reload(&self) -> Result<(), KernelError> {
        tracing::info!("reload beginning");
        self.ctx.bus().publish(KernelNotification::ReloadBeginning);

        // 1. Invalidate the cached configuration generation.
        self.ctx.config().invalidate().await;

        // 2. Logging next; this get() is the generation's first read and
        //    every later step logs through the reloaded subscriber.
        let config = self.ctx.config().get().await?;
        self.logging.reload(&config)?;
        self.ctx.bus().publish(KernelNotification::LoggerReloaded);

        // 3. The HTTP-facing manager is stateless across reloads; recreate
        //    it unconditionally.
        let http = (self.http_factory)(config.clone());
        self.ctx.transports().replace_http(http).await;

        // 4. Extension hook once configuration is available.
        self.hooks
            .on_configuration_loaded(&self.ctx)
            .await
            .map_err(KernelError::hook)?;

        // 5. Recompose parts from the module registry.
        let parts = self.registry.compose();
        *self.parts.write().await = parts.clone();
        tracing::debug!(
            plugins = parts.plugins.len(),
            rest_services = parts.rest_services.len(),
            websocket_listeners = parts.websocket_listeners.len(),
            "parts composed"
        );

        // 6. Plugin fan-out; completes only when every branch has finished.
        self.composer.initialize_all(&parts.plugins, &self.ctx).await;
        self.hooks
            .on_parts_composed(&self.ctx, &parts)
            .await
            .map_err(KernelError::hook)?;

        // 7. The TCP-facing manager depends on the freshly composed service
        //    set, so it is rebuilt last.
        let tcp = (self.tcp_factory)(config, &parts);
        self.ctx.transports().replace_tcp(tcp).await;

        self.ctx.bus().publish(KernelNotification::ReloadCompleted {
            first_run: self.is_first_run(),
        });
        tracing::info!("reload completed");
        Ok(())
    }

    /// Dispose transports (TCP before HTTP) and the directory watcher.
    /// Idempotent; a second call finds nothing left to dispose.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down");
        self.ctx.transports().shutdown().await;
        self.ctx.write_guard().shutdown();
    }
}
