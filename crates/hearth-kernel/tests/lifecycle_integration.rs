//! Integration coverage for the ordered reload sequence.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_kernel::fixtures::{EventLog, PluginMode, TestPlugin};
use hearth_kernel::lifecycle::{LifecycleBuilder, LifecycleController, LifecycleHooks};
use hearth_kernel::modules::{ComposedParts, ModuleRegistry, RestService};
use hearth_kernel::transport::TransportManager;
use hearth_kernel::{ApplicationPaths, HostOptions, KernelContext};
use serde_json::Value;

struct LoggingHooks {
    log: EventLog,
}

#[async_trait]
impl LifecycleHooks for LoggingHooks {
    async fn on_configuration_loaded(&self, _ctx: &Arc<KernelContext>) -> anyhow::Result<()> {
        self.log.push("hook:configuration-loaded");
        Ok(())
    }

    async fn on_parts_composed(
        &self,
        _ctx: &Arc<KernelContext>,
        parts: &ComposedParts,
    ) -> anyhow::Result<()> {
        self.log.push(format!("hook:parts-composed:{}", parts.rest_services.len()));
        Ok(())
    }
}

/// Transport double that logs its creation and disposal.
struct LoggingTransport {
    label: &'static str,
    log: EventLog,
}

#[async_trait]
impl TransportManager for LoggingTransport {
    fn name(&self) -> &str {
        self.label
    }

    async fn broadcast_message(&self, _event: &str, _payload: Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn shutdown(&self) {
        self.log.push(format!("shutdown:{}", self.label));
    }
}

struct StaticRoute(&'static str);

impl RestService for StaticRoute {
    fn route(&self) -> &str {
        self.0
    }
}

fn instrumented_controller(
    root: &std::path::Path,
    registry: Arc<ModuleRegistry>,
    log: &EventLog,
) -> LifecycleController {
    let http_log = log.clone();
    let tcp_log = log.clone();
    LifecycleBuilder::new(ApplicationPaths::new(root), HostOptions::default())
        .with_registry(registry)
        .with_hooks(Arc::new(LoggingHooks { log: log.clone() }))
        .with_http_manager_factory(Box::new(move |_config| {
            http_log.push("factory:http");
            Arc::new(LoggingTransport { label: "http", log: http_log.clone() })
                as Arc<dyn TransportManager>
        }))
        .with_tcp_manager_factory(Box::new(move |_config, parts| {
            tcp_log.push(format!("factory:tcp:{}", parts.rest_services.len()));
            Arc::new(LoggingTransport { label: "tcp", log: tcp_log.clone() })
                as Arc<dyn TransportManager>
        }))
        .build()
}

#[tokio::test]
async fn reload_steps_run_in_the_contract_order() {
    let tmp = tempfile::TempDir::new().unwrap();
    let log = EventLog::default();
    let registry = Arc::new(ModuleRegistry::new());
    registry.register_rest_service(Arc::new(StaticRoute("/system/info")));
    registry.register_plugin(Arc::new(TestPlugin::new(
        "alpha",
        "1.0.0",
        PluginMode::Succeed,
        log.clone(),
    )));

    let controller = instrumented_controller(tmp.path(), registry, &log);
    controller.init().await.unwrap();

    assert_eq!(
        log.entries(),
        vec![
            "factory:http",
            "hook:configuration-loaded",
            "plugin:alpha",
            "hook:parts-composed:1",
            "factory:tcp:1",
        ]
    );
}

#[tokio::test]
async fn manager_rebuild_never_observes_a_stale_service_set() {
    let tmp = tempfile::TempDir::new().unwrap();
    let log = EventLog::default();
    let registry = Arc::new(ModuleRegistry::new());
    registry.register_rest_service(Arc::new(StaticRoute("/system/info")));

    let controller = instrumented_controller(tmp.path(), registry.clone(), &log);
    controller.init().await.unwrap();
    assert!(log.entries().contains(&"factory:tcp:1".to_string()));

    // A module registered between reloads must be visible to the next
    // TCP-manager rebuild.
    registry.register_rest_service(Arc::new(StaticRoute("/items")));
    controller.reload().await.unwrap();
    assert!(log.entries().contains(&"factory:tcp:2".to_string()));
    assert_eq!(controller.composed_parts().await.rest_services.len(), 2);
}

#[tokio::test]
async fn failing_plugin_leaves_reload_and_siblings_intact() {
    let tmp = tempfile::TempDir::new().unwrap();
    let log = EventLog::default();
    let registry = Arc::new(ModuleRegistry::new());
    for (name, mode) in [
        ("alpha", PluginMode::Succeed),
        ("beta", PluginMode::Fail),
        ("gamma", PluginMode::Succeed),
    ] {
        registry.register_plugin(Arc::new(TestPlugin::new(name, "1.0.0", mode, log.clone())));
    }

    let controller = instrumented_controller(tmp.path(), registry, &log);
    controller.init().await.unwrap();

    let entries = log.entries();
    for plugin in ["plugin:alpha", "plugin:beta", "plugin:gamma"] {
        assert!(entries.contains(&plugin.to_string()));
    }
    assert_eq!(controller.failed_modules(), vec!["beta 1.0.0"]);
    // The reload still reached the manager-rebuild step.
    assert!(entries.iter().any(|e| e.starts_with("factory:tcp")));
}

#[tokio::test]
async fn first_run_is_reported_but_not_branched_on() {
    let tmp = tempfile::TempDir::new().unwrap();
    let log = EventLog::default();

    let controller =
        instrumented_controller(tmp.path(), Arc::new(ModuleRegistry::new()), &log);
    controller.init().await.unwrap();
    assert!(controller.is_first_run());

    // The first init persisted the seeded configuration, so a fresh
    // controller over the same directory is no longer a first run.
    let log2 = EventLog::default();
    let controller2 =
        instrumented_controller(tmp.path(), Arc::new(ModuleRegistry::new()), &log2);
    controller2.init().await.unwrap();
    assert!(!controller2.is_first_run());
    // Identical sequence either way.
    assert_eq!(log.entries(), log2.entries());
}

#[tokio::test]
async fn shutdown_disposes_tcp_before_http_and_is_idempotent() {
    let tmp = tempfile::TempDir::new().unwrap();
    let log = EventLog::default();

    let controller =
        instrumented_controller(tmp.path(), Arc::new(ModuleRegistry::new()), &log);
    controller.init().await.unwrap();

    controller.shutdown().await;
    controller.shutdown().await;

    let shutdowns: Vec<String> = log
        .entries()
        .into_iter()
        .filter(|e| e.starts_with("shutdown:"))
        .collect();
    assert_eq!(shutdowns, vec!["shutdown:tcp", "shutdown:http"]);
}
