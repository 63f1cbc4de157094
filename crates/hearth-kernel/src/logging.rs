//! Logging bootstrap and per-reload filter swapping.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::config::ServerConfiguration;
use crate::error::KernelError;

/// Owns the installed subscriber's reloadable filter.
///
/// The lifecycle swaps the filter from the configuration's `log_level` on
/// every reload, before any reload step that logs through it.
pub struct LogManager {
    reload_handle: Option<reload::Handle<EnvFilter, Registry>>,
}

impl LogManager {
    /// Install the global subscriber with `directive` as the initial filter.
    pub fn init(directive: &str) -> Result<Self, KernelError> {
        let filter = EnvFilter::try_new(directive)
            .map_err(|err| KernelError::Logging(err.to_string()))?;
        let (filter_layer, reload_handle) = reload::Layer::new(filter);
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().with_target(false))
            .try_init()
            .map_err(|err| KernelError::Logging(err.to_string()))?;
        Ok(Self {
            reload_handle: Some(reload_handle),
        })
    }

    /// A manager that leaves the ambient subscriber alone; reloads become
    /// no-ops. For embedding and tests.
    pub fn disabled() -> Self {
        Self { reload_handle: None }
    }

    /// Swap the active filter to the configuration's directive.
    pub fn reload(&self, config: &ServerConfiguration) -> Result<(), KernelError> {
        let Some(handle) = &self.reload_handle else {
            tracing::debug!("logging reload skipped; no managed subscriber installed");
            return Ok(());
        };
        let filter = EnvFilter::try_new(&config.log_level)
            .map_err(|err| KernelError::Logging(err.to_string()))?;
        handle
            .reload(filter)
            .map_err(|err| KernelError::Logging(err.to_string()))?;
        tracing::info!(directive = %config.log_level, "logging subsystem reloaded");
        Ok(())
    }
}
