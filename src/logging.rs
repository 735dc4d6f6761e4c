//! Tracing setup and the process-wide logging service.

use tracing::Dispatch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::StorageConfig;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "mclaren_api=debug,tower_http=debug";

/// Initialize tracing subscriber with env filter
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Structured logger shared by every request.
///
/// Holds nothing but a dispatcher handle, so it is safe to call from any
/// number of concurrent requests. Each method emits exactly one event.
#[derive(Clone)]
pub struct LogService {
    dispatch: Dispatch,
}

impl LogService {
    /// Log through an explicit dispatcher.
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Log through whatever subscriber is installed globally.
    pub fn global() -> Self {
        Self::new(tracing::dispatcher::get_default(Dispatch::clone))
    }

    pub fn info(&self, event: &str, message: &str) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::info!(event, "{}", message);
        })
    }

    pub fn warn(&self, event: &str, message: &str) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::warn!(event, "{}", message);
        })
    }

    /// Record the storage backend chosen at startup. The connection string
    /// itself is never logged.
    pub fn storage_selected(&self, config: &StorageConfig) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::info!(
                event = "storage_selected",
                driver = %config.driver,
                target = %config.redacted_target(),
                max_connections = config.max_connections,
                "storage backend selected"
            );
        })
    }

    /// Record a request that ended in a server error, with full detail.
    pub fn request_failed(&self, method: &str, uri: &str, status: u16, detail: &str) {
        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::error!(
                event = "request_failed",
                method,
                uri,
                status,
                detail,
                "request failed"
            );
        })
    }
}

impl std::fmt::Debug for LogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogService").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod logging_test;
