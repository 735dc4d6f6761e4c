//! Application state for the API server.

use std::sync::Arc;

use super::pipeline::{AccessPolicy, AllowAll};
use super::version::VersionMap;
use crate::config::Environment;
use crate::db::Storage;
use crate::logging::LogService;

/// Shared application state.
///
/// Holds only process-wide pieces: the storage pool every request opens its
/// data context from, the logging singleton, the version map and the access
/// policy. Anything request-scoped is built per request by
/// [`RequestScope`](super::scope::RequestScope).
///
/// Dependencies are injected via constructor, not created internally.
#[derive(Clone)]
pub struct AppState {
    storage: Storage,
    log: Arc<LogService>,
    environment: Environment,
    versions: Arc<VersionMap>,
    policy: Arc<dyn AccessPolicy>,
    https_port: Option<u16>,
}

impl AppState {
    /// Create state with the default policy (allow everything) and no HTTPS
    /// redirection.
    pub fn new(
        storage: Storage,
        log: LogService,
        environment: Environment,
        versions: VersionMap,
    ) -> Self {
        Self {
            storage,
            log: Arc::new(log),
            environment,
            versions: Arc::new(versions),
            policy: Arc::new(AllowAll),
            https_port: None,
        }
    }

    /// Replace the access policy consulted before dispatch.
    pub fn with_policy(mut self, policy: impl AccessPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Redirect plain HTTP requests to HTTPS on this port.
    pub fn with_https_port(mut self, port: Option<u16>) -> Self {
        self.https_port = port;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn log(&self) -> &LogService {
        &self.log
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn versions(&self) -> &VersionMap {
        &self.versions
    }

    pub fn policy(&self) -> &dyn AccessPolicy {
        self.policy.as_ref()
    }

    pub fn https_port(&self) -> Option<u16> {
        self.https_port
    }
}
