//! Stages 3 and 4: poll for the system configuration record, then derive
//! the service configuration from it.

use crate::context::{BootContext, ServiceConfig};
use crate::errors::BootError;
use crate::pipeline::BootStage;
use crate::ports::ConfigStore;
use crate::retry::BackoffPoller;
use async_trait::async_trait;
use std::sync::Arc;

/// Polls the single-record configuration query until the record appears.
///
/// The record is a hard dependency with no fallback: a separate process may
/// still be writing it, so emptiness drives backoff rather than failure,
/// and polling continues indefinitely. A query error is fatal immediately.
pub struct LoadSystemConfig {
    store: Arc<dyn ConfigStore>,
    poller: BackoffPoller,
}

impl LoadSystemConfig {
    /// Creates the stage with one-second backoff units.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            poller: BackoffPoller::seconds(),
        }
    }

    /// Overrides the backoff time unit.
    #[must_use]
    pub fn with_poller(mut self, poller: BackoffPoller) -> Self {
        self.poller = poller;
        self
    }
}

#[async_trait]
impl BootStage for LoadSystemConfig {
    fn name(&self) -> &str {
        "load-system-config"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let store = Arc::clone(&self.store);
        let polled = self
            .poller
            .poll(move || {
                let store = Arc::clone(&store);
                async move { store.find_system_config().await }
            })
            .await
            .map_err(|err| BootError::store("find_system_config", err))?;

        tracing::info!(
            not_ready = polled.summary.not_ready,
            waited = ?polled.summary.waited,
            "system configuration loaded"
        );
        ctx.config_poll = Some(polled.summary);
        ctx.system_config = Some(polled.value);
        Ok(())
    }
}

/// Derives service-wide settings from the fetched record, collecting every
/// missing field before reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeriveServiceConfig;

impl DeriveServiceConfig {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BootStage for DeriveServiceConfig {
    fn name(&self) -> &str {
        "derive-service-config"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let record = ctx.require_system_config()?;
        let service = ServiceConfig::derive(record)?;
        tracing::debug!(
            api_port = service.api_port,
            run_mode = %service.run_mode,
            queues = service.root_queue_list.len(),
            "service configuration derived"
        );
        ctx.service = Some(service);
        Ok(())
    }
}
