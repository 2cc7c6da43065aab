//! The bootstrap front door: assembles the default pipeline, runs it, and
//! converts the final context into explicit resources.
//!
//! Resources are returned to the caller rather than published as ambient
//! globals; after bootstrap they are read-mostly and safe to hand to
//! request-handling code.


use crate::context::{
    process_env, AuthIntegration, BootContext, BrokerScope, ConsumerCredentials, EnvMap,
    ReferenceCaches, ServiceConfig,
};
use crate::errors::BootError;
use crate::pipeline::BootPipeline;
use crate::ports::{BootPorts, BoundListener, BrokerHandle};
use crate::process::FatalMonitor;
use crate::retry::{BackoffPoller, PollSummary};
use crate::stages::{
    CacheSystemCodes, CacheSystemConfigs, CacheSystemProperties, ConnectBrokers,
    ConnectConfigStore, CorrelateProviders, DeriveServiceConfig, FetchIntegrationSecrets,
    LoadAuthIntegrations, LoadSystemConfig, StartListening, ValidateEnvironment,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Timing record for a completed bootstrap.
#[derive(Debug, Clone, Copy)]
pub struct BootReport {
    /// When the bootstrap attempt began.
    pub started_at: DateTime<Utc>,
    /// When the final stage completed.
    pub finished_at: DateTime<Utc>,
    /// What the configuration poll waited through.
    pub config_poll: PollSummary,
}

/// The two live broker connections.
#[derive(Debug, Clone)]
pub struct BrokerHandles {
    /// Application-scope connection.
    pub app: BrokerHandle,
    /// Root/administrative-scope connection.
    pub root: BrokerHandle,
}

/// Everything a successful bootstrap publishes, held for the process
/// lifetime.
#[derive(Debug)]
pub struct AppResources {
    /// The derived service configuration.
    pub service: ServiceConfig,
    /// Live broker connections.
    pub brokers: BrokerHandles,
    /// Cached reference data.
    pub caches: ReferenceCaches,
    /// The enriched auth integration records.
    pub integrations: Vec<AuthIntegration>,
    /// Consumer credentials keyed by provider URL.
    pub consumer_settings: Arc<DashMap<String, ConsumerCredentials>>,
    /// The live listener, ready to serve.
    pub listener: Box<dyn BoundListener>,
    /// Timing record.
    pub report: BootReport,
}

impl AppResources {
    fn from_context(ctx: BootContext, started_at: DateTime<Utc>) -> Result<Self, BootError> {
        let app = broker_handle(&ctx, BrokerScope::App)?;
        let root = broker_handle(&ctx, BrokerScope::Root)?;
        let service = ctx.service.ok_or_else(|| {
            BootError::Internal("service configuration missing after bootstrap".to_string())
        })?;
        let listener = ctx
            .listener
            .ok_or_else(|| BootError::Internal("listener missing after bootstrap".to_string()))?;

        Ok(Self {
            service,
            brokers: BrokerHandles { app, root },
            caches: ctx.caches,
            integrations: ctx.integrations,
            consumer_settings: ctx.consumer_settings,
            listener,
            report: BootReport {
                started_at,
                finished_at: Utc::now(),
                config_poll: ctx.config_poll.unwrap_or_default(),
            },
        })
    }
}

fn broker_handle(ctx: &BootContext, scope: BrokerScope) -> Result<BrokerHandle, BootError> {
    ctx.broker(scope)
        .and_then(|binding| binding.handle.clone())
        .ok_or_else(|| BootError::Internal(format!("{scope} broker missing after bootstrap")))
}

/// Assembles and runs the fixed bootstrap stage sequence.
///
/// The sequence is fixed at build time (this is not a workflow engine),
/// but the environment source, backoff unit, and bind budget are
/// injectable for tests and unusual deployments.
pub struct Bootstrap {
    ports: BootPorts,
    env: EnvMap,
    poll_unit: Duration,
    bind_attempts: u32,
    monitor: Arc<FatalMonitor>,
}

impl Bootstrap {
    /// Creates a bootstrap over the current process environment with
    /// production defaults: one-second backoff units and a four-attempt
    /// bind budget.
    #[must_use]
    pub fn new(ports: BootPorts) -> Self {
        Self {
            ports,
            env: process_env(),
            poll_unit: Duration::from_secs(1),
            bind_attempts: 4,
            monitor: Arc::new(FatalMonitor::new()),
        }
    }

    /// Replaces the environment inputs.
    #[must_use]
    pub fn with_env(mut self, env: EnvMap) -> Self {
        self.env = env;
        self
    }

    /// Overrides the backoff poller's time unit.
    #[must_use]
    pub fn with_poll_unit(mut self, unit: Duration) -> Self {
        self.poll_unit = unit;
        self
    }

    /// Overrides the listener bind attempt budget.
    #[must_use]
    pub fn with_bind_attempts(mut self, attempts: u32) -> Self {
        self.bind_attempts = attempts;
        self
    }

    /// The fatal monitor consulted during the bind window.
    #[must_use]
    pub fn monitor(&self) -> Arc<FatalMonitor> {
        Arc::clone(&self.monitor)
    }

    /// Builds the fixed stage sequence.
    #[must_use]
    pub fn pipeline(&self) -> BootPipeline {
        let ports = &self.ports;
        BootPipeline::new()
            .stage(ValidateEnvironment::new())
            .stage(ConnectConfigStore::new(Arc::clone(&ports.config_store)))
            .stage(
                LoadSystemConfig::new(Arc::clone(&ports.config_store))
                    .with_poller(BackoffPoller::new(self.poll_unit)),
            )
            .stage(DeriveServiceConfig::new())
            .stage(ConnectBrokers::new(Arc::clone(&ports.broker_connector)))
            .stage(CacheSystemProperties::new(Arc::clone(&ports.reference_store)))
            .stage(CacheSystemCodes::new(Arc::clone(&ports.reference_store)))
            .stage(CacheSystemConfigs::new(Arc::clone(&ports.config_store)))
            .stage(LoadAuthIntegrations::new(Arc::clone(&ports.reference_store)))
            .stage(FetchIntegrationSecrets::new(Arc::clone(&ports.secret_store)))
            .stage(CorrelateProviders::new(Arc::clone(&ports.provider_directory)))
            .stage(
                StartListening::new(
                    Arc::clone(&ports.listener_binder),
                    Arc::clone(&self.monitor),
                )
                .with_attempts(self.bind_attempts),
            )
    }

    /// Runs the pipeline to completion.
    ///
    /// On failure the process is expected to exit and be restarted by an
    /// external supervisor; nothing is left listening.
    pub async fn run(self) -> Result<AppResources, BootError> {
        let started_at = Utc::now();
        let pipeline = self.pipeline();
        tracing::info!(stages = pipeline.len(), "bootstrap starting");

        match pipeline.run(BootContext::new(self.env)).await {
            Ok(ctx) => {
                let resources = AppResources::from_context(ctx, started_at)?;
                tracing::info!("bootstrap completed");
                Ok(resources)
            }
            Err(err) => {
                tracing::error!(error = %err, "could not initialize service");
                Err(err)
            }
        }
    }
}
