//! The shared bootstrap context and the records it accumulates.
//!
//! A single [`BootContext`] is threaded through every stage of the
//! pipeline. Stages mutate it in place as they succeed; a stage may only
//! read fields populated by earlier stages.

mod records;
mod settings;
mod system_config;


pub use records::{
    AuthIntegration, BrokerBinding, BrokerScope, ConsumerCredentials, FormValue,
    ProviderRecord, ReferenceCaches, SystemCode, SystemProperty,
};
pub use settings::{process_env, EnvMap, EnvSettings, REQUIRED_ENV_KEYS};
pub use system_config::{ServiceConfig, SystemConfigRecord};

use crate::errors::BootError;
use crate::ports::BoundListener;
use crate::retry::PollSummary;
use dashmap::DashMap;
use std::sync::Arc;

/// The mutable record threaded through all bootstrap stages.
///
/// Exclusively owned by the pipeline runner; one process performs exactly
/// one bootstrap attempt per lifetime, so the context is never shared
/// across concurrent initializations.
#[derive(Debug)]
pub struct BootContext {
    /// The raw environment inputs.
    pub env: EnvMap,
    /// Validated environment settings, populated by the environment stage.
    pub settings: Option<EnvSettings>,
    /// The fetched system configuration record.
    pub system_config: Option<SystemConfigRecord>,
    /// Service-wide settings derived from the record.
    pub service: Option<ServiceConfig>,
    /// How long the configuration poll waited before the record appeared.
    pub config_poll: Option<PollSummary>,
    /// Broker bindings, connected in sequence.
    pub brokers: Vec<BrokerBinding>,
    /// Cached reference data.
    pub caches: ReferenceCaches,
    /// Auth integration rows, enriched in place.
    pub integrations: Vec<AuthIntegration>,
    /// Consumer credentials keyed by provider URL; read-mostly once
    /// published.
    pub consumer_settings: Arc<DashMap<String, ConsumerCredentials>>,
    /// The bound listener, populated by the final stage.
    pub listener: Option<Box<dyn BoundListener>>,
}

impl BootContext {
    /// Creates a fresh context over the given environment inputs.
    #[must_use]
    pub fn new(env: EnvMap) -> Self {
        Self {
            env,
            settings: None,
            system_config: None,
            service: None,
            config_poll: None,
            brokers: Vec::new(),
            caches: ReferenceCaches::default(),
            integrations: Vec::new(),
            consumer_settings: Arc::new(DashMap::new()),
            listener: None,
        }
    }

    /// Creates a context over the current process environment.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self::new(process_env())
    }

    /// The validated environment settings.
    ///
    /// Fails with an internal error when called before the environment
    /// stage has run; that is a stage-ordering defect, not an operator
    /// error.
    pub fn require_settings(&self) -> Result<&EnvSettings, BootError> {
        self.settings.as_ref().ok_or_else(|| {
            BootError::Internal("environment settings read before validation ran".to_string())
        })
    }

    /// The fetched system configuration record.
    pub fn require_system_config(&self) -> Result<&SystemConfigRecord, BootError> {
        self.system_config.as_ref().ok_or_else(|| {
            BootError::Internal("system configuration read before it was loaded".to_string())
        })
    }

    /// The derived service configuration.
    pub fn require_service(&self) -> Result<&ServiceConfig, BootError> {
        self.service.as_ref().ok_or_else(|| {
            BootError::Internal("service configuration read before it was derived".to_string())
        })
    }

    /// The broker binding for a scope, once connected.
    pub fn broker(&self, scope: BrokerScope) -> Option<&BrokerBinding> {
        self.brokers.iter().find(|b| b.scope == scope)
    }
}
