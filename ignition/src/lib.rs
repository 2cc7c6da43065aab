//! # Ignition
//!
//! A staged bootstrap orchestrator for network service processes.
//!
//! Before a service can accept traffic it has to bring up, in a strict
//! order, a database-backed configuration source, message-broker
//! connections, caches of reference data, per-integration secrets, and a
//! bound network listener, any of which may be transiently unavailable.
//! Ignition sequences these dependencies, applies a distinct retry policy
//! to each failure mode, and either hands back the fully-initialized
//! resources or fails startup with a diagnosable error.
//!
//! Three resilience patterns are built in:
//!
//! - **Backoff polling**: unbounded polling with a doubling, capped,
//!   resetting delay, for configuration that may not exist yet
//! - **Bounded retry**: a fixed attempt budget with immediate reattempts,
//!   for listener binds racing a previous process instance
//! - **Sequential enrichment**: one-at-a-time, fail-fast processing of
//!   record lists against external dependencies
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ignition::prelude::*;
//!
//! let ports = BootPorts::new(
//!     config_store, reference_store, provider_directory,
//!     secret_store, broker_connector, listener_binder,
//! );
//!
//! let resources = Bootstrap::new(ports).run().await?;
//! serve(resources.listener, resources.consumer_settings);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod adapters;
pub mod boot;
pub mod context;
pub mod enrich;
pub mod errors;
pub mod pipeline;
pub mod ports;
pub mod process;
pub mod retry;
pub mod stages;
pub mod telemetry;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::boot::{AppResources, BootReport, Bootstrap};
    pub use crate::context::{
        AuthIntegration, BootContext, BrokerBinding, BrokerScope,
        ConsumerCredentials, EnvSettings, ProviderRecord, ReferenceCaches,
        ServiceConfig, SystemCode, SystemConfigRecord, SystemProperty,
    };
    pub use crate::enrich::{enrich_in_order, EnrichmentError};
    pub use crate::errors::{BootError, ParamNotFound, ParamReport};
    pub use crate::pipeline::{BootPipeline, BootStage};
    pub use crate::ports::{
        BootPorts, BoundListener, BrokerConnector, BrokerHandle, ConfigStore,
        ListenerBinder, PortError, PortResult, ProviderDirectory,
        ReferenceStore, SecretPayload, SecretStore,
    };
    pub use crate::process::FatalMonitor;
    pub use crate::retry::{BackoffPoller, BoundedRetry, PollSummary, SawtoothDelay};
}
