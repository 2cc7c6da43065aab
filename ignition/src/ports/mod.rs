//! Ports: the trait seams behind which the excluded collaborators live.
//!
//! The orchestrator never implements HTTP routing, SQL, or AMQP wire
//! behavior; it only calls these ports as opaque asynchronous operations
//! with a success/failure outcome. Ports are segregated by concern so each
//! stage receives only the capabilities it needs.

use crate::context::{
    AuthIntegration, EnvSettings, ProviderRecord, SystemCode, SystemConfigRecord,
    SystemProperty,
};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

/// Collaborator failures are opaque to the core; they are only ever wrapped
/// with the failing operation's identity and logged.
pub type PortError = anyhow::Error;

/// Result alias for port operations.
pub type PortResult<T> = Result<T, PortError>;

/// A secret-store payload: the key/value object stored at a secret path.
pub type SecretPayload = serde_json::Map<String, serde_json::Value>;

/// An opaque handle to a live broker connection.
///
/// The concrete connection type belongs to the broker client collaborator;
/// the orchestrator only threads the handle through to whatever consumes it.
#[derive(Clone)]
pub struct BrokerHandle(Arc<dyn Any + Send + Sync>);

impl BrokerHandle {
    /// Wraps a concrete connection value.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    /// Recovers the concrete connection type, if it matches.
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for BrokerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BrokerHandle").finish()
    }
}

/// A listener that has been bound and is ready to serve.
pub trait BoundListener: Send + Sync + fmt::Debug {
    /// The local address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// The database-backed configuration source.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Connects the store and syncs its schema. Called once, before any
    /// query.
    async fn connect(&self, settings: &EnvSettings) -> PortResult<()>;

    /// Finds the single system configuration record. `None` means the
    /// record does not exist yet: "not ready", not an error.
    async fn find_system_config(&self) -> PortResult<Option<SystemConfigRecord>>;

    /// Finds all system configuration records.
    async fn find_all_system_configs(&self) -> PortResult<Vec<SystemConfigRecord>>;
}

/// Reference data queried once during bootstrap and cached for the process
/// lifetime.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// All system property rows.
    async fn find_system_properties(&self) -> PortResult<Vec<SystemProperty>>;

    /// All system code rows.
    async fn find_system_codes(&self) -> PortResult<Vec<SystemCode>>;

    /// The auth integrations that need a client key/secret pair.
    async fn find_auth_integrations(&self) -> PortResult<Vec<AuthIntegration>>;
}

/// Bulk lookup of identity provider records.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    /// Finds all providers matching the given set of identifiers.
    async fn find_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<ProviderRecord>>;
}

/// The secret store holding per-integration credential payloads.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches the key/value payload stored at `path`.
    async fn get_secret(&self, path: &str) -> PortResult<SecretPayload>;
}

/// The message-broker client.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Connects to the broker at `url` and returns the live handle.
    async fn connect(&self, url: &str) -> PortResult<BrokerHandle>;
}

/// Binds the process's network listener.
#[async_trait]
pub trait ListenerBinder: Send + Sync {
    /// Binds a listener on `addr`.
    async fn bind(&self, addr: SocketAddr) -> PortResult<Box<dyn BoundListener>>;
}

/// The full set of ports the bootstrap pipeline is assembled from.
#[derive(Clone)]
pub struct BootPorts {
    /// Configuration source.
    pub config_store: Arc<dyn ConfigStore>,
    /// Reference data source.
    pub reference_store: Arc<dyn ReferenceStore>,
    /// Provider bulk lookup.
    pub provider_directory: Arc<dyn ProviderDirectory>,
    /// Secret store.
    pub secret_store: Arc<dyn SecretStore>,
    /// Broker client.
    pub broker_connector: Arc<dyn BrokerConnector>,
    /// Listener binder.
    pub listener_binder: Arc<dyn ListenerBinder>,
}

impl BootPorts {
    /// Bundles the six collaborator ports.
    #[must_use]
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        reference_store: Arc<dyn ReferenceStore>,
        provider_directory: Arc<dyn ProviderDirectory>,
        secret_store: Arc<dyn SecretStore>,
        broker_connector: Arc<dyn BrokerConnector>,
        listener_binder: Arc<dyn ListenerBinder>,
    ) -> Self {
        Self {
            config_store,
            reference_store,
            provider_directory,
            secret_store,
            broker_connector,
            listener_binder,
        }
    }

    /// Replaces the config store.
    #[must_use]
    pub fn with_config_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.config_store = store;
        self
    }

    /// Replaces the reference store.
    #[must_use]
    pub fn with_reference_store(mut self, store: Arc<dyn ReferenceStore>) -> Self {
        self.reference_store = store;
        self
    }

    /// Replaces the provider directory.
    #[must_use]
    pub fn with_provider_directory(mut self, directory: Arc<dyn ProviderDirectory>) -> Self {
        self.provider_directory = directory;
        self
    }

    /// Replaces the secret store.
    #[must_use]
    pub fn with_secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = store;
        self
    }

    /// Replaces the broker connector.
    #[must_use]
    pub fn with_broker_connector(mut self, connector: Arc<dyn BrokerConnector>) -> Self {
        self.broker_connector = connector;
        self
    }

    /// Replaces the listener binder.
    #[must_use]
    pub fn with_listener_binder(mut self, binder: Arc<dyn ListenerBinder>) -> Self {
        self.listener_binder = binder;
        self
    }
}

impl fmt::Debug for BootPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootPorts").finish_non_exhaustive()
    }
}
