//! The concrete bootstrap stages, in execution order:
//!
//! 1. validate-environment
//! 2. connect-config-store
//! 3. load-system-config
//! 4. derive-service-config
//! 5. connect-brokers
//! 6. cache-system-properties
//! 7. cache-system-codes
//! 8. cache-system-configs
//! 9. load-auth-integrations
//! 10. fetch-integration-secrets
//! 11. correlate-providers
//! 12. start-listening
//!
//! Each stage is a small struct holding only the ports it needs.

mod brokers;
mod caches;
mod config_store;
mod environment;
mod integrations;
mod listen;
mod providers;
mod system_config;

pub use brokers::ConnectBrokers;
pub use caches::{CacheSystemCodes, CacheSystemConfigs, CacheSystemProperties};
pub use config_store::ConnectConfigStore;
pub use environment::ValidateEnvironment;
pub use integrations::{secret_path, FetchIntegrationSecrets, LoadAuthIntegrations};
pub use listen::StartListening;
pub use providers::CorrelateProviders;
pub use system_config::{DeriveServiceConfig, LoadSystemConfig};
