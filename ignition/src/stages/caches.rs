//! Stages 6–8: cache reference data for the process lifetime.

use crate::context::BootContext;
use crate::errors::BootError;
use crate::pipeline::BootStage;
use crate::ports::{ConfigStore, ReferenceStore};
use async_trait::async_trait;
use std::sync::Arc;

/// Caches the plucked system property field names.
pub struct CacheSystemProperties {
    store: Arc<dyn ReferenceStore>,
}

impl CacheSystemProperties {
    /// Creates the stage.
    #[must_use]
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BootStage for CacheSystemProperties {
    fn name(&self) -> &str {
        "cache-system-properties"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let rows = self
            .store
            .find_system_properties()
            .await
            .map_err(|err| BootError::store("find_system_properties", err))?;
        ctx.caches.property_names = rows.into_iter().map(|row| row.field_name).collect();
        tracing::debug!(count = ctx.caches.property_names.len(), "system properties cached");
        Ok(())
    }
}

/// Caches the system code rows whole.
pub struct CacheSystemCodes {
    store: Arc<dyn ReferenceStore>,
}

impl CacheSystemCodes {
    /// Creates the stage.
    #[must_use]
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BootStage for CacheSystemCodes {
    fn name(&self) -> &str {
        "cache-system-codes"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let rows = self
            .store
            .find_system_codes()
            .await
            .map_err(|err| BootError::store("find_system_codes", err))?;
        tracing::debug!(count = rows.len(), "system codes cached");
        ctx.caches.codes = rows;
        Ok(())
    }
}

/// Caches the first row of the full configuration scan.
///
/// An empty scan leaves the cache unset; the primary record was already
/// fetched by the polling stage, so this cache is a convenience copy.
pub struct CacheSystemConfigs {
    store: Arc<dyn ConfigStore>,
}

impl CacheSystemConfigs {
    /// Creates the stage.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BootStage for CacheSystemConfigs {
    fn name(&self) -> &str {
        "cache-system-configs"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let rows = self
            .store
            .find_all_system_configs()
            .await
            .map_err(|err| BootError::store("find_all_system_configs", err))?;
        ctx.caches.primary_config = rows.into_iter().next();
        Ok(())
    }
}
