//! Stage 2: connect the configuration store.

use crate::context::BootContext;
use crate::errors::BootError;
use crate::pipeline::BootStage;
use crate::ports::ConfigStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Connects the store and syncs its schema, an opaque operation on the
/// collaborator; a failure here is fatal to the bootstrap attempt.
pub struct ConnectConfigStore {
    store: Arc<dyn ConfigStore>,
}

impl ConnectConfigStore {
    /// Creates the stage.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BootStage for ConnectConfigStore {
    fn name(&self) -> &str {
        "connect-config-store"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let settings = ctx.require_settings()?;
        self.store
            .connect(settings)
            .await
            .map_err(|err| BootError::store("config store connect", err))?;
        tracing::info!("config store connected and synced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::ValidateEnvironment;
    use crate::testing::{fixtures, ScriptedConfigStore};

    async fn validated_context() -> BootContext {
        let mut ctx = BootContext::new(fixtures::env_map());
        ValidateEnvironment::new().run(&mut ctx).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn connects_once_with_the_validated_settings() {
        let store = Arc::new(ScriptedConfigStore::new());
        let mut ctx = validated_context().await;

        ConnectConfigStore::new(Arc::clone(&store) as Arc<dyn ConfigStore>)
            .run(&mut ctx)
            .await
            .unwrap();

        assert_eq!(store.connect_calls(), 1);
    }

    #[tokio::test]
    async fn a_connect_failure_is_fatal_and_wrapped() {
        let store = Arc::new(ScriptedConfigStore::new());
        store.fail_connect("no route to host");
        let mut ctx = validated_context().await;

        let err = ConnectConfigStore::new(store)
            .run(&mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, BootError::Store { .. }));
        assert!(err.to_string().contains("config store connect"));
    }

    #[tokio::test]
    async fn refuses_to_run_before_validation() {
        let store = Arc::new(ScriptedConfigStore::new());
        let mut ctx = BootContext::new(fixtures::env_map());

        let err = ConnectConfigStore::new(store).run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, BootError::Internal(_)));
    }
}
