//! Stages 9 and 10: load the auth integrations and fetch each one's
//! secret payload.

use crate::context::{BootContext, FormValue};
use crate::enrich::enrich_in_order;
use crate::errors::BootError;
use crate::pipeline::BootStage;
use crate::ports::{PortError, ReferenceStore, SecretPayload, SecretStore};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// The secret-store path for an integration's credential payload. The
/// store's mount prefix belongs to the adapter.
#[must_use]
pub fn secret_path(integration_id: Uuid) -> String {
    format!("systemIntegrations/{integration_id}")
}

/// Loads the auth integrations that need a client key/secret pair.
pub struct LoadAuthIntegrations {
    store: Arc<dyn ReferenceStore>,
}

impl LoadAuthIntegrations {
    /// Creates the stage.
    #[must_use]
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BootStage for LoadAuthIntegrations {
    fn name(&self) -> &str {
        "load-auth-integrations"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let rows = self
            .store
            .find_auth_integrations()
            .await
            .map_err(|err| BootError::store("find_auth_integrations", err))?;
        tracing::debug!(count = rows.len(), "auth integrations loaded");
        ctx.integrations = rows;
        Ok(())
    }
}

/// Fetches each integration's secret payload, one integration at a time,
/// and flattens it into the record's label/value list.
///
/// The first fetch that fails aborts the loop; integrations after it are
/// never attempted.
pub struct FetchIntegrationSecrets {
    secrets: Arc<dyn SecretStore>,
}

impl FetchIntegrationSecrets {
    /// Creates the stage.
    #[must_use]
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl BootStage for FetchIntegrationSecrets {
    fn name(&self) -> &str {
        "fetch-integration-secrets"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let integrations = std::mem::take(&mut ctx.integrations);
        let secrets = Arc::clone(&self.secrets);

        let enriched = enrich_in_order(
            integrations,
            |record| record.id.to_string(),
            |mut record| {
                let secrets = Arc::clone(&secrets);
                async move {
                    let path = secret_path(record.id);
                    let payload = secrets.get_secret(&path).await?;
                    record.form_values = flatten_payload(&payload);
                    Ok::<_, PortError>(record)
                }
            },
        )
        .await
        .map_err(|err| BootError::Secret {
            integration: err.record,
            source: err.source,
        })?;

        ctx.integrations = enriched;
        Ok(())
    }
}

/// Flattens a secret payload into label/value pairs, stringifying
/// non-string values.
fn flatten_payload(payload: &SecretPayload) -> Vec<FormValue> {
    payload
        .iter()
        .map(|(label, value)| FormValue {
            label: label.clone(),
            value: match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MapSecretStore, StaticReferenceStore};

    #[tokio::test]
    async fn loads_integration_rows() {
        let store = Arc::new(StaticReferenceStore::new());
        store.set_integrations(vec![
            fixtures::auth_integration("bitbucket"),
            fixtures::auth_integration("bitbucketServer"),
        ]);
        let mut ctx = BootContext::new(fixtures::env_map());

        LoadAuthIntegrations::new(store).run(&mut ctx).await.unwrap();

        assert_eq!(ctx.integrations.len(), 2);
    }

    #[tokio::test]
    async fn fetches_and_flattens_each_secret_in_order() {
        let secrets = Arc::new(MapSecretStore::new());
        let first = fixtures::auth_integration("bitbucket");
        let second = fixtures::auth_integration("bitbucketServer");
        let provider_id = Uuid::new_v4();
        secrets.insert_secret(
            secret_path(first.id),
            fixtures::secret_payload(provider_id, "key-1", "secret-1"),
        );
        secrets.insert_secret(
            secret_path(second.id),
            fixtures::secret_payload(provider_id, "key-2", "secret-2"),
        );

        let mut ctx = BootContext::new(fixtures::env_map());
        ctx.integrations = vec![first.clone(), second.clone()];

        FetchIntegrationSecrets::new(Arc::clone(&secrets) as Arc<dyn SecretStore>)
            .run(&mut ctx)
            .await
            .unwrap();

        assert_eq!(
            secrets.requests(),
            vec![secret_path(first.id), secret_path(second.id)]
        );
        assert_eq!(ctx.integrations[0].form_value("clientId"), Some("key-1"));
        assert_eq!(
            ctx.integrations[1].form_value("clientSecret"),
            Some("secret-2")
        );
    }

    #[tokio::test]
    async fn the_first_failed_fetch_stops_the_loop() {
        let secrets = Arc::new(MapSecretStore::new());
        let first = fixtures::auth_integration("bitbucket");
        let second = fixtures::auth_integration("bitbucketServer");
        let third = fixtures::auth_integration("github");
        let provider_id = Uuid::new_v4();
        secrets.insert_secret(
            secret_path(first.id),
            fixtures::secret_payload(provider_id, "key-1", "secret-1"),
        );
        secrets.fail_path(secret_path(second.id));

        let mut ctx = BootContext::new(fixtures::env_map());
        ctx.integrations = vec![first.clone(), second.clone(), third.clone()];

        let err = FetchIntegrationSecrets::new(Arc::clone(&secrets) as Arc<dyn SecretStore>)
            .run(&mut ctx)
            .await
            .unwrap_err();

        match err {
            BootError::Secret { integration, .. } => {
                assert_eq!(integration, second.id.to_string());
            }
            other => panic!("expected a secret error, got {other}"),
        }
        // The third integration's secret was never requested.
        assert_eq!(
            secrets.requests(),
            vec![secret_path(first.id), secret_path(second.id)]
        );
    }

    #[test]
    fn flattening_stringifies_non_string_values() {
        let mut payload = SecretPayload::new();
        payload.insert("retries".to_string(), serde_json::json!(5));
        payload.insert(
            "clientId".to_string(),
            serde_json::Value::String("key".to_string()),
        );

        let values = flatten_payload(&payload);

        assert!(values
            .iter()
            .any(|v| v.label == "retries" && v.value == "5"));
        assert!(values.iter().any(|v| v.label == "clientId" && v.value == "key"));
    }
}
