//! Stage 11: derive per-integration credentials and correlate providers.

use crate::context::{BootContext, ConsumerCredentials};
use crate::enrich::enrich_in_order;
use crate::errors::BootError;
use crate::pipeline::BootStage;
use crate::ports::ProviderDirectory;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// Derives each integration's provider id and credential pair from its
/// flattened secret payload, then resolves the providers in one bulk
/// lookup and publishes a credential map keyed by provider URL.
///
/// The derivation pass is pure but still runs one record at a time: the
/// correlation that follows needs every record fully populated.
pub struct CorrelateProviders {
    directory: Arc<dyn ProviderDirectory>,
}

impl CorrelateProviders {
    /// Creates the stage.
    #[must_use]
    pub fn new(directory: Arc<dyn ProviderDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl BootStage for CorrelateProviders {
    fn name(&self) -> &str {
        "correlate-providers"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let integrations = std::mem::take(&mut ctx.integrations);

        let integrations = enrich_in_order(
            integrations,
            |record| record.id.to_string(),
            |mut record| async move {
                let provider_id = record
                    .form_value("providerId")
                    .ok_or(BootError::Credentials {
                        integration: record.id,
                        field: "providerId",
                    })?;
                let provider_id =
                    Uuid::parse_str(provider_id).map_err(|_| BootError::Credentials {
                        integration: record.id,
                        field: "providerId",
                    })?;
                let client_key = record
                    .form_value("clientId")
                    .ok_or(BootError::Credentials {
                        integration: record.id,
                        field: "clientId",
                    })?
                    .to_string();
                let client_secret = record
                    .form_value("clientSecret")
                    .ok_or(BootError::Credentials {
                        integration: record.id,
                        field: "clientSecret",
                    })?
                    .to_string();

                record.provider_id = Some(provider_id);
                record.client_key = Some(client_key);
                record.client_secret = Some(client_secret);
                Ok::<_, BootError>(record)
            },
        )
        .await
        .map_err(|err| err.source)?;

        let distinct_ids: BTreeSet<Uuid> =
            integrations.iter().filter_map(|i| i.provider_id).collect();
        let ids: Vec<Uuid> = distinct_ids.into_iter().collect();

        let providers = self
            .directory
            .find_by_ids(&ids)
            .await
            .map_err(|err| BootError::store("providers find_by_ids", err))?;
        let by_id: HashMap<Uuid, String> =
            providers.into_iter().map(|p| (p.id, p.url)).collect();

        for record in &integrations {
            let (Some(provider_id), Some(key), Some(secret)) = (
                record.provider_id,
                record.client_key.as_ref(),
                record.client_secret.as_ref(),
            ) else {
                return Err(BootError::Internal(
                    "integration missing derived credentials after enrichment".to_string(),
                ));
            };

            let url = by_id.get(&provider_id).ok_or(BootError::Correlation {
                integration: record.id,
                provider_id,
            })?;

            ctx.consumer_settings.insert(
                url.clone(),
                ConsumerCredentials {
                    client_key: key.clone(),
                    client_secret: secret.clone(),
                },
            );
        }

        tracing::debug!(
            providers = ctx.consumer_settings.len(),
            "consumer credentials published"
        );
        ctx.integrations = integrations;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FormValue;
    use crate::testing::{fixtures, StaticProviderDirectory};

    fn integration_with_payload(provider_id: Uuid, key: &str, secret: &str) -> crate::context::AuthIntegration {
        let mut record = fixtures::auth_integration("bitbucket");
        record.form_values = vec![
            FormValue {
                label: "providerId".to_string(),
                value: provider_id.to_string(),
            },
            FormValue {
                label: "clientId".to_string(),
                value: key.to_string(),
            },
            FormValue {
                label: "clientSecret".to_string(),
                value: secret.to_string(),
            },
        ];
        record
    }

    #[tokio::test]
    async fn publishes_credentials_keyed_by_provider_url() {
        let provider_id = Uuid::new_v4();
        let directory = Arc::new(StaticProviderDirectory::new());
        directory.set_providers(vec![fixtures::provider(
            provider_id,
            "https://bitbucket.org",
        )]);

        let mut ctx = BootContext::new(fixtures::env_map());
        ctx.integrations = vec![integration_with_payload(provider_id, "key-1", "secret-1")];

        CorrelateProviders::new(Arc::clone(&directory) as Arc<dyn ProviderDirectory>)
            .run(&mut ctx)
            .await
            .unwrap();

        let creds = ctx
            .consumer_settings
            .get("https://bitbucket.org")
            .map(|entry| entry.value().clone())
            .unwrap();
        assert_eq!(creds.client_key, "key-1");
        assert_eq!(creds.client_secret, "secret-1");
        assert_eq!(ctx.integrations[0].provider_id, Some(provider_id));
    }

    #[tokio::test]
    async fn the_bulk_lookup_queries_distinct_ids_once() {
        let provider_id = Uuid::new_v4();
        let directory = Arc::new(StaticProviderDirectory::new());
        directory.set_providers(vec![fixtures::provider(
            provider_id,
            "https://bitbucket.org",
        )]);

        let mut ctx = BootContext::new(fixtures::env_map());
        // Two integrations sharing one provider.
        ctx.integrations = vec![
            integration_with_payload(provider_id, "key-1", "secret-1"),
            integration_with_payload(provider_id, "key-2", "secret-2"),
        ];

        CorrelateProviders::new(Arc::clone(&directory) as Arc<dyn ProviderDirectory>)
            .run(&mut ctx)
            .await
            .unwrap();

        assert_eq!(directory.queries(), vec![vec![provider_id]]);
    }

    #[tokio::test]
    async fn a_missing_payload_field_names_the_integration() {
        let directory = Arc::new(StaticProviderDirectory::new());
        let mut record = fixtures::auth_integration("bitbucket");
        record.form_values = vec![FormValue {
            label: "clientId".to_string(),
            value: "key".to_string(),
        }];
        let id = record.id;

        let mut ctx = BootContext::new(fixtures::env_map());
        ctx.integrations = vec![record];

        let err = CorrelateProviders::new(directory).run(&mut ctx).await.unwrap_err();

        match err {
            BootError::Credentials { integration, field } => {
                assert_eq!(integration, id);
                assert_eq!(field, "providerId");
            }
            other => panic!("expected a credentials error, got {other}"),
        }
    }

    #[tokio::test]
    async fn an_unresolved_provider_fails_with_both_ids() {
        let provider_id = Uuid::new_v4();
        let directory = Arc::new(StaticProviderDirectory::new());
        // Directory knows nothing about this provider.

        let mut ctx = BootContext::new(fixtures::env_map());
        let record = integration_with_payload(provider_id, "key-1", "secret-1");
        let integration_id = record.id;
        ctx.integrations = vec![record];

        let err = CorrelateProviders::new(Arc::clone(&directory) as Arc<dyn ProviderDirectory>)
            .run(&mut ctx)
            .await
            .unwrap_err();

        match err {
            BootError::Correlation {
                integration,
                provider_id: unresolved,
            } => {
                assert_eq!(integration, integration_id);
                assert_eq!(unresolved, provider_id);
            }
            other => panic!("expected a correlation error, got {other}"),
        }
    }

    #[tokio::test]
    async fn a_directory_failure_is_fatal() {
        let provider_id = Uuid::new_v4();
        let directory = Arc::new(StaticProviderDirectory::new());
        directory.fail_with("timeout");

        let mut ctx = BootContext::new(fixtures::env_map());
        ctx.integrations = vec![integration_with_payload(provider_id, "k", "s")];

        let err = CorrelateProviders::new(directory).run(&mut ctx).await.unwrap_err();
        assert!(matches!(err, BootError::Store { .. }));
    }
}
