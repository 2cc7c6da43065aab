//! Stage 5: connect the application- and root-scope brokers.

use crate::context::{BootContext, BrokerBinding, BrokerScope};
use crate::enrich::enrich_in_order;
use crate::errors::BootError;
use crate::pipeline::BootStage;
use crate::ports::{BrokerConnector, PortError};
use async_trait::async_trait;
use std::sync::Arc;

/// Connects both broker scopes, strictly in sequence.
///
/// Both must succeed independently; a failure on the application-scope
/// broker aborts the root-scope attempt.
pub struct ConnectBrokers {
    connector: Arc<dyn BrokerConnector>,
}

impl ConnectBrokers {
    /// Creates the stage.
    #[must_use]
    pub fn new(connector: Arc<dyn BrokerConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl BootStage for ConnectBrokers {
    fn name(&self) -> &str {
        "connect-brokers"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let service = ctx.require_service()?;
        let bindings = vec![
            BrokerBinding::new(BrokerScope::App, service.amqp_url.clone()),
            BrokerBinding::new(BrokerScope::Root, service.root_amqp_url.clone()),
        ];

        let connector = Arc::clone(&self.connector);
        let bindings = enrich_in_order(
            bindings,
            |binding| binding.url.clone(),
            |mut binding| {
                let connector = Arc::clone(&connector);
                async move {
                    tracing::debug!(scope = %binding.scope, url = %binding.url, "connecting broker");
                    let handle = connector.connect(&binding.url).await?;
                    binding.handle = Some(handle);
                    Ok::<_, PortError>(binding)
                }
            },
        )
        .await
        .map_err(|err| BootError::Broker {
            url: err.record,
            source: err.source,
        })?;

        ctx.brokers = bindings;
        Ok(())
    }
}
