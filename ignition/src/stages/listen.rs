//! Stage 12: bind the network listener.

use crate::context::BootContext;
use crate::errors::BootError;
use crate::pipeline::BootStage;
use crate::process::FatalMonitor;
use crate::ports::ListenerBinder;
use crate::retry::BoundedRetry;
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Binds the listener on all interfaces at the configured port.
///
/// A bind error is retried immediately up to the attempt budget; the
/// expected conflict (a prior instance of this process still holding the
/// port during a restart race) is suppressed from the fatal monitor for
/// the duration of the bind window only.
pub struct StartListening {
    binder: Arc<dyn ListenerBinder>,
    monitor: Arc<FatalMonitor>,
    retry: BoundedRetry,
}

impl StartListening {
    /// Creates the stage with the standard four-attempt budget.
    #[must_use]
    pub fn new(binder: Arc<dyn ListenerBinder>, monitor: Arc<FatalMonitor>) -> Self {
        Self {
            binder,
            monitor,
            retry: BoundedRetry::new(4),
        }
    }

    /// Overrides the attempt budget.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.retry = BoundedRetry::new(attempts);
        self
    }
}

#[async_trait]
impl BootStage for StartListening {
    fn name(&self) -> &str {
        "start-listening"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let service = ctx.require_service()?;
        let port = service.api_port;
        if port == 0 {
            return Err(BootError::Internal("invalid listener port 0".to_string()));
        }
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        let window = self.monitor.suppression_window();
        let binder = Arc::clone(&self.binder);
        let result = self
            .retry
            .run(|attempt| {
                let binder = Arc::clone(&binder);
                async move {
                    tracing::debug!(attempt, %addr, "binding listener");
                    binder.bind(addr).await
                }
            })
            .await;
        drop(window);

        let listener = result.map_err(|source| BootError::Listen {
            port,
            attempts: self.retry.max_attempts(),
            source,
        })?;

        match listener.local_addr() {
            Ok(local) => tracing::info!(%local, "service listening"),
            Err(_) => tracing::info!(port, "service listening"),
        }
        ctx.listener = Some(listener);
        Ok(())
    }
}
