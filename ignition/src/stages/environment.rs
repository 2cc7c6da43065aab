//! Stage 1: validate the required environment keys.

use crate::context::{BootContext, EnvSettings};
use crate::errors::BootError;
use crate::pipeline::BootStage;
use async_trait::async_trait;

/// Checks every required environment key, aggregating the misses so an
/// operator sees all of them in one report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateEnvironment;

impl ValidateEnvironment {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BootStage for ValidateEnvironment {
    fn name(&self) -> &str {
        "validate-environment"
    }

    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError> {
        let settings = EnvSettings::from_env(&ctx.env)?;
        ctx.settings = Some(settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn populates_settings_from_a_complete_environment() {
        let mut ctx = BootContext::new(fixtures::env_map());

        ValidateEnvironment::new().run(&mut ctx).await.unwrap();

        assert!(ctx.settings.is_some());
    }

    #[tokio::test]
    async fn lists_every_missing_key() {
        let mut env = fixtures::env_map();
        env.remove("DBHOST");
        env.remove("DBNAME");
        let mut ctx = BootContext::new(env);

        let err = ValidateEnvironment::new().run(&mut ctx).await.unwrap_err();

        match err {
            BootError::Config(report) => {
                assert_eq!(report.missing_params(), vec!["DBNAME", "DBHOST"]);
            }
            other => panic!("expected a config error, got {other}"),
        }
        assert!(ctx.settings.is_none());
    }
}
