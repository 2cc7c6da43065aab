//! Executes an ordered list of bootstrap stages against a shared context.

use crate::context::BootContext;
use crate::errors::BootError;
use async_trait::async_trait;
use std::fmt;

/// One unit of the bootstrap pipeline.
///
/// A stage consumes and mutates the shared context, succeeding or failing.
/// A stage's success may depend on state set by earlier stages only; it
/// must not read context fields populated by later stages.
#[async_trait]
pub trait BootStage: Send + Sync {
    /// The stage's name, used to wrap its failures for diagnosability.
    fn name(&self) -> &str;

    /// Executes the stage.
    async fn run(&self, ctx: &mut BootContext) -> Result<(), BootError>;
}

/// Runs stages strictly in order, stopping at the first failure.
///
/// On a failure no subsequent stage runs, regardless of how many remain;
/// the failure is wrapped with the failing stage's name and returned. On
/// completion of all stages the final context is returned. Stage N's side
/// effects are fully committed before stage N+1 begins.
#[derive(Default)]
pub struct BootPipeline {
    stages: Vec<Box<dyn BootStage>>,
}

impl BootPipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage. Stages execute in append order.
    #[must_use]
    pub fn stage(mut self, stage: impl BootStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// The number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true when no stages have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The stage names, in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Drives the context through every stage.
    pub async fn run(&self, mut ctx: BootContext) -> Result<BootContext, BootError> {
        for (index, stage) in self.stages.iter().enumerate() {
            tracing::debug!(stage = stage.name(), index, "stage started");

            if let Err(err) = stage.run(&mut ctx).await {
                tracing::error!(
                    stage = stage.name(),
                    error = %err,
                    "stage failed; halting bootstrap"
                );
                return Err(err.in_stage(stage.name()));
            }

            tracing::debug!(stage = stage.name(), "stage completed");
        }

        Ok(ctx)
    }
}

impl fmt::Debug for BootPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootPipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
