//! Error types for the bootstrap orchestrator.
//!
//! The taxonomy distinguishes missing configuration (always aggregated),
//! dependency failures (fatal, wrapped with the failing operation), listener
//! bind exhaustion, and provider correlation misses. "Not ready" (a
//! successful query returning no record) is not an error and never appears
//! here; it is handled inside the backoff poller.

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A single missing required parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{param} is not defined")]
pub struct ParamNotFound {
    /// The name of the missing parameter.
    pub param: String,
}

impl ParamNotFound {
    /// Creates a new missing-parameter entry.
    #[must_use]
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }
}

/// Accumulates missing-parameter errors so an operator sees every missing
/// key in one report instead of one at a time.
///
/// All keys are checked before the report is turned into a result; a
/// non-empty report fails with the full list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamReport {
    errors: Vec<ParamNotFound>,
}

impl ParamReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `param` as missing.
    pub fn missing(&mut self, param: impl Into<String>) {
        self.errors.push(ParamNotFound::new(param));
    }

    /// Checks a candidate value for `param`, recording a miss when absent.
    /// Returns the value unchanged so call sites read as assignments.
    pub fn require<T>(&mut self, param: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing(param);
        }
        value
    }

    /// Returns true if no parameters were missing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of missing parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The names of the missing parameters, in check order.
    #[must_use]
    pub fn missing_params(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.param.as_str()).collect()
    }

    /// The individual entries.
    #[must_use]
    pub fn entries(&self) -> &[ParamNotFound] {
        &self.errors
    }

    /// Converts the report into a result: `Ok` when nothing was missing,
    /// otherwise `Err` carrying the full list.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ParamReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} parameter(s) not found: ", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParamReport {}

/// The main error type for bootstrap operations.
#[derive(Debug, Error)]
pub enum BootError {
    /// One or more required parameters were missing; always aggregated.
    #[error("{0}")]
    Config(#[from] ParamReport),

    /// A configuration or reference store call failed.
    #[error("{operation} failed: {source}")]
    Store {
        /// The failing store operation.
        operation: String,
        /// The underlying collaborator error.
        #[source]
        source: anyhow::Error,
    },

    /// A broker connection attempt failed.
    #[error("broker connect failed for {url}: {source}")]
    Broker {
        /// The broker URL that could not be reached.
        url: String,
        /// The underlying collaborator error.
        #[source]
        source: anyhow::Error,
    },

    /// A secret fetch failed for an integration.
    #[error("failed to get secret for integration {integration}: {source}")]
    Secret {
        /// The integration whose secret could not be fetched.
        integration: String,
        /// The underlying collaborator error.
        #[source]
        source: anyhow::Error,
    },

    /// An integration's secret payload lacked a required credential field.
    #[error("integration {integration} is missing '{field}' in its secret payload")]
    Credentials {
        /// The integration with the incomplete payload.
        integration: Uuid,
        /// The absent field label.
        field: &'static str,
    },

    /// An integration's derived provider id was absent from the bulk lookup.
    #[error("provider {provider_id} for integration {integration} was not found")]
    Correlation {
        /// The integration whose provider could not be resolved.
        integration: Uuid,
        /// The unresolved provider id.
        provider_id: Uuid,
    },

    /// The listener could not be bound within the attempt budget.
    #[error("server failed to start: unable to listen on port {port} after {attempts} attempts")]
    Listen {
        /// The configured port.
        port: u16,
        /// How many bind attempts were made.
        attempts: u32,
        /// The last bind error observed.
        #[source]
        source: anyhow::Error,
    },

    /// A stage failed; wraps the originating error with the stage name.
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        /// The name of the failing stage.
        stage: String,
        /// The originating error.
        #[source]
        source: Box<BootError>,
    },

    /// An orchestrator invariant was broken (e.g. a stage read context
    /// state populated by a later stage).
    #[error("internal error: {0}")]
    Internal(String),
}

impl BootError {
    /// Creates a store-failure error.
    #[must_use]
    pub fn store(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Store {
            operation: operation.into(),
            source,
        }
    }

    /// Wraps this error with the name of the stage it escaped from.
    #[must_use]
    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// Returns the stage name when this is a stage-wrapped error.
    #[must_use]
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Unwraps stage wrappers down to the originating error.
    #[must_use]
    pub fn root(&self) -> &Self {
        let mut current = self;
        while let Self::Stage { source, .. } = current {
            current = source.as_ref();
        }
        current
    }
}
