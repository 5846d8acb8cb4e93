//! Error types
//!
//! `TuningError` is returned from configuration loading. `SimFault` never crosses
//! the simulation boundary: every fault degrades to a visible but non-fatal state
//! and is only reported through the log.

use std::path::PathBuf;

use thiserror::Error;

use crate::sim::state::{AgentKind, EntityId};

/// Failure to load or validate a `Tuning` file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl TuningError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Non-fatal conditions the simulation recovers from on its own
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimFault {
    /// A required capability or table is absent; the dependent action is skipped
    #[error("missing collaborator: {what}")]
    MissingCollaborator { what: &'static str },
    /// The composition formula sampled a negative count; clamped to zero
    #[error("wave {wave}: sampled {sampled} {kind:?}, clamped to 0")]
    InvalidCount {
        wave: u32,
        kind: AgentKind,
        sampled: i32,
    },
    /// An agent was registered again; the previous binding was replaced
    #[error("agent {id:?} registered twice; previous binding replaced")]
    DoubleRegistration { id: EntityId },
    /// Every placement attempt hit an occupied point; fell back to the first anchor
    #[error("no free spawn point after {attempts} attempts, using first anchor")]
    ExhaustedRetry { attempts: u32 },
}

impl SimFault {
    /// Log the fault at a level matching its severity
    pub fn report(&self) {
        match self {
            SimFault::InvalidCount { .. } => log::trace!("{self}"),
            SimFault::ExhaustedRetry { .. } => log::debug!("{self}"),
            SimFault::MissingCollaborator { .. } | SimFault::DoubleRegistration { .. } => {
                log::warn!("{self}")
            }
        }
    }
}
