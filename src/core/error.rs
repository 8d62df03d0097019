//! TL-002: Error taxonomy and per-run diagnostics.
//!
//! Everything except [`TaskError::RegistryLoad`] is recovered locally: the
//! failing call, field, or op-code is dropped or replaced by an error pose and
//! recorded as a [`Diagnostic`], and the run completes.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("malformed call '{text}': {reason}")]
    MalformedCall { text: String, reason: String },

    #[error("malformed value for '{field}': {reason}")]
    MalformedField { field: String, reason: String },

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("no container matches {descriptor}")]
    UnresolvedContainer { descriptor: String },

    #[error("{descriptor} matches {} containers: {}", .candidates.len(), .candidates.join(", "))]
    AmbiguousContainer {
        descriptor: String,
        candidates: Vec<String>,
    },

    #[error("unknown op-code '{0}'")]
    UnknownOpCode(String),

    #[error("container '{0}' not found")]
    ContainerNotFound(String),

    #[error("cannot load container registry: {0}")]
    RegistryLoad(String),
}

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Resolve,
    Synthesize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Resolve => write!(f, "resolve"),
            Self::Synthesize => write!(f, "synthesize"),
        }
    }
}

/// A recovered failure, kept for the run report.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub error: TaskError,
}

impl Diagnostic {
    pub fn new(stage: Stage, error: TaskError) -> Self {
        Self { stage, error }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.error)
    }
}
