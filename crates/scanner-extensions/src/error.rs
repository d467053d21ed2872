use std::path::PathBuf;

use crate::metadata::Relation;

/// Errors raised while selecting and ordering scanner extensions.
///
/// Every variant except the I/O and parse wrappers is a configuration error:
/// extension wiring is checked at query time and never recovered from.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A declaration accessor is not publicly invocable.
    #[error("annotated method must be public: {extension}::{accessor} ({relation})")]
    AccessorNotPublic {
        extension: String,
        accessor: String,
        relation: Relation,
    },

    /// A declaration accessor takes parameters.
    #[error(
        "annotated method must not have parameters: {extension}::{accessor} ({relation}) takes {arity}"
    )]
    AccessorHasParameters {
        extension: String,
        accessor: String,
        relation: Relation,
        arity: usize,
    },

    /// Invoking a declaration accessor failed.
    #[error("can not invoke method {extension}::{accessor} ({relation}): {reason}")]
    AccessorFailed {
        extension: String,
        accessor: String,
        relation: Relation,
        reason: String,
    },

    /// The derived dependency graph contains a cycle.
    #[error("dependency cycle between extensions: {}", participants.join(", "))]
    DependencyCycle { participants: Vec<String> },

    /// Failed to parse a TOML document (plan manifest or settings layer).
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Plan manifest file not found at the expected path.
    #[error("extension plan not found: {0}")]
    PlanNotFound(PathBuf),

    /// Failed to serialize a plan manifest.
    #[error("failed to serialize extension plan: {0}")]
    PlanSerialize(String),

    /// The plan manifest is structurally invalid.
    #[error("invalid extension plan: {reason}")]
    InvalidPlan { reason: String },

    /// I/O error reading settings or plan files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_plan(reason: impl Into<String>) -> Self {
        Self::InvalidPlan {
            reason: reason.into(),
        }
    }

    /// Whether this error is a fatal extension wiring problem, as opposed to
    /// an I/O or parse failure.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::AccessorNotPublic { .. }
                | Self::AccessorHasParameters { .. }
                | Self::AccessorFailed { .. }
                | Self::DependencyCycle { .. }
                | Self::InvalidPlan { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
