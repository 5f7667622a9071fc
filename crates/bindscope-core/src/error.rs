//! Error taxonomy shared by the browsers, the query runner, and the local host.
//!
//! Only two things ever reach a caller as an `Err`: a [`BrowseError`] from a browser
//! operation, or a [`HostError`] while the local host opens its backends. Collaborator
//! failures that the browsing experience tolerates are logged and swallowed at the call
//! site instead.

use crate::classifier::CapabilityKind;
use crate::validate::ValidationFailure;
use serde::Serialize;

/// Failure raised by an external storage collaborator (KV store, bucket, database).
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Key-value store rejected the operation.
    #[error("kv store error: {0}")]
    Kv(String),

    /// Object bucket rejected the operation.
    #[error("bucket error: {0}")]
    Bucket(String),

    /// Relational database rejected the statement.
    #[error("{0}")]
    Database(String),

    /// Stored record could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure underneath a backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking worker panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<sled::Error> for CollaboratorError {
    fn from(e: sled::Error) -> Self {
        Self::Kv(e.to_string())
    }
}

impl From<rusqlite::Error> for CollaboratorError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Result discriminant handed to the rendering/routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    NotFound,
    ValidationError,
    InternalError,
}

/// Error returned by a browser or runner operation.
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    /// The named binding does not exist or is not of the requested kind.
    #[error("no {kind} binding named '{name}'")]
    BindingNotFound { kind: CapabilityKind, name: String },

    /// Key or object is absent in an otherwise valid binding.
    #[error("not found: {0}")]
    NotFound(String),

    /// Mutation input failed validation; the attempted input is echoed back.
    #[error("validation failed: {}", .0.message)]
    Validation(ValidationFailure),

    /// The collaborator call itself failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl BrowseError {
    pub fn binding_not_found(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self::BindingNotFound {
            kind,
            name: name.into(),
        }
    }

    /// Maps the error onto the produced-interface outcome.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::BindingNotFound { .. } | Self::NotFound(_) => Outcome::NotFound,
            Self::Validation(_) => Outcome::ValidationError,
            Self::Collaborator(_) => Outcome::InternalError,
        }
    }
}

impl From<ValidationFailure> for BrowseError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure)
    }
}

/// Startup failure while materialising the local environment.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to open kv namespace '{binding}': {source}")]
    Kv {
        binding: String,
        #[source]
        source: sled::Error,
    },

    #[error("failed to open bucket '{binding}': {source}")]
    Bucket {
        binding: String,
        #[source]
        source: sled::Error,
    },

    #[error("failed to open database '{binding}': {source}")]
    Database {
        binding: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to prepare storage directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("binding '{0}' is declared more than once")]
    DuplicateBinding(String),
}
