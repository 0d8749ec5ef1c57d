//! Error types for Encore operations

use crate::{RecordId, ResourceKind};
use std::fmt;
use thiserror::Error;

/// Remote store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Record not found: {kind} with id {id}")]
    NotFound { kind: ResourceKind, id: RecordId },

    #[error("Insert failed for {kind}: {reason}")]
    InsertFailed { kind: ResourceKind, reason: String },

    #[error("Update failed for {kind} with id {id}: {reason}")]
    UpdateFailed {
        kind: ResourceKind,
        id: RecordId,
        reason: String,
    },

    #[error("Delete failed for {kind} with id {id}: {reason}")]
    DeleteFailed {
        kind: ResourceKind,
        id: RecordId,
        reason: String,
    },

    #[error("Writing child records of {parent_id} failed: {reason}")]
    ChildWriteFailed { parent_id: RecordId, reason: String },

    #[error("Remote store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Invalid response for {kind}: {reason}")]
    InvalidResponse { kind: ResourceKind, reason: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: &'static str },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Payload for {got} used where {expected} was expected")]
    KindMismatch {
        expected: ResourceKind,
        got: ResourceKind,
    },
}

/// Plan limit errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LimitsError {
    #[error("Subscription limits unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or ENCORE_CONFIG)")]
    MissingConfigPath,

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to install tracing subscriber: {reason}")]
    Telemetry { reason: String },
}

/// Remote operation a mutation was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOperation {
    Create,
    Update,
    Delete,
    ReplaceChildren,
}

impl fmt::Display for MutationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ReplaceChildren => "save the links of",
        };
        f.write_str(verb)
    }
}

/// Outcome of a rejected or failed create/update/delete, as seen by the UI.
///
/// By the time a caller receives one of these the local cache has already
/// been corrected (or was never touched), so the value only needs to be
/// shown, not acted on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    /// The plan ceiling for this kind is reached. Cache and store untouched.
    #[error("Limit reached for {kind}: {current} of {ceiling}")]
    LimitExceeded {
        kind: ResourceKind,
        ceiling: u32,
        current: u64,
    },

    /// The remote store rejected or failed the call; the cache was rolled back.
    #[error("Remote {operation} of {kind} failed: {source}")]
    RemoteFailure {
        kind: ResourceKind,
        operation: MutationOperation,
        #[source]
        source: StorageError,
    },

    /// The parent record persisted but its dependent children did not.
    #[error("{kind} {id} saved without its child records: {reason}")]
    PartialFailure {
        kind: ResourceKind,
        id: RecordId,
        reason: String,
    },

    /// The target is still a pending record with a temporary identifier.
    #[error("{kind} {id} is not confirmed yet")]
    NotConfirmed { kind: ResourceKind, id: RecordId },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl MutationError {
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, Self::LimitExceeded { .. })
    }

    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Self::RemoteFailure { .. })
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, Self::PartialFailure { .. })
    }

    /// Whether a failed remote call was a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RemoteFailure { source, .. } if source.is_not_found())
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::LimitExceeded { kind, ceiling, .. } => format!(
                "You've reached your plan's limit of {} {}s. Upgrade your plan or delete an existing {} to add more.",
                ceiling,
                kind.label(),
                kind.label()
            ),
            Self::RemoteFailure { kind, source, .. } if source.is_not_found() => format!(
                "That {} no longer exists. Your change was undone; refresh and try again.",
                kind.label()
            ),
            Self::RemoteFailure {
                kind, operation, ..
            } => format!(
                "Couldn't {} the {}. Your change was undone; please try again.",
                operation,
                kind.label()
            ),
            Self::PartialFailure { kind, .. } => format!(
                "The {} was saved, but its social links were not. Edit it to try saving them again.",
                kind.label()
            ),
            Self::NotConfirmed { kind, .. } => format!(
                "This {} is still being saved. Try again in a moment.",
                kind.label()
            ),
            Self::Validation(err) => format!("Please check your input: {}", err),
        }
    }
}

/// Master error type for all Encore errors.
#[derive(Debug, Error)]
pub enum EncoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Limits error: {0}")]
    Limits(#[from] LimitsError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),
}

/// Result type alias for Encore operations.
pub type EncoreResult<T> = Result<T, EncoreError>;

// =============================================================================
// TESTS
// =============================================================================
