use crate::types::ChangeKind;

pub type MigrationResult<T> = Result<T, MigrationError>;

#[derive(thiserror::Error, Debug)]
pub enum MigrationError {
    #[error("Unsupported migration pattern: {0}")]
    UnsupportedPattern(String),
    #[error("Cannot revert {kind} migration: {reason}")]
    IrrecoverableRevert { kind: ChangeKind, reason: String },
    #[error("Migration file not found: {0}")]
    MigrationNotFound(String),
    #[error("Invalid migration name: {0}")]
    InvalidMigrationName(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse error class, for callers that branch on the taxonomy rather than
/// on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedPattern,
    IrrecoverableRevert,
    MalformedReference,
    Io,
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrationError::UnsupportedPattern(_) => ErrorKind::UnsupportedPattern,
            MigrationError::IrrecoverableRevert { .. } => ErrorKind::IrrecoverableRevert,
            MigrationError::MigrationNotFound(_) | MigrationError::InvalidMigrationName(_) => {
                ErrorKind::MalformedReference
            }
            MigrationError::Io(_) | MigrationError::Json(_) => ErrorKind::Io,
        }
    }
}
