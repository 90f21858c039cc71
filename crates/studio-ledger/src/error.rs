use serde::{Deserialize, Serialize};
use studio_store::StoreError;

/// Coarse classification of a [`LedgerError`], stable across releases and
/// suitable for callers that branch on the failure class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyExists,
    NotFound,
    InsufficientQuantity,
    InsufficientMaterials,
    CorruptState,
    StoreUnavailable,
}

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("owner already exists: {owner}")]
    AlreadyExists { owner: String },

    #[error("owner not found: {owner}")]
    OwnerNotFound { owner: String },

    #[error("material {description:?} not found for owner {owner}")]
    MaterialNotFound { owner: String, description: String },

    #[error(
        "insufficient quantity of {description:?} held by {owner}: requested {requested}, first entry holds {available}"
    )]
    InsufficientQuantity {
        owner: String,
        description: String,
        requested: u64,
        available: u64,
    },

    #[error("owner {owner} holds {available} material entries; crafting needs {required}")]
    InsufficientMaterials {
        owner: String,
        available: usize,
        required: usize,
    },

    #[error("corrupt state under key {key:?}: {reason}")]
    CorruptState { key: String, reason: String },

    #[error("store error: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl LedgerError {
    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::OwnerNotFound { .. } | Self::MaterialNotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientQuantity { .. } => ErrorKind::InsufficientQuantity,
            Self::InsufficientMaterials { .. } => ErrorKind::InsufficientMaterials,
            Self::CorruptState { .. } => ErrorKind::CorruptState,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    pub(crate) fn owner_not_found(owner: &str) -> Self {
        Self::OwnerNotFound {
            owner: owner.to_string(),
        }
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
