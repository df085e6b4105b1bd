use thiserror::Error;
use zarrs::{
    array::{ArrayCreateError, ArrayError},
    filesystem::FilesystemStoreCreateError,
    group::GroupCreateError,
    node::NodeCreateError,
    storage::{StorageError, StoreKeyError, StorePrefixError},
};

use crate::geometry::ShapeMismatchError;

/// An error raised by a source or target store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    StorageError(#[from] StorageError),
    #[error(transparent)]
    ArrayError(#[from] ArrayError),
    #[error(transparent)]
    ArrayCreateError(#[from] ArrayCreateError),
    #[error(transparent)]
    GroupCreateError(#[from] GroupCreateError),
    #[error(transparent)]
    NodeCreateError(#[from] NodeCreateError),
    #[error(transparent)]
    StoreKeyError(#[from] StoreKeyError),
    #[error(transparent)]
    StorePrefixError(#[from] StorePrefixError),
    #[error(transparent)]
    FilesystemStoreCreateError(#[from] FilesystemStoreCreateError),
    #[error(transparent)]
    JSONError(#[from] serde_json::Error),
    #[error("{_0}")]
    Other(String),
}

/// A migration error. All migration errors are fatal.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The source chunk shape of an array does not match its dimensionality.
    #[error("array {name}: {source}")]
    ShapeMismatch {
        name: String,
        #[source]
        source: ShapeMismatchError,
    },
    /// Reading from the source store failed.
    #[error("failed to read {what} from the source store")]
    SourceReadFailure {
        what: String,
        #[source]
        source: StoreError,
    },
    /// Writing to the target store failed.
    #[error("failed to write {what} to the target store")]
    TargetWriteFailure {
        what: String,
        #[source]
        source: StoreError,
    },
    /// Writing the consolidated metadata failed.
    #[error("failed to consolidate the target metadata")]
    ConsolidationFailure(#[source] StoreError),
    /// A migrated array does not match its source.
    #[error("array {name} is inconsistent with its source: {detail}")]
    Inconsistent { name: String, detail: String },
}

impl MigrateError {
    pub(crate) fn source_read(what: impl Into<String>) -> impl FnOnce(StoreError) -> Self {
        let what = what.into();
        move |source| Self::SourceReadFailure { what, source }
    }

    pub(crate) fn target_write(what: impl Into<String>) -> impl FnOnce(StoreError) -> Self {
        let what = what.into();
        move |source| Self::TargetWriteFailure { what, source }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn error_chain() {
        let err = MigrateError::source_read("array t2m")(StoreError::Other(
            "missing .zarray".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "failed to read array t2m from the source store"
        );
        assert_eq!(err.source().unwrap().to_string(), "missing .zarray");

        let err = MigrateError::ShapeMismatch {
            name: "t2m".to_string(),
            source: ShapeMismatchError {
                shape: vec![2, 2],
                chunks: vec![1],
            },
        };
        assert!(err.to_string().starts_with("array t2m: chunk shape [1]"));
    }
}
