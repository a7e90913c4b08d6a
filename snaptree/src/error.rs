// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Error types for subvolume tree operations
///
/// Every variant corresponds to one failure category with its own stable
/// process exit code, so calling scripts can discriminate causes. None of
/// these are recovered locally; they propagate to the top-level handler in
/// the binary, which terminates the run.
#[derive(Error, Debug)]
pub enum SnapError {
    #[error("Not a btrfs subvolume: {0}")]
    InvalidSource(String),

    #[error("Subvolume name too long: {0}")]
    NameTooLong(String),

    #[error("Subvolume listing failed: {0}")]
    Listing(String),

    #[error("Cannot get read-only flag of {path}: {source}")]
    GetFlags {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot set read-only flag on {path}: {source}")]
    SetFlags {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot create snapshot \"{name}\" in {parent}: {source}")]
    SnapshotCreate {
        parent: String,
        name: String,
        source: std::io::Error,
    },

    #[error("Cannot remove placeholder directory {path}: {source}")]
    PlaceholderRemove {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot destroy subvolume \"{name}\" in {parent}: {source}")]
    Destroy {
        parent: String,
        name: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapError {
    /// Stable exit code of this failure category.
    ///
    /// | code | category |
    /// |------|----------|
    /// | 1    | stray I/O failure (prompt or report stream) |
    /// | 3    | listing/discovery failure |
    /// | 7    | precondition failure (invalid source, over-long name) |
    /// | 8    | flag-query failure |
    /// | 9    | snapshot-creation failure (incl. placeholder removal) |
    /// | 10   | destroy failure |
    /// | 11   | flag-set failure |
    ///
    /// Code 2 is claimed by argument parsing and 0 by success, including
    /// an operator-declined confirmation.
    pub fn exit_code(&self) -> i32 {
        match self {
            SnapError::Io(_) => 1,
            SnapError::Listing(_) => 3,
            SnapError::InvalidSource(_) | SnapError::NameTooLong(_) => 7,
            SnapError::GetFlags { .. } => 8,
            SnapError::SnapshotCreate { .. } | SnapError::PlaceholderRemove { .. } => 9,
            SnapError::Destroy { .. } => 10,
            SnapError::SetFlags { .. } => 11,
        }
    }
}

/// Result type alias for subvolume tree operations
pub type Result<T> = std::result::Result<T, SnapError>;
