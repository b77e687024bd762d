// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote Store Trait - Anti-Corruption Layer for HDFS
//!
//! Client-facing contract of the distributed filesystem the gateway fronts.
//! The domain only sees this trait; WebHDFS and in-memory implementations
//! live in the infrastructure layer.
//!
//! All paths are absolute and slash-delimited. Implementations report
//! failures through [`StoreError`]; deciding what a failure means for a
//! file-access session is left to [`PathEntity`](crate::domain::path_entity::PathEntity).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::domain::permission::PermissionBits;

/// Byte stream handed to and from the remote store
pub type ByteReader = Pin<Box<dyn AsyncRead + Send>>;

/// Node type reported by the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

/// Metadata of one remote node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    /// Absolute path of the node
    pub path: String,
    pub kind: FileKind,
    /// Length in bytes (0 for directories)
    pub length: u64,
    /// Modification time in milliseconds since the Unix epoch
    pub modification_time: i64,
    pub owner: String,
    pub group: String,
    pub permission: PermissionBits,
}

impl FileStatus {
    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Remote store client contract
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch metadata for a single node
    async fn status(&self, path: &str) -> Result<FileStatus, StoreError>;

    /// List the direct children of a directory, in store order
    async fn list(&self, path: &str) -> Result<Vec<FileStatus>, StoreError>;

    /// Create a directory and any missing parents
    ///
    /// # Returns
    /// * `Ok(true)` if the directory exists afterwards
    async fn mkdirs(&self, path: &str) -> Result<bool, StoreError>;

    /// Delete a node; directories require `recursive` unless empty
    ///
    /// # Returns
    /// * `Ok(false)` if nothing was deleted
    async fn delete(&self, path: &str, recursive: bool) -> Result<bool, StoreError>;

    /// Rename/move a node
    ///
    /// # Returns
    /// * `Ok(false)` if the store refused the rename
    async fn rename(&self, from: &str, to: &str) -> Result<bool, StoreError>;

    /// Change owner and group of a node
    async fn set_owner(&self, path: &str, owner: &str, group: &str) -> Result<(), StoreError>;

    /// Open a file for reading, starting at `offset`
    async fn open(&self, path: &str, offset: u64) -> Result<ByteReader, StoreError>;

    /// Create (or overwrite) a file with the full contents of `content`
    async fn create(&self, path: &str, content: ByteReader) -> Result<(), StoreError>;

    /// Check the store is reachable
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Remote store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout while communicating with remote store")]
    Timeout,

    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Remote store error ({exception}): {message}")]
    Remote { exception: String, message: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Short machine-friendly label used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::PermissionDenied(_) => "permission_denied",
            StoreError::Network(_) => "network",
            StoreError::Timeout => "timeout",
            StoreError::Unavailable(_) => "unavailable",
            StoreError::InvalidPath(_) => "invalid_path",
            StoreError::Remote { .. } => "remote",
            StoreError::Io(_) => "io",
            StoreError::Serialization(_) => "serialization",
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_connect() {
            StoreError::Network(err.to_string())
        } else if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else {
            StoreError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(StoreError::NotFound("/x".into()).kind(), "not_found");
        assert_eq!(StoreError::Timeout.kind(), "timeout");
        assert_eq!(
            StoreError::Remote {
                exception: "AccessControlException".into(),
                message: "denied".into()
            }
            .kind(),
            "remote"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let err: StoreError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(err, StoreError::Io(msg) if msg.contains("pipe closed")));
    }
}
