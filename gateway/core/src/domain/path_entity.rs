// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Path Entity - one addressable remote node seen through an identity
//!
//! A `PathEntity` is a cheap value pairing a normalized absolute path with
//! the identity acting on it. It may name a node that does not exist yet,
//! and it never caches metadata: every query is a fresh round-trip to the
//! remote store.
//!
//! Remote failures never escape as raw store errors. Queries collapse them
//! into conservative answers (`false`, `0`, `None`) after logging the cause;
//! only the two stream-opening operations return an error, and only a
//! locally synthesized [`AccessError::PermissionDenied`] or the store error
//! that prevented the stream from opening.
//!
//! # Permission evaluation
//!
//! Access is decided here from the node's owner, group and permission bits,
//! not by the remote store:
//!
//! 1. the identity owns the node → owner bits
//! 2. the identity is a member of the node's group → group bits
//! 3. otherwise → other bits
//!
//! When the metadata of a path cannot be fetched (typically because it does
//! not exist yet), writability is decided by the closest ancestor whose
//! metadata can be fetched, so "may I create this?" questions work.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** File-access operations mapped onto remote store calls

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::identity::Identity;
use crate::domain::path;
use crate::domain::permission::PermissionClass;
use crate::domain::remote_store::{ByteReader, FileStatus, StoreError};
use crate::domain::store_handle::StoreHandle;
use crate::domain::stream::WriteStream;

/// Hard-link count reported for directories (Unix `.`/`..` convention).
pub const DIRECTORY_LINK_COUNT: u32 = 3;

/// Hard-link count reported for everything else.
pub const FILE_LINK_COUNT: u32 = 1;

/// Kind of access being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// Errors returned when opening a content stream
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("No {access} permission: {path}")]
    PermissionDenied { path: String, access: Access },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One remote node bound to an acting identity
#[derive(Clone)]
pub struct PathEntity {
    path: String,
    identity: Arc<Identity>,
    store: Arc<StoreHandle>,
}

impl PathEntity {
    /// Create an entity for `path`, normalized to absolute form.
    pub fn new(path: &str, identity: Arc<Identity>, store: Arc<StoreHandle>) -> Self {
        Self {
            path: path::normalize(path),
            identity,
            store,
        }
    }

    fn sibling(&self, path: &str) -> Self {
        Self::new(path, self.identity.clone(), self.store.clone())
    }

    pub fn absolute_path(&self) -> &str {
        &self.path
    }

    /// Last path segment, or `/` for the root.
    pub fn short_name(&self) -> &str {
        path::file_name(&self.path)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The remote store has no hidden nodes.
    pub fn is_hidden(&self) -> bool {
        false
    }

    pub fn parent(&self) -> PathEntity {
        self.sibling(path::parent(&self.path))
    }

    /// Fetch fresh metadata, keeping the failure cause.
    pub async fn status(&self) -> Result<FileStatus, StoreError> {
        Self::status_of(&self.store, &self.path).await
    }

    async fn status_of(store: &StoreHandle, path: &str) -> Result<FileStatus, StoreError> {
        store.get().await?.status(path).await
    }

    fn collapse<T>(&self, operation: &'static str, result: Result<T, StoreError>, fallback: T) -> T {
        result.unwrap_or_else(|e| {
            tracing::debug!(
                path = %self.path,
                operation,
                error_kind = e.kind(),
                error = %e,
                "Remote store call failed"
            );
            fallback
        })
    }

    pub async fn is_directory(&self) -> bool {
        let result = self.status().await.map(|s| s.is_directory());
        self.collapse("is_directory", result, false)
    }

    pub async fn is_file(&self) -> bool {
        let result = self.status().await.map(|s| s.is_file());
        self.collapse("is_file", result, false)
    }

    pub async fn exists(&self) -> bool {
        let result = self.status().await.map(|_| true);
        self.collapse("exists", result, false)
    }

    /// Evaluate `access` for the acting identity against the node at `path`.
    async fn evaluate(&self, path: &str, access: Access) -> Result<bool, StoreError> {
        let status = Self::status_of(&self.store, path).await?;
        let class = PermissionClass::of(&self.identity, &status.owner, &status.group);
        let allowed = match access {
            Access::Read => status.permission.can_read(class),
            Access::Write => status.permission.can_write(class),
        };

        tracing::debug!(
            path = %path,
            identity = %self.identity,
            permission = %status.permission,
            "PERMISSIONS: {} {} for {}",
            access,
            if allowed { "allowed" } else { "denied" },
            class
        );
        Ok(allowed)
    }

    pub async fn is_readable(&self) -> bool {
        let result = self.evaluate(&self.path, Access::Read).await;
        self.collapse("is_readable", result, false)
    }

    /// Writability of this path, or of its closest ancestor whose metadata
    /// can be fetched. A failure at the root answers `false`.
    pub async fn is_writable(&self) -> bool {
        let mut current = self.path.clone();
        loop {
            match self.evaluate(&current, Access::Write).await {
                Ok(allowed) => return allowed,
                Err(e) if current == "/" => {
                    return self.collapse("is_writable", Err::<bool, _>(e), false);
                }
                Err(e) => {
                    tracing::debug!(
                        path = %current,
                        error = %e,
                        "No metadata, checking parent for write permission"
                    );
                    current = path::parent(&current).to_string();
                }
            }
        }
    }

    /// Removal needs the same permission as writing.
    pub async fn is_removable(&self) -> bool {
        self.is_writable().await
    }

    pub async fn owner_name(&self) -> Option<String> {
        let result = self.status().await.map(|s| Some(s.owner));
        self.collapse("owner_name", result, None)
    }

    pub async fn group_name(&self) -> Option<String> {
        let result = self.status().await.map(|s| Some(s.group));
        self.collapse("group_name", result, None)
    }

    /// Conventional link count: 3 for directories, 1 otherwise.
    pub async fn link_count(&self) -> u32 {
        if self.is_directory().await {
            DIRECTORY_LINK_COUNT
        } else {
            FILE_LINK_COUNT
        }
    }

    /// Modification time in milliseconds since the epoch, 0 when unknown.
    pub async fn last_modified(&self) -> i64 {
        let result = self.status().await.map(|s| s.modification_time);
        self.collapse("last_modified", result, 0)
    }

    /// Modification times are owned by the remote store.
    pub fn set_last_modified(&self, _millis: i64) -> bool {
        false
    }

    pub async fn size(&self) -> u64 {
        let result = self.status().await.map(|s| s.length);
        let size = self.collapse("size", result, 0);
        tracing::debug!(path = %self.path, size, "size");
        size
    }

    /// Create this directory (and missing parents) if writable.
    pub async fn make_directory(&self) -> bool {
        if !self.is_writable().await {
            tracing::debug!(path = %self.path, "No write permission");
            return false;
        }

        let result = match self.store.get().await {
            Ok(store) => store.mkdirs(&self.path).await,
            Err(e) => Err(e),
        };
        self.collapse("make_directory", result, false)
    }

    /// Delete this node; directories are always removed recursively.
    pub async fn delete(&self) -> bool {
        let result = match self.store.get().await {
            Ok(store) => store.delete(&self.path, true).await,
            Err(e) => Err(e),
        };
        self.collapse("delete", result, false)
    }

    pub async fn move_to(&self, target: &PathEntity) -> bool {
        let result = match self.store.get().await {
            Ok(store) => store.rename(&self.path, target.absolute_path()).await,
            Err(e) => Err(e),
        };
        self.collapse("move_to", result, false)
    }

    /// Children of this directory in store order.
    ///
    /// `None` when the identity may not read the directory or the listing
    /// fails; an empty directory yields `Some(vec![])`.
    pub async fn list_children(&self) -> Option<Vec<PathEntity>> {
        if !self.is_readable().await {
            tracing::debug!(path = %self.path, "No read permission");
            return None;
        }

        let result = match self.store.get().await {
            Ok(store) => store.list(&self.path).await.map(Some),
            Err(e) => Err(e),
        };

        self.collapse("list_children", result, None).map(|statuses| {
            statuses
                .into_iter()
                .map(|status| self.sibling(&status.path))
                .collect()
        })
    }

    /// Open a stream that replaces the node's content.
    ///
    /// Once the content is committed the node is handed to the acting
    /// identity and its main group. Closing the stream (`shutdown()` or
    /// `finish()`) reports whether both steps succeeded.
    pub async fn open_for_write(&self) -> Result<WriteStream, AccessError> {
        if !self.is_writable().await {
            return Err(AccessError::PermissionDenied {
                path: self.path.clone(),
                access: Access::Write,
            });
        }

        let store = self.store.get().await?;
        let path = self.path.clone();
        let owner = self.identity.name().to_string();
        let group = self.identity.main_group().to_string();

        Ok(WriteStream::spawn(move |content| async move {
            store.create(&path, content).await?;
            store.set_owner(&path, &owner, &group).await
        }))
    }

    pub async fn open_for_read(&self) -> Result<ByteReader, AccessError> {
        self.open_for_read_at(0).await
    }

    /// Open a stream over the node's content starting at `offset`.
    pub async fn open_for_read_at(&self, offset: u64) -> Result<ByteReader, AccessError> {
        if !self.is_readable().await {
            return Err(AccessError::PermissionDenied {
                path: self.path.clone(),
                access: Access::Read,
            });
        }

        let store = self.store.get().await?;
        Ok(store.open(&self.path, offset).await?)
    }
}

impl fmt::Debug for PathEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathEntity")
            .field("path", &self.path)
            .field("identity", &self.identity.name())
            .finish()
    }
}

impl PartialEq for PathEntity {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.identity.name() == other.identity.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::permission::PermissionBits;
    use crate::infrastructure::store::InMemoryStore;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn alice() -> Arc<Identity> {
        Arc::new(Identity::new("alice").with_groups(["staff"]))
    }

    fn bob() -> Arc<Identity> {
        Arc::new(Identity::new("bob").with_groups(["staff"]))
    }

    fn carol() -> Arc<Identity> {
        Arc::new(Identity::new("carol").with_groups(["guests"]))
    }

    fn perm(s: &str) -> PermissionBits {
        s.parse().unwrap()
    }

    /// Store with `/data` (rwxr-xr-x alice:staff) and
    /// `/data/report.csv` (rw-r----- alice:staff)
    fn fixture() -> (Arc<InMemoryStore>, Arc<StoreHandle>) {
        let store = Arc::new(InMemoryStore::new());
        store.insert_directory("/data", "alice", "staff", perm("rwxr-xr-x"));
        store.insert_file("/data/report.csv", b"a,b\n1,2\n", "alice", "staff", perm("rw-r-----"));
        let handle = Arc::new(StoreHandle::with_client(store.clone()));
        (store, handle)
    }

    #[tokio::test]
    async fn test_owner_and_group_scenario() {
        let (_store, handle) = fixture();

        let as_alice = PathEntity::new("/data/report.csv", alice(), handle.clone());
        assert!(as_alice.is_readable().await);
        assert!(as_alice.is_writable().await);

        let as_bob = PathEntity::new("/data/report.csv", bob(), handle.clone());
        assert!(as_bob.is_readable().await);
        assert!(!as_bob.is_writable().await);
        assert!(!as_bob.is_removable().await);

        let as_carol = PathEntity::new("/data/report.csv", carol(), handle);
        assert!(!as_carol.is_readable().await);
        assert!(!as_carol.is_writable().await);
    }

    #[tokio::test]
    async fn test_owner_bits_win_over_group_bits() {
        let (store, handle) = fixture();
        store.insert_file("/data/locked", b"", "alice", "staff", perm("---rw-rw-"));

        let entity = PathEntity::new("/data/locked", alice(), handle);
        assert!(!entity.is_readable().await);
        assert!(!entity.is_writable().await);
    }

    #[tokio::test]
    async fn test_other_bits_for_strangers() {
        let (store, handle) = fixture();
        store.insert_file("/data/public", b"", "root", "wheel", perm("------rw-"));

        let entity = PathEntity::new("/data/public", carol(), handle);
        assert!(entity.is_readable().await);
        assert!(entity.is_writable().await);
    }

    #[tokio::test]
    async fn test_writable_falls_back_to_parent() {
        let (_store, handle) = fixture();

        let new_file = PathEntity::new("/data/new/deeper/file.txt", alice(), handle.clone());
        assert!(!new_file.exists().await);
        assert!(new_file.is_writable().await);

        let as_bob = PathEntity::new("/data/new.txt", bob(), handle);
        assert!(!as_bob.is_writable().await);
    }

    #[tokio::test]
    async fn test_writable_terminates_at_root() {
        let store = Arc::new(InMemoryStore::empty());
        let handle = Arc::new(StoreHandle::with_client(store));

        let entity = PathEntity::new("/a/b/c", alice(), handle);
        assert!(!entity.is_writable().await);
    }

    #[tokio::test]
    async fn test_metadata_queries() {
        let (_store, handle) = fixture();

        let file = PathEntity::new("/data/report.csv", alice(), handle.clone());
        assert!(file.exists().await);
        assert!(file.is_file().await);
        assert!(!file.is_directory().await);
        assert_eq!(file.size().await, 8);
        assert_eq!(file.link_count().await, FILE_LINK_COUNT);
        assert_eq!(file.owner_name().await.as_deref(), Some("alice"));
        assert_eq!(file.group_name().await.as_deref(), Some("staff"));
        assert!(file.last_modified().await > 0);

        let dir = PathEntity::new("/data", alice(), handle);
        assert!(dir.is_directory().await);
        assert_eq!(dir.link_count().await, DIRECTORY_LINK_COUNT);
    }

    #[tokio::test]
    async fn test_missing_path_sentinels() {
        let (_store, handle) = fixture();
        let missing = PathEntity::new("/nope", alice(), handle);

        assert!(!missing.exists().await);
        assert!(!missing.is_file().await);
        assert!(!missing.is_directory().await);
        assert!(!missing.is_readable().await);
        assert_eq!(missing.owner_name().await, None);
        assert_eq!(missing.group_name().await, None);
        assert_eq!(missing.size().await, 0);
        assert_eq!(missing.last_modified().await, 0);
        assert_eq!(missing.link_count().await, FILE_LINK_COUNT);
    }

    #[tokio::test]
    async fn test_unavailable_store_collapses_to_false() {
        let handle = Arc::new(StoreHandle::new(|_| {
            Err(StoreError::Network("connection refused".to_string()))
        }));
        let entity = PathEntity::new("/data", alice(), handle);

        assert!(!entity.exists().await);
        assert!(!entity.is_writable().await);
        assert!(!entity.make_directory().await);
        assert!(!entity.delete().await);
        assert!(entity.list_children().await.is_none());
        assert!(matches!(
            entity.open_for_read().await,
            Err(AccessError::PermissionDenied { access: Access::Read, .. })
        ));
    }

    #[test]
    fn test_names() {
        let handle = Arc::new(StoreHandle::with_client(Arc::new(InMemoryStore::new())));
        let root = PathEntity::new("/", alice(), handle.clone());
        assert_eq!(root.absolute_path(), "/");
        assert_eq!(root.short_name(), "/");
        assert!(!root.is_hidden());

        let file = PathEntity::new("data//report.csv", alice(), handle);
        assert_eq!(file.absolute_path(), "/data/report.csv");
        assert_eq!(file.short_name(), "report.csv");
        assert_eq!(file.parent().absolute_path(), "/data");
        assert!(!file.set_last_modified(0));
    }

    #[tokio::test]
    async fn test_make_directory_round_trip() {
        let (_store, handle) = fixture();

        let dir = PathEntity::new("/data/2026/q3", alice(), handle.clone());
        assert!(dir.make_directory().await);
        assert!(dir.exists().await);
        assert!(dir.is_directory().await);

        let denied = PathEntity::new("/data/bobs", bob(), handle);
        assert!(!denied.make_directory().await);
        assert!(!denied.exists().await);
    }

    #[tokio::test]
    async fn test_delete_is_recursive() {
        let (_store, handle) = fixture();

        let dir = PathEntity::new("/data", alice(), handle.clone());
        assert!(dir.delete().await);
        assert!(!PathEntity::new("/data/report.csv", alice(), handle).exists().await);
        assert!(!dir.delete().await);
    }

    #[tokio::test]
    async fn test_move_to() {
        let (_store, handle) = fixture();

        let source = PathEntity::new("/data/report.csv", alice(), handle.clone());
        let target = PathEntity::new("/data/final.csv", alice(), handle);
        assert!(source.move_to(&target).await);
        assert!(!source.exists().await);
        assert!(target.is_file().await);

        assert!(!source.move_to(&target).await);
    }

    #[tokio::test]
    async fn test_list_children() {
        let (store, handle) = fixture();
        store.insert_directory("/data/archive", "alice", "staff", perm("rwxr-x---"));

        let dir = PathEntity::new("/data", bob(), handle.clone());
        let children = dir.list_children().await.unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.short_name()).collect();
        assert_eq!(names, vec!["archive", "report.csv"]);
        assert_eq!(children[0].absolute_path(), "/data/archive");
        assert_eq!(children[0].identity().name(), "bob");

        let empty = PathEntity::new("/data/archive", alice(), handle);
        assert_eq!(empty.list_children().await, Some(vec![]));
    }

    #[tokio::test]
    async fn test_list_children_unreadable_is_none() {
        let (store, handle) = fixture();
        store.insert_directory("/secret", "root", "wheel", perm("rwx------"));

        let dir = PathEntity::new("/secret", alice(), handle);
        assert_eq!(dir.list_children().await, None);
    }

    #[tokio::test]
    async fn test_open_for_read() {
        let (_store, handle) = fixture();

        let file = PathEntity::new("/data/report.csv", bob(), handle.clone());
        let mut content = String::new();
        file.open_for_read().await.unwrap().read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "a,b\n1,2\n");

        let mut tail = String::new();
        file.open_for_read_at(4).await.unwrap().read_to_string(&mut tail).await.unwrap();
        assert_eq!(tail, "1,2\n");

        let stranger = PathEntity::new("/data/report.csv", carol(), handle);
        let err = match stranger.open_for_read().await {
            Err(e) => e,
            Ok(_) => panic!("read should be denied"),
        };
        assert!(matches!(err, AccessError::PermissionDenied { access: Access::Read, .. }));
        assert_eq!(err.to_string(), "No read permission: /data/report.csv");
    }

    #[tokio::test]
    async fn test_open_for_write_sets_ownership() {
        let (store, handle) = fixture();
        store.insert_directory("/shared", "root", "staff", perm("rwxrwxr-x"));

        let identity = Arc::new(Identity::new("dave").with_groups(["analysts", "staff"]));
        let file = PathEntity::new("/shared/out.txt", identity, handle);

        let mut stream = file.open_for_write().await.unwrap();
        stream.write_all(b"results").await.unwrap();
        stream.finish().await.unwrap();

        let status = file.status().await.unwrap();
        assert_eq!(status.length, 7);
        assert_eq!(status.owner, "dave");
        assert_eq!(status.group, "analysts");
        assert_eq!(store.content("/shared/out.txt").unwrap(), b"results");
    }

    #[tokio::test]
    async fn test_rejected_upload_fails_shutdown() {
        let (store, handle) = fixture();
        store.insert_file("/blob", b"", "alice", "staff", perm("rw-r--r--"));

        // Writable through the parent fallback, but the store cannot create
        // a child under a file
        let file = PathEntity::new("/blob/child.txt", alice(), handle);
        assert!(file.is_writable().await);

        let mut stream = file.open_for_write().await.unwrap();
        stream.write_all(b"payload").await.unwrap();
        assert!(stream.shutdown().await.is_err());
        drop(stream);

        assert!(!file.exists().await);
    }

    #[tokio::test]
    async fn test_open_for_write_denied() {
        let (_store, handle) = fixture();

        let file = PathEntity::new("/data/report.csv", bob(), handle);
        assert!(matches!(
            file.open_for_write().await,
            Err(AccessError::PermissionDenied { access: Access::Write, .. })
        ));
    }
}
