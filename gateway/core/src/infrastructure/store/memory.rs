// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-Memory Remote Store
//!
//! Process-local implementation of [`RemoteStore`] that mimics the HDFS
//! semantics the gateway relies on: owner/group/permission metadata,
//! recursive mkdirs, recursive delete, rename into directories, and nodes
//! created by the connecting superuser.
//!
//! **Use Cases:**
//! - Unit/integration testing of the adapter without a namenode
//! - Local development of a protocol engine
//!
//! Nothing is persisted; contents vanish with the process.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncReadExt;

use crate::domain::path;
use crate::domain::permission::PermissionBits;
use crate::domain::remote_store::{ByteReader, FileKind, FileStatus, RemoteStore, StoreError};
use crate::domain::store_handle::SUPERGROUP;

const DEFAULT_SUPERUSER: &str = "hdfs";
const DIRECTORY_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone)]
struct Node {
    kind: FileKind,
    content: Vec<u8>,
    modification_time: i64,
    owner: String,
    group: String,
    permission: PermissionBits,
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Remote store kept in a process-local map
pub struct InMemoryStore {
    nodes: RwLock<BTreeMap<String, Node>>,
    superuser: String,
    supergroup: String,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Store containing only the root directory (`hdfs:supergroup rwxr-xr-x`).
    pub fn new() -> Self {
        Self::with_superuser(DEFAULT_SUPERUSER, SUPERGROUP)
    }

    /// Store connecting as `superuser`; new nodes belong to that identity.
    pub fn with_superuser(superuser: impl Into<String>, supergroup: impl Into<String>) -> Self {
        let store = Self::empty();
        let store = Self {
            superuser: superuser.into(),
            supergroup: supergroup.into(),
            ..store
        };
        let root = store.new_node(FileKind::Directory, Vec::new(), DIRECTORY_MODE);
        store.nodes.write().insert("/".to_string(), root);
        store
    }

    /// Store without even a root directory; every lookup fails.
    pub fn empty() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            superuser: DEFAULT_SUPERUSER.to_string(),
            supergroup: SUPERGROUP.to_string(),
        }
    }

    fn new_node(&self, kind: FileKind, content: Vec<u8>, mode: u32) -> Node {
        Node {
            kind,
            content,
            modification_time: now_millis(),
            owner: self.superuser.clone(),
            group: self.supergroup.clone(),
            permission: PermissionBits::from_mode(mode),
        }
    }

    /// Insert (or replace) a directory with explicit metadata.
    pub fn insert_directory(&self, path: &str, owner: &str, group: &str, permission: PermissionBits) {
        self.insert(path, FileKind::Directory, Vec::new(), owner, group, permission);
    }

    /// Insert (or replace) a file with explicit metadata.
    pub fn insert_file(
        &self,
        path: &str,
        content: &[u8],
        owner: &str,
        group: &str,
        permission: PermissionBits,
    ) {
        self.insert(path, FileKind::File, content.to_vec(), owner, group, permission);
    }

    fn insert(
        &self,
        path: &str,
        kind: FileKind,
        content: Vec<u8>,
        owner: &str,
        group: &str,
        permission: PermissionBits,
    ) {
        let node = Node {
            kind,
            content,
            modification_time: now_millis(),
            owner: owner.to_string(),
            group: group.to_string(),
            permission,
        };
        self.nodes.write().insert(path::normalize(path), node);
    }

    /// Content of a file, if present.
    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.nodes
            .read()
            .get(&path::normalize(path))
            .filter(|n| n.kind == FileKind::File)
            .map(|n| n.content.clone())
    }

    fn to_status(path: &str, node: &Node) -> FileStatus {
        FileStatus {
            path: path.to_string(),
            kind: node.kind,
            length: node.content.len() as u64,
            modification_time: node.modification_time,
            owner: node.owner.clone(),
            group: node.group.clone(),
            permission: node.permission,
        }
    }

    fn is_descendant(candidate: &str, ancestor: &str) -> bool {
        if ancestor == "/" {
            return candidate != "/";
        }
        candidate.len() > ancestor.len()
            && candidate.starts_with(ancestor)
            && candidate.as_bytes()[ancestor.len()] == b'/'
    }

    /// Create `path` and missing ancestors inside an already held map.
    fn mkdirs_locked(&self, nodes: &mut BTreeMap<String, Node>, path: &str) -> Result<(), StoreError> {
        let mut current = String::new();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        for segment in std::iter::once("").chain(segments) {
            if !segment.is_empty() {
                current.push('/');
                current.push_str(segment);
            }
            let key = if current.is_empty() { "/" } else { current.as_str() };
            match nodes.get(key) {
                Some(node) if node.kind == FileKind::Directory => {}
                Some(_) => {
                    return Err(StoreError::Remote {
                        exception: "ParentNotDirectoryException".to_string(),
                        message: format!("{key} is not a directory"),
                    });
                }
                None => {
                    nodes.insert(
                        key.to_string(),
                        self.new_node(FileKind::Directory, Vec::new(), DIRECTORY_MODE),
                    );
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn status(&self, path: &str) -> Result<FileStatus, StoreError> {
        let path = path::normalize(path);
        self.nodes
            .read()
            .get(&path)
            .map(|node| Self::to_status(&path, node))
            .ok_or(StoreError::NotFound(path))
    }

    async fn list(&self, path: &str) -> Result<Vec<FileStatus>, StoreError> {
        let path = path::normalize(path);
        let nodes = self.nodes.read();

        let node = nodes.get(&path).ok_or_else(|| StoreError::NotFound(path.clone()))?;
        if node.kind != FileKind::Directory {
            return Ok(vec![Self::to_status(&path, node)]);
        }

        Ok(nodes
            .iter()
            .filter(|(child, _)| Self::is_descendant(child, &path) && path::parent(child) == path)
            .map(|(child, node)| Self::to_status(child, node))
            .collect())
    }

    async fn mkdirs(&self, path: &str) -> Result<bool, StoreError> {
        let path = path::normalize(path);
        let mut nodes = self.nodes.write();
        self.mkdirs_locked(&mut nodes, &path)?;
        Ok(true)
    }

    async fn delete(&self, path: &str, recursive: bool) -> Result<bool, StoreError> {
        let path = path::normalize(path);
        if path == "/" {
            return Ok(false);
        }

        let mut nodes = self.nodes.write();
        if !nodes.contains_key(&path) {
            return Ok(false);
        }

        let descendants: Vec<String> = nodes
            .keys()
            .filter(|k| Self::is_descendant(k, &path))
            .cloned()
            .collect();

        if !descendants.is_empty() && !recursive {
            return Err(StoreError::Remote {
                exception: "PathIsNotEmptyDirectoryException".to_string(),
                message: format!("{path} is non empty"),
            });
        }

        for key in descendants {
            nodes.remove(&key);
        }
        nodes.remove(&path);
        Ok(true)
    }

    async fn rename(&self, from: &str, to: &str) -> Result<bool, StoreError> {
        let from = path::normalize(from);
        let mut to = path::normalize(to);
        let mut nodes = self.nodes.write();

        if from == "/" || !nodes.contains_key(&from) {
            return Ok(false);
        }

        // Renaming onto an existing directory moves the source into it
        if let Some(target) = nodes.get(&to) {
            if target.kind != FileKind::Directory {
                return Ok(false);
            }
            to = format!("{}/{}", to.trim_end_matches('/'), path::file_name(&from));
            if nodes.contains_key(&to) {
                return Ok(false);
            }
        }

        if to == from || Self::is_descendant(&to, &from) {
            return Ok(false);
        }

        match nodes.get(path::parent(&to)) {
            Some(parent) if parent.kind == FileKind::Directory => {}
            _ => return Ok(false),
        }

        let moved: Vec<String> = nodes
            .keys()
            .filter(|k| *k == &from || Self::is_descendant(k, &from))
            .cloned()
            .collect();

        for key in moved {
            if let Some(node) = nodes.remove(&key) {
                let new_key = format!("{}{}", to, &key[from.len()..]);
                nodes.insert(new_key, node);
            }
        }
        Ok(true)
    }

    async fn set_owner(&self, path: &str, owner: &str, group: &str) -> Result<(), StoreError> {
        let path = path::normalize(path);
        let mut nodes = self.nodes.write();
        let node = nodes.get_mut(&path).ok_or(StoreError::NotFound(path))?;
        node.owner = owner.to_string();
        node.group = group.to_string();
        Ok(())
    }

    async fn open(&self, path: &str, offset: u64) -> Result<ByteReader, StoreError> {
        let path = path::normalize(path);
        let nodes = self.nodes.read();

        match nodes.get(&path) {
            Some(node) if node.kind == FileKind::File => {
                let start = (offset as usize).min(node.content.len());
                let content = node.content[start..].to_vec();
                Ok(Box::pin(std::io::Cursor::new(content)))
            }
            Some(_) => Err(StoreError::Remote {
                exception: "FileNotFoundException".to_string(),
                message: format!("Path is not a file: {path}"),
            }),
            None => Err(StoreError::NotFound(path)),
        }
    }

    async fn create(&self, path: &str, mut content: ByteReader) -> Result<(), StoreError> {
        let path = path::normalize(path);

        let mut buf = Vec::new();
        content.read_to_end(&mut buf).await?;

        let mut nodes = self.nodes.write();
        if nodes.get(&path).is_some_and(|n| n.kind == FileKind::Directory) {
            return Err(StoreError::Remote {
                exception: "FileAlreadyExistsException".to_string(),
                message: format!("{path} already exists as a directory"),
            });
        }

        self.mkdirs_locked(&mut nodes, path::parent(&path))?;
        nodes.insert(path, self.new_node(FileKind::File, buf, FILE_MODE));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
