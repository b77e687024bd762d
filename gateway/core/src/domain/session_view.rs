// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session View
//!
//! Per-session navigation state: the root prefix derived from the
//! identity's home directory and the current working directory. Client
//! supplied names are resolved against the working directory and handed
//! back as [`PathEntity`] values.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Relative path resolution and change-directory state

use std::sync::Arc;
use thiserror::Error;

use crate::domain::identity::Identity;
use crate::domain::path;
use crate::domain::path_entity::PathEntity;
use crate::domain::store_handle::StoreHandle;

/// Session construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Identity can not be absent")]
    MissingIdentity,

    #[error("Home directory of identity {0} can not be absent")]
    MissingHomeDirectory(String),
}

/// Navigation state of one authenticated session
#[derive(Debug)]
pub struct SessionView {
    /// Identity home directory, always ending with `/`
    root_dir: String,
    /// Current directory, always absolute
    current_dir: String,
    case_insensitive: bool,
    identity: Arc<Identity>,
    store: Arc<StoreHandle>,
}

impl SessionView {
    /// Create a case-insensitive view for `identity`.
    pub fn new(
        identity: Option<Arc<Identity>>,
        store: Arc<StoreHandle>,
    ) -> Result<Self, SessionError> {
        Self::with_case_sensitivity(identity, store, true)
    }

    pub fn with_case_sensitivity(
        identity: Option<Arc<Identity>>,
        store: Arc<StoreHandle>,
        case_insensitive: bool,
    ) -> Result<Self, SessionError> {
        let identity = identity.ok_or(SessionError::MissingIdentity)?;
        let home = identity
            .home_directory()
            .ok_or_else(|| SessionError::MissingHomeDirectory(identity.name().to_string()))?;

        let mut root_dir = home.to_string();
        if !root_dir.ends_with('/') {
            root_dir.push('/');
        }

        tracing::debug!(identity = %identity, root_dir = %root_dir, "Session view created");

        Ok(Self {
            root_dir,
            current_dir: "/".to_string(),
            case_insensitive,
            identity,
            store,
        })
    }

    fn entity(&self, path: &str) -> PathEntity {
        PathEntity::new(path, self.identity.clone(), self.store.clone())
    }

    /// The identity's home directory as configured, with a trailing `/`.
    pub fn root_directory(&self) -> &str {
        &self.root_dir
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The protocol-level home of every session is the filesystem root.
    pub fn home_directory(&self) -> PathEntity {
        self.entity("/")
    }

    pub fn working_directory(&self) -> PathEntity {
        self.entity(&self.current_dir)
    }

    /// Resolve a client supplied name against the working directory.
    ///
    /// Absolute names ignore the working directory. `..` never climbs
    /// above the filesystem root.
    pub fn resolve(&self, name: &str) -> PathEntity {
        self.entity(&path::join(&self.current_dir, name))
    }

    /// Move to `name` if it is a directory the identity may read.
    ///
    /// The working directory is left untouched on failure.
    pub async fn change_working_directory(&mut self, name: &str) -> bool {
        let target = self.resolve(name);

        if target.is_directory().await && target.is_readable().await {
            self.current_dir = target.absolute_path().to_string();
            tracing::debug!(identity = %self.identity, cwd = %self.current_dir, "Changed directory");
            true
        } else {
            false
        }
    }

    /// Content can be read from arbitrary offsets.
    pub fn is_random_accessible(&self) -> bool {
        true
    }

    /// Nothing to release; the store handle outlives sessions.
    pub fn dispose(&mut self) {}
}
