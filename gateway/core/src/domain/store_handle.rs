// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote Store Handle
//!
//! Owns the single client every session shares. The handle is configured
//! once at startup (backend URI, superuser), wrapped in an `Arc` and passed
//! to every session; the client itself is only built on the first call to
//! [`StoreHandle::get`].
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Lazily initialised, injected remote store client

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::domain::remote_store::{RemoteStore, StoreError};

/// Group label the superuser connects with.
pub const SUPERGROUP: &str = "supergroup";

/// Connection settings used to build the shared client
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Backend address (e.g. "http://namenode:9870")
    pub backend_uri: Option<String>,
    /// Identity the gateway connects as
    pub superuser: Option<String>,
    pub supergroup: String,
    /// Per-request timeout of the client
    pub timeout: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend_uri: None,
            superuser: None,
            supergroup: SUPERGROUP.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

type Connector =
    Box<dyn Fn(&StoreSettings) -> Result<Arc<dyn RemoteStore>, StoreError> + Send + Sync>;

/// Shared remote store client, initialised on first use
pub struct StoreHandle {
    settings: StoreSettings,
    connector: Connector,
    client: OnceCell<Arc<dyn RemoteStore>>,
}

impl StoreHandle {
    /// Create an uninitialised handle that builds its client with `connector`.
    pub fn new<F>(connector: F) -> Self
    where
        F: Fn(&StoreSettings) -> Result<Arc<dyn RemoteStore>, StoreError> + Send + Sync + 'static,
    {
        Self {
            settings: StoreSettings::default(),
            connector: Box::new(connector),
            client: OnceCell::new(),
        }
    }

    /// Create a handle around an already constructed client.
    pub fn with_client(client: Arc<dyn RemoteStore>) -> Self {
        let handle = Self::new(|_| {
            Err(StoreError::Unavailable(
                "handle was built around a fixed client".to_string(),
            ))
        });
        // A fresh cell cannot already be set
        let _ = handle.client.set(client);
        handle
    }

    pub fn set_backend_uri(&mut self, uri: impl Into<String>) {
        self.settings.backend_uri = Some(uri.into());
    }

    pub fn set_superuser(&mut self, name: impl Into<String>) {
        self.settings.superuser = Some(name.into());
    }

    pub fn set_supergroup(&mut self, group: impl Into<String>) {
        self.settings.supergroup = group.into();
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.settings.timeout = timeout;
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    /// Return the shared client, building it on first use.
    ///
    /// A failed build is logged and reported as [`StoreError::Unavailable`];
    /// the next call tries again.
    pub async fn get(&self) -> Result<Arc<dyn RemoteStore>, StoreError> {
        self.client
            .get_or_try_init(|| async {
                tracing::info!(
                    backend_uri = ?self.settings.backend_uri,
                    superuser = ?self.settings.superuser,
                    supergroup = %self.settings.supergroup,
                    "Connecting to remote store"
                );
                (self.connector)(&self.settings).map_err(|e| {
                    tracing::error!(error = %e, "Remote store initialization failed");
                    StoreError::Unavailable(e.to_string())
                })
            })
            .await
            .cloned()
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("settings", &self.settings)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
