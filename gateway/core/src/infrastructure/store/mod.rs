// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Remote Store Infrastructure Module
//!
//! Provides concrete implementations of the RemoteStore trait and the
//! wiring that turns configuration into a shared [`StoreHandle`].

pub mod memory;
pub mod webhdfs;

pub use memory::InMemoryStore;
pub use webhdfs::WebHdfsAdapter;

use std::sync::Arc;

use crate::domain::gateway_config::{StoreBackendType, StoreConfig};
use crate::domain::remote_store::{RemoteStore, StoreError};
use crate::domain::store_handle::{StoreHandle, StoreSettings};

/// Remote store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// HDFS through WebHDFS (production)
    WebHdfs,

    /// Process-local store (development/testing)
    Memory,
}

impl From<StoreBackendType> for StoreBackend {
    fn from(backend: StoreBackendType) -> Self {
        match backend {
            StoreBackendType::Webhdfs => StoreBackend::WebHdfs,
            StoreBackendType::Memory => StoreBackend::Memory,
        }
    }
}

/// Factory function to create a remote store client from connection settings
pub fn create_remote_store(
    backend: StoreBackend,
    settings: &StoreSettings,
) -> Result<Arc<dyn RemoteStore>, StoreError> {
    match backend {
        StoreBackend::WebHdfs => {
            let uri = settings
                .backend_uri
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("backend URI is not set".to_string()))?;
            let superuser = settings
                .superuser
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("superuser is not set".to_string()))?;

            Ok(Arc::new(WebHdfsAdapter::with_timeout(
                uri,
                superuser,
                settings.timeout,
            )?))
        }
        StoreBackend::Memory => {
            let superuser = settings.superuser.as_deref().unwrap_or("hdfs");
            Ok(Arc::new(InMemoryStore::with_superuser(
                superuser,
                settings.supergroup.as_str(),
            )))
        }
    }
}

/// Build an uninitialised handle from the `spec.store` section.
///
/// No connection is made until the first session touches the store.
pub fn store_handle_from_config(config: &StoreConfig) -> StoreHandle {
    let backend = StoreBackend::from(config.backend);
    let mut handle = StoreHandle::new(move |settings| create_remote_store(backend, settings));

    if let Some(uri) = &config.uri {
        handle.set_backend_uri(uri.clone());
    }
    if let Some(superuser) = &config.superuser {
        handle.set_superuser(superuser.clone());
    }
    handle.set_supergroup(config.supergroup.clone());
    handle.set_timeout(config.timeout());
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_webhdfs_requires_uri_and_superuser() {
        let settings = StoreSettings::default();
        assert!(matches!(
            create_remote_store(StoreBackend::WebHdfs, &settings),
            Err(StoreError::Unavailable(msg)) if msg.contains("URI")
        ));

        let settings = StoreSettings {
            backend_uri: Some("http://namenode:9870".to_string()),
            ..StoreSettings::default()
        };
        assert!(matches!(
            create_remote_store(StoreBackend::WebHdfs, &settings),
            Err(StoreError::Unavailable(msg)) if msg.contains("superuser")
        ));
    }

    #[tokio::test]
    async fn test_memory_backend_uses_superuser() {
        let settings = StoreSettings {
            superuser: Some("ftp".to_string()),
            ..StoreSettings::default()
        };
        let store = create_remote_store(StoreBackend::Memory, &settings).unwrap();

        assert!(store.mkdirs("/incoming").await.unwrap());
        let status = store.status("/incoming").await.unwrap();
        assert_eq!(status.owner, "ftp");
        assert_eq!(status.group, "supergroup");
    }

    #[tokio::test]
    async fn test_handle_from_config_is_lazy() {
        let config = StoreConfig {
            backend: StoreBackendType::Memory,
            uri: None,
            superuser: Some("hdfs".to_string()),
            supergroup: "hadoop".to_string(),
            timeout_secs: 5,
        };

        let handle = store_handle_from_config(&config);
        assert!(!handle.is_initialized());
        assert_eq!(handle.settings().timeout, Duration::from_secs(5));
        assert_eq!(handle.settings().supergroup, "hadoop");

        let store = handle.get().await.unwrap();
        assert!(handle.is_initialized());
        assert!(store.status("/").await.unwrap().is_directory());
    }

    #[tokio::test]
    async fn test_unreachable_config_surfaces_unavailable() {
        let handle = store_handle_from_config(&StoreConfig::default());
        assert!(matches!(handle.get().await, Err(StoreError::Unavailable(_))));
    }
}
