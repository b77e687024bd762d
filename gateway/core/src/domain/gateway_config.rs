// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration Types
//
// Defines the configuration manifest of a gateway node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Remote store connection (backend URI, superuser identity)
// - Session defaults

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::store_handle::SUPERGROUP;

pub const API_VERSION: &str = "hdfsgw.io/v1";
pub const KIND: &str = "GatewayConfig";
pub const CONFIG_PATH_ENV: &str = "HDFSGW_CONFIG_PATH";

/// Top-level gateway configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigManifest {
    /// API version (must be "hdfsgw.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GatewayConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: GatewayConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable gateway name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfigSpec {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendType {
    /// HDFS through its WebHDFS REST API
    Webhdfs,
    /// Process-local store, for development only
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackendType,

    /// Backend URI (e.g. "http://namenode:9870")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Identity the gateway connects to the store as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superuser: Option<String>,

    #[serde(default = "default_supergroup")]
    pub supergroup: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            uri: None,
            superuser: None,
            supergroup: default_supergroup(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Recorded on every session view; the remote store itself is case sensitive
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
        }
    }
}

impl Default for GatewayConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "hdfs-gateway".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: GatewayConfigSpec::default(),
        }
    }
}

impl GatewayConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Locations checked by [`discover_config`](Self::discover_config), in order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }

        paths.push(PathBuf::from("./hdfsgw-config.yaml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".hdfsgw").join("config.yaml"));
        }

        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/hdfsgw/config.yaml"));
        #[cfg(windows)]
        paths.push(PathBuf::from("C:\\ProgramData\\hdfsgw\\config.yaml"));

        paths
    }

    /// Discover configuration file using precedence order
    /// 1. HDFSGW_CONFIG_PATH environment variable
    /// 2. ./hdfsgw-config.yaml (working directory)
    /// 3. ~/.hdfsgw/config.yaml (user home)
    /// 4. /etc/hdfsgw/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|p| p.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using empty defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(uri) = lookup("HDFSGW_STORE_URI") {
            tracing::info!("Environment override: HDFSGW_STORE_URI={}", uri);
            self.spec.store.uri = Some(uri);
        }

        if let Some(superuser) = lookup("HDFSGW_SUPERUSER") {
            tracing::info!("Environment override: HDFSGW_SUPERUSER={}", superuser);
            self.spec.store.superuser = Some(superuser);
        }

        if let Some(val) = lookup("HDFSGW_STORE_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => {
                    tracing::info!("Environment override: HDFSGW_STORE_TIMEOUT_SECS={}", secs);
                    self.spec.store.timeout_secs = secs;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for HDFSGW_STORE_TIMEOUT_SECS: '{}'. Expected seconds. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let store = &self.spec.store;
        if store.backend == StoreBackendType::Webhdfs {
            match store.uri.as_deref() {
                None | Some("") => anyhow::bail!("spec.store.uri is not set"),
                Some(uri) if !(uri.starts_with("http://") || uri.starts_with("https://")) => {
                    anyhow::bail!("spec.store.uri must be an http(s) URI, got '{}'", uri)
                }
                Some(_) => {}
            }

            if store.superuser.as_deref().map_or(true, str::is_empty) {
                anyhow::bail!("spec.store.superuser is not set");
            }
        }

        if store.timeout_secs == 0 {
            anyhow::bail!("spec.store.timeout_secs must be greater than zero");
        }

        Ok(())
    }
}

fn default_backend() -> StoreBackendType {
    StoreBackendType::Webhdfs
}

fn default_supergroup() -> String {
    SUPERGROUP.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
