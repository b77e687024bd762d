// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Session Identity
//!
//! The authenticated principal a session acts as. Identities are produced
//! by the external identity store and treated as immutable for the lifetime
//! of a session; path entities and session views only hold shared
//! references to them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Principal, group membership and capability grants

use serde::{Deserialize, Serialize};

/// Main group reported when an identity has no group memberships.
pub const MISSING_GROUP_SENTINEL: &str = "error";

/// Capability grant attached to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Authority {
    /// Allows write operations at or below `root` (anywhere when unset).
    WritePermission {
        #[serde(default)]
        root: Option<String>,
    },

    /// Bounds the number of simultaneous logins (0 = unlimited).
    ConcurrentLogin {
        max_logins: u32,
        max_logins_per_ip: u32,
    },

    /// Bounds transfer rates in bytes per second (0 = unlimited).
    TransferRate {
        max_download: u64,
        max_upload: u64,
    },
}

/// A question put to the identity's authorities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationRequest {
    /// May the identity write to `path`?
    Write { path: String },

    /// May the identity open another session given the current counts?
    ConcurrentLogin {
        current_logins: u32,
        current_logins_per_ip: u32,
    },

    /// Which transfer rates apply? Filled in by a `TransferRate` authority.
    TransferRate {
        max_download: u64,
        max_upload: u64,
    },
}

impl Authority {
    fn can_authorize(&self, request: &AuthorizationRequest) -> bool {
        matches!(
            (self, request),
            (Authority::WritePermission { .. }, AuthorizationRequest::Write { .. })
                | (Authority::ConcurrentLogin { .. }, AuthorizationRequest::ConcurrentLogin { .. })
                | (Authority::TransferRate { .. }, AuthorizationRequest::TransferRate { .. })
        )
    }

    /// Returns the (possibly rewritten) request, or `None` when refused.
    fn authorize(&self, request: AuthorizationRequest) -> Option<AuthorizationRequest> {
        match (self, request) {
            (Authority::WritePermission { root }, AuthorizationRequest::Write { path }) => {
                let prefix = root.as_deref().unwrap_or("/").trim_end_matches('/');
                if prefix.is_empty() || path == prefix || path.starts_with(&format!("{prefix}/")) {
                    Some(AuthorizationRequest::Write { path })
                } else {
                    None
                }
            }
            (
                Authority::ConcurrentLogin {
                    max_logins,
                    max_logins_per_ip,
                },
                AuthorizationRequest::ConcurrentLogin {
                    current_logins,
                    current_logins_per_ip,
                },
            ) => {
                if *max_logins != 0 && current_logins >= *max_logins {
                    return None;
                }
                if *max_logins_per_ip != 0 && current_logins_per_ip >= *max_logins_per_ip {
                    return None;
                }
                Some(AuthorizationRequest::ConcurrentLogin {
                    current_logins,
                    current_logins_per_ip,
                })
            }
            (
                Authority::TransferRate {
                    max_download,
                    max_upload,
                },
                AuthorizationRequest::TransferRate { .. },
            ) => Some(AuthorizationRequest::TransferRate {
                max_download: *max_download,
                max_upload: *max_upload,
            }),
            _ => None,
        }
    }
}

/// Authenticated principal with group memberships
///
/// Deserialized through `IdentityRecord` so stored records get the same
/// normalisation as identities built in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "IdentityRecord")]
pub struct Identity {
    name: String,

    #[serde(skip_serializing)]
    password: Option<String>,

    enabled: bool,

    /// Maximum idle time in seconds (0 = no limit)
    max_idle_time_secs: u32,

    home_directory: Option<String>,

    /// Ordered group memberships; the first entry is the main group
    groups: Vec<String>,

    authorities: Vec<Authority>,
}

/// Identity as stored by the identity store
#[derive(Debug, Deserialize)]
struct IdentityRecord {
    name: String,

    #[serde(default)]
    password: Option<String>,

    #[serde(default = "default_true")]
    enabled: bool,

    /// Negative values mean "no limit"
    #[serde(default)]
    max_idle_time_secs: i64,

    #[serde(default)]
    home_directory: Option<String>,

    #[serde(default)]
    groups: Vec<String>,

    #[serde(default)]
    authorities: Vec<Authority>,
}

fn default_true() -> bool {
    true
}

impl From<IdentityRecord> for Identity {
    fn from(record: IdentityRecord) -> Self {
        let mut identity = Identity::new(record.name)
            .with_enabled(record.enabled)
            .with_max_idle_time(record.max_idle_time_secs)
            .with_groups(record.groups)
            .with_authorities(record.authorities);
        identity.password = record.password;
        identity.home_directory = record.home_directory;
        identity
    }
}

impl Identity {
    /// Create an enabled identity with no groups, home directory or grants.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: None,
            enabled: true,
            max_idle_time_secs: 0,
            home_directory: None,
            groups: Vec::new(),
            authorities: Vec::new(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_home_directory(mut self, home: impl Into<String>) -> Self {
        self.home_directory = Some(home.into());
        self
    }

    /// Replace the group memberships. An empty list is accepted but logged.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        if self.groups.is_empty() {
            tracing::error!(identity = %self.name, "Identity is not a member of any group");
        }
        self
    }

    pub fn with_authorities(mut self, authorities: Vec<Authority>) -> Self {
        self.authorities = authorities;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Negative values mean "no limit" and are stored as 0.
    pub fn with_max_idle_time(mut self, seconds: i64) -> Self {
        self.max_idle_time_secs = seconds.clamp(0, u32::MAX as i64) as u32;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_idle_time_secs(&self) -> u32 {
        self.max_idle_time_secs
    }

    pub fn home_directory(&self) -> Option<&str> {
        self.home_directory.as_deref()
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn authorities(&self) -> &[Authority] {
        &self.authorities
    }

    /// First group of the identity, or [`MISSING_GROUP_SENTINEL`] when the
    /// identity belongs to no group.
    pub fn main_group(&self) -> &str {
        match self.groups.first() {
            Some(group) => group.as_str(),
            None => {
                tracing::error!(identity = %self.name, "Identity is not a member of any group");
                MISSING_GROUP_SENTINEL
            }
        }
    }

    pub fn is_group_member(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Run the request through every authority able to handle it, in order.
    ///
    /// Returns the final request when at least one authority handled it and
    /// none refused; `None` otherwise.
    pub fn authorize(&self, request: AuthorizationRequest) -> Option<AuthorizationRequest> {
        let mut request = request;
        let mut handled = false;

        for authority in &self.authorities {
            if authority.can_authorize(&request) {
                handled = true;
                request = authority.authorize(request)?;
            }
        }

        handled.then_some(request)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
