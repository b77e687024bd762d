// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Session Factory
//!
//! Hands out one [`SessionView`] per authenticated connection. Every view
//! shares the same lazily connected [`StoreHandle`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wires configuration, store handle and identities into sessions

use std::sync::Arc;

use crate::domain::gateway_config::GatewayConfigManifest;
use crate::domain::identity::Identity;
use crate::domain::remote_store::StoreError;
use crate::domain::session_view::{SessionError, SessionView};
use crate::domain::store_handle::StoreHandle;
use crate::infrastructure::store::store_handle_from_config;

/// Creates session views over a shared remote store
#[derive(Debug, Clone)]
pub struct SessionFactory {
    store: Arc<StoreHandle>,
    case_insensitive: bool,
}

impl SessionFactory {
    pub fn new(store: Arc<StoreHandle>) -> Self {
        Self {
            store,
            case_insensitive: true,
        }
    }

    /// Build the factory and its (not yet connected) store from a manifest.
    pub fn from_config(config: &GatewayConfigManifest) -> Self {
        let store = Arc::new(store_handle_from_config(&config.spec.store));
        Self::new(store).with_case_insensitive(config.spec.session.case_insensitive)
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn store(&self) -> &Arc<StoreHandle> {
        &self.store
    }

    /// Create the view for a newly authenticated identity.
    pub fn create_session(&self, identity: Option<Arc<Identity>>) -> Result<SessionView, SessionError> {
        let view = SessionView::with_case_sensitivity(identity, self.store.clone(), self.case_insensitive)?;
        tracing::info!(identity = %view.identity(), "Session opened");
        Ok(view)
    }

    /// Connect to the store (if not already) and confirm it answers.
    pub async fn check_store(&self) -> Result<(), StoreError> {
        let store = self.store.get().await?;
        store.health_check().await
    }
}
