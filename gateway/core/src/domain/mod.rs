// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Identities, permission bits, and the path/session adapters that sit
//! between a file-transfer protocol engine and the remote store.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Access semantics independent of any wire protocol

pub mod identity;
pub mod permission;
pub mod path;
pub mod remote_store;
pub mod store_handle;
pub mod stream;
pub mod path_entity;
pub mod session_view;
pub mod gateway_config;
