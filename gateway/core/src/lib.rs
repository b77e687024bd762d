// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HDFS Gateway Core
//!
//! Adapter layer that lets a file-transfer protocol engine serve an HDFS
//! namespace: per-session path resolution, per-identity permission checks
//! against remote owner/group/mode metadata, and streaming reads/writes.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, remote store adapters, session wiring

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
