// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the hdfsgw CLI

pub mod config;
pub mod fs;

pub use self::config::ConfigCommand;
pub use self::fs::{FsCommand, IdentityArgs};
