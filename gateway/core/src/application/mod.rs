// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod session_factory;

pub use session_factory::SessionFactory;
