// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Clearance desk CLI library - exposes testable components
//!
//! - [`server`]: server bootstrap and the HTTP client used by commands
//! - [`commands`]: clap subcommands

pub mod commands;
pub mod server;
