// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the clearance CLI

pub mod config;
pub mod db;
pub mod mailbox;
pub mod message;
mod output;
pub mod record;
pub mod status;

pub use self::config::ConfigCommand;
pub use self::db::DbCommand;
pub use self::mailbox::MailboxCommand;
pub use self::message::MessageCommand;
pub use self::record::RecordCommand;
