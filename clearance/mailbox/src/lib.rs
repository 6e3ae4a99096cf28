// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Clearance Mailbox
//!
//! Subject/body messages addressed to a single user, with read flags and
//! admin broadcast. A separate bounded context from the clearance thread:
//! nothing here touches a `ClearanceRecord`.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::{MailboxService, StandardMailboxService};
pub use domain::{MailboxError, MailboxMessage, MailboxMessageId};
