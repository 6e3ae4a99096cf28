// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Clearance Core
//!
//! The multi-department clearance aggregate, its persistence contracts and
//! the HTTP gateway in front of it.
//!
//! - [`domain`]: the clearance record, departments, actors, events and config
//! - [`application`]: `ClearanceService` and repository wiring
//! - [`infrastructure`]: in-memory and PostgreSQL stores, the read-through
//!   cache and the event bus
//! - [`presentation`]: axum routes, identity extraction and error mapping

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
