// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer
//!
//! HTTP surface that translates requests into application service calls.
//! Caller identity and role checks live here; business rules do not.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | REST endpoints + Server-Sent Events for clearance changes |
//! | [`auth`] | `Actor` extractor from upstream identity headers |
//! | [`error`] | `ApiError` to HTTP response mapping |

pub mod api;
pub mod auth;
pub mod error;

pub use error::ApiError;
