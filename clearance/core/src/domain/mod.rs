// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! The clearance aggregate and the value types around it. No I/O lives here;
//! repository traits are declared here and implemented in
//! `crate::infrastructure`.

pub mod actor;
pub mod clearance;
pub mod department;
pub mod events;
pub mod repository;
pub mod service_config;
