// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod clearance_service;
pub mod repository_factory;

pub use clearance_service::{
    ClearanceService, ClearanceServiceError, ClearanceView, ListFilter, ServiceResult,
    StandardClearanceService,
};
