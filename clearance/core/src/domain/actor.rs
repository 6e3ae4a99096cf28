// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Actor
//!
//! Identity of the authenticated caller as supplied by the request gateway.
//! The aggregate records who changed what; it never authorizes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::department::Department;

/// Role of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "department", rename_all = "camelCase")]
pub enum ActorRole {
    Student,
    /// Staff of a single department.
    Department(Department),
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn student(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: ActorRole::Student }
    }

    pub fn department(id: impl Into<String>, department: Department) -> Self {
        Self { id: id.into(), role: ActorRole::Department(department) }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self { id: id.into(), role: ActorRole::Admin }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, ActorRole::Admin)
    }

    pub fn is_student(&self, student_id: &str) -> bool {
        self.role == ActorRole::Student && self.id == student_id
    }

    /// Department the actor works for, if any.
    pub fn department_of(&self) -> Option<Department> {
        match self.role {
            ActorRole::Department(d) => Some(d),
            _ => None,
        }
    }

    /// Whether the actor may decide on `department`'s sign-off.
    pub fn can_review(&self, department: Department) -> bool {
        self.is_admin() || self.department_of() == Some(department)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            ActorRole::Student => write!(f, "student:{}", self.id),
            ActorRole::Department(d) => write!(f, "{}:{}", d, self.id),
            ActorRole::Admin => write!(f, "admin:{}", self.id),
        }
    }
}
