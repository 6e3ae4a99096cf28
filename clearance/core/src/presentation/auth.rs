// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Caller identity extraction.
//!
//! Authentication happens upstream. The proxy in front of this service sets
//! three headers, which are trusted as-is:
//!
//! - `x-actor-id`: user id (the student id for students)
//! - `x-actor-role`: `student`, `department` or `admin`
//! - `x-actor-department`: department key, required when the role is `department`

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::actor::Actor;
use crate::domain::department::Department;
use crate::presentation::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_DEPARTMENT_HEADER: &str = "x-actor-department";

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", ACTOR_ID_HEADER)))?
            .to_string();
        let role = header(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", ACTOR_ROLE_HEADER)))?;

        match role.to_lowercase().as_str() {
            "student" => Ok(Actor::student(id)),
            "admin" => Ok(Actor::admin(id)),
            "department" => {
                let department: Department = header(parts, ACTOR_DEPARTMENT_HEADER)
                    .ok_or_else(|| {
                        ApiError::Unauthorized(format!(
                            "{} header is required for department staff",
                            ACTOR_DEPARTMENT_HEADER
                        ))
                    })?
                    .parse()
                    .map_err(|e| ApiError::Unauthorized(format!("Invalid actor department: {}", e)))?;
                Ok(Actor::department(id, department))
            }
            other => Err(ApiError::Unauthorized(format!("Unknown actor role '{}'", other))),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
