// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract for the clearance aggregate, defined in the domain
//! layer and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `ClearanceRepository` | `ClearanceRecord` | `InMemoryClearanceRepository`, `PostgresClearanceRepository`, `CachedClearanceRepository` |
//!
//! ## Partial updates
//!
//! There is deliberately no `save(record)`. Writers hand the store a
//! [`DepartmentPatch`] or a single [`Message`]; the store merges it into
//! whatever it currently holds. Two writers on different departments of the
//! same student therefore both land, and the merged record they get back
//! reflects each other's change.

use async_trait::async_trait;

use crate::domain::clearance::{ClearanceRecord, DepartmentPatch, Message, StudentId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

/// Repository interface for ClearanceRecord aggregates
#[async_trait]
pub trait ClearanceRepository: Send + Sync {
    /// Store a freshly initialized record. Fails with `AlreadyExists` if the
    /// student already has one.
    async fn insert(&self, record: &ClearanceRecord) -> Result<(), RepositoryError>;

    /// Find a record by student
    async fn find_by_student(&self, student_id: &StudentId) -> Result<Option<ClearanceRecord>, RepositoryError>;

    /// List all records, ordered by student id
    async fn list_all(&self) -> Result<Vec<ClearanceRecord>, RepositoryError>;

    /// Ids of every student with a record
    async fn list_student_ids(&self) -> Result<Vec<StudentId>, RepositoryError>;

    /// Atomically write one department slot plus its appended messages and
    /// return the merged record.
    async fn apply_department_patch(
        &self,
        student_id: &StudentId,
        patch: &DepartmentPatch,
    ) -> Result<ClearanceRecord, RepositoryError>;

    /// Append one message and return it as stored (timestamp may be clamped).
    async fn append_message(&self, student_id: &StudentId, message: &Message) -> Result<Message, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::AlreadyExists(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
