// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of [`ClearanceRepository`].
//!
//! - **PostgresClearanceRepository** - JSONB department map plus a message
//!   table; per-department writes via `jsonb_set` inside one transaction
//! - **InMemoryClearanceRepository** - `HashMap` behind a `parking_lot`
//!   lock; each patch is merged inside one write-lock critical section
//!
//! Both merge partial updates into the stored record instead of replacing it.

pub mod postgres_clearance;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::clearance::{ClearanceRecord, DepartmentPatch, Message, StudentId};
use crate::domain::repository::{ClearanceRepository, RepositoryError};

pub use postgres_clearance::PostgresClearanceRepository;

#[derive(Clone, Default)]
pub struct InMemoryClearanceRepository {
    records: Arc<RwLock<HashMap<StudentId, ClearanceRecord>>>,
}

impl InMemoryClearanceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClearanceRepository for InMemoryClearanceRepository {
    async fn insert(&self, record: &ClearanceRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        if records.contains_key(&record.student_id) {
            return Err(RepositoryError::AlreadyExists(record.student_id.to_string()));
        }
        records.insert(record.student_id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_student(&self, student_id: &StudentId) -> Result<Option<ClearanceRecord>, RepositoryError> {
        Ok(self.records.read().get(student_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<ClearanceRecord>, RepositoryError> {
        let records = self.records.read();
        let mut all: Vec<ClearanceRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        Ok(all)
    }

    async fn list_student_ids(&self) -> Result<Vec<StudentId>, RepositoryError> {
        let mut ids: Vec<StudentId> = self.records.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn apply_department_patch(
        &self,
        student_id: &StudentId,
        patch: &DepartmentPatch,
    ) -> Result<ClearanceRecord, RepositoryError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(student_id)
            .ok_or_else(|| RepositoryError::NotFound(student_id.to_string()))?;
        record.apply_patch(patch);
        Ok(record.clone())
    }

    async fn append_message(&self, student_id: &StudentId, message: &Message) -> Result<Message, RepositoryError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(student_id)
            .ok_or_else(|| RepositoryError::NotFound(student_id.to_string()))?;
        Ok(record.merge_message(message.clone()))
    }
}
