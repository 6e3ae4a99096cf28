// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Read-through record cache.
//!
//! Wraps any [`ClearanceRepository`]. Reads of a single record are served
//! from an LRU when possible; every write goes to the inner store first and
//! then evicts the cached entry. The inner store stays the
//! source of truth, so a crash loses nothing but warm entries.

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::domain::clearance::{ClearanceRecord, DepartmentPatch, Message, StudentId};
use crate::domain::repository::{ClearanceRepository, RepositoryError};

pub struct CachedClearanceRepository {
    inner: Arc<dyn ClearanceRepository>,
    entries: Mutex<Entries>,
}

struct Entries {
    records: LruCache<StudentId, ClearanceRecord>,
    /// Bumped on every eviction. A read that started before a write must not
    /// put its (now stale) result back.
    generation: u64,
}

impl CachedClearanceRepository {
    pub fn new(inner: Arc<dyn ClearanceRepository>, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            entries: Mutex::new(Entries {
                records: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict(&self, student_id: &StudentId) {
        let mut entries = self.entries.lock();
        entries.records.pop(student_id);
        entries.generation += 1;
    }
}

#[async_trait]
impl ClearanceRepository for CachedClearanceRepository {
    async fn insert(&self, record: &ClearanceRecord) -> Result<(), RepositoryError> {
        self.inner.insert(record).await?;
        self.evict(&record.student_id);
        Ok(())
    }

    async fn find_by_student(&self, student_id: &StudentId) -> Result<Option<ClearanceRecord>, RepositoryError> {
        let generation = {
            let mut entries = self.entries.lock();
            if let Some(hit) = entries.records.get(student_id).cloned() {
                metrics::counter!("clearance_cache_lookups_total", "result" => "hit").increment(1);
                return Ok(Some(hit));
            }
            entries.generation
        };
        metrics::counter!("clearance_cache_lookups_total", "result" => "miss").increment(1);

        let found = self.inner.find_by_student(student_id).await?;
        if let Some(record) = &found {
            let mut entries = self.entries.lock();
            if entries.generation == generation {
                entries.records.put(student_id.clone(), record.clone());
            }
        }
        Ok(found)
    }

    async fn list_all(&self) -> Result<Vec<ClearanceRecord>, RepositoryError> {
        self.inner.list_all().await
    }

    async fn list_student_ids(&self) -> Result<Vec<StudentId>, RepositoryError> {
        self.inner.list_student_ids().await
    }

    async fn apply_department_patch(
        &self,
        student_id: &StudentId,
        patch: &DepartmentPatch,
    ) -> Result<ClearanceRecord, RepositoryError> {
        let result = self.inner.apply_department_patch(student_id, patch).await;
        // Evict rather than cache the merge: a concurrent writer may have
        // produced a newer one already.
        self.evict(student_id);
        result
    }

    async fn append_message(&self, student_id: &StudentId, message: &Message) -> Result<Message, RepositoryError> {
        let result = self.inner.append_message(student_id, message).await;
        self.evict(student_id);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::Actor;
    use crate::domain::clearance::{Participant, Recipient};
    use crate::domain::department::{ClearanceStatus, Department};
    use crate::infrastructure::repositories::InMemoryClearanceRepository;

    fn cached() -> (Arc<InMemoryClearanceRepository>, CachedClearanceRepository) {
        let inner = Arc::new(InMemoryClearanceRepository::new());
        let cache = CachedClearanceRepository::new(inner.clone(), NonZeroUsize::new(2).unwrap());
        (inner, cache)
    }

    #[tokio::test]
    async fn test_read_populates_and_write_evicts() {
        let (_, cache) = cached();
        let id = StudentId::new("s-1").unwrap();
        cache.insert(&ClearanceRecord::initialize(id.clone())).await.unwrap();
        assert!(cache.is_empty());

        let mut record = cache.find_by_student(&id).await.unwrap().unwrap();
        assert_eq!(cache.len(), 1);

        let patch = record
            .set_department_status(
                Department::Library,
                ClearanceStatus::Cleared,
                "",
                &Actor::department("lib", Department::Library),
                true,
            )
            .unwrap();
        cache.apply_department_patch(&id, &patch).await.unwrap();
        assert!(cache.is_empty());

        let fresh = cache.find_by_student(&id).await.unwrap().unwrap();
        assert_eq!(fresh.status_of(Department::Library).status, ClearanceStatus::Cleared);
    }

    #[tokio::test]
    async fn test_message_append_is_visible_through_cache() {
        let (_, cache) = cached();
        let id = StudentId::new("s-2").unwrap();
        cache.insert(&ClearanceRecord::initialize(id.clone())).await.unwrap();
        let mut record = cache.find_by_student(&id).await.unwrap().unwrap();

        let message = record
            .append_message(
                Participant::Student,
                Recipient::Department(Department::Fee),
                Some(&Actor::student("s-2")),
                "Is my scholarship applied?",
            )
            .unwrap();
        cache.append_message(&id, &message).await.unwrap();

        let fresh = cache.find_by_student(&id).await.unwrap().unwrap();
        assert_eq!(fresh.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let (_, cache) = cached();
        for id in ["a", "b", "c"] {
            let id = StudentId::new(id).unwrap();
            cache.insert(&ClearanceRecord::initialize(id.clone())).await.unwrap();
            cache.find_by_student(&id).await.unwrap();
        }
        assert_eq!(cache.len(), 2);
    }
}
