// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete `ClearanceRepository` for the configured storage
//! backend, optionally wrapped in the read-through cache. Keeps the domain
//! layer free of infrastructure types.

use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::domain::repository::{ClearanceRepository, StorageBackend};
use crate::infrastructure::cache::CachedClearanceRepository;
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::{InMemoryClearanceRepository, PostgresClearanceRepository};

/// Creates a ClearanceRepository implementation based on the configured backend.
///
/// `database` must be present for the PostgreSQL backend. A `cache_capacity`
/// of 0 disables caching.
pub fn create_clearance_repository(
    backend: &StorageBackend,
    database: Option<&Database>,
    cache_capacity: usize,
) -> anyhow::Result<Arc<dyn ClearanceRepository>> {
    let store: Arc<dyn ClearanceRepository> = match backend {
        StorageBackend::InMemory => Arc::new(InMemoryClearanceRepository::new()),
        StorageBackend::PostgreSQL(_) => {
            let db = database.ok_or_else(|| {
                anyhow::anyhow!("PostgreSQL backend selected but no database connection was opened")
            })?;
            Arc::new(PostgresClearanceRepository::new(db.get_pool().clone()))
        }
    };

    Ok(match NonZeroUsize::new(cache_capacity) {
        Some(capacity) => Arc::new(CachedClearanceRepository::new(store, capacity)),
        None => store,
    })
}
