// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service-level tests for the clearance workflow.
//!
//! Exercises `StandardClearanceService` over the in-memory store, both bare
//! and behind the read-through cache:
//! - raw input parsing and error kinds
//! - overall status derivation after each change
//! - concurrent writers on sibling departments
//! - event publication

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;

use clearance_core::application::repository_factory::create_clearance_repository;
use clearance_core::application::{ClearanceService, ClearanceServiceError, ListFilter, StandardClearanceService};
use clearance_core::domain::actor::Actor;
use clearance_core::domain::clearance::{
    ClearanceError, ClearanceRecord, DepartmentPatch, Message, Participant, Recipient, StudentId,
};
use clearance_core::domain::department::{ClearanceStatus, Department, OverallStatus};
use clearance_core::domain::events::ClearanceEvent;
use clearance_core::domain::repository::{ClearanceRepository, RepositoryError, StorageBackend};
use clearance_core::infrastructure::cache::CachedClearanceRepository;
use clearance_core::infrastructure::event_bus::EventBus;
use clearance_core::infrastructure::repositories::InMemoryClearanceRepository;

fn service_with_cache(cache_capacity: usize) -> (Arc<StandardClearanceService>, Arc<EventBus>) {
    let repository = create_clearance_repository(&StorageBackend::InMemory, None, cache_capacity).unwrap();
    let event_bus = Arc::new(EventBus::new(256));
    (
        Arc::new(StandardClearanceService::new(repository, event_bus.clone())),
        event_bus,
    )
}

fn service() -> Arc<StandardClearanceService> {
    service_with_cache(0).0
}

fn staff(department: Department) -> Actor {
    Actor::department(format!("{}-officer", department.key()), department)
}

#[tokio::test]
async fn test_create_record_starts_all_pending() {
    let service = service();
    let view = service.create_record("FA21-BSE-042").await.unwrap();

    assert_eq!(view.overall_status, OverallStatus::Pending);
    assert_eq!(view.department_badges.len(), Department::COUNT);
    assert!(view
        .department_badges
        .values()
        .all(|b| b.css_class == "status-pending"));
    assert!(view.record.messages().is_empty());
}

#[tokio::test]
async fn test_duplicate_and_blank_records_are_rejected() {
    let service = service();
    service.create_record("s-1").await.unwrap();

    let err = service.create_record("s-1").await.unwrap_err();
    assert!(matches!(err, ClearanceServiceError::AlreadyExists(_)));

    let err = service.create_record("  ").await.unwrap_err();
    assert!(matches!(err, ClearanceServiceError::Domain(ClearanceError::InvalidStudentId)));
}

#[tokio::test]
async fn test_fee_cleared_library_rejected_is_rejected() {
    let service = service();
    service.create_record("s-2").await.unwrap();

    service
        .set_department_status("s-2", "fee", "cleared", "", &staff(Department::Fee), true)
        .await
        .unwrap();
    let view = service
        .set_department_status(
            "s-2",
            "library",
            "rejected",
            "Overdue: Clean Code",
            &staff(Department::Library),
            true,
        )
        .await
        .unwrap();

    assert_eq!(view.overall_status, OverallStatus::Rejected);
    assert_eq!(view.overall_badge.css_class, "status-rejected");
    assert_eq!(view.record.messages().len(), 2);
}

#[tokio::test]
async fn test_all_cleared_with_hostel_not_applicable() {
    let service = service();
    service.create_record("s-3").await.unwrap();

    let mut view = None;
    for department in Department::ALL {
        let status = if department == Department::Hostel { "notApplicable" } else { "cleared" };
        view = Some(
            service
                .set_department_status("s-3", department.key(), status, "", &staff(department), false)
                .await
                .unwrap(),
        );
    }
    let view = view.unwrap();
    assert_eq!(view.overall_status, OverallStatus::Cleared);
    assert!(view.record.messages().is_empty());
    assert_eq!(view.department_badges["hostel"].label, "Not Applicable");
}

#[tokio::test]
async fn test_invalid_inputs_leave_record_untouched() {
    let service = service();
    service.create_record("s-4").await.unwrap();
    let before = service.get_record("s-4").await.unwrap().record;
    let actor = Actor::admin("registrar");

    let cases = [
        ("cafeteria", "cleared", "", "InvalidDepartmentKind"),
        ("fee", "approved", "", "InvalidStatusValue"),
        ("transport", "rejected", "  ", "MissingRemarks"),
    ];
    for (department, status, remarks, kind) in cases {
        let err = service
            .set_department_status("s-4", department, status, remarks, &actor, true)
            .await
            .unwrap_err();
        match err {
            ClearanceServiceError::Domain(e) => assert_eq!(e.kind(), kind),
            other => panic!("expected {}, got {:?}", kind, other),
        }
    }

    let after = service.get_record("s-4").await.unwrap().record;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_unknown_student_is_not_found() {
    let service = service();
    let err = service
        .set_department_status("ghost", "fee", "cleared", "", &Actor::admin("a"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ClearanceServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_terminal_then_reopen_then_change() {
    let service = service();
    service.create_record("s-5").await.unwrap();
    let lab = staff(Department::Laboratory);

    service
        .set_department_status("s-5", "laboratory", "cleared", "", &lab, true)
        .await
        .unwrap();
    let err = service
        .set_department_status("s-5", "laboratory", "rejected", "Lost goggles", &lab, true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClearanceServiceError::Domain(ClearanceError::TerminalStatus { .. })
    ));

    let reopened = service.reopen_department("s-5", "laboratory", &lab).await.unwrap();
    assert_eq!(
        reopened.record.status_of(Department::Laboratory).status,
        ClearanceStatus::Pending
    );

    let view = service
        .set_department_status("s-5", "laboratory", "rejected", "Lost goggles", &lab, true)
        .await
        .unwrap();
    assert_eq!(view.overall_status, OverallStatus::Rejected);
}

#[tokio::test]
async fn test_reopen_pending_changes_nothing() {
    let service = service();
    let created = service.create_record("s-6").await.unwrap();

    let view = service
        .reopen_department("s-6", "coordination", &staff(Department::Coordination))
        .await
        .unwrap();
    assert_eq!(view.record.updated_at, created.record.updated_at);
    assert!(view.record.messages().is_empty());
}

#[tokio::test]
async fn test_message_validation_and_department_view() {
    let service = service();
    service.create_record("s-7").await.unwrap();
    let student = Actor::student("s-7");

    let err = service
        .append_message("s-7", Participant::Student, "library", &student, "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, ClearanceServiceError::Domain(ClearanceError::EmptyMessage)));

    let err = service
        .append_message("s-7", Participant::Student, "dean", &student, "Hello")
        .await
        .unwrap_err();
    assert!(matches!(err, ClearanceServiceError::Domain(ClearanceError::InvalidRecipient(_))));

    service
        .append_message("s-7", Participant::Student, "library", &student, "Book returned yesterday")
        .await
        .unwrap();
    service
        .append_message("s-7", Participant::Student, "fee", &student, "Receipt attached")
        .await
        .unwrap();
    service
        .append_message(
            "s-7",
            Participant::Department,
            "student",
            &staff(Department::Library),
            "Confirmed, thanks",
        )
        .await
        .unwrap();

    let all = service.list_messages("s-7", None).await.unwrap();
    assert_eq!(all.len(), 3);

    let library = service.list_messages("s-7", Some(Department::Library)).await.unwrap();
    assert_eq!(library.len(), 2);
    assert!(library.iter().all(|m| m.involves(Department::Library)));
    assert_eq!(library[1].to, Recipient::Student);
}

#[tokio::test]
async fn test_list_records_filters() {
    let service = service();
    for id in ["a", "b", "c"] {
        service.create_record(id).await.unwrap();
    }
    service
        .set_department_status("a", "library", "cleared", "", &staff(Department::Library), false)
        .await
        .unwrap();
    service
        .set_department_status("b", "library", "rejected", "Fine unpaid", &staff(Department::Library), false)
        .await
        .unwrap();

    let pending_library = service
        .list_records(&ListFilter::parse(Some("library"), Some("pending"), None).unwrap())
        .await
        .unwrap();
    assert_eq!(pending_library.len(), 1);
    assert_eq!(pending_library[0].record.student_id.as_str(), "c");

    let rejected = service
        .list_records(&ListFilter::parse(None, None, Some("rejected")).unwrap())
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].record.student_id.as_str(), "b");

    assert!(ListFilter::parse(None, None, Some("notApplicable")).is_err());

    let ids = service.list_student_ids().await.unwrap();
    assert_eq!(ids.len(), 3);
}

/// In-memory store that yields around every read and write, so concurrent
/// commands interleave between loading a record and patching it.
struct YieldingRepository {
    inner: InMemoryClearanceRepository,
}

impl YieldingRepository {
    async fn pause() {
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ClearanceRepository for YieldingRepository {
    async fn insert(&self, record: &ClearanceRecord) -> Result<(), RepositoryError> {
        self.inner.insert(record).await
    }

    async fn find_by_student(&self, student_id: &StudentId) -> Result<Option<ClearanceRecord>, RepositoryError> {
        let found = self.inner.find_by_student(student_id).await;
        Self::pause().await;
        found
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
        Self::pause().await;
        self.inner.apply_department_patch(student_id, patch).await
    }

    async fn append_message(&self, student_id: &StudentId, message: &Message) -> Result<Message, RepositoryError> {
        Self::pause().await;
        self.inner.append_message(student_id, message).await
    }
}

fn interleaving_service(cache_capacity: usize) -> Arc<StandardClearanceService> {
    let store: Arc<dyn ClearanceRepository> = Arc::new(YieldingRepository {
        inner: InMemoryClearanceRepository::new(),
    });
    let repository: Arc<dyn ClearanceRepository> = match NonZeroUsize::new(cache_capacity) {
        Some(capacity) => Arc::new(CachedClearanceRepository::new(store, capacity)),
        None => store,
    };
    Arc::new(StandardClearanceService::new(repository, Arc::new(EventBus::new(256))))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_department_updates_all_land() {
    for cache_capacity in [0, 64] {
        let service = interleaving_service(cache_capacity);
        service.create_record("busy-student").await.unwrap();

        let mut handles = Vec::new();
        for department in Department::ALL {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .set_department_status(
                        "busy-student",
                        department.key(),
                        "cleared",
                        "",
                        &staff(department),
                        true,
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let view = service.get_record("busy-student").await.unwrap();
        for department in Department::ALL {
            assert_eq!(
                view.record.status_of(department).status,
                ClearanceStatus::Cleared,
                "lost update on {} (cache {})",
                department,
                cache_capacity
            );
        }
        assert_eq!(view.overall_status, OverallStatus::Cleared);
        assert_eq!(view.record.messages().len(), Department::COUNT);
        assert!(view
            .record
            .messages()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }
}

#[tokio::test]
async fn test_concurrent_messages_stay_ordered() {
    let service = service();
    service.create_record("chatty").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let student = Actor::student("chatty");
            service
                .append_message("chatty", Participant::Student, "transport", &student, &format!("ping {}", i))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let messages = service.list_messages("chatty", None).await.unwrap();
    assert_eq!(messages.len(), 20);
    assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_events_are_published_after_writes() {
    let (service, event_bus) = service_with_cache(0);
    let mut receiver = event_bus.subscribe();

    service.create_record("watched").await.unwrap();
    service
        .set_department_status("watched", "hostel", "cleared", "", &staff(Department::Hostel), true)
        .await
        .unwrap();

    assert!(matches!(
        receiver.recv().await.unwrap(),
        ClearanceEvent::RecordInitialized { .. }
    ));
    match receiver.recv().await.unwrap() {
        ClearanceEvent::DepartmentStatusChanged { department, overall, .. } => {
            assert_eq!(department, Department::Hostel);
            assert_eq!(overall, OverallStatus::Pending);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(
        receiver.recv().await.unwrap(),
        ClearanceEvent::MessageAppended { .. }
    ));

    // Failed commands publish nothing
    let _ = service
        .set_department_status("watched", "hostel", "rejected", "x", &staff(Department::Hostel), true)
        .await;
    assert!(receiver.try_recv().is_err());
}
