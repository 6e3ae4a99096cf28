// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Clearance Application Service
//!
//! Entry point for every clearance use case. Coordinates:
//! - Domain layer: `ClearanceRecord` commands (validation + patch production)
//! - Infrastructure layer: `ClearanceRepository` (atomic patch merge)
//! - Event bus: publishing `ClearanceEvent`s once the store has accepted a write
//!
//! Raw strings from the gateway are parsed here, before any record is loaded.
//! Authorization is the gateway's job; this layer trusts the actor it is given.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::actor::Actor;
use crate::domain::clearance::{ClearanceError, ClearanceRecord, Message, Participant, Recipient, StudentId};
use crate::domain::department::{ClearanceStatus, Department, OverallStatus, StatusBadge};
use crate::domain::events::ClearanceEvent;
use crate::domain::repository::{ClearanceRepository, RepositoryError};
use crate::infrastructure::event_bus::EventBus;

// ============================================================================
// Views and filters
// ============================================================================

/// A record as served to clients: the stored fields plus the derived overall
/// status and display badges.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceView {
    #[serde(flatten)]
    pub record: ClearanceRecord,
    pub overall_status: OverallStatus,
    pub overall_badge: StatusBadge,
    pub department_badges: BTreeMap<&'static str, StatusBadge>,
}

impl From<ClearanceRecord> for ClearanceView {
    fn from(record: ClearanceRecord) -> Self {
        let overall_status = record.overall_status();
        let department_badges = record
            .department_statuses()
            .iter()
            .map(|(department, status)| (department.key(), status.status.badge()))
            .collect();

        Self {
            overall_badge: overall_status.badge(),
            overall_status,
            department_badges,
            record,
        }
    }
}

/// Criteria for listing records. Unset fields match everything.
///
/// `status` alone matches records where any department holds that status;
/// combined with `department` it matches that department only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub department: Option<Department>,
    pub status: Option<ClearanceStatus>,
    pub overall: Option<OverallStatus>,
}

impl ListFilter {
    pub fn parse(
        department: Option<&str>,
        status: Option<&str>,
        overall: Option<&str>,
    ) -> Result<Self, ClearanceError> {
        Ok(Self {
            department: department.map(str::parse).transpose()?,
            status: status.map(str::parse).transpose()?,
            overall: overall.map(str::parse).transpose()?,
        })
    }

    pub fn matches(&self, record: &ClearanceRecord) -> bool {
        if let Some(overall) = self.overall {
            if record.overall_status() != overall {
                return false;
            }
        }

        match (self.department, self.status) {
            (Some(department), Some(status)) => record.status_of(department).status == status,
            (None, Some(status)) => record.department_statuses().statuses().any(|s| s == status),
            _ => true,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClearanceServiceError {
    #[error(transparent)]
    Domain(#[from] ClearanceError),

    #[error("No clearance record for student '{0}'")]
    NotFound(String),

    #[error("Student '{0}' already has a clearance record")]
    AlreadyExists(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ClearanceServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            RepositoryError::AlreadyExists(id) => Self::AlreadyExists(id),
            other => Self::Repository(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ClearanceServiceError>;

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait ClearanceService: Send + Sync {
    /// Start a clearance for a student: all departments pending
    async fn create_record(&self, student_id: &str) -> ServiceResult<ClearanceView>;

    async fn get_record(&self, student_id: &str) -> ServiceResult<ClearanceView>;

    async fn list_records(&self, filter: &ListFilter) -> ServiceResult<Vec<ClearanceView>>;

    /// Record a department decision; returns the merged record and its new
    /// overall status
    async fn set_department_status(
        &self,
        student_id: &str,
        department: &str,
        status: &str,
        remarks: &str,
        actor: &Actor,
        notify: bool,
    ) -> ServiceResult<ClearanceView>;

    /// Reset a department to pending. No-op when it already is.
    async fn reopen_department(&self, student_id: &str, department: &str, actor: &Actor)
        -> ServiceResult<ClearanceView>;

    async fn append_message(
        &self,
        student_id: &str,
        from: Participant,
        to: &str,
        sender: &Actor,
        text: &str,
    ) -> ServiceResult<Message>;

    /// The thread, optionally narrowed to one department's conversation
    async fn list_messages(&self, student_id: &str, department: Option<Department>) -> ServiceResult<Vec<Message>>;

    async fn list_student_ids(&self) -> ServiceResult<Vec<StudentId>>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardClearanceService {
    repository: Arc<dyn ClearanceRepository>,
    event_bus: Arc<EventBus>,
}

impl StandardClearanceService {
    pub fn new(repository: Arc<dyn ClearanceRepository>, event_bus: Arc<EventBus>) -> Self {
        Self { repository, event_bus }
    }

    async fn load(&self, student_id: &StudentId) -> ServiceResult<ClearanceRecord> {
        self.repository
            .find_by_student(student_id)
            .await?
            .ok_or_else(|| ClearanceServiceError::NotFound(student_id.to_string()))
    }

    fn publish_messages(&self, student_id: &StudentId, messages: &[Message]) {
        for message in messages {
            self.event_bus.publish(ClearanceEvent::MessageAppended {
                student_id: student_id.clone(),
                message: message.clone(),
            });
        }
    }
}

#[async_trait]
impl ClearanceService for StandardClearanceService {
    async fn create_record(&self, student_id: &str) -> ServiceResult<ClearanceView> {
        let student_id = StudentId::new(student_id)?;
        let record = ClearanceRecord::initialize(student_id.clone());

        self.repository.insert(&record).await?;

        metrics::counter!("clearance_records_created_total").increment(1);
        info!(student_id = %student_id, "Clearance record created");

        self.event_bus.publish(ClearanceEvent::RecordInitialized {
            student_id,
            initialized_at: record.created_at,
        });

        Ok(record.into())
    }

    async fn get_record(&self, student_id: &str) -> ServiceResult<ClearanceView> {
        let student_id = StudentId::new(student_id)?;
        debug!(student_id = %student_id, "Fetching clearance record");
        Ok(self.load(&student_id).await?.into())
    }

    async fn list_records(&self, filter: &ListFilter) -> ServiceResult<Vec<ClearanceView>> {
        let records = self.repository.list_all().await?;
        Ok(records
            .into_iter()
            .filter(|r| filter.matches(r))
            .map(ClearanceView::from)
            .collect())
    }

    async fn set_department_status(
        &self,
        student_id: &str,
        department: &str,
        status: &str,
        remarks: &str,
        actor: &Actor,
        notify: bool,
    ) -> ServiceResult<ClearanceView> {
        let student_id = StudentId::new(student_id)?;
        let department: Department = department.parse()?;
        let status: ClearanceStatus = status.parse()?;

        let mut record = self.load(&student_id).await?;
        let patch = record.set_department_status(department, status, remarks, actor, notify)?;
        let merged = self.repository.apply_department_patch(&student_id, &patch).await?;

        let overall = merged.overall_status();
        metrics::counter!(
            "clearance_status_changes_total",
            "department" => department.key(),
            "status" => status.as_str()
        )
        .increment(1);
        info!(
            student_id = %student_id,
            department = %department,
            status = %status,
            overall = %overall,
            actor = %actor,
            "Department status updated"
        );

        self.event_bus.publish(ClearanceEvent::DepartmentStatusChanged {
            student_id: student_id.clone(),
            department,
            status: patch.status.clone(),
            overall,
            changed_at: patch.updated_at,
        });
        self.publish_messages(&student_id, &patch.appended);

        Ok(merged.into())
    }

    async fn reopen_department(
        &self,
        student_id: &str,
        department: &str,
        actor: &Actor,
    ) -> ServiceResult<ClearanceView> {
        let student_id = StudentId::new(student_id)?;
        let department: Department = department.parse()?;

        let mut record = self.load(&student_id).await?;
        let Some(patch) = record.reopen(department, actor) else {
            debug!(student_id = %student_id, department = %department, "Department already pending; reopen skipped");
            return Ok(record.into());
        };
        let merged = self.repository.apply_department_patch(&student_id, &patch).await?;

        metrics::counter!("clearance_reopens_total", "department" => department.key()).increment(1);
        info!(student_id = %student_id, department = %department, actor = %actor, "Department reopened");

        self.event_bus.publish(ClearanceEvent::DepartmentReopened {
            student_id: student_id.clone(),
            department,
            reopened_by: actor.id.clone(),
            reopened_at: patch.updated_at,
        });
        self.publish_messages(&student_id, &patch.appended);

        Ok(merged.into())
    }

    async fn append_message(
        &self,
        student_id: &str,
        from: Participant,
        to: &str,
        sender: &Actor,
        text: &str,
    ) -> ServiceResult<Message> {
        let student_id = StudentId::new(student_id)?;
        Message::validate_text(text)?;
        let to: Recipient = to.parse()?;

        let mut record = self.load(&student_id).await?;
        let message = record.append_message(from, to, Some(sender), text)?;
        let stored = self.repository.append_message(&student_id, &message).await?;

        metrics::counter!("clearance_messages_total", "from" => from.as_str()).increment(1);
        info!(student_id = %student_id, from = from.as_str(), to = %to, "Message appended");

        self.publish_messages(&student_id, std::slice::from_ref(&stored));
        Ok(stored)
    }

    async fn list_messages(&self, student_id: &str, department: Option<Department>) -> ServiceResult<Vec<Message>> {
        let student_id = StudentId::new(student_id)?;
        let record = self.load(&student_id).await?;
        Ok(record
            .messages()
            .iter()
            .filter(|m| department.map_or(true, |d| m.involves(d)))
            .cloned()
            .collect())
    }

    async fn list_student_ids(&self) -> ServiceResult<Vec<StudentId>> {
        Ok(self.repository.list_student_ids().await?)
    }
}
