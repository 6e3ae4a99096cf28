// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain events emitted after a clearance change has been persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::clearance::{DepartmentStatus, Message, StudentId};
use crate::domain::department::{Department, OverallStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClearanceEvent {
    RecordInitialized {
        student_id: StudentId,
        initialized_at: DateTime<Utc>,
    },
    DepartmentStatusChanged {
        student_id: StudentId,
        department: Department,
        status: DepartmentStatus,
        /// Overall status after the change, as seen by the store
        overall: OverallStatus,
        changed_at: DateTime<Utc>,
    },
    DepartmentReopened {
        student_id: StudentId,
        department: Department,
        reopened_by: String,
        reopened_at: DateTime<Utc>,
    },
    MessageAppended {
        student_id: StudentId,
        message: Message,
    },
}

impl ClearanceEvent {
    pub fn student_id(&self) -> &StudentId {
        match self {
            Self::RecordInitialized { student_id, .. }
            | Self::DepartmentStatusChanged { student_id, .. }
            | Self::DepartmentReopened { student_id, .. }
            | Self::MessageAppended { student_id, .. } => student_id,
        }
    }

    /// SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RecordInitialized { .. } => "record_initialized",
            Self::DepartmentStatusChanged { .. } => "department_status_changed",
            Self::DepartmentReopened { .. } => "department_reopened",
            Self::MessageAppended { .. } => "message_appended",
        }
    }
}
