// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Clearance Aggregate
//!
//! One student's clearance: an approval status per department, an overall
//! status derived from them on every read, and an append-only message thread.
//!
//! ## Invariants
//!
//! - Exactly one [`DepartmentStatus`] per [`Department`]. The map is a fixed
//!   array indexed by department, and deserialization rejects missing,
//!   duplicated or unknown keys.
//! - [`OverallStatus`] is never stored. [`ClearanceRecord::overall_status`]
//!   recomputes it from the department map.
//! - `messages` is append-only with non-decreasing timestamps.
//! - Leaving `Pending` is terminal for a department until [`ClearanceRecord::reopen`].
//!
//! Every command validates before it mutates. A failed command leaves the
//! record exactly as it was.
//!
//! ## Persistence
//!
//! Mutating commands return a [`DepartmentPatch`] naming the single department
//! slot and the messages they touched. Stores persist the patch, never the
//! whole record, so concurrent writers on sibling departments cannot clobber
//! each other.

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::actor::Actor;
use crate::domain::department::{ClearanceStatus, Department, OverallStatus};

// ============================================================================
// Value Objects
// ============================================================================

/// Opaque student identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Result<Self, ClearanceError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ClearanceError::InvalidStudentId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StudentId {
    type Error = ClearanceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StudentId> for String {
    fn from(id: StudentId) -> Self {
        id.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One department's sign-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStatus {
    pub status: ClearanceStatus,

    #[serde(default)]
    pub remarks: String,

    /// Actor that made the last change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl DepartmentStatus {
    pub fn pending() -> Self {
        Self {
            status: ClearanceStatus::Pending,
            remarks: String::new(),
            reviewed_by: None,
            reviewed_at: None,
        }
    }
}

impl Default for DepartmentStatus {
    fn default() -> Self {
        Self::pending()
    }
}

/// Complete department → status map. Always holds all seven departments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentStatuses([DepartmentStatus; Department::COUNT]);

impl DepartmentStatuses {
    pub fn get(&self, department: Department) -> &DepartmentStatus {
        &self.0[department.index()]
    }

    pub(crate) fn set(&mut self, department: Department, status: DepartmentStatus) {
        self.0[department.index()] = status;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Department, &DepartmentStatus)> + '_ {
        Department::ALL.iter().copied().zip(self.0.iter())
    }

    pub fn statuses(&self) -> impl Iterator<Item = ClearanceStatus> + '_ {
        self.0.iter().map(|s| s.status)
    }
}

impl Default for DepartmentStatuses {
    fn default() -> Self {
        Self(std::array::from_fn(|_| DepartmentStatus::pending()))
    }
}

impl Serialize for DepartmentStatuses {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Department::COUNT))?;
        for (department, status) in self.iter() {
            map.serialize_entry(department.key(), status)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DepartmentStatuses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatusesVisitor;

        impl<'de> Visitor<'de> for StatusesVisitor {
            type Value = DepartmentStatuses;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map with exactly one entry per department")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut slots: [Option<DepartmentStatus>; Department::COUNT] = Default::default();

                while let Some(key) = map.next_key::<String>()? {
                    let department = Department::from_key(&key)
                        .ok_or_else(|| de::Error::unknown_field(&key, &Department::KEYS))?;
                    let slot = &mut slots[department.index()];
                    if slot.is_some() {
                        return Err(de::Error::duplicate_field(department.key()));
                    }
                    *slot = Some(map.next_value()?);
                }

                let mut statuses = DepartmentStatuses::default();
                for department in Department::ALL {
                    let status = slots[department.index()]
                        .take()
                        .ok_or_else(|| de::Error::missing_field(department.key()))?;
                    statuses.set(department, status);
                }
                Ok(statuses)
            }
        }

        deserializer.deserialize_map(StatusesVisitor)
    }
}

/// Which side of the conversation wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    Student,
    Department,
}

impl Participant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Department => "department",
        }
    }
}

impl FromStr for Participant {
    type Err = ClearanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "department" => Ok(Self::Department),
            other => Err(ClearanceError::InvalidRecipient(other.to_string())),
        }
    }
}

/// Addressee of a thread message: the student or one department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Recipient {
    Student,
    Department(Department),
}

impl FromStr for Recipient {
    type Err = ClearanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("student") {
            return Ok(Self::Student);
        }
        s.parse::<Department>()
            .map(Self::Department)
            .map_err(|_| ClearanceError::InvalidRecipient(s.to_string()))
    }
}

impl TryFrom<String> for Recipient {
    type Error = ClearanceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Recipient> for String {
    fn from(recipient: Recipient) -> Self {
        recipient.to_string()
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => f.write_str("student"),
            Self::Department(d) => f.write_str(d.key()),
        }
    }
}

/// Entry in a clearance thread. Never changed after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub from: Participant,

    /// Absent for system notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,

    pub to: Recipient,

    /// Department side of the conversation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,

    pub message: String,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Trimmed message text, or `EmptyMessage`.
    pub fn validate_text(text: &str) -> Result<&str, ClearanceError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ClearanceError::EmptyMessage);
        }
        Ok(trimmed)
    }

    /// Whether `department` is a party to this message.
    pub fn involves(&self, department: Department) -> bool {
        self.department == Some(department)
    }

    pub fn is_system(&self) -> bool {
        self.sender_id.is_none()
    }
}

/// Delta produced by a department-scoped command.
///
/// Stores apply exactly this: one department slot plus appended messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPatch {
    pub department: Department,
    pub status: DepartmentStatus,
    pub appended: Vec<Message>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Aggregate Root: ClearanceRecord
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceRecord {
    pub student_id: StudentId,
    department_statuses: DepartmentStatuses,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClearanceRecord {
    /// Fresh record: every department `Pending`, no messages.
    pub fn initialize(student_id: StudentId) -> Self {
        let now = Utc::now();
        Self {
            student_id,
            department_statuses: DepartmentStatuses::default(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a record from persisted parts.
    pub fn restore(
        student_id: StudentId,
        department_statuses: DepartmentStatuses,
        messages: Vec<Message>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            department_statuses,
            messages,
            created_at,
            updated_at,
        }
    }

    // ========================================================================
    // Aggregate Queries
    // ========================================================================

    pub fn department_statuses(&self) -> &DepartmentStatuses {
        &self.department_statuses
    }

    pub fn status_of(&self, department: Department) -> &DepartmentStatus {
        self.department_statuses.get(department)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Derived from the department map on every call.
    pub fn overall_status(&self) -> OverallStatus {
        OverallStatus::derive(self.department_statuses.statuses())
    }

    // ========================================================================
    // Aggregate Commands
    // ========================================================================

    /// Record a department's decision.
    ///
    /// Appends a system notification to the student unless `notify` is false.
    /// Setting the status a department already holds is allowed and still
    /// refreshes remarks, timestamps and the notification.
    pub fn set_department_status(
        &mut self,
        department: Department,
        status: ClearanceStatus,
        remarks: &str,
        actor: &Actor,
        notify: bool,
    ) -> Result<DepartmentPatch, ClearanceError> {
        let remarks = remarks.trim();
        if status == ClearanceStatus::Rejected && remarks.is_empty() {
            return Err(ClearanceError::MissingRemarks { department });
        }

        let current = self.status_of(department).status;
        if !current.is_pending() && current != status {
            return Err(ClearanceError::TerminalStatus { department, current });
        }

        let now = self.next_timestamp();
        let new_status = DepartmentStatus {
            status,
            remarks: remarks.to_string(),
            reviewed_by: Some(actor.id.clone()),
            reviewed_at: Some(now),
        };
        self.department_statuses.set(department, new_status.clone());

        let mut appended = Vec::new();
        if notify {
            let text = status_notification(department, status, remarks);
            appended.push(self.push_system_notification(department, now, text));
        }
        self.updated_at = now;

        Ok(DepartmentPatch {
            department,
            status: new_status,
            appended,
            updated_at: now,
        })
    }

    /// Put a decided department back to `Pending` with empty remarks.
    ///
    /// Returns `None` without touching the record when the department is
    /// already pending.
    pub fn reopen(&mut self, department: Department, actor: &Actor) -> Option<DepartmentPatch> {
        if self.status_of(department).status.is_pending() {
            return None;
        }

        let now = self.next_timestamp();
        let new_status = DepartmentStatus {
            status: ClearanceStatus::Pending,
            remarks: String::new(),
            reviewed_by: Some(actor.id.clone()),
            reviewed_at: Some(now),
        };
        self.department_statuses.set(department, new_status.clone());

        let text = format!(
            "{} reopened your clearance for review.",
            department.display_name()
        );
        let notification = self.push_system_notification(department, now, text);
        self.updated_at = now;

        Some(DepartmentPatch {
            department,
            status: new_status,
            appended: vec![notification],
            updated_at: now,
        })
    }

    /// Append a message to the thread.
    ///
    /// The department side of the conversation is the addressed department,
    /// or the sender's own department when writing to the student.
    pub fn append_message(
        &mut self,
        from: Participant,
        to: Recipient,
        sender: Option<&Actor>,
        text: &str,
    ) -> Result<Message, ClearanceError> {
        let text = Message::validate_text(text)?;

        // Staff write to the student or within their own conversation
        if let (Recipient::Department(addressed), Some(own)) = (to, sender.and_then(Actor::department_of)) {
            if addressed != own {
                return Err(ClearanceError::InvalidRecipient(addressed.key().to_string()));
            }
        }

        let department = match to {
            Recipient::Department(d) => Some(d),
            Recipient::Student => sender.and_then(Actor::department_of),
        };
        let now = self.next_timestamp();
        let message = Message {
            from,
            sender_id: sender.map(|a| a.id.clone()),
            to,
            department,
            message: text.to_string(),
            timestamp: now,
        };
        self.messages.push(message.clone());
        self.updated_at = now;
        Ok(message)
    }

    // ========================================================================
    // Store-side merge
    // ========================================================================

    /// Merge a patch produced against a possibly older copy of this record.
    ///
    /// Only the patched department slot changes; messages are appended after
    /// whatever is already in the thread.
    pub fn apply_patch(&mut self, patch: &DepartmentPatch) {
        self.department_statuses
            .set(patch.department, patch.status.clone());
        for message in &patch.appended {
            self.merge_message(message.clone());
        }
        self.updated_at = self.updated_at.max(patch.updated_at);
    }

    /// Append an already-built message, clamping its timestamp so the thread
    /// stays ordered.
    pub fn merge_message(&mut self, mut message: Message) -> Message {
        if let Some(last) = self.messages.last() {
            message.timestamp = message.timestamp.max(last.timestamp);
        }
        self.updated_at = self.updated_at.max(message.timestamp);
        self.messages.push(message.clone());
        message
    }

    fn push_system_notification(
        &mut self,
        department: Department,
        timestamp: DateTime<Utc>,
        text: String,
    ) -> Message {
        let message = Message {
            from: Participant::Department,
            sender_id: None,
            to: Recipient::Student,
            department: Some(department),
            message: text,
            timestamp,
        };
        self.messages.push(message.clone());
        message
    }

    /// Current time, never earlier than anything already on the record.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let floor = self
            .messages
            .last()
            .map(|m| m.timestamp.max(self.updated_at))
            .unwrap_or(self.updated_at);
        Utc::now().max(floor)
    }
}

fn status_notification(department: Department, status: ClearanceStatus, remarks: &str) -> String {
    let mut text = format!(
        "{} set your clearance to {}.",
        department.display_name(),
        status.badge().label
    );
    if !remarks.is_empty() {
        text.push_str(" Remarks: ");
        text.push_str(remarks);
    }
    text
}

// ============================================================================
// Domain Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClearanceError {
    #[error("Unrecognized department: '{0}'")]
    InvalidDepartmentKind(String),

    #[error("Unrecognized clearance status: '{0}'")]
    InvalidStatusValue(String),

    #[error("Remarks are required when rejecting the {department} clearance")]
    MissingRemarks { department: Department },

    #[error("Message text cannot be empty")]
    EmptyMessage,

    #[error("Unrecognized message recipient: '{0}'")]
    InvalidRecipient(String),

    #[error("The {department} clearance is already {current}; reopen it before changing it")]
    TerminalStatus {
        department: Department,
        current: ClearanceStatus,
    },

    #[error("Student id cannot be empty")]
    InvalidStudentId,
}

impl ClearanceError {
    /// Stable name of the error kind, surfaced to API callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidDepartmentKind(_) => "InvalidDepartmentKind",
            Self::InvalidStatusValue(_) => "InvalidStatusValue",
            Self::MissingRemarks { .. } => "MissingRemarks",
            Self::EmptyMessage => "EmptyMessage",
            Self::InvalidRecipient(_) => "InvalidRecipient",
            Self::TerminalStatus { .. } => "TerminalStatus",
            Self::InvalidStudentId => "InvalidStudentId",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
