// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Departments and Clearance Statuses
//!
//! The closed set of departments that sign off a clearance, the per-department
//! status values, and the overall status derived from them.
//!
//! [`StatusBadge`] is the one place that maps a status to its display label and
//! CSS class. Every view renders badges from the API payload instead of keeping
//! its own status-to-class table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::clearance::ClearanceError;

// ============================================================================
// Department
// ============================================================================

/// A department whose sign-off is part of every clearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Department {
    Fee,
    Library,
    StudentServices,
    Laboratory,
    Coordination,
    Transport,
    Hostel,
}

impl Department {
    pub const COUNT: usize = 7;

    /// All departments in canonical order.
    pub const ALL: [Department; Department::COUNT] = [
        Department::Fee,
        Department::Library,
        Department::StudentServices,
        Department::Laboratory,
        Department::Coordination,
        Department::Transport,
        Department::Hostel,
    ];

    /// Wire keys of [`Department::ALL`], in the same order.
    pub const KEYS: [&'static str; Department::COUNT] = {
        let mut keys = [""; Department::COUNT];
        let mut i = 0;
        while i < Department::COUNT {
            keys[i] = Department::ALL[i].key();
            i += 1;
        }
        keys
    };

    /// Wire key, as used in URLs, JSON maps and persisted records.
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Fee => "fee",
            Self::Library => "library",
            Self::StudentServices => "studentServices",
            Self::Laboratory => "laboratory",
            Self::Coordination => "coordination",
            Self::Transport => "transport",
            Self::Hostel => "hostel",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fee => "Fee",
            Self::Library => "Library",
            Self::StudentServices => "Student Services",
            Self::Laboratory => "Laboratory",
            Self::Coordination => "Coordination",
            Self::Transport => "Transport",
            Self::Hostel => "Hostel",
        }
    }

    /// Exact wire-key lookup, used for persisted maps.
    pub fn from_key(key: &str) -> Option<Self> {
        Department::ALL.iter().copied().find(|d| d.key() == key)
    }

    /// Position in [`Department::ALL`].
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Department {
    type Err = ClearanceError;

    /// Accepts the canonical key case-insensitively, plus the snake/kebab
    /// spellings of `studentServices`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        Department::ALL
            .iter()
            .copied()
            .find(|d| d.key().to_lowercase() == normalized)
            .ok_or_else(|| ClearanceError::InvalidDepartmentKind(s.to_string()))
    }
}

// ============================================================================
// Per-department status
// ============================================================================

/// Sign-off status held by one department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ClearanceStatus {
    #[default]
    Pending,
    Cleared,
    Rejected,
    NotApplicable,
}

impl ClearanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cleared => "cleared",
            Self::Rejected => "rejected",
            Self::NotApplicable => "notApplicable",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Counts towards an overall `Cleared`.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Cleared | Self::NotApplicable)
    }

    pub fn badge(&self) -> StatusBadge {
        StatusBadge::for_status(*self)
    }
}

impl fmt::Display for ClearanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClearanceStatus {
    type Err = ClearanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "cleared" => Ok(Self::Cleared),
            "rejected" => Ok(Self::Rejected),
            "notapplicable" | "n/a" => Ok(Self::NotApplicable),
            _ => Err(ClearanceError::InvalidStatusValue(s.to_string())),
        }
    }
}

// ============================================================================
// Overall status
// ============================================================================

/// Status of a whole clearance, derived from its department statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverallStatus {
    Pending,
    Cleared,
    Rejected,
}

impl OverallStatus {
    /// Aggregation rule: any `Rejected` wins, then all satisfied means
    /// `Cleared`, anything else is `Pending`.
    pub fn derive<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ClearanceStatus>,
    {
        let mut all_satisfied = true;
        for status in statuses {
            if status == ClearanceStatus::Rejected {
                return Self::Rejected;
            }
            all_satisfied &= status.is_satisfied();
        }

        if all_satisfied {
            Self::Cleared
        } else {
            Self::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cleared => "cleared",
            Self::Rejected => "rejected",
        }
    }

    pub fn badge(&self) -> StatusBadge {
        match self {
            Self::Pending => StatusBadge::for_status(ClearanceStatus::Pending),
            Self::Cleared => StatusBadge::for_status(ClearanceStatus::Cleared),
            Self::Rejected => StatusBadge::for_status(ClearanceStatus::Rejected),
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverallStatus {
    type Err = ClearanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match ClearanceStatus::from_str(s)? {
            ClearanceStatus::Pending => Ok(Self::Pending),
            ClearanceStatus::Cleared => Ok(Self::Cleared),
            ClearanceStatus::Rejected => Ok(Self::Rejected),
            ClearanceStatus::NotApplicable => Err(ClearanceError::InvalidStatusValue(s.to_string())),
        }
    }
}

// ============================================================================
// Display formatting
// ============================================================================

/// Label and CSS class for a status, shared by every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBadge {
    pub label: &'static str,
    pub css_class: &'static str,
}

impl StatusBadge {
    pub const fn for_status(status: ClearanceStatus) -> Self {
        match status {
            ClearanceStatus::Pending => Self { label: "Pending", css_class: "status-pending" },
            ClearanceStatus::Cleared => Self { label: "Cleared", css_class: "status-cleared" },
            ClearanceStatus::Rejected => Self { label: "Rejected", css_class: "status-rejected" },
            ClearanceStatus::NotApplicable => Self { label: "Not Applicable", css_class: "status-na" },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_keys_roundtrip_through_from_str() {
        for department in Department::ALL {
            assert_eq!(department.key().parse::<Department>().unwrap(), department);
        }
    }

    #[test]
    fn test_from_key_is_exact() {
        for (key, department) in Department::KEYS.iter().zip(Department::ALL) {
            assert_eq!(*key, department.key());
            assert_eq!(Department::from_key(key), Some(department));
        }
        assert_eq!(Department::from_key("student_services"), None);
        assert_eq!(Department::from_key("Library"), None);
    }

    #[test]
    fn test_department_parse_accepts_alternate_spellings() {
        assert_eq!("student_services".parse::<Department>().unwrap(), Department::StudentServices);
        assert_eq!("Student-Services".parse::<Department>().unwrap(), Department::StudentServices);
        assert_eq!(" LIBRARY ".parse::<Department>().unwrap(), Department::Library);
    }

    #[test]
    fn test_unknown_department_is_rejected() {
        let err = "cafeteria".parse::<Department>().unwrap_err();
        assert!(matches!(err, ClearanceError::InvalidDepartmentKind(ref k) if k == "cafeteria"));
    }

    #[test]
    fn test_department_index_matches_canonical_order() {
        for (i, department) in Department::ALL.iter().enumerate() {
            assert_eq!(department.index(), i);
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Cleared".parse::<ClearanceStatus>().unwrap(), ClearanceStatus::Cleared);
        assert_eq!("not_applicable".parse::<ClearanceStatus>().unwrap(), ClearanceStatus::NotApplicable);
        assert_eq!("notApplicable".parse::<ClearanceStatus>().unwrap(), ClearanceStatus::NotApplicable);
        assert!(matches!(
            "approved".parse::<ClearanceStatus>(),
            Err(ClearanceError::InvalidStatusValue(_))
        ));
    }

    #[test]
    fn test_status_serde_uses_camel_case() {
        let json = serde_json::to_string(&ClearanceStatus::NotApplicable).unwrap();
        assert_eq!(json, "\"notApplicable\"");
        let json = serde_json::to_string(&Department::StudentServices).unwrap();
        assert_eq!(json, "\"studentServices\"");
    }

    #[test]
    fn test_overall_rejected_takes_precedence() {
        let mut statuses = vec![ClearanceStatus::Pending; Department::COUNT];
        statuses[0] = ClearanceStatus::Cleared;
        statuses[1] = ClearanceStatus::Rejected;
        assert_eq!(OverallStatus::derive(statuses), OverallStatus::Rejected);
    }

    #[test]
    fn test_overall_cleared_with_not_applicable() {
        let mut statuses = vec![ClearanceStatus::Cleared; Department::COUNT];
        assert_eq!(OverallStatus::derive(statuses.clone()), OverallStatus::Cleared);

        statuses[6] = ClearanceStatus::NotApplicable;
        assert_eq!(OverallStatus::derive(statuses.clone()), OverallStatus::Cleared);

        statuses[6] = ClearanceStatus::Pending;
        assert_eq!(OverallStatus::derive(statuses), OverallStatus::Pending);
    }

    #[test]
    fn test_badges() {
        assert_eq!(ClearanceStatus::NotApplicable.badge().css_class, "status-na");
        assert_eq!(OverallStatus::Rejected.badge().label, "Rejected");
    }
}
