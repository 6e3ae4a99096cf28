// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering for records and messages.

use colored::{ColoredString, Colorize};

use clearance_core::domain::clearance::{ClearanceRecord, Message};
use clearance_core::domain::department::{ClearanceStatus, OverallStatus};

pub fn status_label(status: ClearanceStatus) -> ColoredString {
    let label = status.badge().label;
    match status {
        ClearanceStatus::Pending => label.yellow(),
        ClearanceStatus::Cleared => label.green(),
        ClearanceStatus::Rejected => label.red(),
        ClearanceStatus::NotApplicable => label.dimmed(),
    }
}

pub fn overall_label(status: OverallStatus) -> ColoredString {
    let label = status.badge().label;
    match status {
        OverallStatus::Pending => label.yellow().bold(),
        OverallStatus::Cleared => label.green().bold(),
        OverallStatus::Rejected => label.red().bold(),
    }
}

pub fn print_record(record: &ClearanceRecord) {
    println!(
        "{} {}  {}",
        "Student:".bold(),
        record.student_id,
        overall_label(record.overall_status())
    );
    for (department, status) in record.department_statuses().iter() {
        let mut line = format!("  {:<20} {}", department.display_name(), status_label(status.status));
        if !status.remarks.is_empty() {
            line.push_str(&format!("  {}", status.remarks.dimmed()));
        }
        println!("{}", line);
    }
    println!(
        "  {} {}",
        "Updated:".dimmed(),
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

/// One line per record, for listings.
pub fn print_record_row(record: &ClearanceRecord) {
    let cleared = record
        .department_statuses()
        .statuses()
        .filter(ClearanceStatus::is_satisfied)
        .count();
    let total = record.department_statuses().iter().count();
    println!(
        "{:<24} {:<10} {}/{} departments",
        record.student_id.as_str(),
        overall_label(record.overall_status()),
        cleared,
        total
    );
}

pub fn print_message(message: &Message) {
    // System notifications carry no sender id
    let from = match &message.sender_id {
        Some(id) => format!("{} ({})", id, message.from.as_str()),
        None => "system".dimmed().to_string(),
    };
    println!(
        "[{}] {} → {}: {}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        from,
        message.to,
        message.message
    );
}
