// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Clearance record commands
//!
//! Commands: create, show, list, set, reopen

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crate::commands::output::{print_record, print_record_row};
use crate::server::ClearanceClient;

#[derive(Subcommand)]
pub enum RecordCommand {
    /// Start a clearance (students omit the id; admins must give one)
    Create {
        #[arg(value_name = "STUDENT_ID")]
        student_id: Option<String>,
    },

    /// Show one clearance with every department status
    Show {
        #[arg(value_name = "STUDENT_ID")]
        student_id: String,
    },

    /// List clearances (department staff and admins)
    List {
        /// Only records where this department...
        #[arg(long)]
        department: Option<String>,

        /// ...has this status
        #[arg(long)]
        status: Option<String>,

        /// Only records with this overall status
        #[arg(long)]
        overall: Option<String>,
    },

    /// Set a department's status
    Set {
        #[arg(value_name = "STUDENT_ID")]
        student_id: String,

        #[arg(value_name = "DEPARTMENT")]
        department: String,

        /// pending, cleared, rejected or notApplicable
        #[arg(value_name = "STATUS")]
        status: String,

        /// Required when rejecting
        #[arg(short, long, default_value = "")]
        remarks: String,

        /// Do not post a notification to the student's thread
        #[arg(long)]
        no_notify: bool,
    },

    /// Return a department to pending
    Reopen {
        #[arg(value_name = "STUDENT_ID")]
        student_id: String,

        #[arg(value_name = "DEPARTMENT")]
        department: String,
    },
}

pub async fn handle_command(command: RecordCommand, client: &ClearanceClient) -> Result<()> {
    match command {
        RecordCommand::Create { student_id } => {
            let record = client.create_record(student_id.as_deref()).await?;
            println!("{}", format!("✓ Clearance started for {}", record.student_id).green());
            print_record(&record);
        }
        RecordCommand::Show { student_id } => {
            let record = client.get_record(&student_id).await?;
            print_record(&record);
        }
        RecordCommand::List {
            department,
            status,
            overall,
        } => {
            let records = client
                .list_records(department.as_deref(), status.as_deref(), overall.as_deref())
                .await?;
            if records.is_empty() {
                println!("{}", "No clearances found".dimmed());
            }
            for record in &records {
                print_record_row(record);
            }
        }
        RecordCommand::Set {
            student_id,
            department,
            status,
            remarks,
            no_notify,
        } => {
            let record = client
                .set_status(&student_id, &department, &status, &remarks, !no_notify)
                .await?;
            println!("{}", format!("✓ {} set to {}", department, status).green());
            print_record(&record);
        }
        RecordCommand::Reopen { student_id, department } => {
            let record = client.reopen(&student_id, &department).await?;
            println!("{}", format!("✓ {} reopened", department).green());
            print_record(&record);
        }
    }
    Ok(())
}
