// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Clearance thread commands

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crate::commands::output::print_message;
use crate::server::ClearanceClient;

#[derive(Subcommand)]
pub enum MessageCommand {
    /// Post to a student's clearance thread
    Send {
        #[arg(value_name = "STUDENT_ID")]
        student_id: String,

        /// Department key, or "student" when writing as department staff
        #[arg(long)]
        to: String,

        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Show a student's thread (department staff see only their own conversation)
    List {
        #[arg(value_name = "STUDENT_ID")]
        student_id: String,
    },
}

pub async fn handle_command(command: MessageCommand, client: &ClearanceClient) -> Result<()> {
    match command {
        MessageCommand::Send { student_id, to, text } => {
            let message = client.send_message(&student_id, &to, &text).await?;
            println!("{}", "✓ Message sent".green());
            print_message(&message);
        }
        MessageCommand::List { student_id } => {
            let messages = client.list_messages(&student_id).await?;
            if messages.is_empty() {
                println!("{}", "No messages".dimmed());
            }
            for message in &messages {
                print_message(message);
            }
        }
    }
    Ok(())
}
