// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Mailbox commands
//!
//! Commands: inbox, send, broadcast, reply, read

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crate::server::ClearanceClient;

#[derive(Subcommand)]
pub enum MailboxCommand {
    /// List the caller's inbox, newest first
    Inbox,

    /// Send one message
    Send {
        #[arg(long)]
        to: String,

        #[arg(short, long)]
        subject: String,

        #[arg(value_name = "BODY")]
        body: String,
    },

    /// Send to many users at once (admin only; no --to means every student)
    Broadcast {
        /// Repeatable
        #[arg(long = "to")]
        recipients: Vec<String>,

        #[arg(short, long)]
        subject: String,

        #[arg(value_name = "BODY")]
        body: String,
    },

    /// Reply to a message in the caller's inbox
    Reply {
        #[arg(value_name = "MESSAGE_ID")]
        id: String,

        #[arg(value_name = "BODY")]
        body: String,
    },

    /// Mark a message as read
    Read {
        #[arg(value_name = "MESSAGE_ID")]
        id: String,
    },
}

pub async fn handle_command(command: MailboxCommand, client: &ClearanceClient) -> Result<()> {
    match command {
        MailboxCommand::Inbox => {
            let inbox = client.inbox().await?;
            println!("{} ({} unread)", "Inbox".bold(), inbox.unread);
            for message in &inbox.messages {
                let marker = if message.read { " ".normal() } else { "●".blue() };
                println!(
                    "{} {}  {:<16} {}",
                    marker,
                    message.id,
                    message.sender,
                    message.subject.bold()
                );
                println!("    {}", message.body);
            }
        }
        MailboxCommand::Send { to, subject, body } => {
            let message = client.mailbox_send(&to, &subject, &body).await?;
            println!("{}", format!("✓ Sent to {} ({})", message.recipient, message.id).green());
        }
        MailboxCommand::Broadcast {
            recipients,
            subject,
            body,
        } => {
            let delivered = client.mailbox_broadcast(&recipients, &subject, &body).await?;
            println!("{}", format!("✓ Delivered to {} recipient(s)", delivered).green());
        }
        MailboxCommand::Reply { id, body } => {
            let message = client.mailbox_reply(&id, &body).await?;
            println!("{}", format!("✓ Replied to {}: {}", message.recipient, message.subject).green());
        }
        MailboxCommand::Read { id } => {
            let message = client.mailbox_mark_read(&id).await?;
            println!("{}", format!("✓ Marked read: {}", message.subject).green());
        }
    }
    Ok(())
}
