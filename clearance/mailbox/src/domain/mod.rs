// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mailbox domain: messages, their repository contract and errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MailboxMessageId(pub Uuid);

impl MailboxMessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MailboxMessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MailboxMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One message in one user's inbox. Only `read` ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxMessage {
    pub id: MailboxMessageId,
    pub recipient: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<MailboxMessageId>,
    pub sent_at: DateTime<Utc>,
}

impl MailboxMessage {
    /// Build an unread message, trimming and validating every field.
    pub fn compose(sender: &str, recipient: &str, subject: &str, body: &str) -> Result<Self, MailboxError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(MailboxError::EmptySubject);
        }
        let body = body.trim();
        if body.is_empty() {
            return Err(MailboxError::EmptyBody);
        }
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(MailboxError::NoRecipients);
        }

        Ok(Self {
            id: MailboxMessageId::new(),
            recipient: recipient.to_string(),
            sender: sender.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            read: false,
            in_reply_to: None,
            sent_at: Utc::now(),
        })
    }

    /// Subject for a reply: prefixed with "Re: " once.
    pub fn reply_subject(&self) -> String {
        if self.subject.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("re:")) {
            self.subject.clone()
        } else {
            format!("Re: {}", self.subject)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    #[error("Subject cannot be empty")]
    EmptySubject,

    #[error("Message body cannot be empty")]
    EmptyBody,

    #[error("At least one recipient is required")]
    NoRecipients,

    #[error("Mailbox message not found: {0}")]
    NotFound(MailboxMessageId),

    #[error("Mailbox storage error: {0}")]
    Storage(String),
}

impl MailboxError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptySubject => "EmptySubject",
            Self::EmptyBody => "EmptyBody",
            Self::NoRecipients => "NoRecipients",
            Self::NotFound(_) => "NotFound",
            Self::Storage(_) => "Storage",
        }
    }
}

#[async_trait]
pub trait MailboxRepository: Send + Sync {
    async fn save(&self, message: &MailboxMessage) -> Result<(), MailboxError>;

    async fn find_by_id(&self, id: MailboxMessageId) -> Result<Option<MailboxMessage>, MailboxError>;

    /// Newest first
    async fn find_by_recipient(&self, recipient: &str) -> Result<Vec<MailboxMessage>, MailboxError>;

    /// Set the read flag; returns the updated message
    async fn mark_read(&self, id: MailboxMessageId) -> Result<MailboxMessage, MailboxError>;
}
