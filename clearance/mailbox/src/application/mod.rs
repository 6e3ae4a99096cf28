// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Mailbox Application Service
//!
//! Send, broadcast, reply, list and mark-read. A caller can only see or
//! act on messages addressed to them; anything else looks like `NotFound`.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{MailboxError, MailboxMessage, MailboxMessageId, MailboxRepository};

#[async_trait]
pub trait MailboxService: Send + Sync {
    async fn send(&self, sender: &str, recipient: &str, subject: &str, body: &str) -> Result<MailboxMessage, MailboxError>;

    /// Deliver one copy per distinct recipient; returns how many were delivered
    async fn broadcast(
        &self,
        sender: &str,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<usize, MailboxError>;

    /// Answer a message the caller received, addressed to its sender
    async fn reply(&self, sender: &str, original: MailboxMessageId, body: &str) -> Result<MailboxMessage, MailboxError>;

    async fn inbox(&self, user: &str) -> Result<Vec<MailboxMessage>, MailboxError>;

    async fn unread_count(&self, user: &str) -> Result<usize, MailboxError>;

    async fn mark_read(&self, user: &str, id: MailboxMessageId) -> Result<MailboxMessage, MailboxError>;
}

pub struct StandardMailboxService {
    repository: Arc<dyn MailboxRepository>,
}

impl StandardMailboxService {
    pub fn new(repository: Arc<dyn MailboxRepository>) -> Self {
        Self { repository }
    }

    /// A message addressed to `user`, or `NotFound`
    async fn owned_by(&self, user: &str, id: MailboxMessageId) -> Result<MailboxMessage, MailboxError> {
        match self.repository.find_by_id(id).await? {
            Some(message) if message.recipient == user => Ok(message),
            _ => Err(MailboxError::NotFound(id)),
        }
    }
}

#[async_trait]
impl MailboxService for StandardMailboxService {
    async fn send(&self, sender: &str, recipient: &str, subject: &str, body: &str) -> Result<MailboxMessage, MailboxError> {
        let message = MailboxMessage::compose(sender, recipient, subject, body)?;
        self.repository.save(&message).await?;

        metrics::counter!("mailbox_messages_sent_total", "kind" => "direct").increment(1);
        info!(sender = sender, recipient = %message.recipient, id = %message.id, "Mailbox message sent");
        Ok(message)
    }

    async fn broadcast(
        &self,
        sender: &str,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<usize, MailboxError> {
        let recipients: BTreeSet<&str> = recipients
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(MailboxError::NoRecipients);
        }

        // Validate once before delivering anything
        let mut drafts = Vec::with_capacity(recipients.len());
        for recipient in &recipients {
            drafts.push(MailboxMessage::compose(sender, recipient, subject, body)?);
        }
        for draft in &drafts {
            self.repository.save(draft).await?;
        }

        metrics::counter!("mailbox_messages_sent_total", "kind" => "broadcast").increment(drafts.len() as u64);
        info!(sender = sender, delivered = drafts.len(), "Mailbox broadcast delivered");
        Ok(drafts.len())
    }

    async fn reply(&self, sender: &str, original: MailboxMessageId, body: &str) -> Result<MailboxMessage, MailboxError> {
        let original = self.owned_by(sender, original).await?;

        let mut reply = MailboxMessage::compose(sender, &original.sender, &original.reply_subject(), body)?;
        reply.in_reply_to = Some(original.id);
        self.repository.save(&reply).await?;

        metrics::counter!("mailbox_messages_sent_total", "kind" => "reply").increment(1);
        info!(sender = sender, recipient = %reply.recipient, in_reply_to = %original.id, "Mailbox reply sent");
        Ok(reply)
    }

    async fn inbox(&self, user: &str) -> Result<Vec<MailboxMessage>, MailboxError> {
        debug!(user = user, "Listing inbox");
        self.repository.find_by_recipient(user).await
    }

    async fn unread_count(&self, user: &str) -> Result<usize, MailboxError> {
        Ok(self
            .repository
            .find_by_recipient(user)
            .await?
            .iter()
            .filter(|m| !m.read)
            .count())
    }

    async fn mark_read(&self, user: &str, id: MailboxMessageId) -> Result<MailboxMessage, MailboxError> {
        self.owned_by(user, id).await?;
        self.repository.mark_read(id).await
    }
}
