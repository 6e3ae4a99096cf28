// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory mailbox storage. Mailbox contents are not persisted across
//! restarts.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{MailboxError, MailboxMessage, MailboxMessageId, MailboxRepository};

#[derive(Clone, Default)]
pub struct InMemoryMailboxRepository {
    messages: Arc<RwLock<HashMap<MailboxMessageId, MailboxMessage>>>,
}

impl InMemoryMailboxRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MailboxRepository for InMemoryMailboxRepository {
    async fn save(&self, message: &MailboxMessage) -> Result<(), MailboxError> {
        self.messages.write().insert(message.id, message.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: MailboxMessageId) -> Result<Option<MailboxMessage>, MailboxError> {
        Ok(self.messages.read().get(&id).cloned())
    }

    async fn find_by_recipient(&self, recipient: &str) -> Result<Vec<MailboxMessage>, MailboxError> {
        let mut inbox: Vec<MailboxMessage> = self
            .messages
            .read()
            .values()
            .filter(|m| m.recipient == recipient)
            .cloned()
            .collect();
        inbox.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(inbox)
    }

    async fn mark_read(&self, id: MailboxMessageId) -> Result<MailboxMessage, MailboxError> {
        let mut messages = self.messages.write();
        let message = messages.get_mut(&id).ok_or(MailboxError::NotFound(id))?;
        message.read = true;
        Ok(message.clone())
    }
}
