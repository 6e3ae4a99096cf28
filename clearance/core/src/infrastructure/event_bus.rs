// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Clearance Events
//
// In-process fan-out over a tokio broadcast channel. Feeds the SSE endpoint
// and any in-process observer. Events are not persisted; a subscriber that
// falls more than `capacity` events behind loses the oldest ones.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::clearance::StudentId;
use crate::domain::events::ClearanceEvent;

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ClearanceEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish(&self, event: ClearanceEvent) {
        debug!(event_type = event.event_type(), student_id = %event.student_id(), "Publishing event");

        // send() only fails when nobody is subscribed
        if self.sender.send(event).is_err() {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to every clearance event
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to events for one student only
    pub fn subscribe_student(&self, student_id: StudentId) -> StudentEventReceiver {
        StudentEventReceiver {
            receiver: self.sender.subscribe(),
            student_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Raw broadcast receiver, for adapting into a `Stream`
    pub fn raw_receiver(&self) -> broadcast::Receiver<ClearanceEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<ClearanceEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<ClearanceEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    pub fn try_recv(&mut self) -> Result<ClearanceEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to a single student
pub struct StudentEventReceiver {
    receiver: broadcast::Receiver<ClearanceEvent>,
    student_id: StudentId,
}

impl StudentEventReceiver {
    /// Next event for this student; events for other students are skipped
    pub async fn recv(&mut self) -> Result<ClearanceEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.student_id() == &self.student_id {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
