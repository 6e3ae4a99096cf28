// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mailbox HTTP API, mounted next to the clearance routes.
//!
//! | Method | Path | Allowed |
//! |--------|------|---------|
//! | GET | `/api/mailbox` | any identified caller (own inbox) |
//! | POST | `/api/mailbox/send` | any identified caller |
//! | POST | `/api/mailbox/broadcast` | admin |
//! | POST | `/api/mailbox/{id}/reply` | recipient of `{id}` |
//! | POST | `/api/mailbox/{id}/read` | recipient of `{id}` |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use clearance_core::application::ClearanceService;
use clearance_core::domain::actor::Actor;
use clearance_core::presentation::ApiError;

use crate::application::MailboxService;
use crate::domain::{MailboxError, MailboxMessage, MailboxMessageId};

pub struct MailboxState {
    pub mailbox_service: Arc<dyn MailboxService>,
    /// Source of "every student" for broadcasts with no explicit recipients
    pub clearance_service: Arc<dyn ClearanceService>,
}

pub fn router(mailbox_service: Arc<dyn MailboxService>, clearance_service: Arc<dyn ClearanceService>) -> Router {
    let state = Arc::new(MailboxState {
        mailbox_service,
        clearance_service,
    });

    Router::new()
        .route("/api/mailbox", get(inbox))
        .route("/api/mailbox/send", post(send))
        .route("/api/mailbox/broadcast", post(broadcast))
        .route("/api/mailbox/{id}/reply", post(reply))
        .route("/api/mailbox/{id}/read", post(mark_read))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

impl From<MailboxError> for ApiError {
    fn from(err: MailboxError) -> Self {
        match err {
            MailboxError::NotFound(_) => ApiError::NotFound(err.to_string()),
            MailboxError::Storage(ref e) => {
                error!("Mailbox storage failure: {}", e);
                ApiError::Internal("Internal storage error".to_string())
            }
            other => ApiError::validation(other.to_string(), other.kind()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    /// Empty or absent means every student with a clearance record
    #[serde(default)]
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub messages: Vec<MailboxMessage>,
    pub unread: usize,
}

#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    pub delivered: usize,
}

fn parse_id(raw: &str) -> Result<MailboxMessageId, ApiError> {
    Uuid::parse_str(raw)
        .map(MailboxMessageId)
        .map_err(|_| ApiError::NotFound(format!("Mailbox message not found: {}", raw)))
}

async fn inbox(actor: Actor, State(state): State<Arc<MailboxState>>) -> Result<Json<InboxResponse>, ApiError> {
    let messages = state.mailbox_service.inbox(&actor.id).await?;
    let unread = messages.iter().filter(|m| !m.read).count();
    Ok(Json(InboxResponse { messages, unread }))
}

async fn send(
    actor: Actor,
    State(state): State<Arc<MailboxState>>,
    Json(body): Json<SendRequest>,
) -> Result<(StatusCode, Json<MailboxMessage>), ApiError> {
    let message = state
        .mailbox_service
        .send(&actor.id, &body.to, &body.subject, &body.body)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn broadcast(
    actor: Actor,
    State(state): State<Arc<MailboxState>>,
    Json(body): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    if !actor.is_admin() {
        return Err(ApiError::forbidden("Only admins may broadcast"));
    }

    let recipients = if body.recipients.is_empty() {
        state
            .clearance_service
            .list_student_ids()
            .await?
            .into_iter()
            .map(String::from)
            .collect()
    } else {
        body.recipients
    };

    let delivered = state
        .mailbox_service
        .broadcast(&actor.id, &recipients, &body.subject, &body.body)
        .await?;
    Ok(Json(BroadcastResponse { delivered }))
}

async fn reply(
    actor: Actor,
    State(state): State<Arc<MailboxState>>,
    Path(id): Path<String>,
    Json(body): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<MailboxMessage>), ApiError> {
    let id = parse_id(&id)?;
    let message = state.mailbox_service.reply(&actor.id, id, &body.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn mark_read(
    actor: Actor,
    State(state): State<Arc<MailboxState>>,
    Path(id): Path<String>,
) -> Result<Json<MailboxMessage>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.mailbox_service.mark_read(&actor.id, id).await?))
}
