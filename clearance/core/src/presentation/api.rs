// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Clearance HTTP API.
//!
//! | Method | Path | Allowed |
//! |--------|------|---------|
//! | GET | `/health` | anyone |
//! | POST | `/api/clearances` | student (own id), admin |
//! | GET | `/api/clearances` | department, admin |
//! | GET | `/api/clearances/{student_id}` | owner, department, admin |
//! | PUT | `/api/clearances/{student_id}/departments/{department}` | that department, admin |
//! | POST | `/api/clearances/{student_id}/departments/{department}/reopen` | that department, admin |
//! | GET | `/api/clearances/{student_id}/messages` | owner, department, admin |
//! | POST | `/api/clearances/{student_id}/messages` | owner, department |
//! | GET | `/api/clearances/{student_id}/events` | owner, department, admin |

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    routing::{get, post, put},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;

use crate::application::{ClearanceService, ClearanceView, ListFilter};
use crate::domain::actor::{Actor, ActorRole};
use crate::domain::clearance::{ClearanceError, Message, Participant, Recipient, StudentId};
use crate::domain::department::Department;
use crate::domain::events::ClearanceEvent;
use crate::infrastructure::event_bus::EventBus;
use crate::presentation::error::ApiError;

pub struct AppState {
    pub clearance_service: Arc<dyn ClearanceService>,
    pub event_bus: Arc<EventBus>,
}

pub fn app(clearance_service: Arc<dyn ClearanceService>, event_bus: Arc<EventBus>) -> Router {
    let state = Arc::new(AppState {
        clearance_service,
        event_bus,
    });

    Router::new()
        .route("/health", get(health))
        .route("/api/clearances", post(create_record).get(list_records))
        .route("/api/clearances/{student_id}", get(get_record))
        .route(
            "/api/clearances/{student_id}/departments/{department}",
            put(set_department_status),
        )
        .route(
            "/api/clearances/{student_id}/departments/{department}/reopen",
            post(reopen_department),
        )
        .route(
            "/api/clearances/{student_id}/messages",
            get(list_messages).post(append_message),
        )
        .route("/api/clearances/{student_id}/events", get(stream_events))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    /// Required for admins; students may omit it
    #[serde(default)]
    pub student_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    pub status: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

fn default_notify() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AppendMessageRequest {
    pub to: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub department: Option<String>,
    pub status: Option<String>,
    pub overall: Option<String>,
}

// ============================================================================
// Authorization helpers
// ============================================================================

/// Students may only see their own record; staff and admins see all.
fn ensure_can_view(actor: &Actor, student_id: &str) -> Result<(), ApiError> {
    match actor.role {
        ActorRole::Student if !actor.is_student(student_id) => {
            Err(ApiError::forbidden("Students may only access their own clearance"))
        }
        _ => Ok(()),
    }
}

fn ensure_can_review(actor: &Actor, department: Department) -> Result<(), ApiError> {
    if actor.can_review(department) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Only {} staff or an admin may change the {} clearance",
            department.display_name(),
            department
        )))
    }
}

/// Whether `actor` should receive `event` on the live stream.
fn event_visible_to(actor: &Actor, event: &ClearanceEvent) -> bool {
    match (actor.department_of(), event) {
        (Some(department), ClearanceEvent::MessageAppended { message, .. }) => message.involves(department),
        _ => true,
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn create_record(
    actor: Actor,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<ClearanceView>), ApiError> {
    // The body is optional for students starting their own clearance
    let requested = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<CreateRecordRequest>(&body)
            .map_err(|e| ApiError::validation(format!("Invalid request body: {}", e), "InvalidBody"))?
            .student_id
    };

    let student_id = match actor.role {
        ActorRole::Student => match requested {
            Some(id) if id.trim() != actor.id => {
                return Err(ApiError::forbidden("Students may only start their own clearance"));
            }
            _ => actor.id.clone(),
        },
        ActorRole::Admin => requested.ok_or(ClearanceError::InvalidStudentId)?,
        ActorRole::Department(_) => {
            return Err(ApiError::forbidden("Department staff cannot start clearances"));
        }
    };

    let view = state.clearance_service.create_record(&student_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_records(
    actor: Actor,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ClearanceView>>, ApiError> {
    if actor.role == ActorRole::Student {
        return Err(ApiError::forbidden("Students cannot list clearances"));
    }

    let filter = ListFilter::parse(
        query.department.as_deref(),
        query.status.as_deref(),
        query.overall.as_deref(),
    )?;
    Ok(Json(state.clearance_service.list_records(&filter).await?))
}

async fn get_record(
    actor: Actor,
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ClearanceView>, ApiError> {
    ensure_can_view(&actor, &student_id)?;
    Ok(Json(state.clearance_service.get_record(&student_id).await?))
}

async fn set_department_status(
    actor: Actor,
    State(state): State<Arc<AppState>>,
    Path((student_id, department)): Path<(String, String)>,
    Json(body): Json<SetStatusRequest>,
) -> Result<Json<ClearanceView>, ApiError> {
    let department: Department = department.parse()?;
    ensure_can_review(&actor, department)?;

    let view = state
        .clearance_service
        .set_department_status(
            &student_id,
            department.key(),
            &body.status,
            &body.remarks,
            &actor,
            body.notify,
        )
        .await?;
    Ok(Json(view))
}

async fn reopen_department(
    actor: Actor,
    State(state): State<Arc<AppState>>,
    Path((student_id, department)): Path<(String, String)>,
) -> Result<Json<ClearanceView>, ApiError> {
    let department: Department = department.parse()?;
    ensure_can_review(&actor, department)?;

    let view = state
        .clearance_service
        .reopen_department(&student_id, department.key(), &actor)
        .await?;
    Ok(Json(view))
}

async fn list_messages(
    actor: Actor,
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    ensure_can_view(&actor, &student_id)?;
    let messages = state
        .clearance_service
        .list_messages(&student_id, actor.department_of())
        .await?;
    Ok(Json(messages))
}

async fn append_message(
    actor: Actor,
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
    Json(body): Json<AppendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let from = match actor.role {
        ActorRole::Student => {
            ensure_can_view(&actor, &student_id)?;
            // A student's message must be addressed to a department
            if matches!(body.to.parse::<Recipient>(), Ok(Recipient::Student)) {
                return Err(ClearanceError::InvalidRecipient(body.to).into());
            }
            Participant::Student
        }
        ActorRole::Department(_) => Participant::Department,
        ActorRole::Admin => {
            return Err(ApiError::forbidden("Admins message students through the mailbox"));
        }
    };

    let message = state
        .clearance_service
        .append_message(&student_id, from, &body.to, &actor, &body.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn stream_events(
    actor: Actor,
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    ensure_can_view(&actor, &student_id)?;
    // 404 for unknown students instead of an idle stream
    state.clearance_service.get_record(&student_id).await?;
    let student_id = StudentId::new(student_id)?;

    let stream = BroadcastStream::new(state.event_bus.raw_receiver())
        .filter_map(move |item| match item {
            Ok(event) if event.student_id() == &student_id && event_visible_to(&actor, &event) => {
                Event::default().event(event.event_type()).json_data(&event).ok()
            }
            // Lagged receivers just skip what they missed
            _ => None,
        })
        .map(Ok::<_, Infallible>);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
