// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Clearance
//!
//! PostgreSQL persistence for clearance records.
//!
//! The department map lives in one JSONB column. A department write touches
//! only its own key through `jsonb_set`, and the row lock taken by the
//! `UPDATE` serializes writers on the same student without overwriting each
//! other's departments. Messages are rows in `clearance_messages`, inserted in
//! the same transaction with their timestamp clamped to the thread's latest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::Row;
use std::collections::HashMap;

use crate::domain::clearance::{
    ClearanceRecord, DepartmentPatch, DepartmentStatuses, Message, Participant, Recipient, StudentId,
};
use crate::domain::department::Department;
use crate::domain::repository::{ClearanceRepository, RepositoryError};

pub struct PostgresClearanceRepository {
    pool: PgPool,
}

impl PostgresClearanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClearanceRepository for PostgresClearanceRepository {
    async fn insert(&self, record: &ClearanceRecord) -> Result<(), RepositoryError> {
        let departments = serde_json::to_value(record.department_statuses())?;

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO clearances (student_id, departments, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (student_id) DO NOTHING
            "#,
        )
        .bind(record.student_id.as_str())
        .bind(departments)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(RepositoryError::AlreadyExists(record.student_id.to_string()));
        }

        for message in record.messages() {
            insert_message(&mut tx, &record.student_id, message).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_student(&self, student_id: &StudentId) -> Result<Option<ClearanceRecord>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_record(&mut conn, student_id).await
    }

    async fn list_all(&self) -> Result<Vec<ClearanceRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, departments, created_at, updated_at
            FROM clearances
            ORDER BY student_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let message_rows = sqlx::query(
            r#"
            SELECT student_id, sender, sender_id, recipient, department, body, sent_at
            FROM clearance_messages
            ORDER BY student_id ASC, sent_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut threads: HashMap<String, Vec<Message>> = HashMap::new();
        for row in message_rows {
            let student_id: String = row.try_get("student_id")?;
            threads.entry(student_id).or_default().push(parse_message_row(&row)?);
        }

        rows.into_iter()
            .map(|row| {
                let student_id: String = row.try_get("student_id")?;
                let messages = threads.remove(&student_id).unwrap_or_default();
                parse_record_row(&row, messages)
            })
            .collect()
    }

    async fn list_student_ids(&self) -> Result<Vec<StudentId>, RepositoryError> {
        let rows = sqlx::query("SELECT student_id FROM clearances ORDER BY student_id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("student_id")?;
                parse_student_id(id)
            })
            .collect()
    }

    async fn apply_department_patch(
        &self,
        student_id: &StudentId,
        patch: &DepartmentPatch,
    ) -> Result<ClearanceRecord, RepositoryError> {
        let status = serde_json::to_value(&patch.status)?;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE clearances
            SET departments = jsonb_set(departments, ARRAY[$2::text], $3::jsonb),
                updated_at = GREATEST(updated_at, $4)
            WHERE student_id = $1
            "#,
        )
        .bind(student_id.as_str())
        .bind(patch.department.key())
        .bind(status)
        .bind(patch.updated_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(student_id.to_string()));
        }

        for message in &patch.appended {
            insert_message(&mut tx, student_id, message).await?;
        }

        let record = load_record(&mut tx, student_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(student_id.to_string()))?;

        tx.commit().await?;
        Ok(record)
    }

    async fn append_message(&self, student_id: &StudentId, message: &Message) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("SELECT student_id FROM clearances WHERE student_id = $1 FOR UPDATE")
            .bind(student_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound(student_id.to_string()));
        }

        let stored = insert_message(&mut tx, student_id, message).await?;

        sqlx::query("UPDATE clearances SET updated_at = GREATEST(updated_at, $2) WHERE student_id = $1")
            .bind(student_id.as_str())
            .bind(stored.timestamp)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(stored)
    }
}

/// Insert one message, clamping its timestamp to the latest in the thread.
async fn insert_message(
    conn: &mut PgConnection,
    student_id: &StudentId,
    message: &Message,
) -> Result<Message, RepositoryError> {
    let row = sqlx::query(
        r#"
        INSERT INTO clearance_messages (student_id, sender, sender_id, recipient, department, body, sent_at)
        SELECT $1, $2, $3, $4, $5, $6,
               GREATEST($7, COALESCE((SELECT MAX(sent_at) FROM clearance_messages WHERE student_id = $1), $7))
        RETURNING sent_at
        "#,
    )
    .bind(student_id.as_str())
    .bind(message.from.as_str())
    .bind(message.sender_id.as_deref())
    .bind(message.to.to_string())
    .bind(message.department.map(|d| d.key()))
    .bind(&message.message)
    .bind(message.timestamp)
    .fetch_one(&mut *conn)
    .await?;

    let sent_at: DateTime<Utc> = row.try_get("sent_at")?;
    Ok(Message {
        timestamp: sent_at,
        ..message.clone()
    })
}

async fn load_record(
    conn: &mut PgConnection,
    student_id: &StudentId,
) -> Result<Option<ClearanceRecord>, RepositoryError> {
    let row = sqlx::query(
        r#"
        SELECT student_id, departments, created_at, updated_at
        FROM clearances
        WHERE student_id = $1
        "#,
    )
    .bind(student_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let message_rows = sqlx::query(
        r#"
        SELECT sender, sender_id, recipient, department, body, sent_at
        FROM clearance_messages
        WHERE student_id = $1
        ORDER BY sent_at ASC, id ASC
        "#,
    )
    .bind(student_id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    let messages = message_rows
        .iter()
        .map(parse_message_row)
        .collect::<Result<Vec<_>, _>>()?;

    parse_record_row(&row, messages).map(Some)
}

fn parse_record_row(row: &PgRow, messages: Vec<Message>) -> Result<ClearanceRecord, RepositoryError> {
    let student_id: String = row.try_get("student_id")?;
    let departments: serde_json::Value = row.try_get("departments")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let statuses: DepartmentStatuses = serde_json::from_value(departments)?;

    Ok(ClearanceRecord::restore(
        parse_student_id(student_id)?,
        statuses,
        messages,
        created_at,
        updated_at,
    ))
}

fn parse_message_row(row: &PgRow) -> Result<Message, RepositoryError> {
    let sender: String = row.try_get("sender")?;
    let recipient: String = row.try_get("recipient")?;
    let department: Option<String> = row.try_get("department")?;

    let from: Participant = sender
        .parse()
        .map_err(|e| RepositoryError::Serialization(format!("sender: {}", e)))?;
    let to: Recipient = recipient
        .parse()
        .map_err(|e| RepositoryError::Serialization(format!("recipient: {}", e)))?;
    let department = department
        .map(|key| {
            Department::from_key(&key)
                .ok_or_else(|| RepositoryError::Serialization(format!("unknown department '{}'", key)))
        })
        .transpose()?;

    Ok(Message {
        from,
        sender_id: row.try_get("sender_id")?,
        to,
        department,
        message: row.try_get("body")?,
        timestamp: row.try_get("sent_at")?,
    })
}

fn parse_student_id(id: String) -> Result<StudentId, RepositoryError> {
    StudentId::new(id).map_err(|e| RepositoryError::Serialization(e.to_string()))
}
