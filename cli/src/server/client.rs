// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for a running clearance server.
//!
//! Sends the same identity headers the upstream proxy would set, so the CLI
//! acts as whichever student, department officer or admin it is told to be.

use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use clearance_core::domain::clearance::{ClearanceRecord, Message};
use clearance_core::presentation::auth::{ACTOR_DEPARTMENT_HEADER, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use clearance_mailbox::MailboxMessage;

/// Characters escaped inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Who the CLI claims to be on each request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub role: String,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Inbox {
    pub messages: Vec<MailboxMessage>,
    pub unread: usize,
}

#[derive(Debug, Clone)]
pub struct ClearanceClient {
    client: Client,
    base_url: String,
    identity: Option<Identity>,
}

impl ClearanceClient {
    pub fn new(host: &str, port: u16, identity: Option<Identity>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}:{}", host, port)
        } else {
            format!("http://{}:{}", host, port)
        };

        Ok(Self {
            client,
            base_url,
            identity,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(identity) = &self.identity {
            builder = builder
                .header(ACTOR_ID_HEADER, &identity.id)
                .header(ACTOR_ROLE_HEADER, &identity.role);
            if let Some(department) = &identity.department {
                builder = builder.header(ACTOR_DEPARTMENT_HEADER, department);
            }
        }
        builder
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .request(reqwest::Method::GET, "/health")
            .timeout(Duration::from_millis(500))
            .send()
            .await
            .context("Server is not reachable")?;
        parse(response, "health check").await
    }

    pub async fn create_record(&self, student_id: Option<&str>) -> Result<ClearanceRecord> {
        let body = match student_id {
            Some(id) => json!({ "studentId": id }),
            None => json!({}),
        };
        let response = self
            .request(reqwest::Method::POST, "/api/clearances")
            .json(&body)
            .send()
            .await
            .context("Failed to create clearance")?;
        parse(response, "create clearance").await
    }

    pub async fn get_record(&self, student_id: &str) -> Result<ClearanceRecord> {
        let response = self
            .request(reqwest::Method::GET, &format!("/api/clearances/{}", segment(student_id)))
            .send()
            .await
            .context("Failed to fetch clearance")?;
        parse(response, "fetch clearance").await
    }

    pub async fn list_records(
        &self,
        department: Option<&str>,
        status: Option<&str>,
        overall: Option<&str>,
    ) -> Result<Vec<ClearanceRecord>> {
        let mut query = Vec::new();
        if let Some(department) = department {
            query.push(("department", department));
        }
        if let Some(status) = status {
            query.push(("status", status));
        }
        if let Some(overall) = overall {
            query.push(("overall", overall));
        }

        let response = self
            .request(reqwest::Method::GET, "/api/clearances")
            .query(&query)
            .send()
            .await
            .context("Failed to list clearances")?;
        parse(response, "list clearances").await
    }

    pub async fn set_status(
        &self,
        student_id: &str,
        department: &str,
        status: &str,
        remarks: &str,
        notify: bool,
    ) -> Result<ClearanceRecord> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/api/clearances/{}/departments/{}", segment(student_id), segment(department)),
            )
            .json(&json!({ "status": status, "remarks": remarks, "notify": notify }))
            .send()
            .await
            .context("Failed to update department status")?;
        parse(response, "update department status").await
    }

    pub async fn reopen(&self, student_id: &str, department: &str) -> Result<ClearanceRecord> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!(
                    "/api/clearances/{}/departments/{}/reopen",
                    segment(student_id),
                    segment(department)
                ),
            )
            .send()
            .await
            .context("Failed to reopen department")?;
        parse(response, "reopen department").await
    }

    pub async fn send_message(&self, student_id: &str, to: &str, text: &str) -> Result<Message> {
        let response = self
            .request(reqwest::Method::POST, &format!("/api/clearances/{}/messages", segment(student_id)))
            .json(&json!({ "to": to, "message": text }))
            .send()
            .await
            .context("Failed to send message")?;
        parse(response, "send message").await
    }

    pub async fn list_messages(&self, student_id: &str) -> Result<Vec<Message>> {
        let response = self
            .request(reqwest::Method::GET, &format!("/api/clearances/{}/messages", segment(student_id)))
            .send()
            .await
            .context("Failed to list messages")?;
        parse(response, "list messages").await
    }

    pub async fn inbox(&self) -> Result<Inbox> {
        let response = self
            .request(reqwest::Method::GET, "/api/mailbox")
            .send()
            .await
            .context("Failed to fetch inbox")?;
        parse(response, "fetch inbox").await
    }

    pub async fn mailbox_send(&self, to: &str, subject: &str, body: &str) -> Result<MailboxMessage> {
        let response = self
            .request(reqwest::Method::POST, "/api/mailbox/send")
            .json(&json!({ "to": to, "subject": subject, "body": body }))
            .send()
            .await
            .context("Failed to send mail")?;
        parse(response, "send mail").await
    }

    pub async fn mailbox_broadcast(&self, recipients: &[String], subject: &str, body: &str) -> Result<usize> {
        #[derive(Deserialize)]
        struct BroadcastResponse {
            delivered: usize,
        }

        let response = self
            .request(reqwest::Method::POST, "/api/mailbox/broadcast")
            .json(&json!({ "recipients": recipients, "subject": subject, "body": body }))
            .send()
            .await
            .context("Failed to broadcast")?;
        let parsed: BroadcastResponse = parse(response, "broadcast").await?;
        Ok(parsed.delivered)
    }

    pub async fn mailbox_reply(&self, id: &str, body: &str) -> Result<MailboxMessage> {
        let response = self
            .request(reqwest::Method::POST, &format!("/api/mailbox/{}/reply", segment(id)))
            .json(&json!({ "body": body }))
            .send()
            .await
            .context("Failed to send reply")?;
        parse(response, "send reply").await
    }

    pub async fn mailbox_mark_read(&self, id: &str) -> Result<MailboxMessage> {
        let response = self
            .request(reqwest::Method::POST, &format!("/api/mailbox/{}/read", segment(id)))
            .send()
            .await
            .context("Failed to mark message read")?;
        parse(response, "mark message read").await
    }
}

/// Decode a success body, or turn the server's `{error, kind}` into an error.
async fn parse<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| {
                Some(format!(
                    "{} ({})",
                    v.get("error")?.as_str()?,
                    v.get("kind")?.as_str()?
                ))
            })
            .unwrap_or(text);
        anyhow::bail!("Failed to {}: HTTP {}: {}", action, status, detail);
    }

    response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", action))
}
