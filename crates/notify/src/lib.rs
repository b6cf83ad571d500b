//! Approval outcome notifications for timesheet owners.
//!
//! This crate covers the delivery side of the approval workflow:
//! - **Message shapes** - the `{ "type": ..., "data": ... }` envelope sent to
//!   the downstream collaborator when a timesheet is approved or rejected
//! - **Webhook transport** (`webhook`) - HTTPS POST with optional bearer
//!   token and an HMAC-SHA256 body signature header
//! - **Dispatch** (`dispatch`) - fire-and-forget delivery on a spawned task;
//!   failures are logged and never reach the decision that triggered them

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

pub mod dispatch;
pub mod webhook;

pub use dispatch::Dispatcher;
pub use webhook::WebhookTransport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TimesheetApproved,
    TimesheetRejected,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimesheetApproved => "timesheet_approved",
            Self::TimesheetRejected => "timesheet_rejected",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recipient-facing payload. Field names follow the collaborator's contract,
/// so `comments` is omitted entirely for approvals rather than sent as null.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub email: String,
    pub name: String,
    pub week_start: NaiveDate,
    pub actor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub data: NotificationData,
}

impl NotificationMessage {
    pub fn approved(
        email: impl Into<String>,
        name: impl Into<String>,
        week_start: NaiveDate,
        actor_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: NotificationType::TimesheetApproved,
            data: NotificationData {
                email: email.into(),
                name: name.into(),
                week_start,
                actor_name: actor_name.into(),
                comments: None,
            },
        }
    }

    pub fn rejected(
        email: impl Into<String>,
        name: impl Into<String>,
        week_start: NaiveDate,
        actor_name: impl Into<String>,
        comments: impl Into<String>,
    ) -> Self {
        Self {
            kind: NotificationType::TimesheetRejected,
            data: NotificationData {
                email: email.into(),
                name: name.into(),
                week_start,
                actor_name: actor_name.into(),
                comments: Some(comments.into()),
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("failed to serialize notification payload: {0}")]
    Serialize(String),
    #[error("notification request failed: {0}")]
    Transport(String),
    #[error("notification endpoint returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifyError>;
}

/// Transport for environments without a configured collaborator endpoint.
#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl NotificationTransport for NoopTransport {
    async fn deliver(&self, _message: &NotificationMessage) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Records every message it is handed, optionally failing each delivery.
/// Lives outside `#[cfg(test)]` so downstream crates can drive their own
/// dispatch tests against it.
#[derive(Default)]
pub struct RecordingTransport {
    delivered: Mutex<Vec<NotificationMessage>>,
    fail_with: Option<NotifyError>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: NotifyError) -> Self {
        Self { delivered: Mutex::new(Vec::new()), fail_with: Some(error) }
    }

    pub async fn delivered(&self) -> Vec<NotificationMessage> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn deliver(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        self.delivered.lock().await.push(message.clone());
        match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
