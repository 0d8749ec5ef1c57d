//! User-facing notifications.

use chrono::{DateTime, Utc};
use encore_core::{RecordId, ResourceKind};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Follow-up the UI can offer next to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    /// Retry writing the dependent children of a record.
    RetryChildren { kind: ResourceKind, id: RecordId },
    /// Take the user to the plan upgrade flow.
    UpgradePlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub action: Option<NotificationAction>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            action: None,
            created_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Destination for notifications (toasts in the UI, a log in headless use).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Sink that writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info | NotificationLevel::Success => info!(
                level = ?notification.level,
                action = ?notification.action,
                "{}",
                notification.message
            ),
            NotificationLevel::Warning | NotificationLevel::Error => warn!(
                level = ?notification.level,
                action = ?notification.action,
                "{}",
                notification.message
            ),
        }
    }
}
