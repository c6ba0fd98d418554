//! Transient user notifications.
//!
//! Notices are what a front end shows as short-lived messages; they are
//! separate from the tracing log. The controller emits one per visible
//! transition or failure.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// What happened, for consumers that react to notices programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    AuthorizationRequested,
    Connected,
    Disconnected,
    EncryptionDegraded,
    RoleUnknown,
    ConnectionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub level: NoticeLevel,
    pub message: String,
    /// Underlying error, when the notice reports one.
    pub error: Option<SessionError>,
}

impl Notice {
    pub fn new(kind: NoticeKind, level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            kind,
            level,
            message: message.into(),
            error: None,
        }
    }

    /// A notice for `error`, worded with its guidance.
    pub fn from_error(kind: NoticeKind, error: &SessionError) -> Self {
        let level = if error.is_degraded() {
            NoticeLevel::Warning
        } else {
            NoticeLevel::Error
        };
        Self {
            kind,
            level,
            message: error.guidance().to_string(),
            error: Some(error.clone()),
        }
    }
}

/// Sink for notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        let kind = format!("{:?}", notice.kind);
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(kind = %kind, "{}", notice.message)
            }
            NoticeLevel::Warning => tracing::warn!(kind = %kind, "{}", notice.message),
            NoticeLevel::Error => match &notice.error {
                Some(err) => tracing::error!(kind = %kind, error = %err, "{}", notice.message),
                None => tracing::error!(kind = %kind, "{}", notice.message),
            },
        }
    }
}

/// Forwards notices to a channel; dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices().iter().filter(|n| n.kind == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
