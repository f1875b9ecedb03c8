//! Transient notifications: one toast at a time, auto-dismissed.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub shown_at: Instant,
}

#[derive(Debug, Clone)]
pub struct Notifications {
    ttl: Duration,
    current: Option<Notice>,
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(notice = %message, "success");
        self.show(NoticeKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(notice = %message, "failure");
        self.show(NoticeKind::Error, message);
    }

    fn show(&mut self, kind: NoticeKind, message: String) {
        self.current = Some(Notice {
            kind,
            message,
            shown_at: Instant::now(),
        });
    }

    /// The visible notice at `now`, if it has not expired.
    pub fn visible_at(&self, now: Instant) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.shown_at) < self.ttl)
    }

    pub fn visible(&self) -> Option<&Notice> {
        self.visible_at(Instant::now())
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
