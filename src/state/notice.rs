//! User-visible notifications (toasts)
//!
//! The core never fails past its boundary; it reports outcomes here once and
//! the UI layer drains the receiver.

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Sending half, cheap to clone into async tasks
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

pub fn notice_channel() -> (Notifier, NoticeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier { tx }, rx)
}

impl Notifier {
    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.send(NoticeLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.send(NoticeLevel::Error, message);
    }

    fn send(&self, level: NoticeLevel, message: String) {
        // A closed receiver just means no UI is listening
        let _ = self.tx.send(Notice { level, message });
    }
}

/// Drain everything currently queued
pub fn drain(rx: &mut NoticeReceiver) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}
