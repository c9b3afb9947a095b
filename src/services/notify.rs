// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification boundary.
//!
//! The scheduler and booking flow only know how to *ask* for a
//! notification; delivery is fire-and-forget and a failed send never
//! blocks a lifecycle pass.

use std::sync::Mutex;

/// Something that can deliver a message to a contact address.
pub trait Notifier: Send + Sync {
    /// Fire-and-forget send. Implementations log failures; callers
    /// never see them.
    fn notify(&self, recipient: &str, message: &str);
}

/// Production notifier: emits the message through structured logging.
///
/// Stands in for an email/SMS gateway; the delivery mechanics live
/// outside this service.
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: &str) -> Self {
        Self {
            sender: sender.to_string(),
        }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, recipient: &str, message: &str) {
        tracing::info!(
            from = %self.sender,
            to = %recipient,
            message,
            "Notification dispatched"
        );
    }
}

/// Test notifier that records every send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipient: &str, message: &str) {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push((recipient.to_string(), message.to_string()));
    }
}
