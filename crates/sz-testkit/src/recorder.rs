//! Observer that records every notification it receives.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::time::Duration;
use sz_sdk::Observer;
use tokio::sync::Notify;

pub struct RecordingObserver {
    id: String,
    messages: Mutex<Vec<String>>,
    arrived: Notify,
}

impl RecordingObserver {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Mutex::new(Vec::new()),
            arrived: Notify::new(),
        }
    }

    /// Raw messages in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Messages parsed as JSON. Unparseable messages are skipped.
    pub fn notifications(&self) -> Vec<Value> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| serde_json::from_str(m).ok())
            .collect()
    }

    /// `messageId` of every notification, in arrival order.
    pub fn message_ids(&self) -> Vec<String> {
        self.notifications()
            .iter()
            .filter_map(|n| n["messageId"].as_str().map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until at least `count` messages arrived. Returns whether they did
    /// before `timeout` elapsed.
    pub async fn wait_for_count(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.arrived.notified();
                if self.len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Waits for a notification with the given message id.
    pub async fn wait_for_message_id(&self, message_id: &str, timeout: Duration) -> Option<Value> {
        let wait = async {
            loop {
                let notified = self.arrived.notified();
                if let Some(found) = self
                    .notifications()
                    .into_iter()
                    .find(|n| n["messageId"] == message_id)
                {
                    return found;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.ok()
    }
}

#[async_trait]
impl Observer for RecordingObserver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn update(&self, message: String) {
        self.messages.lock().push(message);
        self.arrived.notify_waiters();
    }
}

impl std::fmt::Debug for RecordingObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingObserver")
            .field("id", &self.id)
            .field("messages", &self.len())
            .finish()
    }
}
