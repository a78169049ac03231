//! Observer fan-out for per-call notifications.
//!
//! Observers are a telemetry side channel. Delivery is fire-and-forget and
//! never affects the result of the call being reported.
//!
//! The registry keeps an immutable snapshot of its members. Notification
//! clones the snapshot and dispatches from it, so a concurrent unregister does
//! not race with delivery; an observer removed mid-flight may still receive
//! the message that was already on its way.

use crate::error::{message_id, SzError, SzResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc;

/// Receiver of notification messages.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Identity used for registration and removal.
    fn id(&self) -> &str;

    /// Receives one JSON-encoded [`Notification`].
    async fn update(&self, message: String);
}

/// Message delivered to observers after each call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub origin: String,
    pub subject_id: String,
    pub message_id: String,
    pub message_time: DateTime<Utc>,
    pub details: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Notification {
    pub fn new(origin: impl Into<String>, component_id: u32, message_number: u32) -> Self {
        Self {
            origin: origin.into(),
            subject_id: component_id.to_string(),
            message_id: message_id(component_id, message_number),
            message_time: Utc::now(),
            details: BTreeMap::new(),
            error: None,
        }
    }

    pub fn with_details<K, V>(mut self, details: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.details
            .extend(details.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_error(mut self, error: Option<&SzError>) -> Self {
        self.error = error.map(|e| e.to_string());
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

type Snapshot = Arc<[Arc<dyn Observer>]>;

/// Lazily created set of observers belonging to one client.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Option<Snapshot>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer.
    ///
    /// # Errors
    ///
    /// Returns [`SzError::Observer`] if an observer with the same id is
    /// already registered.
    pub fn register(&self, observer: Arc<dyn Observer>) -> SzResult<()> {
        let mut guard = self.observers.write();
        let mut members: Vec<Arc<dyn Observer>> = guard.as_deref().map(<[_]>::to_vec).unwrap_or_default();
        if members.iter().any(|o| o.id() == observer.id()) {
            return Err(SzError::observer(format!(
                "observer {} is already registered",
                observer.id()
            )));
        }
        members.push(observer);
        *guard = Some(members.into());
        Ok(())
    }

    /// Removes the observer with the given id. Unknown ids are ignored.
    ///
    /// Removing the last observer resets the registry to its empty state.
    pub fn unregister(&self, observer_id: &str) -> SzResult<()> {
        let mut guard = self.observers.write();
        let Some(current) = guard.as_ref() else {
            return Ok(());
        };
        let remaining: Vec<Arc<dyn Observer>> = current
            .iter()
            .filter(|o| o.id() != observer_id)
            .cloned()
            .collect();
        *guard = if remaining.is_empty() {
            None
        } else {
            Some(remaining.into())
        };
        Ok(())
    }

    /// Current members, or `None` when no observer is registered.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.observers.read().clone()
    }

    pub fn is_active(&self) -> bool {
        self.observers.read().is_some()
    }

    pub fn len(&self) -> usize {
        self.observers.read().as_ref().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers a notification to the current members without waiting.
    pub fn notify(&self, notification: &Notification) {
        if let Some(observers) = self.snapshot() {
            dispatch(observers, notification.to_json());
        }
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

/// Spawns one delivery task per observer.
///
/// Inside a Tokio runtime the tasks run on that runtime. Otherwise the
/// message is queued for the shared delivery thread.
fn dispatch(observers: Snapshot, message: String) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            for observer in observers.iter() {
                let observer = Arc::clone(observer);
                let message = message.clone();
                handle.spawn(async move {
                    observer.update(message).await;
                });
            }
        }
        Err(_) => {
            if delivery_queue().send((observers, message)).is_err() {
                tracing::warn!("Observer delivery thread is not running; notification dropped");
            }
        }
    }
}

type Delivery = (Snapshot, String);

static DELIVERY_QUEUE: OnceLock<mpsc::UnboundedSender<Delivery>> = OnceLock::new();

/// Sender for the delivery thread, started on first use.
///
/// The thread drives a current-thread runtime for the life of the process
/// and spawns one task per observer for each queued message.
fn delivery_queue() -> &'static mpsc::UnboundedSender<Delivery> {
    DELIVERY_QUEUE.get_or_init(|| {
        let (tx, rx) = mpsc::unbounded_channel();
        let started = std::thread::Builder::new()
            .name("sz-observer-delivery".into())
            .spawn(move || delivery_loop(rx));
        if let Err(e) = started {
            tracing::warn!(error = %e, "Cannot start observer delivery thread");
        }
        tx
    })
}

fn delivery_loop(mut rx: mpsc::UnboundedReceiver<Delivery>) {
    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot start observer delivery runtime");
            return;
        }
    };
    runtime.block_on(async move {
        while let Some((observers, message)) = rx.recv().await {
            for observer in observers.iter() {
                let observer = Arc::clone(observer);
                let message = message.clone();
                tokio::spawn(async move { observer.update(message).await });
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct ChannelObserver {
        id: String,
        tx: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl Observer for ChannelObserver {
        fn id(&self) -> &str {
            &self.id
        }

        async fn update(&self, message: String) {
            let _ = self.tx.send(message);
        }
    }

    fn observer(id: &str) -> (Arc<dyn Observer>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(ChannelObserver { id: id.to_string(), tx }), rx)
    }

    #[test]
    fn test_registry_is_lazy_and_resets() {
        let registry = ObserverRegistry::new();
        assert!(!registry.is_active());
        assert!(registry.snapshot().is_none());

        let (first, _rx1) = observer("first");
        let (second, _rx2) = observer("second");
        registry.register(first).unwrap();
        registry.register(second).unwrap();
        assert_eq!(registry.len(), 2);

        registry.unregister("first").unwrap();
        assert!(registry.is_active());
        registry.unregister("second").unwrap();
        assert!(!registry.is_active());
        assert!(registry.snapshot().is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = ObserverRegistry::new();
        let (first, _rx) = observer("dup");
        let (again, _rx2) = observer("dup");
        registry.register(first).unwrap();
        let err = registry.register(again).unwrap_err();
        assert!(matches!(err, SzError::Observer { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let registry = ObserverRegistry::new();
        registry.unregister("missing").unwrap();
        let (first, _rx) = observer("present");
        registry.register(first).unwrap();
        registry.unregister("missing").unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_changes() {
        let registry = ObserverRegistry::new();
        let (first, _rx) = observer("a");
        registry.register(first).unwrap();
        let snapshot = registry.snapshot().unwrap();
        registry.unregister("a").unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_notification_json_shape() {
        let notification = Notification::new("test-origin", 6004, 8001)
            .with_details([("dataSourceCode", "CUSTOMERS"), ("recordID", "1001")]);
        let value: serde_json::Value = serde_json::from_str(&notification.to_json()).unwrap();
        assert_eq!(value["origin"], "test-origin");
        assert_eq!(value["subjectId"], "6004");
        assert_eq!(value["messageId"], "SZSDK60048001");
        assert_eq!(value["details"]["recordID"], "1001");
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn test_notify_delivers_to_every_observer() {
        let registry = ObserverRegistry::new();
        let (first, mut rx1) = observer("one");
        let (second, mut rx2) = observer("two");
        registry.register(first).unwrap();
        registry.register(second).unwrap();

        registry.notify(&Notification::new("", 6004, 8001));

        let m1 = rx1.recv().await.unwrap();
        let m2 = rx2.recv().await.unwrap();
        assert_eq!(m1, m2);
        assert!(m1.contains("SZSDK60048001"));
    }

    #[test]
    fn test_notify_without_runtime() {
        let registry = ObserverRegistry::new();
        let (first, mut rx) = observer("threaded");
        registry.register(first).unwrap();
        registry.notify(&Notification::new("", 6001, 8003));

        let message = rx.blocking_recv().unwrap();
        assert!(message.contains("SZSDK60018003"));
    }

    #[test]
    fn test_delivery_thread_is_shared() {
        let registry = ObserverRegistry::new();
        let (first, mut rx) = observer("shared");
        registry.register(first).unwrap();
        for message_number in [8001, 8002, 8003] {
            registry.notify(&Notification::new("", 6004, message_number));
        }

        let received: Vec<String> = (0..3).map(|_| rx.blocking_recv().unwrap()).collect();
        for message_id in ["SZSDK60048001", "SZSDK60048002", "SZSDK60048003"] {
            assert!(received.iter().any(|m| m.contains(message_id)), "{} not delivered", message_id);
        }

        let queue = delivery_queue() as *const _;
        assert!(std::ptr::eq(queue, delivery_queue()));
        assert!(!delivery_queue().is_closed());
    }
}
