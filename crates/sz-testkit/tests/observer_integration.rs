//! Observer notifications emitted by the clients

use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use sz_sdk::{InfoMode, Observer, SzFlags};
use sz_testkit::{mock_engine, mock_factory, truthset, RecordingObserver};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_register_then_call_notifications() {
    let (_mock, engine) = mock_engine();
    let observer = Arc::new(RecordingObserver::new("recorder-1"));
    engine.set_observer_origin("integration-test");
    engine.register_observer(observer.clone()).unwrap();

    let registered = observer.wait_for_message_id("SZSDK60048702", WAIT).await.unwrap();
    assert_eq!(registered["details"]["observerID"], "recorder-1");
    assert_eq!(registered["origin"], "integration-test");
    assert_eq!(registered["subjectId"], "6004");

    let record = truthset::customer_1001();
    engine
        .add_record(&record.data_source, &record.record_id, &record.definition(), InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap();
    let added = observer.wait_for_message_id("SZSDK60048001", WAIT).await.unwrap();
    assert_eq!(added["details"]["dataSourceCode"], "CUSTOMERS");
    assert_eq!(added["details"]["recordID"], "1001");
    assert_eq!(added["details"]["infoMode"], "without_info");
    assert!(added.get("error").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_call_carries_error() {
    let (_mock, engine) = mock_engine();
    let observer = Arc::new(RecordingObserver::new("recorder-2"));
    engine.register_observer(observer.clone()).unwrap();

    let _ = engine.get_record("CUSTOMERS", "missing", SzFlags::RECORD_DEFAULT_FLAGS);
    let failed = observer.wait_for_message_id("SZSDK60048020", WAIT).await.unwrap();
    assert_eq!(failed["details"]["recordID"], "missing");
    let error = failed["error"].as_str().unwrap();
    assert!(error.contains("SENZ0033"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplicate_registration_rejected() {
    let (_mock, engine) = mock_engine();
    let observer = Arc::new(RecordingObserver::new("same-id"));
    engine.register_observer(observer.clone()).unwrap();
    let err = engine.register_observer(observer.clone()).unwrap_err();
    assert!(matches!(err, sz_sdk::SzError::Observer { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unregister_notifies_departing_observer() {
    let (_mock, engine) = mock_engine();
    let observer = Arc::new(RecordingObserver::new("leaving"));
    engine.register_observer(observer.clone()).unwrap();
    engine.unregister_observer("leaving").unwrap();

    let removed = observer.wait_for_message_id("SZSDK60048704", WAIT).await.unwrap();
    assert_eq!(removed["details"]["observerID"], "leaving");

    let before = observer.len();
    engine.prime_engine().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(observer.len(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_log_level_notification() {
    let (_mock, factory) = mock_factory();
    let product = factory.create_product().unwrap();
    let observer = Arc::new(RecordingObserver::new("levels"));
    product.register_observer(observer.clone()).unwrap();
    product.set_log_level("DEBUG").unwrap();

    let changed = observer.wait_for_message_id("SZSDK60068703", WAIT).await.unwrap();
    assert_eq!(changed["details"]["logLevel"], "DEBUG");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_export_stream_notifies_on_finish() {
    let (_mock, engine) = mock_engine();
    for record in truthset::customers() {
        engine
            .add_record(&record.data_source, &record.record_id, &record.definition(), InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
            .unwrap();
    }
    let observer = Arc::new(RecordingObserver::new("exports"));
    engine.register_observer(observer.clone()).unwrap();

    let mut stream = engine
        .export_csv_entity_report_stream("", SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    while let Some(item) = stream.next().await {
        item.unwrap();
    }
    stream.join().await;

    let finished = observer.wait_for_message_id("SZSDK60048007", WAIT).await;
    assert!(finished.is_some());
}

#[test]
fn test_notifications_outside_runtime() {
    let (_mock, engine) = mock_engine();
    let observer = Arc::new(RecordingObserver::new("threaded"));
    engine.register_observer(observer.clone()).unwrap();
    engine.prime_engine().unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let arrived = runtime.block_on(observer.wait_for_count(2, WAIT));
    assert!(arrived);
    let ids: Vec<String> = observer.message_ids();
    assert!(ids.contains(&"SZSDK60048026".to_string()));
    assert_eq!(observer.id(), "threaded");
    let parsed: Vec<Value> = observer.notifications();
    assert!(parsed.iter().all(|n| n["messageTime"].is_string()));
}
