//! Export cursor lifecycle: raw handles, scoped reports and streams

use pretty_assertions::assert_eq;
use sz_sdk::{InfoMode, SzEngine, SzError, SzErrorKind, SzFlags, EXPORT_CHANNEL_CAPACITY};
use sz_testkit::{mock::codes, mock_engine, truthset, verify_native_error, TestRecord};
use tokio_stream::StreamExt;

const CSV_HEADER: &str = "RESOLVED_ENTITY_ID,RELATED_ENTITY_ID,MATCH_LEVEL_CODE,MATCH_KEY,DATA_SOURCE,RECORD_ID\n";

fn load(engine: &SzEngine, records: &[TestRecord]) {
    for record in records {
        engine
            .add_record(
                &record.data_source,
                &record.record_id,
                &record.definition(),
                InfoMode::WithoutInfo,
                SzFlags::NO_FLAGS,
            )
            .expect("record loads");
    }
}

fn many_records(count: usize) -> Vec<TestRecord> {
    (0..count)
        .map(|i| TestRecord::new("TEST", format!("R{:04}", i)).with_attribute("NAME_FULL", format!("Person {}", i)))
        .collect()
}

/// Scenario:
/// 1. Load three customers
/// 2. Open a CSV export with the default columns
/// 3. Fetch until the empty fragment, then close
#[test]
fn test_csv_export_lifecycle() {
    let (mock, engine) = mock_engine();
    load(&engine, &truthset::customers());

    let handle = engine
        .export_csv_entity_report("", SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    assert_eq!(mock.open_exports(), 1);

    let mut fragments = Vec::new();
    loop {
        let fragment = engine.fetch_next(handle).unwrap();
        if fragment.is_empty() {
            break;
        }
        fragments.push(fragment);
    }
    engine.close_export_report(handle).unwrap();
    assert_eq!(mock.open_exports(), 0);

    assert_eq!(fragments.len(), 4);
    assert_eq!(fragments[0], CSV_HEADER);
    assert_eq!(fragments[1], "1,0,\"\",\"\",\"CUSTOMERS\",\"1001\"\n");
    assert!(fragments[3].ends_with("\"CUSTOMERS\",\"1003\"\n"));
}

#[test]
fn test_fetch_after_close_fails() {
    let (_mock, engine) = mock_engine();
    load(&engine, &truthset::customers());
    let handle = engine.export_json_entity_report(SzFlags::EXPORT_DEFAULT_FLAGS).unwrap();
    engine.close_export_report(handle).unwrap();

    let err = engine.fetch_next(handle).unwrap_err();
    verify_native_error(&err, SzErrorKind::BadInput, codes::INVALID_EXPORT_HANDLE).unwrap();
    assert!(err.to_string().contains("szengine.fetch_next"));
}

#[test]
fn test_double_close_matches_invalid_handle() {
    let (_mock, engine) = mock_engine();
    let handle = engine.export_json_entity_report(SzFlags::EXPORT_DEFAULT_FLAGS).unwrap();
    engine.close_export_report(handle).unwrap();

    let double = engine.close_export_report(handle).unwrap_err();
    let bogus = engine
        .close_export_report(sz_sdk::ExportHandle::from_raw(4242))
        .unwrap_err();
    assert_eq!(double.kind(), bogus.kind());
    assert_eq!(double.code(), bogus.code());
}

#[test]
fn test_unknown_csv_column() {
    let (mock, engine) = mock_engine();
    let err = engine
        .export_csv_entity_report("RESOLVED_ENTITY_ID,SHOE_SIZE", SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap_err();
    verify_native_error(&err, SzErrorKind::BadInput, codes::INVALID_ARGUMENT).unwrap();
    assert_eq!(mock.open_exports(), 0);
}

#[test]
fn test_custom_csv_columns() {
    let (_mock, engine) = mock_engine();
    load(&engine, &[truthset::customer_1001()]);
    let mut report = engine
        .export_csv_report("resolved_entity_id, record_id", SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    let text = report.read_to_string().unwrap();
    assert_eq!(text, "RESOLVED_ENTITY_ID,RECORD_ID\n1,\"1001\"\n");
}

#[test]
fn test_export_report_closes_on_drop() {
    let (mock, engine) = mock_engine();
    load(&engine, &truthset::customers());
    {
        let mut report = engine.export_json_report(SzFlags::EXPORT_DEFAULT_FLAGS).unwrap();
        // Stop after the first entity.
        let first = report.next().unwrap().unwrap();
        assert!(first.contains("RESOLVED_ENTITY"));
        assert_eq!(mock.open_exports(), 1);
    }
    assert_eq!(mock.open_exports(), 0);
}

#[test]
fn test_export_report_iterates_json_lines() {
    let (mock, engine) = mock_engine();
    load(&engine, &truthset::customers());
    let report = engine.export_json_report(SzFlags::EXPORT_DEFAULT_FLAGS).unwrap();
    let lines: Vec<String> = report.collect::<Result<_, _>>().unwrap();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        let entity: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert!(entity["RESOLVED_ENTITY"]["ENTITY_ID"].is_i64());
    }
    assert_eq!(mock.open_exports(), 0);
}

#[test]
fn test_export_report_explicit_close() {
    let (mock, engine) = mock_engine();
    let report = engine.export_json_report(SzFlags::EXPORT_DEFAULT_FLAGS).unwrap();
    report.close().unwrap();
    assert_eq!(mock.open_exports(), 0);
}

/// Scenario:
/// 1. Load five records and let two fetches succeed
/// 2. Iterate: two entities, the lost-connection error once, then `None`
/// 3. Dropping the report still closes the handle
#[test]
fn test_export_report_yields_fetch_error_once() {
    let (mock, engine) = mock_engine();
    load(&engine, &many_records(5));
    mock.fail_fetch_after(2);

    let mut report = engine.export_json_report(SzFlags::EXPORT_DEFAULT_FLAGS).unwrap();
    assert!(report.next().unwrap().is_ok());
    assert!(report.next().unwrap().is_ok());
    let err = report.next().unwrap().unwrap_err();
    verify_native_error(&err, SzErrorKind::DatabaseConnectionLost, codes::DATABASE_CONNECTION_LOST).unwrap();
    assert!(err.is_retryable());
    assert!(report.next().is_none());
    assert!(report.next().is_none());
    assert_eq!(mock.open_exports(), 1);

    drop(report);
    assert_eq!(mock.open_exports(), 0);
    assert!(!mock.has_pending_exception());
}

#[test]
fn test_stream_requires_runtime() {
    let (_mock, engine) = mock_engine();
    let err = engine
        .export_json_entity_report_stream(SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap_err();
    assert!(matches!(err, SzError::Config { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_delivers_report_in_order() {
    let (mock, engine) = mock_engine();
    let records = many_records(EXPORT_CHANNEL_CAPACITY * 3);
    load(&engine, &records);

    let mut stream = engine
        .export_csv_entity_report_stream("RECORD_ID", SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    let mut fragments = Vec::new();
    while let Some(item) = stream.next().await {
        fragments.push(item.unwrap());
    }
    stream.join().await;

    assert_eq!(fragments.len(), records.len() + 1);
    assert_eq!(fragments[0], "RECORD_ID\n");
    assert_eq!(fragments[1], "\"R0000\"\n");
    assert_eq!(mock.open_exports(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_into_stream() {
    let (mock, engine) = mock_engine();
    load(&engine, &truthset::customers());
    let stream = engine
        .export_json_entity_report_stream(SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap()
        .into_stream();
    let items: Vec<_> = stream.collect().await;
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(Result::is_ok));

    // The detached producer closes the handle once the channel drains.
    for _ in 0..100 {
        if mock.open_exports() == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(mock.open_exports(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_cancel_closes_handle() {
    let (mock, engine) = mock_engine();
    let records = many_records(EXPORT_CHANNEL_CAPACITY * 4);
    load(&engine, &records);

    let mut stream = engine
        .export_json_entity_report_stream(SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    let token = stream.cancellation_token();
    stream.cancel();
    assert!(token.is_cancelled());

    let mut delivered = 0;
    let mut last_error = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(_) => delivered += 1,
            Err(e) => last_error = Some(e),
        }
    }
    stream.join().await;

    assert!(delivered < records.len());
    if let Some(e) = last_error {
        assert!(matches!(e, SzError::Cancelled));
    }
    assert_eq!(mock.open_exports(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_dropped_consumer_closes_handle() {
    let (mock, engine) = mock_engine();
    load(&engine, &many_records(EXPORT_CHANNEL_CAPACITY * 4));

    let mut stream = engine
        .export_json_entity_report_stream(SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    stream.join().await;
    assert_eq!(mock.open_exports(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_open_failure_is_last_item() {
    let (_mock, engine) = mock_engine();
    let mut stream = engine
        .export_csv_entity_report_stream("NOT_A_COLUMN", SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    let err = stream.next().await.unwrap().unwrap_err();
    verify_native_error(&err, SzErrorKind::BadInput, codes::INVALID_ARGUMENT).unwrap();
    assert!(stream.next().await.is_none());
    stream.join().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_close_failure_panics_producer() {
    let (mock, engine) = mock_engine();
    load(&engine, &truthset::customers());
    mock.fail_close_export(true);

    let mut stream = engine
        .export_json_entity_report_stream(SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    while stream.next().await.is_some() {}

    let joined = tokio::spawn(stream.join()).await;
    let err = joined.unwrap_err();
    assert!(err.is_panic());
}

/// Scenario:
/// 1. Fetching fails after the channel has filled and two more fragments
/// 2. The consumer starts late and reads slowly
/// 3. Every fragment arrives, the error is the last item, the handle closes
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_fetch_error_reaches_slow_consumer() {
    let (mock, engine) = mock_engine();
    load(&engine, &many_records(EXPORT_CHANNEL_CAPACITY * 3));
    let delivered_before_failure = EXPORT_CHANNEL_CAPACITY + 2;
    mock.fail_fetch_after(delivered_before_failure);

    let mut stream = engine
        .export_json_entity_report_stream(SzFlags::EXPORT_DEFAULT_FLAGS)
        .unwrap();
    // Let the producer fill the channel before reading anything.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    stream.join().await;

    assert_eq!(items.len(), delivered_before_failure + 1);
    let (last, fragments) = items.split_last().unwrap();
    assert!(fragments.iter().all(Result::is_ok));
    let err = last.as_ref().unwrap_err();
    verify_native_error(err, SzErrorKind::DatabaseConnectionLost, codes::DATABASE_CONNECTION_LOST).unwrap();
    assert_eq!(mock.open_exports(), 0);
    assert!(!mock.has_pending_exception());
}
