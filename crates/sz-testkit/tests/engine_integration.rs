//! Engine client against the in-memory native library
//!
//! Covers record round trips, failure classification, info mode selection
//! and entry point dispatch.

use pretty_assertions::assert_eq;
use serde_json::Value;
use sz_sdk::{InfoMode, PathConstraints, SzError, SzErrorKind, SzFlags};
use sz_testkit::{
    data_sources, entity_id_of, entity_ids, mock::codes, mock_engine, record_keys, response_field, truthset,
    verify_native_error, TestRecord,
};

fn load_customers(engine: &sz_sdk::SzEngine) {
    for record in truthset::customers() {
        engine
            .add_record(
                &record.data_source,
                &record.record_id,
                &record.definition(),
                InfoMode::WithoutInfo,
                SzFlags::NO_FLAGS,
            )
            .expect("customer loads");
    }
}

/// Scenario:
/// 1. Add CUSTOMERS/1001 without info
/// 2. Read it back by record and by entity
/// 3. Delete it and observe NOT_FOUND
#[test]
fn test_record_round_trip() {
    let (_mock, engine) = mock_engine();
    let record = truthset::customer_1001();

    let info = engine
        .add_record("CUSTOMERS", "1001", &record.definition(), InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap();
    assert_eq!(info, "");

    let fetched = engine
        .get_record("CUSTOMERS", "1001", SzFlags::RECORD_DEFAULT_FLAGS)
        .unwrap();
    assert_eq!(
        response_field(&fetched, "/JSON_DATA/PRIMARY_NAME_FIRST").unwrap(),
        Value::from("Robert")
    );

    let entity = engine
        .get_entity_by_record_id("CUSTOMERS", "1001", SzFlags::ENTITY_DEFAULT_FLAGS)
        .unwrap();
    let entity_id = entity_id_of(&entity).unwrap();
    let by_id = engine
        .get_entity_by_entity_id(entity_id, SzFlags::ENTITY_DEFAULT_FLAGS)
        .unwrap();
    assert_eq!(entity_id_of(&by_id).unwrap(), entity_id);

    engine
        .delete_record("CUSTOMERS", "1001", InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap();
    let err = engine
        .get_record("CUSTOMERS", "1001", SzFlags::RECORD_DEFAULT_FLAGS)
        .unwrap_err();
    verify_native_error(&err, SzErrorKind::NotFound, codes::UNKNOWN_RECORD).unwrap();
    assert!(err.is_bad_input());
}

#[test]
fn test_conflicting_data_source_payload() {
    let (_mock, engine) = mock_engine();
    let err = engine
        .add_record(
            "CUSTOMERS",
            "1001",
            r#"{"DATA_SOURCE":"BOB","NAME_FULL":"Robert Smith"}"#,
            InfoMode::WithoutInfo,
            SzFlags::NO_FLAGS,
        )
        .unwrap_err();

    verify_native_error(&err, SzErrorKind::BadInput, codes::CONFLICTING_DATA_SOURCE).unwrap();
    assert_eq!(
        err.to_string(),
        r#"{"function":"szengine.add_record","error":{"id":"SZSDK60044001","reason":"SENZ0023|Conflicting DATA_SOURCE values 'CUSTOMERS' and 'BOB'"}}"#
    );
}

#[test]
fn test_unknown_data_source() {
    let (mock, engine) = mock_engine();
    let err = engine
        .add_record("NOPE", "1", "{}", InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap_err();
    verify_native_error(&err, SzErrorKind::UnknownDataSource, codes::UNKNOWN_DATA_SOURCE).unwrap();
    assert!(err.is_unknown_data_source());
    assert_eq!(err.reason(), Some("SENZ2207|Data source code [NOPE] does not exist."));
    assert!(!mock.has_pending_exception(), "exception state must be cleared");
}

#[test]
fn test_invalid_json_is_bad_input() {
    let (_mock, engine) = mock_engine();
    let err = engine
        .add_record("CUSTOMERS", "1001", "{not json", InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap_err();
    verify_native_error(&err, SzErrorKind::BadInput, codes::INVALID_JSON).unwrap();
}

#[test]
fn test_interior_nul_never_reaches_native() {
    let (mock, engine) = mock_engine();
    mock.clear_calls();
    let err = engine
        .add_record("CUSTOMERS", "10\u{0}01", "{}", InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap_err();
    assert!(matches!(err, SzError::InvalidArgument { ref name, .. } if name == "record_id"));
    assert!(mock.calls().is_empty());
}

#[test]
fn test_info_mode_selects_entry_point() {
    let (mock, engine) = mock_engine();
    let record = truthset::customer_1002();

    let info = engine
        .add_record(
            &record.data_source,
            &record.record_id,
            &record.definition(),
            InfoMode::WithInfo,
            SzFlags::NO_FLAGS,
        )
        .unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_addRecordWithInfo");
    let document: Value = serde_json::from_str(&info).unwrap();
    assert_eq!(document["DATA_SOURCE"], "CUSTOMERS");
    assert_eq!(document["RECORD_ID"], "1002");
    assert_eq!(document["AFFECTED_ENTITIES"].as_array().unwrap().len(), 1);

    let plain = engine
        .delete_record(&record.data_source, &record.record_id, InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap();
    assert_eq!(plain, "");
    assert_eq!(mock.last_call().unwrap().name, "Sz_deleteRecord");
}

#[test]
fn test_with_info_bit_is_stripped() {
    let (mock, engine) = mock_engine();
    engine
        .add_record(
            "CUSTOMERS",
            "1001",
            &truthset::customer_1001().definition(),
            InfoMode::WithInfo,
            SzFlags::WITH_INFO | SzFlags::ENTITY_INCLUDE_RECORD_DATA,
        )
        .unwrap();
    let call = mock.last_call().unwrap();
    assert_eq!(call.flags, Some(SzFlags::ENTITY_INCLUDE_RECORD_DATA.bits()));

    // The mode decides, not the legacy bit.
    let plain = engine
        .reevaluate_record("CUSTOMERS", "1001", InfoMode::WithoutInfo, SzFlags::WITH_INFO)
        .unwrap();
    assert_eq!(plain, "");
    let call = mock.last_call().unwrap();
    assert_eq!(call.name, "Sz_reevaluateRecord");
    assert_eq!(call.flags, Some(0));
}

#[test]
fn test_reevaluate_entity() {
    let (_mock, engine) = mock_engine();
    load_customers(&engine);
    let entity_id = entity_id_of(
        &engine
            .get_entity_by_record_id("CUSTOMERS", "1003", SzFlags::ENTITY_DEFAULT_FLAGS)
            .unwrap(),
    )
    .unwrap();
    let info = engine
        .reevaluate_entity(entity_id, InfoMode::WithInfo, SzFlags::NO_FLAGS)
        .unwrap();
    assert_eq!(
        response_field(&info, "/AFFECTED_ENTITIES/0/ENTITY_ID").unwrap(),
        Value::from(entity_id)
    );

    let err = engine
        .reevaluate_entity(999, InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap_err();
    verify_native_error(&err, SzErrorKind::NotFound, codes::UNKNOWN_ENTITY).unwrap();
}

#[test]
fn test_find_path_negative_degrees() {
    let (_mock, engine) = mock_engine();
    load_customers(&engine);
    let err = engine
        .find_path_by_entity_id(1, 2, -1, PathConstraints::default(), SzFlags::FIND_PATH_DEFAULT_FLAGS)
        .unwrap_err();
    verify_native_error(&err, SzErrorKind::BadInput, codes::INVALID_MAX_DEGREES).unwrap();
    assert!(err.reason().unwrap().starts_with("SENZ0087|"));
}

#[test]
fn test_find_path_dispatch() {
    let (mock, engine) = mock_engine();
    load_customers(&engine);
    let flags = SzFlags::FIND_PATH_DEFAULT_FLAGS;

    engine
        .find_path_by_entity_id(1, 2, 3, PathConstraints::default(), flags)
        .unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_findPathByEntityID");

    let avoid = entity_ids(&[3]);
    let path = engine
        .find_path_by_entity_id(1, 2, 3, PathConstraints::avoiding(&avoid), flags)
        .unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_findPathByEntityIDWithAvoids");
    assert_eq!(response_field(&path, "/AVOIDED_ENTITIES/0").unwrap(), Value::from(3));

    let required = data_sources(&["CUSTOMERS"]);
    engine
        .find_path_by_entity_id(1, 2, 3, PathConstraints::requiring("", &required), flags)
        .unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_findPathByEntityIDIncludingSource");

    let avoid_records = record_keys(&[truthset::customer_1003()]);
    engine
        .find_path_by_record_id(
            "CUSTOMERS",
            "1001",
            "CUSTOMERS",
            "1002",
            3,
            PathConstraints::avoiding(&avoid_records),
            flags,
        )
        .unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_findPathByRecordIDWithAvoids");

    engine
        .find_path_by_record_id(
            "CUSTOMERS",
            "1001",
            "CUSTOMERS",
            "1002",
            3,
            PathConstraints::requiring(&avoid_records, &required),
            flags,
        )
        .unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_findPathByRecordIDIncludingSource");
}

#[test]
fn test_find_network() {
    let (_mock, engine) = mock_engine();
    load_customers(&engine);

    let network = engine
        .find_network_by_entity_id(&entity_ids(&[1, 2]), 2, 1, 10, SzFlags::FIND_NETWORK_DEFAULT_FLAGS)
        .unwrap();
    assert_eq!(
        response_field(&network, "/ENTITIES").unwrap().as_array().unwrap().len(),
        2
    );

    let network = engine
        .find_network_by_record_id(
            &record_keys(&truthset::customers()),
            2,
            1,
            10,
            SzFlags::FIND_NETWORK_DEFAULT_FLAGS,
        )
        .unwrap();
    assert_eq!(
        response_field(&network, "/ENTITIES").unwrap().as_array().unwrap().len(),
        3
    );

    let err = engine
        .find_network_by_entity_id(&entity_ids(&[1]), -1, 1, 10, SzFlags::FIND_NETWORK_DEFAULT_FLAGS)
        .unwrap_err();
    verify_native_error(&err, SzErrorKind::BadInput, codes::INVALID_MAX_DEGREES).unwrap();
}

#[test]
fn test_search_profile_dispatch() {
    let (mock, engine) = mock_engine();
    load_customers(&engine);
    let attributes = r#"{"PRIMARY_NAME_LAST":"smith","PHONE_NUMBER":"702-919-1300"}"#;

    let result = engine
        .search_by_attributes(attributes, "", SzFlags::SEARCH_BY_ATTRIBUTES_DEFAULT_FLAGS)
        .unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_searchByAttributes");
    let found = response_field(&result, "/RESOLVED_ENTITIES").unwrap();
    assert_eq!(found.as_array().unwrap().len(), 3);

    engine
        .search_by_attributes(attributes, "SEARCH", SzFlags::SEARCH_BY_ATTRIBUTES_DEFAULT_FLAGS)
        .unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_searchByAttributesWithProfile");
}

#[test]
fn test_why_and_how() {
    let (_mock, engine) = mock_engine();
    load_customers(&engine);

    let why = engine
        .why_records("CUSTOMERS", "1001", "CUSTOMERS", "1002", SzFlags::WHY_RECORDS_DEFAULT_FLAGS)
        .unwrap();
    assert_eq!(response_field(&why, "/WHY_RESULTS/0/ENTITY_ID").unwrap(), Value::from(1));
    assert_eq!(response_field(&why, "/WHY_RESULTS/0/ENTITY_ID_2").unwrap(), Value::from(2));

    engine
        .why_entities(1, 3, SzFlags::WHY_ENTITIES_DEFAULT_FLAGS)
        .unwrap();
    engine
        .why_record_in_entity("CUSTOMERS", "1003", SzFlags::WHY_RECORD_IN_ENTITY_DEFAULT_FLAGS)
        .unwrap();
    let why_search = engine
        .why_search(r#"{"PRIMARY_NAME_LAST":"Smith"}"#, 1, "", SzFlags::WHY_SEARCH_DEFAULT_FLAGS)
        .unwrap();
    assert_eq!(
        response_field(&why_search, "/SEARCH_REQUEST/JSON_DATA/PRIMARY_NAME_LAST").unwrap(),
        Value::from("Smith")
    );

    let how = engine.how_entity_by_entity_id(2, SzFlags::HOW_ENTITY_DEFAULT_FLAGS).unwrap();
    assert!(response_field(&how, "/HOW_RESULTS/FINAL_STATE").is_ok());

    let err = engine
        .why_entities(1, 404, SzFlags::WHY_ENTITIES_DEFAULT_FLAGS)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_virtual_entity_and_preview() {
    let (_mock, engine) = mock_engine();
    load_customers(&engine);

    let virtual_entity = engine
        .get_virtual_entity_by_record_id(
            &record_keys(&[truthset::customer_1001(), truthset::customer_1002()]),
            SzFlags::VIRTUAL_ENTITY_DEFAULT_FLAGS,
        )
        .unwrap();
    assert_eq!(
        response_field(&virtual_entity, "/RESOLVED_ENTITY/RECORDS")
            .unwrap()
            .as_array()
            .unwrap()
            .len(),
        2
    );

    let preview = engine
        .get_record_preview(
            &TestRecord::new("CUSTOMERS", "9").with_attribute("NAME_FULL", "Jane Doe").definition(),
            SzFlags::RECORD_PREVIEW_DEFAULT_FLAGS,
        )
        .unwrap();
    assert!(response_field(&preview, "/FEATURES/NAME_FULL").is_ok());

    engine
        .find_interesting_entities_by_entity_id(1, SzFlags::FIND_INTERESTING_ENTITIES_DEFAULT_FLAGS)
        .unwrap();
    engine
        .find_interesting_entities_by_record_id("CUSTOMERS", "1002", SzFlags::FIND_INTERESTING_ENTITIES_DEFAULT_FLAGS)
        .unwrap();
}

#[test]
fn test_redo_queue() {
    let (mock, engine) = mock_engine();
    load_customers(&engine);
    assert_eq!(engine.count_redo_records().unwrap(), 0);
    assert_eq!(engine.get_redo_record().unwrap(), "");

    let redo = r#"{"REASON":"deferred","DATA_SOURCE":"CUSTOMERS","RECORD_ID":"1001"}"#;
    mock.queue_redo_record(redo);
    mock.queue_redo_record(redo);
    assert_eq!(engine.count_redo_records().unwrap(), 2);

    let first = engine.get_redo_record().unwrap();
    assert_eq!(first, redo);
    assert_eq!(engine.process_redo_record(&first, InfoMode::WithoutInfo).unwrap(), "");

    let second = engine.get_redo_record().unwrap();
    let info = engine.process_redo_record(&second, InfoMode::WithInfo).unwrap();
    assert_eq!(response_field(&info, "/RECORD_ID").unwrap(), Value::from("1001"));
    assert_eq!(engine.count_redo_records().unwrap(), 0);
}

#[test]
fn test_stats_and_config_id() {
    let (mock, engine) = mock_engine();
    load_customers(&engine);
    engine.prime_engine().unwrap();
    assert_eq!(engine.get_active_config_id().unwrap(), mock.default_config_id());
    let stats = engine.get_stats().unwrap();
    assert_eq!(response_field(&stats, "/workload/addedRecords").unwrap(), Value::from(3));
}

#[test]
fn test_destroyed_engine_rejects_calls() {
    let (mock, engine) = mock_engine();
    engine.destroy().unwrap();
    assert!(!engine.is_initialized());
    mock.clear_calls();

    let err = engine.get_stats().unwrap_err();
    assert!(matches!(err, SzError::Destroyed { component: "SzEngine" }));
    assert!(matches!(engine.destroy(), Err(SzError::Destroyed { .. })));
    assert!(mock.calls().is_empty(), "destroyed clients never reach native code");

    // A fresh initialize revives the client.
    engine
        .initialize("revived", &sz_testkit::test_settings(), 0, 0)
        .unwrap();
    engine.get_stats().unwrap();
}

#[test]
fn test_reinitialize_switches_config() {
    let (_mock, engine) = mock_engine();
    let err = engine.reinitialize(77).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.kind(), Some(SzErrorKind::Configuration));
}

#[test]
fn test_trace_level_does_not_change_results() {
    let (_mock, engine) = mock_engine();
    engine.set_log_level("TRACE").unwrap();
    load_customers(&engine);
    let entity = engine
        .get_entity_by_record_id("CUSTOMERS", "1001", SzFlags::ENTITY_DEFAULT_FLAGS)
        .unwrap();
    assert!(entity_id_of(&entity).is_ok());
    assert!(engine.set_log_level("CHATTY").is_err());
}

/// Scenario:
/// 1. Several threads interleave failing and succeeding engine calls
/// 2. Each failure must carry the code and reason of its own call
/// 3. No exception is left pending on the native side
#[test]
fn test_concurrent_failures_keep_their_own_exception() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 40;

    let (mock, engine) = mock_engine();
    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let engine = engine.clone();
            scope.spawn(move || {
                for round in 0..ROUNDS {
                    let record_id = format!("T{}-R{}", t, round);
                    let record = TestRecord::new("TEST", &record_id).with_attribute("NAME_FULL", "Concurrent Person");
                    engine
                        .add_record("TEST", &record_id, &record.definition(), InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
                        .unwrap();

                    let missing = format!("MISSING-{}-{}", t, round);
                    let err = engine.get_record("TEST", &missing, SzFlags::NO_FLAGS).unwrap_err();
                    verify_native_error(&err, SzErrorKind::NotFound, codes::UNKNOWN_RECORD).unwrap();
                    assert!(err.reason().unwrap().contains(&missing), "{}", err);

                    let unknown = format!("NOPE_{}_{}", t, round);
                    let err = engine
                        .add_record(&unknown, &record_id, "{}", InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
                        .unwrap_err();
                    verify_native_error(&err, SzErrorKind::UnknownDataSource, codes::UNKNOWN_DATA_SOURCE).unwrap();
                    assert!(err.reason().unwrap().contains(&unknown), "{}", err);

                    let stored = engine.get_record("TEST", &record_id, SzFlags::NO_FLAGS).unwrap();
                    assert!(stored.contains(&record_id));
                }
            });
        }
    });

    assert_eq!(mock.record_count(), THREADS * ROUNDS);
    assert!(!mock.has_pending_exception());
}
