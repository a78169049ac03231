//! Factory lifecycle plus the diagnostic and product clients

use pretty_assertions::assert_eq;
use serde_json::Value;
use sz_sdk::{InfoMode, NativeLibrary, SdkConfig, SzAbstractFactory, SzError, SzErrorKind, SzFlags};
use sz_testkit::{mock::codes, mock_factory, response_field, truthset, verify_native_error, MockSenzing};

#[test]
fn test_clients_are_cached() {
    let (mock, factory) = mock_factory();
    let first = factory.create_engine().unwrap();
    let second = factory.create_engine().unwrap();
    assert!(first.is_initialized() && second.is_initialized());

    let inits = mock
        .call_names()
        .into_iter()
        .filter(|name| *name == "Sz_init")
        .count();
    assert_eq!(inits, 1);

    // Clones share state: destroying one is visible through the other.
    first.destroy().unwrap();
    assert!(!second.is_initialized());
}

#[test]
fn test_config_manager_initializes_paired_config() {
    let (mock, factory) = mock_factory();
    factory.create_config_manager().unwrap();
    let names = mock.call_names();
    assert_eq!(names, vec!["SzConfig_init", "SzConfigMgr_init"]);
    // The paired config is the cached one.
    factory.create_config().unwrap();
    assert_eq!(mock.call_names().len(), 2);
}

#[test]
fn test_pinned_config_id_uses_init_with_config_id() {
    let mock = MockSenzing::new();
    let factory = SzAbstractFactory::new(mock.library(), "pinned", &sz_testkit::test_settings(), 1, 0);
    let engine = factory.create_engine().unwrap();
    assert_eq!(mock.last_call().unwrap().name, "Sz_initWithConfigID");
    assert_eq!(engine.get_active_config_id().unwrap(), 1);
    assert_eq!(factory.config_id(), 1);
}

#[test]
fn test_unknown_pinned_config_fails_creation() {
    let mock = MockSenzing::new();
    let factory = SzAbstractFactory::new(mock.library(), "pinned", &sz_testkit::test_settings(), 55, 0);
    let err = factory.create_engine().unwrap_err();
    verify_native_error(&err, SzErrorKind::Configuration, codes::UNKNOWN_CONFIG_ID).unwrap();
    assert_eq!(
        err.to_string(),
        r#"{"function":"szengine.initialize","error":{"id":"SZSDK60044042","reason":"SENZ7221|No configuration registered with ID [55]"}}"#
    );
}

#[test]
fn test_destroy_releases_everything() {
    let (mock, factory) = mock_factory();
    let engine = factory.create_engine().unwrap();
    let diagnostic = factory.create_diagnostic().unwrap();
    let product = factory.create_product().unwrap();
    factory.create_config_manager().unwrap();

    factory.destroy().unwrap();
    for name in ["Sz_destroy", "SzDiagnostic_destroy", "SzProduct_destroy", "SzConfigMgr_destroy", "SzConfig_destroy"] {
        assert!(mock.call_names().contains(&name), "{} not called", name);
    }
    assert!(matches!(engine.get_stats(), Err(SzError::Destroyed { .. })));
    assert!(matches!(diagnostic.get_datastore_info(), Err(SzError::Destroyed { .. })));
    assert!(matches!(product.get_version(), Err(SzError::Destroyed { .. })));

    assert!(matches!(factory.destroy(), Err(SzError::Destroyed { component: "SzAbstractFactory" })));
    assert!(matches!(factory.create_engine(), Err(SzError::Destroyed { .. })));
}

#[test]
fn test_destroy_reports_first_failure() {
    let (_mock, factory) = mock_factory();
    let engine = factory.create_engine().unwrap();
    factory.create_product().unwrap();
    // Destroyed behind the factory's back.
    engine.destroy().unwrap();

    let err = factory.destroy().unwrap_err();
    assert!(matches!(err, SzError::Destroyed { component: "SzEngine" }));
}

#[test]
fn test_from_config_applies_log_level_and_codes() {
    let mock = MockSenzing::new();
    let mut config = SdkConfig::default();
    config.log_level = "TRACE".to_string();
    config.database_url = Some("sqlite3://na:na@/tmp/sqlite/G2C.db".to_string());

    let factory = SzAbstractFactory::from_config(mock.library(), &config).unwrap();
    let engine = factory.create_engine().unwrap();
    engine
        .add_record("CUSTOMERS", "1001", &truthset::customer_1001().definition(), InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap();

    config.log_level = "LOUD".to_string();
    assert!(SzAbstractFactory::from_config(mock.library(), &config).is_err());
}

#[test]
fn test_diagnostic_operations() {
    let (mock, factory) = mock_factory();
    let engine = factory.create_engine().unwrap();
    let diagnostic = factory.create_diagnostic().unwrap();
    for record in truthset::customers() {
        engine
            .add_record(&record.data_source, &record.record_id, &record.definition(), InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
            .unwrap();
    }

    let info = diagnostic.get_datastore_info().unwrap();
    assert_eq!(response_field(&info, "/dataStores/0/id").unwrap(), Value::from("CORE"));
    let performance = diagnostic.check_datastore_performance(2).unwrap();
    assert_eq!(
        response_field(&performance, "/numRecordsInserted").unwrap(),
        Value::from(2000)
    );
    assert!(diagnostic.check_datastore_performance(-1).unwrap_err().is_bad_input());

    let feature = diagnostic.get_feature(1).unwrap();
    assert_eq!(response_field(&feature, "/LIB_FEAT_ID").unwrap(), Value::from(1));
    assert!(diagnostic.get_feature(0).unwrap_err().is_not_found());

    diagnostic.purge_repository().unwrap();
    assert_eq!(mock.record_count(), 0);
    assert!(engine
        .get_record("CUSTOMERS", "1001", SzFlags::RECORD_DEFAULT_FLAGS)
        .unwrap_err()
        .is_not_found());

    diagnostic.reinitialize(1).unwrap();
    assert!(diagnostic.reinitialize(404).is_err());
}

#[test]
fn test_product_documents() {
    let (_mock, factory) = mock_factory();
    let product = factory.create_product().unwrap();

    let version = product.version_info().unwrap();
    assert_eq!(version.product_name, "Senzing SDK");
    assert_eq!(version.version, "4.0.0");

    let license = product.get_license().unwrap();
    assert_eq!(response_field(&license, "/licenseType").unwrap(), Value::from("EVAL (Solely for non-productive use)"));
}

#[test]
fn test_uninitialized_client_classified() {
    let mock = MockSenzing::new();
    let engine = sz_sdk::SzEngine::new(mock.library().engine());
    let err = engine.prime_engine().unwrap_err();
    verify_native_error(&err, SzErrorKind::NotInitialized, codes::NOT_INITIALIZED).unwrap();
    assert!(err.is_unrecoverable());
}

#[test]
fn test_custom_exception_table() {
    let mock = MockSenzing::new();
    let table = sz_sdk::ExceptionCodeTable::from_json(r#"{"RETRYABLE": [2207]}"#).unwrap();
    let factory = SzAbstractFactory::new(mock.library(), "custom", &sz_testkit::test_settings(), 0, 0)
        .with_exception_codes(table);
    let engine = factory.create_engine().unwrap();
    let err = engine
        .add_record("NOPE", "1", "{}", InfoMode::WithoutInfo, SzFlags::NO_FLAGS)
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(!err.is_unknown_data_source());
}
