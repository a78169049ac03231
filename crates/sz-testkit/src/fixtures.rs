//! Test fixtures for common binding scenarios
//!
//! Provides reusable records, settings and configuration documents

use serde_json::{json, Map, Value};

/// Instance name used by every fixture client
pub const TEST_INSTANCE_NAME: &str = "sz-testkit";

/// Engine settings pointing at an in-memory SQLite repository
pub fn test_settings() -> String {
    json!({
        "PIPELINE": {
            "CONFIGPATH": "/etc/opt/senzing",
            "RESOURCEPATH": "/opt/senzing/er/resources",
            "SUPPORTPATH": "/opt/senzing/data",
        },
        "SQL": { "CONNECTION": "sqlite3://na:na@/tmp/sqlite/G2C.db" },
    })
    .to_string()
}

/// A record to load, keyed by data source and record id
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub data_source: String,
    pub record_id: String,
    /// Attributes other than DATA_SOURCE and RECORD_ID
    pub attributes: Map<String, Value>,
}

impl TestRecord {
    pub fn new(data_source: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            record_id: record_id.into(),
            attributes: Map::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), Value::String(value.into()));
        self
    }

    /// Record definition with the embedded DATA_SOURCE and RECORD_ID
    pub fn definition(&self) -> String {
        let mut document = self.attributes.clone();
        document.insert("DATA_SOURCE".to_string(), Value::String(self.data_source.clone()));
        document.insert("RECORD_ID".to_string(), Value::String(self.record_id.clone()));
        Value::Object(document).to_string()
    }

    /// `{"DATA_SOURCE":...,"RECORD_ID":...}` key for record lists
    pub fn key(&self) -> Value {
        json!({ "DATA_SOURCE": self.data_source, "RECORD_ID": self.record_id })
    }
}

/// `{"RECORDS":[...]}` document for the given records
pub fn record_keys(records: &[TestRecord]) -> String {
    json!({ "RECORDS": records.iter().map(TestRecord::key).collect::<Vec<_>>() }).to_string()
}

/// `{"ENTITIES":[...]}` document for the given entity ids
pub fn entity_ids(ids: &[i64]) -> String {
    json!({ "ENTITIES": ids.iter().map(|id| json!({ "ENTITY_ID": id })).collect::<Vec<_>>() }).to_string()
}

/// `{"DATA_SOURCES":[...]}` document for the given codes
pub fn data_sources(codes: &[&str]) -> String {
    json!({ "DATA_SOURCES": codes }).to_string()
}

/// Customer records from the Senzing truth set
pub mod truthset {
    use super::*;

    pub const CUSTOMERS: &str = "CUSTOMERS";

    pub fn customer_1001() -> TestRecord {
        TestRecord::new(CUSTOMERS, "1001")
            .with_attribute("RECORD_TYPE", "PERSON")
            .with_attribute("PRIMARY_NAME_LAST", "Smith")
            .with_attribute("PRIMARY_NAME_FIRST", "Robert")
            .with_attribute("DATE_OF_BIRTH", "12/11/1978")
            .with_attribute("ADDR_TYPE", "MAILING")
            .with_attribute("ADDR_LINE1", "123 Main Street, Las Vegas NV 89132")
            .with_attribute("PHONE_TYPE", "HOME")
            .with_attribute("PHONE_NUMBER", "702-919-1300")
            .with_attribute("EMAIL_ADDRESS", "bsmith@work.com")
    }

    pub fn customer_1002() -> TestRecord {
        TestRecord::new(CUSTOMERS, "1002")
            .with_attribute("RECORD_TYPE", "PERSON")
            .with_attribute("PRIMARY_NAME_LAST", "Smith")
            .with_attribute("PRIMARY_NAME_FIRST", "Bob")
            .with_attribute("DATE_OF_BIRTH", "11/12/1978")
            .with_attribute("ADDR_TYPE", "HOME")
            .with_attribute("ADDR_LINE1", "1515 Adela Lane")
            .with_attribute("ADDR_CITY", "Las Vegas")
            .with_attribute("ADDR_STATE", "NV")
            .with_attribute("ADDR_POSTAL_CODE", "89111")
            .with_attribute("PHONE_TYPE", "MOBILE")
            .with_attribute("PHONE_NUMBER", "702-919-1300")
    }

    pub fn customer_1003() -> TestRecord {
        TestRecord::new(CUSTOMERS, "1003")
            .with_attribute("RECORD_TYPE", "PERSON")
            .with_attribute("PRIMARY_NAME_LAST", "Smith")
            .with_attribute("PRIMARY_NAME_FIRST", "Bob")
            .with_attribute("PRIMARY_NAME_MIDDLE", "J")
            .with_attribute("DATE_OF_BIRTH", "12/11/1978")
            .with_attribute("EMAIL_ADDRESS", "bsmith@work.com")
    }

    /// All three customers, in record id order
    pub fn customers() -> Vec<TestRecord> {
        vec![customer_1001(), customer_1002(), customer_1003()]
    }
}

/// Configuration documents in the registry format
pub mod config_fixtures {
    use super::*;

    /// A configuration registering the given data sources after TEST and SEARCH
    pub fn config_with_data_sources(codes: &[&str]) -> String {
        let mut entries = vec![
            json!({ "DSRC_ID": 1, "DSRC_CODE": "TEST" }),
            json!({ "DSRC_ID": 2, "DSRC_CODE": "SEARCH" }),
        ];
        entries.extend(
            codes
                .iter()
                .enumerate()
                .map(|(i, code)| json!({ "DSRC_ID": 1001 + i, "DSRC_CODE": code })),
        );
        json!({ "G2_CONFIG": { "CFG_DSRC": entries } }).to_string()
    }

    /// Data source codes listed in a `get_data_sources` response
    pub fn data_source_codes(document: &str) -> Vec<String> {
        serde_json::from_str::<Value>(document)
            .ok()
            .and_then(|v| v["DATA_SOURCES"].as_array().cloned())
            .unwrap_or_default()
            .iter()
            .filter_map(|e| e["DSRC_CODE"].as_str().map(str::to_string))
            .collect()
    }
}
