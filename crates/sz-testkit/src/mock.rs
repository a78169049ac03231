//! In-memory native library.
//!
//! [`MockSenzing`] implements every native trait over a small record store so
//! the clients can be exercised without libSz. It does not resolve: each
//! record forms its own entity. Failures follow the native conventions (a
//! negative status plus a last-exception code and message) using the codes
//! in [`codes`].

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ffi::CStr;
use std::sync::Arc;
use sz_sdk::{
    ConfigApi, ConfigManagerApi, DiagnosticApi, EngineApi, ExceptionApi, NativeLibrary, NativeResponse, ProductApi,
    SzFlags,
};

/// Exception codes raised by the mock.
pub mod codes {
    pub const INVALID_JSON: i64 = 2;
    pub const INVALID_ARGUMENT: i64 = 7;
    pub const CONFLICTING_DATA_SOURCE: i64 = 23;
    pub const CONFLICTING_RECORD_ID: i64 = 24;
    pub const UNKNOWN_RECORD: i64 = 33;
    pub const UNKNOWN_ENTITY: i64 = 37;
    pub const NOT_INITIALIZED: i64 = 48;
    pub const INVALID_MAX_DEGREES: i64 = 87;
    pub const DATABASE_CONNECTION_LOST: i64 = 1006;
    pub const UNKNOWN_DATA_SOURCE: i64 = 2207;
    pub const INVALID_EXPORT_HANDLE: i64 = 3103;
    pub const DUPLICATE_DATA_SOURCE: i64 = 7220;
    pub const UNKNOWN_CONFIG_ID: i64 = 7221;
    pub const REPLACE_CONFLICT: i64 = 7245;
}

/// Status returned by failing mock calls.
pub const FAILURE_STATUS: i64 = -2;

/// Data sources registered in the seeded default configuration.
pub const DEFAULT_DATA_SOURCES: &[&str] = &["TEST", "SEARCH", "CUSTOMERS", "REFERENCE", "WATCHLIST"];

/// Columns of a CSV export requested with an empty column list.
pub const DEFAULT_CSV_COLUMNS: &[&str] = &[
    "RESOLVED_ENTITY_ID",
    "RELATED_ENTITY_ID",
    "MATCH_LEVEL_CODE",
    "MATCH_KEY",
    "DATA_SOURCE",
    "RECORD_ID",
];

const KNOWN_CSV_COLUMNS: &[&str] = &[
    "RESOLVED_ENTITY_ID",
    "RESOLVED_ENTITY_NAME",
    "RELATED_ENTITY_ID",
    "MATCH_LEVEL",
    "MATCH_LEVEL_CODE",
    "MATCH_KEY",
    "MATCH_KEY_DETAILS",
    "IS_DISCLOSED",
    "IS_AMBIGUOUS",
    "DATA_SOURCE",
    "RECORD_ID",
    "JSON_DATA",
    "ERRULE_CODE",
];

const EXPORT_ENTITY_BITS: SzFlags =
    SzFlags::EXPORT_INCLUDE_ALL_ENTITIES.union(SzFlags::EXPORT_INCLUDE_ALL_HAVING_RELATIONSHIPS);

/// One native entry point invocation, as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub name: &'static str,
    /// Flags forwarded to the entry point, if it takes any
    pub flags: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Part {
    Engine,
    Config,
    ConfigManager,
    Diagnostic,
    Product,
}

#[derive(Debug, Clone)]
struct Fault {
    code: i64,
    message: String,
}

impl Fault {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

type MockResult<T> = Result<T, Fault>;

#[derive(Debug, Clone)]
struct StoredRecord {
    entity_id: i64,
    json: Value,
}

/// Data sources of one configuration document, as `(DSRC_ID, DSRC_CODE)`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConfigDoc {
    data_sources: Vec<(i64, String)>,
}

impl ConfigDoc {
    fn template() -> Self {
        Self {
            data_sources: vec![(1, "TEST".to_string()), (2, "SEARCH".to_string())],
        }
    }

    fn with_codes(codes: &[&str]) -> Self {
        let mut doc = Self::template();
        for code in codes {
            if !doc.contains(code) {
                doc.push(code);
            }
        }
        doc
    }

    fn parse(definition: &str) -> MockResult<Self> {
        let value: Value = serde_json::from_str(definition)
            .map_err(|e| Fault::new(codes::INVALID_JSON, format!("Invalid JSON: {}", e)))?;
        let entries = value["G2_CONFIG"]["CFG_DSRC"]
            .as_array()
            .ok_or_else(|| Fault::new(codes::INVALID_JSON, "Configuration has no G2_CONFIG.CFG_DSRC section"))?;
        let data_sources = entries
            .iter()
            .filter_map(|e| Some((e["DSRC_ID"].as_i64()?, e["DSRC_CODE"].as_str()?.to_string())))
            .collect();
        Ok(Self { data_sources })
    }

    fn contains(&self, code: &str) -> bool {
        self.data_sources.iter().any(|(_, c)| c == code)
    }

    fn push(&mut self, code: &str) -> i64 {
        let next = self.data_sources.iter().map(|(id, _)| *id).max().unwrap_or(0).max(1000) + 1;
        self.data_sources.push((next, code.to_string()));
        next
    }

    fn data_sources_json(&self) -> Value {
        Value::Array(
            self.data_sources
                .iter()
                .map(|(id, code)| json!({ "DSRC_ID": id, "DSRC_CODE": code }))
                .collect(),
        )
    }

    fn to_json(&self) -> String {
        json!({ "G2_CONFIG": { "CFG_DSRC": self.data_sources_json() } }).to_string()
    }
}

#[derive(Debug, Clone)]
struct RegisteredConfig {
    definition: String,
    comment: String,
    created: String,
}

#[derive(Debug)]
struct MockState {
    initialized: HashSet<Part>,
    last_exception: Option<Fault>,
    calls: Vec<MockCall>,

    registry: BTreeMap<i64, RegisteredConfig>,
    next_config_id: i64,
    default_config_id: i64,
    active_config_id: i64,
    active_data_sources: ConfigDoc,

    records: BTreeMap<(String, String), StoredRecord>,
    next_entity_id: i64,
    added_records: u64,
    deleted_records: u64,
    redo: VecDeque<String>,

    exports: HashMap<usize, VecDeque<String>>,
    next_export_handle: usize,
    fail_close_export: bool,
    fetches_before_failure: Option<usize>,

    configs: HashMap<usize, ConfigDoc>,
    next_config_handle: usize,
}

impl Default for MockState {
    fn default() -> Self {
        let seed = ConfigDoc::with_codes(DEFAULT_DATA_SOURCES);
        let mut registry = BTreeMap::new();
        registry.insert(
            1,
            RegisteredConfig {
                definition: seed.to_json(),
                comment: "Seed configuration".to_string(),
                created: Utc::now().to_rfc3339(),
            },
        );
        Self {
            initialized: HashSet::new(),
            last_exception: None,
            calls: Vec::new(),
            registry,
            next_config_id: 2,
            default_config_id: 1,
            active_config_id: 0,
            active_data_sources: seed,
            records: BTreeMap::new(),
            next_entity_id: 1,
            added_records: 0,
            deleted_records: 0,
            redo: VecDeque::new(),
            exports: HashMap::new(),
            next_export_handle: 1,
            fail_close_export: false,
            fetches_before_failure: None,
            configs: HashMap::new(),
            next_config_handle: 1,
        }
    }
}

fn text(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

fn parse_json(value: &CStr) -> MockResult<Value> {
    serde_json::from_str(&value.to_string_lossy())
        .map_err(|e| Fault::new(codes::INVALID_JSON, format!("Invalid JSON: {}", e)))
}

fn affected(entity_ids: &[i64]) -> Vec<Value> {
    entity_ids.iter().map(|id| json!({ "ENTITY_ID": id })).collect()
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

impl MockState {
    fn activate_config(&mut self, config_id: i64) -> MockResult<()> {
        let id = if config_id > 0 { config_id } else { self.default_config_id };
        let registered = self
            .registry
            .get(&id)
            .ok_or_else(|| Fault::new(codes::UNKNOWN_CONFIG_ID, format!("No configuration registered with ID [{}]", id)))?;
        self.active_data_sources = ConfigDoc::parse(&registered.definition)?;
        self.active_config_id = id;
        Ok(())
    }

    fn require_data_source(&self, data_source_code: &str) -> MockResult<()> {
        if self.active_data_sources.contains(data_source_code) {
            Ok(())
        } else {
            Err(Fault::new(
                codes::UNKNOWN_DATA_SOURCE,
                format!("Data source code [{}] does not exist.", data_source_code),
            ))
        }
    }

    fn record(&self, data_source_code: &str, record_id: &str) -> MockResult<&StoredRecord> {
        self.require_data_source(data_source_code)?;
        self.records
            .get(&(data_source_code.to_string(), record_id.to_string()))
            .ok_or_else(|| {
                Fault::new(
                    codes::UNKNOWN_RECORD,
                    format!("Unknown record: dsrc[{}], record[{}]", data_source_code, record_id),
                )
            })
    }

    fn require_entity(&self, entity_id: i64) -> MockResult<()> {
        if self.records.values().any(|r| r.entity_id == entity_id) {
            Ok(())
        } else {
            Err(Fault::new(
                codes::UNKNOWN_ENTITY,
                format!("Unknown resolved entity value '{}'", entity_id),
            ))
        }
    }

    fn require_max_degrees(max_degrees: i64) -> MockResult<()> {
        if max_degrees < 0 {
            return Err(Fault::new(
                codes::INVALID_MAX_DEGREES,
                format!("Invalid value of max degree [{}].", max_degrees),
            ));
        }
        Ok(())
    }

    fn entity_name(&self, entity_id: i64) -> String {
        self.records
            .values()
            .filter(|r| r.entity_id == entity_id)
            .find_map(|r| {
                if let Some(full) = r.json["NAME_FULL"].as_str() {
                    return Some(full.to_string());
                }
                let first = r.json["PRIMARY_NAME_FIRST"].as_str().unwrap_or("");
                let last = r.json["PRIMARY_NAME_LAST"].as_str().unwrap_or("");
                let name = format!("{} {}", first, last).trim().to_string();
                (!name.is_empty()).then_some(name)
            })
            .unwrap_or_default()
    }

    fn entity_document(&self, entity_id: i64) -> Value {
        let records: Vec<Value> = self
            .records
            .iter()
            .filter(|(_, r)| r.entity_id == entity_id)
            .map(|((ds, id), _)| {
                json!({
                    "DATA_SOURCE": ds,
                    "RECORD_ID": id,
                    "INTERNAL_ID": entity_id,
                    "MATCH_KEY": "",
                    "MATCH_LEVEL_CODE": "",
                })
            })
            .collect();
        let mut summary: BTreeMap<String, u64> = BTreeMap::new();
        for record in &records {
            if let Some(ds) = record["DATA_SOURCE"].as_str() {
                *summary.entry(ds.to_string()).or_default() += 1;
            }
        }
        let summary: Vec<Value> = summary
            .into_iter()
            .map(|(ds, count)| json!({ "DATA_SOURCE": ds, "RECORD_COUNT": count }))
            .collect();
        json!({
            "RESOLVED_ENTITY": {
                "ENTITY_ID": entity_id,
                "ENTITY_NAME": self.entity_name(entity_id),
                "FEATURES": {},
                "RECORD_SUMMARY": summary,
                "RECORDS": records,
            },
            "RELATED_ENTITIES": [],
        })
    }

    fn entity_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.records.values().map(|r| r.entity_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn record_keys(&self, document: &Value) -> MockResult<Vec<i64>> {
        let keys = document["RECORDS"]
            .as_array()
            .ok_or_else(|| Fault::new(codes::INVALID_JSON, "Expected a RECORDS list"))?;
        keys.iter()
            .map(|key| {
                let ds = key["DATA_SOURCE"].as_str().unwrap_or_default();
                let id = key["RECORD_ID"].as_str().unwrap_or_default();
                self.record(ds, id).map(|r| r.entity_id)
            })
            .collect()
    }

    fn entity_list(&self, document: &Value) -> MockResult<Vec<i64>> {
        let entities = document["ENTITIES"]
            .as_array()
            .ok_or_else(|| Fault::new(codes::INVALID_JSON, "Expected an ENTITIES list"))?;
        entities
            .iter()
            .map(|e| {
                let id = e["ENTITY_ID"]
                    .as_i64()
                    .ok_or_else(|| Fault::new(codes::INVALID_JSON, "ENTITY_ID must be an integer"))?;
                self.require_entity(id)?;
                Ok(id)
            })
            .collect()
    }

    fn require_data_source_list(&self, document: &Value) -> MockResult<()> {
        let sources = document["DATA_SOURCES"]
            .as_array()
            .ok_or_else(|| Fault::new(codes::INVALID_JSON, "Expected a DATA_SOURCES list"))?;
        for source in sources {
            self.require_data_source(source.as_str().unwrap_or_default())?;
        }
        Ok(())
    }

    fn add(&mut self, data_source_code: &str, record_id: &str, definition: &Value) -> MockResult<i64> {
        if let Some(embedded) = definition["DATA_SOURCE"].as_str() {
            if embedded != data_source_code {
                return Err(Fault::new(
                    codes::CONFLICTING_DATA_SOURCE,
                    format!("Conflicting DATA_SOURCE values '{}' and '{}'", data_source_code, embedded),
                ));
            }
        }
        if let Some(embedded) = definition["RECORD_ID"].as_str() {
            if embedded != record_id {
                return Err(Fault::new(
                    codes::CONFLICTING_RECORD_ID,
                    format!("Conflicting RECORD_ID values '{}' and '{}'", record_id, embedded),
                ));
            }
        }
        if !definition.is_object() {
            return Err(Fault::new(codes::INVALID_JSON, "Record definition must be a JSON object"));
        }
        self.require_data_source(data_source_code)?;

        let key = (data_source_code.to_string(), record_id.to_string());
        let entity_id = match self.records.get(&key) {
            Some(existing) => existing.entity_id,
            None => {
                let id = self.next_entity_id;
                self.next_entity_id += 1;
                id
            }
        };
        self.records.insert(
            key,
            StoredRecord {
                entity_id,
                json: definition.clone(),
            },
        );
        self.added_records += 1;
        Ok(entity_id)
    }

    fn delete(&mut self, data_source_code: &str, record_id: &str) -> MockResult<Vec<i64>> {
        self.require_data_source(data_source_code)?;
        let removed = self
            .records
            .remove(&(data_source_code.to_string(), record_id.to_string()));
        Ok(match removed {
            Some(record) => {
                self.deleted_records += 1;
                vec![record.entity_id]
            }
            None => Vec::new(),
        })
    }

    fn record_info(data_source_code: &str, record_id: &str, entity_ids: &[i64]) -> String {
        json!({
            "DATA_SOURCE": data_source_code,
            "RECORD_ID": record_id,
            "AFFECTED_ENTITIES": affected(entity_ids),
            "INTERESTING_ENTITIES": { "ENTITIES": [] },
        })
        .to_string()
    }

    fn search(&self, attributes: &Value) -> MockResult<String> {
        let wanted = attributes
            .as_object()
            .ok_or_else(|| Fault::new(codes::INVALID_JSON, "Search attributes must be a JSON object"))?;
        let mut matches: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for record in self.records.values() {
            for (key, value) in wanted {
                if matches!(key.as_str(), "DATA_SOURCE" | "RECORD_ID") {
                    continue;
                }
                let (Some(want), Some(have)) = (value.as_str(), record.json[key].as_str()) else {
                    continue;
                };
                if want.eq_ignore_ascii_case(have) {
                    matches.entry(record.entity_id).or_default().push(key.clone());
                }
            }
        }
        let entities: Vec<Value> = matches
            .into_iter()
            .map(|(entity_id, keys)| {
                json!({
                    "MATCH_INFO": {
                        "MATCH_LEVEL_CODE": "RESOLVED",
                        "MATCH_KEY": format!("+{}", keys.join("+")),
                    },
                    "ENTITY": self.entity_document(entity_id),
                })
            })
            .collect();
        Ok(json!({ "RESOLVED_ENTITIES": entities }).to_string())
    }

    fn why(&self, entity_ids: &[i64]) -> String {
        let results: Vec<Value> = entity_ids
            .windows(2)
            .map(|pair| {
                json!({
                    "ENTITY_ID": pair[0],
                    "ENTITY_ID_2": pair[1],
                    "MATCH_INFO": { "WHY_KEY": "", "WHY_ERRULE_CODE": "", "MATCH_LEVEL_CODE": "" },
                })
            })
            .collect();
        let results = if results.is_empty() {
            entity_ids
                .iter()
                .map(|id| json!({ "ENTITY_ID": id, "MATCH_INFO": { "WHY_KEY": "", "WHY_ERRULE_CODE": "" } }))
                .collect()
        } else {
            results
        };
        let entities: Vec<Value> = entity_ids.iter().map(|id| self.entity_document(*id)).collect();
        json!({ "WHY_RESULTS": results, "ENTITIES": entities }).to_string()
    }

    fn path(&self, start: i64, end: i64, avoid: &[i64]) -> String {
        let mut entities = vec![start];
        if end != start {
            entities.push(end);
        }
        let path: Vec<i64> = if start == end { vec![start] } else { Vec::new() };
        json!({
            "ENTITY_PATHS": [{ "START_ENTITY_ID": start, "END_ENTITY_ID": end, "ENTITIES": path }],
            "ENTITY_PATH_LINKS": [],
            "AVOIDED_ENTITIES": avoid,
            "ENTITIES": entities.iter().map(|id| self.entity_document(*id)).collect::<Vec<_>>(),
        })
        .to_string()
    }

    fn network(&self, entity_ids: &[i64]) -> String {
        json!({
            "ENTITY_PATHS": [],
            "ENTITY_NETWORK_LINKS": [],
            "ENTITIES": entity_ids.iter().map(|id| self.entity_document(*id)).collect::<Vec<_>>(),
        })
        .to_string()
    }

    /// No export bits at all means every entity.
    fn include_in_export(flags: SzFlags) -> bool {
        // Every mock entity holds a single record.
        flags.contains(SzFlags::EXPORT_INCLUDE_SINGLE_RECORD_ENTITIES) || (flags & EXPORT_ENTITY_BITS).is_empty()
    }

    fn csv_export(&self, csv_column_list: &str, flags: SzFlags) -> MockResult<VecDeque<String>> {
        let columns: Vec<String> = if csv_column_list.trim().is_empty() {
            DEFAULT_CSV_COLUMNS.iter().map(|c| c.to_string()).collect()
        } else {
            csv_column_list
                .split(',')
                .map(|c| c.trim().to_ascii_uppercase())
                .collect()
        };
        if let Some(unknown) = columns.iter().find(|c| !KNOWN_CSV_COLUMNS.contains(&c.as_str())) {
            return Err(Fault::new(codes::INVALID_ARGUMENT, format!("Invalid CSV column [{}]", unknown)));
        }

        let mut fragments = VecDeque::new();
        fragments.push_back(format!("{}\n", columns.join(",")));
        if !Self::include_in_export(flags) {
            return Ok(fragments);
        }
        let mut rows: Vec<(&(String, String), &StoredRecord)> = self.records.iter().collect();
        rows.sort_by_key(|(_, r)| r.entity_id);
        for ((ds, id), record) in rows {
            let cells: Vec<String> = columns
                .iter()
                .map(|column| match column.as_str() {
                    "RESOLVED_ENTITY_ID" => record.entity_id.to_string(),
                    "RELATED_ENTITY_ID" | "MATCH_LEVEL" | "IS_DISCLOSED" | "IS_AMBIGUOUS" => "0".to_string(),
                    "RESOLVED_ENTITY_NAME" => csv_quote(&self.entity_name(record.entity_id)),
                    "DATA_SOURCE" => csv_quote(ds),
                    "RECORD_ID" => csv_quote(id),
                    "JSON_DATA" => csv_quote(&record.json.to_string()),
                    _ => csv_quote(""),
                })
                .collect();
            fragments.push_back(format!("{}\n", cells.join(",")));
        }
        Ok(fragments)
    }

    fn json_export(&self, flags: SzFlags) -> VecDeque<String> {
        if !Self::include_in_export(flags) {
            return VecDeque::new();
        }
        self.entity_ids()
            .into_iter()
            .map(|id| format!("{}\n", self.entity_document(id)))
            .collect()
    }

    fn open_export(&mut self, fragments: VecDeque<String>) -> usize {
        let handle = self.next_export_handle;
        self.next_export_handle += 1;
        self.exports.insert(handle, fragments);
        handle
    }

    fn config_doc(&mut self, handle: usize) -> MockResult<&mut ConfigDoc> {
        self.configs
            .get_mut(&handle)
            .ok_or_else(|| Fault::new(codes::INVALID_ARGUMENT, format!("Invalid configuration handle [{}]", handle)))
    }

    fn data_source_code(definition: &CStr) -> MockResult<String> {
        let value = parse_json(definition)?;
        value["DSRC_CODE"]
            .as_str()
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Fault::new(codes::INVALID_ARGUMENT, "DSRC_CODE is required"))
    }

    fn require_registered(&self, config_id: i64) -> MockResult<()> {
        if self.registry.contains_key(&config_id) {
            Ok(())
        } else {
            Err(Fault::new(
                codes::UNKNOWN_CONFIG_ID,
                format!("No configuration registered with ID [{}]", config_id),
            ))
        }
    }
}

/// In-memory stand-in for libSz.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the clients own others.
#[derive(Debug, Clone, Default)]
pub struct MockSenzing {
    state: Arc<Mutex<MockState>>,
}

impl MockSenzing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn library(&self) -> Arc<dyn NativeLibrary> {
        Arc::new(self.clone())
    }

    /// Queues a redo record for `get_redo_record`.
    pub fn queue_redo_record(&self, redo_record: &str) {
        self.state.lock().redo.push_back(redo_record.to_string());
    }

    /// Makes every later `close_export_report` fail.
    pub fn fail_close_export(&self, fail: bool) {
        self.state.lock().fail_close_export = fail;
    }

    /// Lets `fetches` more fragments through, then fails every later
    /// `fetch_next` with a lost database connection.
    pub fn fail_fetch_after(&self, fetches: usize) {
        self.state.lock().fetches_before_failure = Some(fetches);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn last_call(&self) -> Option<MockCall> {
        self.state.lock().calls.last().cloned()
    }

    /// Names of the invoked entry points, oldest first.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.state.lock().calls.iter().map(|c| c.name).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn open_exports(&self) -> usize {
        self.state.lock().exports.len()
    }

    pub fn open_configs(&self) -> usize {
        self.state.lock().configs.len()
    }

    pub fn default_config_id(&self) -> i64 {
        self.state.lock().default_config_id
    }

    pub fn active_config_id(&self) -> i64 {
        self.state.lock().active_config_id
    }

    /// Whether an exception is pending, i.e. was not cleared after a failure.
    pub fn has_pending_exception(&self) -> bool {
        self.state.lock().last_exception.is_some()
    }

    fn respond<T: Default>(state: &mut MockState, result: MockResult<T>) -> NativeResponse<T> {
        match result {
            Ok(value) => NativeResponse::ok(value),
            Err(fault) => {
                state.last_exception = Some(fault);
                NativeResponse::failed(FAILURE_STATUS)
            }
        }
    }

    /// Runs an entry point that requires its component to be initialized.
    fn call<T: Default>(
        &self,
        part: Part,
        name: &'static str,
        flags: Option<i64>,
        op: impl FnOnce(&mut MockState) -> MockResult<T>,
    ) -> NativeResponse<T> {
        let mut state = self.state.lock();
        state.calls.push(MockCall { name, flags });
        let result = if state.initialized.contains(&part) {
            op(&mut state)
        } else {
            Err(Fault::new(codes::NOT_INITIALIZED, "Function called without initialization"))
        };
        Self::respond(&mut state, result)
    }

    fn call_text(
        &self,
        part: Part,
        name: &'static str,
        flags: Option<i64>,
        op: impl FnOnce(&mut MockState) -> MockResult<String>,
    ) -> NativeResponse {
        let response = self.call(part, name, flags, op);
        NativeResponse::new(response.return_code, response.value.into_bytes())
    }

    fn call_status(&self, part: Part, name: &'static str, op: impl FnOnce(&mut MockState) -> MockResult<()>) -> i64 {
        self.call(part, name, None, op).return_code
    }

    fn initialize(&self, part: Part, name: &'static str, config_id: i64) -> i64 {
        let mut state = self.state.lock();
        state.calls.push(MockCall { name, flags: None });
        let result = match part {
            Part::Engine | Part::Diagnostic => state.activate_config(config_id),
            _ => Ok(()),
        };
        if result.is_ok() {
            state.initialized.insert(part);
        }
        Self::respond(&mut state, result).return_code
    }

    fn destroy_part(&self, part: Part, name: &'static str) -> i64 {
        self.call_status(part, name, |state| {
            state.initialized.remove(&part);
            Ok(())
        })
    }
}

impl NativeLibrary for MockSenzing {
    fn engine(&self) -> Arc<dyn EngineApi> {
        Arc::new(self.clone())
    }

    fn config(&self) -> Arc<dyn ConfigApi> {
        Arc::new(self.clone())
    }

    fn config_manager(&self) -> Arc<dyn ConfigManagerApi> {
        Arc::new(self.clone())
    }

    fn diagnostic(&self) -> Arc<dyn DiagnosticApi> {
        Arc::new(self.clone())
    }

    fn product(&self) -> Arc<dyn ProductApi> {
        Arc::new(self.clone())
    }
}

impl ExceptionApi for MockSenzing {
    fn get_last_exception_code(&self) -> i64 {
        self.state.lock().last_exception.as_ref().map_or(0, |f| f.code)
    }

    fn get_last_exception(&self) -> Vec<u8> {
        self.state
            .lock()
            .last_exception
            .as_ref()
            .map(|f| f.message.clone().into_bytes())
            .unwrap_or_default()
    }

    fn clear_last_exception(&self) -> i64 {
        self.state.lock().last_exception = None;
        0
    }
}

// ============================================================================
// Engine
// ============================================================================

impl EngineApi for MockSenzing {
    fn init(&self, _instance_name: &CStr, _settings: &CStr, _verbose_logging: i64) -> i64 {
        self.initialize(Part::Engine, "Sz_init", 0)
    }

    fn init_with_config_id(&self, _instance_name: &CStr, _settings: &CStr, config_id: i64, _verbose: i64) -> i64 {
        self.initialize(Part::Engine, "Sz_initWithConfigID", config_id)
    }

    fn reinit(&self, config_id: i64) -> i64 {
        self.call_status(Part::Engine, "Sz_reinit", |state| state.activate_config(config_id))
    }

    fn destroy(&self) -> i64 {
        self.destroy_part(Part::Engine, "Sz_destroy")
    }

    fn prime_engine(&self) -> i64 {
        self.call_status(Part::Engine, "Sz_primeEngine", |_| Ok(()))
    }

    fn get_active_config_id(&self) -> NativeResponse<i64> {
        self.call(Part::Engine, "Sz_getActiveConfigID", None, |state| Ok(state.active_config_id))
    }

    fn get_stats(&self) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_stats", None, |state| {
            Ok(json!({
                "workload": {
                    "addedRecords": state.added_records,
                    "deletedRecords": state.deleted_records,
                    "redoTriggers": state.redo.len(),
                }
            })
            .to_string())
        })
    }

    fn add_record(&self, data_source_code: &CStr, record_id: &CStr, record_definition: &CStr) -> i64 {
        self.call_status(Part::Engine, "Sz_addRecord", |state| {
            let definition = parse_json(record_definition)?;
            state.add(&text(data_source_code), &text(record_id), &definition).map(|_| ())
        })
    }

    fn add_record_with_info(
        &self,
        data_source_code: &CStr,
        record_id: &CStr,
        record_definition: &CStr,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_addRecordWithInfo", Some(flags), |state| {
            let (ds, id) = (text(data_source_code), text(record_id));
            let definition = parse_json(record_definition)?;
            let entity_id = state.add(&ds, &id, &definition)?;
            Ok(MockState::record_info(&ds, &id, &[entity_id]))
        })
    }

    fn delete_record(&self, data_source_code: &CStr, record_id: &CStr) -> i64 {
        self.call_status(Part::Engine, "Sz_deleteRecord", |state| {
            state.delete(&text(data_source_code), &text(record_id)).map(|_| ())
        })
    }

    fn delete_record_with_info(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_deleteRecordWithInfo", Some(flags), |state| {
            let (ds, id) = (text(data_source_code), text(record_id));
            let affected = state.delete(&ds, &id)?;
            Ok(MockState::record_info(&ds, &id, &affected))
        })
    }

    fn reevaluate_record(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> i64 {
        self.call(Part::Engine, "Sz_reevaluateRecord", Some(flags), |state| {
            state.record(&text(data_source_code), &text(record_id)).map(|_| ())
        })
        .return_code
    }

    fn reevaluate_record_with_info(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_reevaluateRecordWithInfo", Some(flags), |state| {
            let (ds, id) = (text(data_source_code), text(record_id));
            let entity_id = state.record(&ds, &id)?.entity_id;
            Ok(MockState::record_info(&ds, &id, &[entity_id]))
        })
    }

    fn reevaluate_entity(&self, entity_id: i64, flags: i64) -> i64 {
        self.call(Part::Engine, "Sz_reevaluateEntity", Some(flags), |state| state.require_entity(entity_id))
            .return_code
    }

    fn reevaluate_entity_with_info(&self, entity_id: i64, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_reevaluateEntityWithInfo", Some(flags), |state| {
            state.require_entity(entity_id)?;
            Ok(json!({ "AFFECTED_ENTITIES": affected(&[entity_id]), "INTERESTING_ENTITIES": { "ENTITIES": [] } })
                .to_string())
        })
    }

    fn count_redo_records(&self) -> i64 {
        let response = self.call(Part::Engine, "Sz_countRedoRecords", None, |state| {
            Ok(i64::try_from(state.redo.len()).unwrap_or(i64::MAX))
        });
        if response.return_code == 0 {
            response.value
        } else {
            response.return_code
        }
    }

    fn get_redo_record(&self) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_getRedoRecord", None, |state| {
            Ok(state.redo.pop_front().unwrap_or_default())
        })
    }

    fn process_redo_record(&self, redo_record: &CStr) -> i64 {
        self.call_status(Part::Engine, "Sz_processRedoRecord", |_| parse_json(redo_record).map(|_| ()))
    }

    fn process_redo_record_with_info(&self, redo_record: &CStr) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_processRedoRecordWithInfo", None, |state| {
            let redo = parse_json(redo_record)?;
            let ds = redo["DATA_SOURCE"].as_str().unwrap_or_default();
            let id = redo["RECORD_ID"].as_str().unwrap_or_default();
            let affected: Vec<i64> = state.record(ds, id).map(|r| vec![r.entity_id]).unwrap_or_default();
            Ok(MockState::record_info(ds, id, &affected))
        })
    }

    fn get_entity_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_getEntityByEntityID", Some(flags), |state| {
            state.require_entity(entity_id)?;
            Ok(state.entity_document(entity_id).to_string())
        })
    }

    fn get_entity_by_record_id(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_getEntityByRecordID", Some(flags), |state| {
            let entity_id = state.record(&text(data_source_code), &text(record_id))?.entity_id;
            Ok(state.entity_document(entity_id).to_string())
        })
    }

    fn get_record(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_getRecord", Some(flags), |state| {
            let (ds, id) = (text(data_source_code), text(record_id));
            let record = state.record(&ds, &id)?;
            Ok(json!({ "DATA_SOURCE": ds, "RECORD_ID": id, "JSON_DATA": record.json }).to_string())
        })
    }

    fn get_record_preview(&self, record_definition: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_getRecordPreview", Some(flags), |_| {
            let definition = parse_json(record_definition)?;
            let features: serde_json::Map<String, Value> = definition
                .as_object()
                .map(|o| {
                    o.iter()
                        .filter(|(k, _)| !matches!(k.as_str(), "DATA_SOURCE" | "RECORD_ID"))
                        .map(|(k, v)| (k.clone(), json!([{ "FEAT_DESC": v }])))
                        .collect()
                })
                .unwrap_or_default();
            Ok(json!({ "FEATURES": features }).to_string())
        })
    }

    fn get_virtual_entity_by_record_id(&self, record_keys: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_getVirtualEntityByRecordID", Some(flags), |state| {
            let keys = parse_json(record_keys)?;
            let entity_ids = state.record_keys(&keys)?;
            let records: Vec<Value> = keys["RECORDS"].as_array().cloned().unwrap_or_default();
            let entity_id = entity_ids.iter().copied().min().unwrap_or_default();
            Ok(json!({ "RESOLVED_ENTITY": { "ENTITY_ID": entity_id, "RECORDS": records } }).to_string())
        })
    }

    fn how_entity_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_howEntityByEntityID", Some(flags), |state| {
            state.require_entity(entity_id)?;
            Ok(json!({
                "HOW_RESULTS": {
                    "RESOLUTION_STEPS": [],
                    "FINAL_STATE": {
                        "NEED_REEVALUATION": 0,
                        "VIRTUAL_ENTITIES": [{ "VIRTUAL_ENTITY_ID": format!("V{}", entity_id) }],
                    },
                }
            })
            .to_string())
        })
    }

    fn find_interesting_entities_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findInterestingEntitiesByEntityID", Some(flags), |state| {
            state.require_entity(entity_id)?;
            Ok(json!({ "INTERESTING_ENTITIES": { "ENTITIES": [] } }).to_string())
        })
    }

    fn find_interesting_entities_by_record_id(
        &self,
        data_source_code: &CStr,
        record_id: &CStr,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findInterestingEntitiesByRecordID", Some(flags), |state| {
            state.record(&text(data_source_code), &text(record_id))?;
            Ok(json!({ "INTERESTING_ENTITIES": { "ENTITIES": [] } }).to_string())
        })
    }

    fn find_network_by_entity_id(
        &self,
        entity_ids: &CStr,
        max_degrees: i64,
        _build_out_degrees: i64,
        _build_out_max_entities: i64,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findNetworkByEntityID", Some(flags), |state| {
            MockState::require_max_degrees(max_degrees)?;
            let ids = state.entity_list(&parse_json(entity_ids)?)?;
            Ok(state.network(&ids))
        })
    }

    fn find_network_by_record_id(
        &self,
        record_keys: &CStr,
        max_degrees: i64,
        _build_out_degrees: i64,
        _build_out_max_entities: i64,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findNetworkByRecordID", Some(flags), |state| {
            MockState::require_max_degrees(max_degrees)?;
            let ids = state.record_keys(&parse_json(record_keys)?)?;
            Ok(state.network(&ids))
        })
    }

    fn find_path_by_entity_id(&self, start: i64, end: i64, max_degrees: i64, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findPathByEntityID", Some(flags), |state| {
            MockState::require_max_degrees(max_degrees)?;
            state.require_entity(start)?;
            state.require_entity(end)?;
            Ok(state.path(start, end, &[]))
        })
    }

    fn find_path_by_entity_id_with_avoids(
        &self,
        start: i64,
        end: i64,
        max_degrees: i64,
        avoid_entity_ids: &CStr,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findPathByEntityIDWithAvoids", Some(flags), |state| {
            MockState::require_max_degrees(max_degrees)?;
            state.require_entity(start)?;
            state.require_entity(end)?;
            let avoid = state.entity_list(&parse_json(avoid_entity_ids)?)?;
            Ok(state.path(start, end, &avoid))
        })
    }

    fn find_path_by_entity_id_including_source(
        &self,
        start: i64,
        end: i64,
        max_degrees: i64,
        avoid_entity_ids: &CStr,
        required_data_sources: &CStr,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findPathByEntityIDIncludingSource", Some(flags), |state| {
            MockState::require_max_degrees(max_degrees)?;
            state.require_entity(start)?;
            state.require_entity(end)?;
            let avoid = if avoid_entity_ids.to_bytes().is_empty() {
                Vec::new()
            } else {
                state.entity_list(&parse_json(avoid_entity_ids)?)?
            };
            state.require_data_source_list(&parse_json(required_data_sources)?)?;
            Ok(state.path(start, end, &avoid))
        })
    }

    fn find_path_by_record_id(
        &self,
        start: (&CStr, &CStr),
        end: (&CStr, &CStr),
        max_degrees: i64,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findPathByRecordID", Some(flags), |state| {
            MockState::require_max_degrees(max_degrees)?;
            let start = state.record(&text(start.0), &text(start.1))?.entity_id;
            let end = state.record(&text(end.0), &text(end.1))?.entity_id;
            Ok(state.path(start, end, &[]))
        })
    }

    fn find_path_by_record_id_with_avoids(
        &self,
        start: (&CStr, &CStr),
        end: (&CStr, &CStr),
        max_degrees: i64,
        avoid_record_keys: &CStr,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findPathByRecordIDWithAvoids", Some(flags), |state| {
            MockState::require_max_degrees(max_degrees)?;
            let start = state.record(&text(start.0), &text(start.1))?.entity_id;
            let end = state.record(&text(end.0), &text(end.1))?.entity_id;
            let avoid = state.record_keys(&parse_json(avoid_record_keys)?)?;
            Ok(state.path(start, end, &avoid))
        })
    }

    fn find_path_by_record_id_including_source(
        &self,
        start: (&CStr, &CStr),
        end: (&CStr, &CStr),
        max_degrees: i64,
        avoid_record_keys: &CStr,
        required_data_sources: &CStr,
        flags: i64,
    ) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_findPathByRecordIDIncludingSource", Some(flags), |state| {
            MockState::require_max_degrees(max_degrees)?;
            let start = state.record(&text(start.0), &text(start.1))?.entity_id;
            let end = state.record(&text(end.0), &text(end.1))?.entity_id;
            let avoid = if avoid_record_keys.to_bytes().is_empty() {
                Vec::new()
            } else {
                state.record_keys(&parse_json(avoid_record_keys)?)?
            };
            state.require_data_source_list(&parse_json(required_data_sources)?)?;
            Ok(state.path(start, end, &avoid))
        })
    }

    fn search_by_attributes(&self, attributes: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_searchByAttributes", Some(flags), |state| {
            state.search(&parse_json(attributes)?)
        })
    }

    fn search_by_attributes_with_profile(&self, attributes: &CStr, _search_profile: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_searchByAttributesWithProfile", Some(flags), |state| {
            state.search(&parse_json(attributes)?)
        })
    }

    fn why_entities(&self, entity_id1: i64, entity_id2: i64, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_whyEntities", Some(flags), |state| {
            state.require_entity(entity_id1)?;
            state.require_entity(entity_id2)?;
            Ok(state.why(&[entity_id1, entity_id2]))
        })
    }

    fn why_record_in_entity(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_whyRecordInEntity", Some(flags), |state| {
            let entity_id = state.record(&text(data_source_code), &text(record_id))?.entity_id;
            Ok(state.why(&[entity_id]))
        })
    }

    fn why_records(&self, first: (&CStr, &CStr), second: (&CStr, &CStr), flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_whyRecords", Some(flags), |state| {
            let first = state.record(&text(first.0), &text(first.1))?.entity_id;
            let second = state.record(&text(second.0), &text(second.1))?.entity_id;
            Ok(state.why(&[first, second]))
        })
    }

    fn why_search(&self, attributes: &CStr, entity_id: i64, _search_profile: &CStr, flags: i64) -> NativeResponse {
        self.call_text(Part::Engine, "Sz_whySearch", Some(flags), |state| {
            let request = parse_json(attributes)?;
            state.require_entity(entity_id)?;
            let mut why: Value = serde_json::from_str(&state.why(&[entity_id]))
                .map_err(|e| Fault::new(codes::INVALID_JSON, e.to_string()))?;
            why["SEARCH_REQUEST"] = json!({ "JSON_DATA": request });
            Ok(why.to_string())
        })
    }

    fn export_csv_entity_report(&self, csv_column_list: &CStr, flags: i64) -> NativeResponse<usize> {
        self.call(Part::Engine, "Sz_exportCSVEntityReport", Some(flags), |state| {
            let fragments = state.csv_export(&text(csv_column_list), SzFlags::from_bits(flags))?;
            Ok(state.open_export(fragments))
        })
    }

    fn export_json_entity_report(&self, flags: i64) -> NativeResponse<usize> {
        self.call(Part::Engine, "Sz_exportJSONEntityReport", Some(flags), |state| {
            let fragments = state.json_export(SzFlags::from_bits(flags));
            Ok(state.open_export(fragments))
        })
    }

    fn fetch_next(&self, export_handle: usize) -> NativeResponse {
        let response = self.call_text(Part::Engine, "Sz_fetchNext", None, |state| {
            let fragments = state.exports.get_mut(&export_handle).ok_or_else(|| {
                Fault::new(codes::INVALID_EXPORT_HANDLE, format!("Invalid export handle [{}]", export_handle))
            })?;
            match state.fetches_before_failure.as_mut() {
                Some(0) => {
                    return Err(Fault::new(
                        codes::DATABASE_CONNECTION_LOST,
                        "Database connection lost during export",
                    ))
                }
                Some(remaining) => *remaining -= 1,
                None => {}
            }
            Ok(fragments.pop_front().unwrap_or_default())
        });
        if response.return_code != 0 {
            return response;
        }
        // Success reports the fragment length.
        let length = i64::try_from(response.value.len()).unwrap_or(i64::MAX);
        NativeResponse::new(length, response.value)
    }

    fn close_export_report(&self, export_handle: usize) -> i64 {
        self.call_status(Part::Engine, "Sz_closeExportReport", |state| {
            if state.fail_close_export {
                return Err(Fault::new(codes::INVALID_EXPORT_HANDLE, "Export report could not be released"));
            }
            state.exports.remove(&export_handle).map(|_| ()).ok_or_else(|| {
                Fault::new(codes::INVALID_EXPORT_HANDLE, format!("Invalid export handle [{}]", export_handle))
            })
        })
    }
}

// ============================================================================
// Config
// ============================================================================

impl ConfigApi for MockSenzing {
    fn init(&self, _instance_name: &CStr, _settings: &CStr, _verbose_logging: i64) -> i64 {
        self.initialize(Part::Config, "SzConfig_init", 0)
    }

    fn destroy(&self) -> i64 {
        self.destroy_part(Part::Config, "SzConfig_destroy")
    }

    fn create(&self) -> NativeResponse<usize> {
        self.call(Part::Config, "SzConfig_create", None, |state| {
            let handle = state.next_config_handle;
            state.next_config_handle += 1;
            state.configs.insert(handle, ConfigDoc::template());
            Ok(handle)
        })
    }

    fn load(&self, config_definition: &CStr) -> NativeResponse<usize> {
        self.call(Part::Config, "SzConfig_load", None, |state| {
            let doc = ConfigDoc::parse(&text(config_definition))?;
            let handle = state.next_config_handle;
            state.next_config_handle += 1;
            state.configs.insert(handle, doc);
            Ok(handle)
        })
    }

    fn save(&self, config_handle: usize) -> NativeResponse {
        self.call_text(Part::Config, "SzConfig_save", None, |state| {
            Ok(state.config_doc(config_handle)?.to_json())
        })
    }

    fn close(&self, config_handle: usize) -> i64 {
        self.call_status(Part::Config, "SzConfig_close", |state| {
            state.config_doc(config_handle)?;
            state.configs.remove(&config_handle);
            Ok(())
        })
    }

    fn list_data_sources(&self, config_handle: usize) -> NativeResponse {
        self.call_text(Part::Config, "SzConfig_listDataSources", None, |state| {
            let doc = state.config_doc(config_handle)?;
            Ok(json!({ "DATA_SOURCES": doc.data_sources_json() }).to_string())
        })
    }

    fn add_data_source(&self, config_handle: usize, data_source_definition: &CStr) -> NativeResponse {
        self.call_text(Part::Config, "SzConfig_addDataSource", None, |state| {
            let code = MockState::data_source_code(data_source_definition)?;
            let doc = state.config_doc(config_handle)?;
            if doc.contains(&code) {
                return Err(Fault::new(
                    codes::DUPLICATE_DATA_SOURCE,
                    format!("Data source code [{}] already exists.", code),
                ));
            }
            let id = doc.push(&code);
            Ok(json!({ "DSRC_ID": id }).to_string())
        })
    }

    fn delete_data_source(&self, config_handle: usize, data_source_definition: &CStr) -> i64 {
        self.call_status(Part::Config, "SzConfig_deleteDataSource", |state| {
            let code = MockState::data_source_code(data_source_definition)?;
            let doc = state.config_doc(config_handle)?;
            if !doc.contains(&code) {
                return Err(Fault::new(
                    codes::UNKNOWN_DATA_SOURCE,
                    format!("Data source code [{}] does not exist.", code),
                ));
            }
            doc.data_sources.retain(|(_, c)| *c != code);
            Ok(())
        })
    }
}

// ============================================================================
// Config manager
// ============================================================================

impl ConfigManagerApi for MockSenzing {
    fn init(&self, _instance_name: &CStr, _settings: &CStr, _verbose_logging: i64) -> i64 {
        self.initialize(Part::ConfigManager, "SzConfigMgr_init", 0)
    }

    fn destroy(&self) -> i64 {
        self.destroy_part(Part::ConfigManager, "SzConfigMgr_destroy")
    }

    fn add_config(&self, config_definition: &CStr, config_comment: &CStr) -> NativeResponse<i64> {
        self.call(Part::ConfigManager, "SzConfigMgr_addConfig", None, |state| {
            let definition = text(config_definition);
            ConfigDoc::parse(&definition)?;
            let id = state.next_config_id;
            state.next_config_id += 1;
            state.registry.insert(
                id,
                RegisteredConfig {
                    definition,
                    comment: text(config_comment),
                    created: Utc::now().to_rfc3339(),
                },
            );
            Ok(id)
        })
    }

    fn get_config(&self, config_id: i64) -> NativeResponse {
        self.call_text(Part::ConfigManager, "SzConfigMgr_getConfig", None, |state| {
            state.require_registered(config_id)?;
            Ok(state.registry.get(&config_id).map(|c| c.definition.clone()).unwrap_or_default())
        })
    }

    fn get_config_list(&self) -> NativeResponse {
        self.call_text(Part::ConfigManager, "SzConfigMgr_getConfigList", None, |state| {
            let configs: Vec<Value> = state
                .registry
                .iter()
                .map(|(id, c)| json!({ "CONFIG_ID": id, "CONFIG_COMMENT": c.comment, "SYS_CREATE_DT": c.created }))
                .collect();
            Ok(json!({ "CONFIGS": configs }).to_string())
        })
    }

    fn get_default_config_id(&self) -> NativeResponse<i64> {
        self.call(Part::ConfigManager, "SzConfigMgr_getDefaultConfigID", None, |state| {
            Ok(state.default_config_id)
        })
    }

    fn set_default_config_id(&self, config_id: i64) -> i64 {
        self.call_status(Part::ConfigManager, "SzConfigMgr_setDefaultConfigID", |state| {
            state.require_registered(config_id)?;
            state.default_config_id = config_id;
            Ok(())
        })
    }

    fn replace_default_config_id(&self, current_default_config_id: i64, new_default_config_id: i64) -> i64 {
        self.call_status(Part::ConfigManager, "SzConfigMgr_replaceDefaultConfigID", |state| {
            if state.default_config_id != current_default_config_id {
                return Err(Fault::new(
                    codes::REPLACE_CONFLICT,
                    format!(
                        "Current configuration ID [{}] does not match specified data [{}]",
                        state.default_config_id, current_default_config_id
                    ),
                ));
            }
            state.require_registered(new_default_config_id)?;
            state.default_config_id = new_default_config_id;
            Ok(())
        })
    }
}

// ============================================================================
// Diagnostic
// ============================================================================

impl DiagnosticApi for MockSenzing {
    fn init(&self, _instance_name: &CStr, _settings: &CStr, _verbose_logging: i64) -> i64 {
        self.initialize(Part::Diagnostic, "SzDiagnostic_init", 0)
    }

    fn init_with_config_id(&self, _instance_name: &CStr, _settings: &CStr, config_id: i64, _verbose: i64) -> i64 {
        self.initialize(Part::Diagnostic, "SzDiagnostic_initWithConfigID", config_id)
    }

    fn reinit(&self, config_id: i64) -> i64 {
        self.call_status(Part::Diagnostic, "SzDiagnostic_reinit", |state| state.activate_config(config_id))
    }

    fn destroy(&self) -> i64 {
        self.destroy_part(Part::Diagnostic, "SzDiagnostic_destroy")
    }

    fn check_datastore_performance(&self, seconds_to_run: i64) -> NativeResponse {
        self.call_text(Part::Diagnostic, "SzDiagnostic_checkDatastorePerformance", None, |_| {
            if seconds_to_run < 0 {
                return Err(Fault::new(
                    codes::INVALID_ARGUMENT,
                    format!("Invalid seconds to run [{}]", seconds_to_run),
                ));
            }
            Ok(json!({ "numRecordsInserted": seconds_to_run * 1000, "insertTime": seconds_to_run * 1000 }).to_string())
        })
    }

    fn get_datastore_info(&self) -> NativeResponse {
        self.call_text(Part::Diagnostic, "SzDiagnostic_getDatastoreInfo", None, |_| {
            Ok(json!({ "dataStores": [{ "id": "CORE", "type": "sqlite3", "location": "memory" }] }).to_string())
        })
    }

    fn get_feature(&self, feature_id: i64) -> NativeResponse {
        self.call_text(Part::Diagnostic, "SzDiagnostic_getFeature", None, |_| {
            if feature_id <= 0 {
                return Err(Fault::new(codes::UNKNOWN_RECORD, format!("Unknown feature [{}]", feature_id)));
            }
            Ok(json!({ "LIB_FEAT_ID": feature_id, "FTYPE_CODE": "NAME", "ELEMENTS": [] }).to_string())
        })
    }

    fn purge_repository(&self) -> i64 {
        self.call_status(Part::Diagnostic, "SzDiagnostic_purgeRepository", |state| {
            state.records.clear();
            state.redo.clear();
            state.next_entity_id = 1;
            Ok(())
        })
    }
}

// ============================================================================
// Product
// ============================================================================

pub const MOCK_LICENSE: &str = r#"{"customer":"Senzing Public Test License","contract":"EVALUATION - support@senzing.com","issueDate":"2024-10-15","licenseType":"EVAL (Solely for non-productive use)","licenseLevel":"STANDARD","billing":"YEARLY","expireDate":"2025-10-16","recordLimit":50000}"#;

pub const MOCK_VERSION: &str = r#"{"PRODUCT_NAME":"Senzing SDK","VERSION":"4.0.0","BUILD_VERSION":"4.0.0.24289","BUILD_DATE":"2024-10-15","BUILD_NUMBER":"2024_10_15__14_00","COMPATIBILITY_VERSION":{"CONFIG_VERSION":"11"},"SCHEMA_VERSION":{"ENGINE_SCHEMA_VERSION":"4.0","MINIMUM_REQUIRED_SCHEMA_VERSION":"4.0","MAXIMUM_REQUIRED_SCHEMA_VERSION":"4.99"}}"#;

impl ProductApi for MockSenzing {
    fn init(&self, _instance_name: &CStr, _settings: &CStr, _verbose_logging: i64) -> i64 {
        self.initialize(Part::Product, "SzProduct_init", 0)
    }

    fn destroy(&self) -> i64 {
        self.destroy_part(Part::Product, "SzProduct_destroy")
    }

    fn get_license(&self) -> NativeResponse {
        self.call_text(Part::Product, "SzProduct_getLicense", None, |_| Ok(MOCK_LICENSE.to_string()))
    }

    fn get_version(&self) -> NativeResponse {
        self.call_text(Part::Product, "SzProduct_getVersion", None, |_| Ok(MOCK_VERSION.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::ffi::CString;

    fn c(value: &str) -> CString {
        CString::new(value).unwrap()
    }

    fn engine() -> MockSenzing {
        let mock = MockSenzing::new();
        assert_eq!(EngineApi::init(&mock, &c("test"), &c("{}"), 0), 0);
        mock
    }

    #[test]
    fn test_uninitialized_calls_fail() {
        let mock = MockSenzing::new();
        assert_eq!(EngineApi::prime_engine(&mock), FAILURE_STATUS);
        assert_eq!(mock.get_last_exception_code(), codes::NOT_INITIALIZED);
        assert_eq!(mock.clear_last_exception(), 0);
        assert_eq!(mock.get_last_exception_code(), 0);
    }

    #[test]
    fn test_add_and_get_record() {
        let mock = engine();
        let status = mock.add_record(&c("CUSTOMERS"), &c("1001"), &c(r#"{"NAME_FULL":"Robert Smith"}"#));
        assert_eq!(status, 0);
        let response = mock.get_record(&c("CUSTOMERS"), &c("1001"), 0);
        let value: Value = serde_json::from_slice(&response.value).unwrap();
        assert_eq!(value["RECORD_ID"], "1001");
        assert_eq!(value["JSON_DATA"]["NAME_FULL"], "Robert Smith");
    }

    #[test]
    fn test_conflicting_data_source() {
        let mock = engine();
        let status = mock.add_record(&c("CUSTOMERS"), &c("1001"), &c(r#"{"DATA_SOURCE":"BOB"}"#));
        assert_eq!(status, FAILURE_STATUS);
        assert_eq!(mock.get_last_exception_code(), codes::CONFLICTING_DATA_SOURCE);
        let message = String::from_utf8(mock.get_last_exception()).unwrap();
        assert!(message.contains("CUSTOMERS") && message.contains("BOB"));
    }

    #[test]
    fn test_fetch_next_reports_length() {
        let mock = engine();
        mock.add_record(&c("CUSTOMERS"), &c("1001"), &c("{}"));
        let handle = mock.export_json_entity_report(SzFlags::EXPORT_DEFAULT_FLAGS.bits());
        let first = mock.fetch_next(handle.value);
        assert_eq!(first.return_code, first.value.len() as i64);
        let end = mock.fetch_next(handle.value);
        assert_eq!(end.return_code, 0);
        assert!(end.value.is_empty());
    }

    #[test]
    fn test_config_doc_round_trip() {
        let doc = ConfigDoc::with_codes(&["CUSTOMERS"]);
        assert_eq!(ConfigDoc::parse(&doc.to_json()).unwrap(), doc);
        assert_eq!(doc.data_sources.last().unwrap(), &(1001, "CUSTOMERS".to_string()));
    }
}
