//! Error types and native exception classification.
//!
//! Every failing native call becomes an [`SzError::Native`] that carries the
//! native exception code, the native message and the wrapper function that
//! issued the call. The category of the error is looked up in an
//! [`ExceptionCodeTable`]; the table is vendor data and can be replaced.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix of every wrapper message identifier.
pub const MESSAGE_ID_PREFIX: &str = "SZSDK";

/// Builds a wrapper message identifier, e.g. `SZSDK60044001`.
pub fn message_id(component_id: u32, number: u32) -> String {
    format!("{}{:04}{:04}", MESSAGE_ID_PREFIX, component_id, number)
}

/// Formats a native exception code the way the vendor documents it.
pub fn exception_code(code: i64) -> String {
    format!("SENZ{:04}", code)
}

/// Category of a native failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SzErrorKind {
    BadInput,
    NotFound,
    UnknownDataSource,
    Configuration,
    Retryable,
    DatabaseConnectionLost,
    RetryTimeoutExceeded,
    Unrecoverable,
    Database,
    License,
    NotInitialized,
    UnhandledException,
    ReplaceConflict,
    General,
}

impl SzErrorKind {
    /// Bad input, including its not-found and unknown-data-source refinements.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            SzErrorKind::BadInput | SzErrorKind::NotFound | SzErrorKind::UnknownDataSource
        )
    }

    /// The same call may succeed if it is issued again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SzErrorKind::Retryable | SzErrorKind::DatabaseConnectionLost | SzErrorKind::RetryTimeoutExceeded
        )
    }

    /// The engine is unusable until it is reinitialized.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            SzErrorKind::Unrecoverable
                | SzErrorKind::Database
                | SzErrorKind::License
                | SzErrorKind::NotInitialized
                | SzErrorKind::UnhandledException
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SzErrorKind::BadInput => "BAD_INPUT",
            SzErrorKind::NotFound => "NOT_FOUND",
            SzErrorKind::UnknownDataSource => "UNKNOWN_DATA_SOURCE",
            SzErrorKind::Configuration => "CONFIGURATION",
            SzErrorKind::Retryable => "RETRYABLE",
            SzErrorKind::DatabaseConnectionLost => "DATABASE_CONNECTION_LOST",
            SzErrorKind::RetryTimeoutExceeded => "RETRY_TIMEOUT_EXCEEDED",
            SzErrorKind::Unrecoverable => "UNRECOVERABLE",
            SzErrorKind::Database => "DATABASE",
            SzErrorKind::License => "LICENSE",
            SzErrorKind::NotInitialized => "NOT_INITIALIZED",
            SzErrorKind::UnhandledException => "UNHANDLED_EXCEPTION",
            SzErrorKind::ReplaceConflict => "REPLACE_CONFLICT",
            SzErrorKind::General => "GENERAL",
        }
    }
}

impl FromStr for SzErrorKind {
    type Err = SzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [SzErrorKind; 14] = [
            SzErrorKind::BadInput,
            SzErrorKind::NotFound,
            SzErrorKind::UnknownDataSource,
            SzErrorKind::Configuration,
            SzErrorKind::Retryable,
            SzErrorKind::DatabaseConnectionLost,
            SzErrorKind::RetryTimeoutExceeded,
            SzErrorKind::Unrecoverable,
            SzErrorKind::Database,
            SzErrorKind::License,
            SzErrorKind::NotInitialized,
            SzErrorKind::UnhandledException,
            SzErrorKind::ReplaceConflict,
            SzErrorKind::General,
        ];
        ALL.into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SzError::config(format!("unknown error kind {}", s)))
    }
}

impl fmt::Display for SzErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured body of a native failure.
///
/// Displays as `{"function":...,"error":{"id":...,"reason":"SENZnnnn|..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub function: String,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub id: String,
    pub reason: String,
}

impl ErrorPayload {
    pub fn new(
        function: impl Into<String>,
        component_id: u32,
        error_number: u32,
        code: i64,
        message: &str,
    ) -> Self {
        Self {
            function: function.into(),
            error: ErrorDetail {
                id: message_id(component_id, error_number),
                reason: format!("{}|{}", exception_code(code), message),
            },
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Error type for all binding operations.
#[derive(Debug, Clone, Error)]
pub enum SzError {
    /// A native call returned a failure status.
    #[error("{payload}")]
    Native {
        kind: SzErrorKind,
        /// Native exception code read after the failing call
        code: i64,
        /// Status returned by the failing call
        status: i64,
        payload: ErrorPayload,
    },

    /// The client was used after `destroy`.
    #[error("this {component} has been destroyed")]
    Destroyed { component: &'static str },

    /// An argument could not be marshalled or validated.
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// A native response buffer was not valid UTF-8.
    #[error("{function}: native response is not valid UTF-8")]
    InvalidUtf8 { function: String },

    /// The observer registry rejected the operation.
    #[error("observer registry: {message}")]
    Observer { message: String },

    /// A streaming export was cancelled by its consumer.
    #[error("export stream cancelled")]
    Cancelled,

    /// Client configuration could not be loaded.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SzError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SzError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an observer registry error.
    pub fn observer(message: impl Into<String>) -> Self {
        SzError::Observer {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SzError::Config {
            message: message.into(),
        }
    }

    /// Category of a native failure, `None` for wrapper-side errors.
    pub fn kind(&self) -> Option<SzErrorKind> {
        match self {
            SzError::Native { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Native exception code, if this error came from the native layer.
    pub fn code(&self) -> Option<i64> {
        match self {
            SzError::Native { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The `SENZnnnn|message` reason of a native failure.
    pub fn reason(&self) -> Option<&str> {
        match self {
            SzError::Native { payload, .. } => Some(&payload.error.reason),
            _ => None,
        }
    }

    pub fn is_bad_input(&self) -> bool {
        self.kind().is_some_and(|k| k.is_bad_input())
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(SzErrorKind::NotFound)
    }

    pub fn is_unknown_data_source(&self) -> bool {
        self.kind() == Some(SzErrorKind::UnknownDataSource)
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == Some(SzErrorKind::Configuration)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(|k| k.is_retryable())
    }

    pub fn is_unrecoverable(&self) -> bool {
        self.kind().is_some_and(|k| k.is_unrecoverable())
    }
}

/// Result type for binding operations.
pub type SzResult<T> = Result<T, SzError>;

/// Mapping from native exception codes to [`SzErrorKind`].
///
/// The authoritative table is versioned vendor data. [`Default`] provides a
/// partial seed covering the codes this crate relies on; load the vendor
/// table with [`ExceptionCodeTable::from_json`] for full coverage. Codes
/// missing from the table classify as [`SzErrorKind::General`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionCodeTable {
    kinds: HashMap<i64, SzErrorKind>,
}

const SEED: &[(SzErrorKind, &[i64])] = &[
    (
        SzErrorKind::BadInput,
        &[2, 3, 7, 22, 23, 24, 25, 26, 27, 32, 34, 35, 36, 61, 62, 63, 64, 87, 88, 3103],
    ),
    (SzErrorKind::NotFound, &[33, 37]),
    (SzErrorKind::UnknownDataSource, &[2207]),
    (SzErrorKind::Configuration, &[2131, 7220, 7221]),
    (SzErrorKind::ReplaceConflict, &[7245]),
    (SzErrorKind::DatabaseConnectionLost, &[1006, 1007]),
    (SzErrorKind::Database, &[1000, 1001, 1002, 1003, 1004, 1005]),
    (SzErrorKind::NotInitialized, &[48, 53]),
    (SzErrorKind::License, &[9000]),
    (SzErrorKind::UnhandledException, &[1, 999]),
];

impl ExceptionCodeTable {
    /// A table that classifies everything as [`SzErrorKind::General`].
    pub fn empty() -> Self {
        Self { kinds: HashMap::new() }
    }

    /// Parses a table of the form `{"BAD_INPUT": [2, 7], "NOT_FOUND": [33]}`.
    ///
    /// # Errors
    ///
    /// Returns [`SzError::Config`] if the document is not such a map.
    pub fn from_json(json: &str) -> SzResult<Self> {
        let groups: HashMap<String, Vec<i64>> = serde_json::from_str(json)
            .map_err(|e| SzError::config(format!("invalid exception code table: {}", e)))?;
        let mut table = Self::empty();
        for (name, codes) in groups {
            let kind: SzErrorKind = name.parse()?;
            for code in codes {
                table.insert(code, kind);
            }
        }
        Ok(table)
    }

    /// Adds or replaces the classification of one code.
    pub fn insert(&mut self, code: i64, kind: SzErrorKind) {
        self.kinds.insert(code, kind);
    }

    /// Merges another table into this one; entries in `other` win.
    pub fn extend(&mut self, other: &ExceptionCodeTable) {
        self.kinds.extend(other.kinds.iter().map(|(c, k)| (*c, *k)));
    }

    pub fn classify(&self, code: i64) -> SzErrorKind {
        self.kinds.get(&code).copied().unwrap_or(SzErrorKind::General)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for ExceptionCodeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (kind, codes) in SEED {
            for code in *codes {
                table.insert(*code, *kind);
            }
        }
        table
    }
}
