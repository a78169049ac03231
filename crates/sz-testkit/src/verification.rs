//! Verification helpers for binding errors and response documents

use serde_json::Value;
use sz_sdk::{exception_code, SzError, SzErrorKind};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected a native error, got: {0}")]
    NotNative(String),

    #[error("Expected error kind {expected}, got {actual}")]
    KindMismatch { expected: SzErrorKind, actual: SzErrorKind },

    #[error("Expected native code {expected}, got {actual}")]
    CodeMismatch { expected: String, actual: String },

    #[error("Response is not JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Expected field '{path}' not found in response")]
    FieldNotFound { path: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Verify that `error` is a native failure of the given kind and code
pub fn verify_native_error(error: &SzError, kind: SzErrorKind, code: i64) -> VerifyResult<()> {
    let (Some(actual_kind), Some(actual_code)) = (error.kind(), error.code()) else {
        return Err(VerificationError::NotNative(error.to_string()));
    };
    if actual_kind != kind {
        return Err(VerificationError::KindMismatch {
            expected: kind,
            actual: actual_kind,
        });
    }
    if actual_code != code {
        return Err(VerificationError::CodeMismatch {
            expected: exception_code(code),
            actual: exception_code(actual_code),
        });
    }
    Ok(())
}

/// Parse a response and fetch a value by JSON pointer, e.g. `/RESOLVED_ENTITY/ENTITY_ID`
pub fn response_field(response: &str, pointer: &str) -> VerifyResult<Value> {
    let document: Value = serde_json::from_str(response)?;
    document
        .pointer(pointer)
        .cloned()
        .ok_or_else(|| VerificationError::FieldNotFound {
            path: pointer.to_string(),
        })
}

/// Entity id of a `get_entity_*` response
pub fn entity_id_of(response: &str) -> VerifyResult<i64> {
    let value = response_field(response, "/RESOLVED_ENTITY/ENTITY_ID")?;
    value.as_i64().ok_or_else(|| VerificationError::FieldNotFound {
        path: "/RESOLVED_ENTITY/ENTITY_ID".to_string(),
    })
}
