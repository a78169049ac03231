//! The seam between the safe clients and the vendor C ABI.
//!
//! Each vendor component is described by one trait. Arguments arrive already
//! marshalled as `&CStr`, and results come back as a raw status plus, for
//! data-bearing calls, the response bytes copied out of the native buffer.
//! Nothing here interprets a status; classification happens in the clients.
//!
//! [`LibSz`](crate::libsz::LibSz) implements these traits over `sz-sys`.
//! Tests implement them in memory.

use crate::error::{SzError, SzResult};
use libc::c_char;
use parking_lot::{Mutex, MutexGuard};
use std::ffi::{CStr, CString};
use std::sync::Arc;

/// Status returned by a successful native call.
pub const NO_ERROR: i64 = 0;

/// Serializes every native call together with its exception post-mortem.
///
/// The vendor's last-exception state is process-global, so the status check,
/// the exception reads and the clear must not interleave with another call.
static NATIVE_CALL_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Acquires the process-wide native call lock.
pub(crate) fn native_call_lock() -> MutexGuard<'static, ()> {
    NATIVE_CALL_LOCK.lock()
}

/// Marshals a string argument into a NUL-terminated C string.
pub(crate) fn c_arg(name: &str, value: &str) -> SzResult<CString> {
    CString::new(value).map_err(|_| SzError::invalid_argument(name, "contains an interior NUL byte"))
}

/// Raw result of a data-bearing native call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeResponse<T = Vec<u8>> {
    pub return_code: i64,
    pub value: T,
}

impl<T> NativeResponse<T> {
    pub fn new(return_code: i64, value: T) -> Self {
        Self { return_code, value }
    }

    pub fn ok(value: T) -> Self {
        Self::new(NO_ERROR, value)
    }
}

impl<T: Default> NativeResponse<T> {
    pub fn failed(return_code: i64) -> Self {
        Self::new(return_code, T::default())
    }
}

/// Owner of a response buffer allocated by the native library.
///
/// The buffer is released with `free` when the guard is dropped, whether or
/// not its contents were copied out successfully.
#[cfg_attr(not(feature = "link-libsz"), allow(dead_code))]
pub(crate) struct NativeBuffer {
    ptr: *mut c_char,
    size: libc::size_t,
}

#[cfg_attr(not(feature = "link-libsz"), allow(dead_code))]
impl NativeBuffer {
    pub(crate) fn new() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            size: 0,
        }
    }

    /// Pointer slot handed to the native call.
    pub(crate) fn ptr_mut(&mut self) -> *mut *mut c_char {
        &mut self.ptr
    }

    /// Size slot handed to the native call.
    pub(crate) fn size_mut(&mut self) -> *mut libc::size_t {
        &mut self.size
    }

    /// Copies the NUL-terminated contents out. A null buffer yields no bytes.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        if self.ptr.is_null() {
            return Vec::new();
        }
        // Safety: the native library NUL-terminates every response buffer it
        // allocates, and the pointer stays valid until drop.
        unsafe { CStr::from_ptr(self.ptr) }.to_bytes().to_vec()
    }
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            // Safety: the buffer was allocated through the C allocator via
            // sz_resize_buffer and is owned exclusively by this guard.
            unsafe { libc::free(self.ptr.cast()) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Access to a component's last-exception state.
pub trait ExceptionApi: Send + Sync {
    fn get_last_exception_code(&self) -> i64;

    /// Message of the last exception, without the trailing NUL.
    fn get_last_exception(&self) -> Vec<u8>;

    /// Clears the last exception; non-zero means the clear itself failed.
    fn clear_last_exception(&self) -> i64;
}

/// Engine entry points (`Sz_*`).
pub trait EngineApi: ExceptionApi {
    fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64;
    fn init_with_config_id(&self, instance_name: &CStr, settings: &CStr, config_id: i64, verbose_logging: i64)
        -> i64;
    fn reinit(&self, config_id: i64) -> i64;
    fn destroy(&self) -> i64;
    fn prime_engine(&self) -> i64;
    fn get_active_config_id(&self) -> NativeResponse<i64>;
    fn get_stats(&self) -> NativeResponse;

    fn add_record(&self, data_source_code: &CStr, record_id: &CStr, record_definition: &CStr) -> i64;
    fn add_record_with_info(
        &self,
        data_source_code: &CStr,
        record_id: &CStr,
        record_definition: &CStr,
        flags: i64,
    ) -> NativeResponse;
    fn delete_record(&self, data_source_code: &CStr, record_id: &CStr) -> i64;
    fn delete_record_with_info(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse;
    fn reevaluate_record(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> i64;
    fn reevaluate_record_with_info(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse;
    fn reevaluate_entity(&self, entity_id: i64, flags: i64) -> i64;
    fn reevaluate_entity_with_info(&self, entity_id: i64, flags: i64) -> NativeResponse;

    /// Returns the count, or a negative status on failure.
    fn count_redo_records(&self) -> i64;
    fn get_redo_record(&self) -> NativeResponse;
    fn process_redo_record(&self, redo_record: &CStr) -> i64;
    fn process_redo_record_with_info(&self, redo_record: &CStr) -> NativeResponse;

    fn get_entity_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse;
    fn get_entity_by_record_id(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse;
    fn get_record(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse;
    fn get_record_preview(&self, record_definition: &CStr, flags: i64) -> NativeResponse;
    fn get_virtual_entity_by_record_id(&self, record_keys: &CStr, flags: i64) -> NativeResponse;
    fn how_entity_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse;

    fn find_interesting_entities_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse;
    fn find_interesting_entities_by_record_id(
        &self,
        data_source_code: &CStr,
        record_id: &CStr,
        flags: i64,
    ) -> NativeResponse;
    fn find_network_by_entity_id(
        &self,
        entity_ids: &CStr,
        max_degrees: i64,
        build_out_degrees: i64,
        build_out_max_entities: i64,
        flags: i64,
    ) -> NativeResponse;
    fn find_network_by_record_id(
        &self,
        record_keys: &CStr,
        max_degrees: i64,
        build_out_degrees: i64,
        build_out_max_entities: i64,
        flags: i64,
    ) -> NativeResponse;

    fn find_path_by_entity_id(&self, start_entity_id: i64, end_entity_id: i64, max_degrees: i64, flags: i64)
        -> NativeResponse;
    fn find_path_by_entity_id_with_avoids(
        &self,
        start_entity_id: i64,
        end_entity_id: i64,
        max_degrees: i64,
        avoid_entity_ids: &CStr,
        flags: i64,
    ) -> NativeResponse;
    fn find_path_by_entity_id_including_source(
        &self,
        start_entity_id: i64,
        end_entity_id: i64,
        max_degrees: i64,
        avoid_entity_ids: &CStr,
        required_data_sources: &CStr,
        flags: i64,
    ) -> NativeResponse;
    fn find_path_by_record_id(
        &self,
        start: (&CStr, &CStr),
        end: (&CStr, &CStr),
        max_degrees: i64,
        flags: i64,
    ) -> NativeResponse;
    fn find_path_by_record_id_with_avoids(
        &self,
        start: (&CStr, &CStr),
        end: (&CStr, &CStr),
        max_degrees: i64,
        avoid_record_keys: &CStr,
        flags: i64,
    ) -> NativeResponse;
    fn find_path_by_record_id_including_source(
        &self,
        start: (&CStr, &CStr),
        end: (&CStr, &CStr),
        max_degrees: i64,
        avoid_record_keys: &CStr,
        required_data_sources: &CStr,
        flags: i64,
    ) -> NativeResponse;

    fn search_by_attributes(&self, attributes: &CStr, flags: i64) -> NativeResponse;
    fn search_by_attributes_with_profile(&self, attributes: &CStr, search_profile: &CStr, flags: i64)
        -> NativeResponse;

    fn why_entities(&self, entity_id1: i64, entity_id2: i64, flags: i64) -> NativeResponse;
    fn why_record_in_entity(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse;
    fn why_records(&self, first: (&CStr, &CStr), second: (&CStr, &CStr), flags: i64) -> NativeResponse;
    fn why_search(&self, attributes: &CStr, entity_id: i64, search_profile: &CStr, flags: i64) -> NativeResponse;

    fn export_csv_entity_report(&self, csv_column_list: &CStr, flags: i64) -> NativeResponse<usize>;
    fn export_json_entity_report(&self, flags: i64) -> NativeResponse<usize>;
    /// A negative status means failure; an empty value means end of report.
    fn fetch_next(&self, export_handle: usize) -> NativeResponse;
    fn close_export_report(&self, export_handle: usize) -> i64;
}

/// Configuration entry points (`SzConfig_*`).
pub trait ConfigApi: ExceptionApi {
    fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64;
    fn destroy(&self) -> i64;
    fn create(&self) -> NativeResponse<usize>;
    fn load(&self, config_definition: &CStr) -> NativeResponse<usize>;
    fn save(&self, config_handle: usize) -> NativeResponse;
    fn close(&self, config_handle: usize) -> i64;
    fn list_data_sources(&self, config_handle: usize) -> NativeResponse;
    fn add_data_source(&self, config_handle: usize, data_source_definition: &CStr) -> NativeResponse;
    fn delete_data_source(&self, config_handle: usize, data_source_definition: &CStr) -> i64;
}

/// Configuration manager entry points (`SzConfigMgr_*`).
pub trait ConfigManagerApi: ExceptionApi {
    fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64;
    fn destroy(&self) -> i64;
    fn add_config(&self, config_definition: &CStr, config_comment: &CStr) -> NativeResponse<i64>;
    fn get_config(&self, config_id: i64) -> NativeResponse;
    fn get_config_list(&self) -> NativeResponse;
    fn get_default_config_id(&self) -> NativeResponse<i64>;
    fn set_default_config_id(&self, config_id: i64) -> i64;
    fn replace_default_config_id(&self, current_default_config_id: i64, new_default_config_id: i64) -> i64;
}

/// Diagnostic entry points (`SzDiagnostic_*`).
pub trait DiagnosticApi: ExceptionApi {
    fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64;
    fn init_with_config_id(&self, instance_name: &CStr, settings: &CStr, config_id: i64, verbose_logging: i64)
        -> i64;
    fn reinit(&self, config_id: i64) -> i64;
    fn destroy(&self) -> i64;
    fn check_datastore_performance(&self, seconds_to_run: i64) -> NativeResponse;
    fn get_datastore_info(&self) -> NativeResponse;
    fn get_feature(&self, feature_id: i64) -> NativeResponse;
    fn purge_repository(&self) -> i64;
}

/// Product entry points (`SzProduct_*`).
pub trait ProductApi: ExceptionApi {
    fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64;
    fn destroy(&self) -> i64;
    fn get_license(&self) -> NativeResponse;
    fn get_version(&self) -> NativeResponse;
}

/// A complete native library: one implementation per vendor component.
pub trait NativeLibrary: Send + Sync {
    fn engine(&self) -> Arc<dyn EngineApi>;
    fn config(&self) -> Arc<dyn ConfigApi>;
    fn config_manager(&self) -> Arc<dyn ConfigManagerApi>;
    fn diagnostic(&self) -> Arc<dyn DiagnosticApi>;
    fn product(&self) -> Arc<dyn ProductApi>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_c_arg_rejects_interior_nul() {
        assert!(c_arg("record_id", "1001").is_ok());
        let err = c_arg("record_id", "10\001").unwrap_err();
        assert!(matches!(err, SzError::InvalidArgument { ref name, .. } if name == "record_id"));
    }

    #[test]
    fn test_native_response_constructors() {
        let ok: NativeResponse<i64> = NativeResponse::ok(42);
        assert_eq!(ok.return_code, NO_ERROR);
        let failed: NativeResponse = NativeResponse::failed(-2);
        assert_eq!(failed.return_code, -2);
        assert!(failed.value.is_empty());
    }

    #[test]
    fn test_native_buffer_copies_and_frees() {
        let mut buffer = NativeBuffer::new();
        assert!(buffer.to_bytes().is_empty());
        unsafe {
            let raw = libc::malloc(6).cast::<c_char>();
            assert!(!raw.is_null());
            std::ptr::copy_nonoverlapping(b"hello\0".as_ptr().cast::<c_char>(), raw, 6);
            *buffer.ptr_mut() = raw;
            *buffer.size_mut() = 6;
        }
        assert_eq!(buffer.to_bytes(), b"hello".to_vec());
        drop(buffer);
    }

    #[test]
    fn test_native_call_lock_released_on_drop() {
        {
            let _guard = native_call_lock();
        }
        let _again = native_call_lock();
    }
}
