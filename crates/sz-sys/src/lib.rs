//! Raw FFI declarations for the Senzing `libSz` native library.
//!
//! This crate only declares the C ABI. It performs no marshalling and holds no
//! state; the safe wrappers live in `sz-sdk`.
//!
//! # Response buffers
//!
//! Data-bearing entry points take a `char**` buffer, a `size_t*` length and a
//! resize callback. The library grows the buffer through the callback, so the
//! buffer must come from the C allocator and must be released with
//! [`libc::free`] once its contents have been copied out. [`sz_resize_buffer`]
//! is the callback to pass.
//!
//! # Linking
//!
//! The `extern "C"` blocks are only compiled with the `link-libsz` feature.
//! See `build.rs` for the library search path.

use libc::{c_char, c_void, size_t};

/// Opaque export cursor returned by the export entry points (`uintptr_t`).
pub type ExportHandle = usize;

/// Opaque in-memory configuration handle (`uintptr_t`).
pub type ConfigHandle = usize;

/// Signature of the buffer resize callback (`void *(*)(void *, size_t)`).
pub type ResizeFn = unsafe extern "C" fn(ptr: *mut c_void, new_size: size_t) -> *mut c_void;

/// Resize callback handed to every data-bearing entry point.
///
/// # Safety
///
/// `ptr` must be null or a pointer previously returned by the C allocator.
pub unsafe extern "C" fn sz_resize_buffer(ptr: *mut c_void, new_size: size_t) -> *mut c_void {
    libc::realloc(ptr, new_size)
}

// =============================================================================
// Engine (Sz_*)
// =============================================================================

#[cfg(feature = "link-libsz")]
extern "C" {
    pub fn Sz_init(instance_name: *const c_char, settings: *const c_char, verbose_logging: i64) -> i64;
    pub fn Sz_initWithConfigID(
        instance_name: *const c_char,
        settings: *const c_char,
        config_id: i64,
        verbose_logging: i64,
    ) -> i64;
    pub fn Sz_reinit(config_id: i64) -> i64;
    pub fn Sz_destroy() -> i64;
    pub fn Sz_primeEngine() -> i64;
    pub fn Sz_getActiveConfigID(config_id: *mut i64) -> i64;
    pub fn Sz_getStats(response: *mut *mut c_char, size: *mut size_t, resize: ResizeFn) -> i64;

    pub fn Sz_addRecord(data_source_code: *const c_char, record_id: *const c_char, json_data: *const c_char) -> i64;
    pub fn Sz_addRecordWithInfo(
        data_source_code: *const c_char,
        record_id: *const c_char,
        json_data: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_deleteRecord(data_source_code: *const c_char, record_id: *const c_char) -> i64;
    pub fn Sz_deleteRecordWithInfo(
        data_source_code: *const c_char,
        record_id: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_reevaluateRecord(data_source_code: *const c_char, record_id: *const c_char, flags: i64) -> i64;
    pub fn Sz_reevaluateRecordWithInfo(
        data_source_code: *const c_char,
        record_id: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_reevaluateEntity(entity_id: i64, flags: i64) -> i64;
    pub fn Sz_reevaluateEntityWithInfo(
        entity_id: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;

    pub fn Sz_countRedoRecords() -> i64;
    pub fn Sz_getRedoRecord(response: *mut *mut c_char, size: *mut size_t, resize: ResizeFn) -> i64;
    pub fn Sz_processRedoRecord(redo_record: *const c_char) -> i64;
    pub fn Sz_processRedoRecordWithInfo(
        redo_record: *const c_char,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;

    pub fn Sz_getEntityByEntityID_V2(
        entity_id: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_getEntityByRecordID_V2(
        data_source_code: *const c_char,
        record_id: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_getRecord_V2(
        data_source_code: *const c_char,
        record_id: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_getRecordPreview(
        record_definition: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_getVirtualEntityByRecordID_V2(
        record_list: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_howEntityByEntityID_V2(
        entity_id: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;

    pub fn Sz_findInterestingEntitiesByEntityID(
        entity_id: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_findInterestingEntitiesByRecordID(
        data_source_code: *const c_char,
        record_id: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_findNetworkByEntityID_V2(
        entity_list: *const c_char,
        max_degrees: i64,
        build_out_degrees: i64,
        build_out_max_entities: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_findNetworkByRecordID_V2(
        record_list: *const c_char,
        max_degrees: i64,
        build_out_degrees: i64,
        build_out_max_entities: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;

    pub fn Sz_findPathByEntityID_V2(
        start_entity_id: i64,
        end_entity_id: i64,
        max_degrees: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_findPathByEntityIDWithAvoids_V2(
        start_entity_id: i64,
        end_entity_id: i64,
        max_degrees: i64,
        avoided_entities: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_findPathByEntityIDIncludingSource_V2(
        start_entity_id: i64,
        end_entity_id: i64,
        max_degrees: i64,
        avoided_entities: *const c_char,
        required_data_sources: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_findPathByRecordID_V2(
        start_data_source_code: *const c_char,
        start_record_id: *const c_char,
        end_data_source_code: *const c_char,
        end_record_id: *const c_char,
        max_degrees: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_findPathByRecordIDWithAvoids_V2(
        start_data_source_code: *const c_char,
        start_record_id: *const c_char,
        end_data_source_code: *const c_char,
        end_record_id: *const c_char,
        max_degrees: i64,
        avoided_records: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_findPathByRecordIDIncludingSource_V2(
        start_data_source_code: *const c_char,
        start_record_id: *const c_char,
        end_data_source_code: *const c_char,
        end_record_id: *const c_char,
        max_degrees: i64,
        avoided_records: *const c_char,
        required_data_sources: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;

    pub fn Sz_searchByAttributes_V2(
        attributes: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_searchByAttributes_V3(
        attributes: *const c_char,
        search_profile: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;

    pub fn Sz_whyEntities_V2(
        entity_id1: i64,
        entity_id2: i64,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_whyRecordInEntity_V2(
        data_source_code: *const c_char,
        record_id: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_whyRecords_V2(
        data_source_code1: *const c_char,
        record_id1: *const c_char,
        data_source_code2: *const c_char,
        record_id2: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn Sz_whySearch_V2(
        attributes: *const c_char,
        entity_id: i64,
        search_profile: *const c_char,
        flags: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;

    pub fn Sz_exportCSVEntityReport(csv_column_list: *const c_char, flags: i64, handle: *mut ExportHandle) -> i64;
    pub fn Sz_exportJSONEntityReport(flags: i64, handle: *mut ExportHandle) -> i64;
    /// Returns the number of bytes written, zero at end of report, negative on error.
    pub fn Sz_fetchNext(handle: ExportHandle, response: *mut c_char, size: size_t) -> i64;
    pub fn Sz_closeExportReport(handle: ExportHandle) -> i64;

    pub fn Sz_getLastException(buffer: *mut c_char, size: size_t) -> i64;
    pub fn Sz_getLastExceptionCode() -> i64;
    pub fn Sz_clearLastException();
}

// =============================================================================
// Configuration (SzConfig_*)
// =============================================================================

#[cfg(feature = "link-libsz")]
extern "C" {
    pub fn SzConfig_init(instance_name: *const c_char, settings: *const c_char, verbose_logging: i64) -> i64;
    pub fn SzConfig_destroy() -> i64;
    pub fn SzConfig_create(handle: *mut ConfigHandle) -> i64;
    pub fn SzConfig_load(config_definition: *const c_char, handle: *mut ConfigHandle) -> i64;
    pub fn SzConfig_save(handle: ConfigHandle, response: *mut *mut c_char, size: *mut size_t, resize: ResizeFn)
        -> i64;
    pub fn SzConfig_close(handle: ConfigHandle) -> i64;
    pub fn SzConfig_listDataSources(
        handle: ConfigHandle,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn SzConfig_addDataSource(
        handle: ConfigHandle,
        data_source_definition: *const c_char,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn SzConfig_deleteDataSource(handle: ConfigHandle, data_source_definition: *const c_char) -> i64;

    pub fn SzConfig_getLastException(buffer: *mut c_char, size: size_t) -> i64;
    pub fn SzConfig_getLastExceptionCode() -> i64;
    pub fn SzConfig_clearLastException();
}

// =============================================================================
// Configuration manager (SzConfigMgr_*)
// =============================================================================

#[cfg(feature = "link-libsz")]
extern "C" {
    pub fn SzConfigMgr_init(instance_name: *const c_char, settings: *const c_char, verbose_logging: i64) -> i64;
    pub fn SzConfigMgr_destroy() -> i64;
    pub fn SzConfigMgr_addConfig(
        config_definition: *const c_char,
        config_comment: *const c_char,
        config_id: *mut i64,
    ) -> i64;
    pub fn SzConfigMgr_getConfig(
        config_id: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn SzConfigMgr_getConfigList(response: *mut *mut c_char, size: *mut size_t, resize: ResizeFn) -> i64;
    pub fn SzConfigMgr_getDefaultConfigID(config_id: *mut i64) -> i64;
    pub fn SzConfigMgr_setDefaultConfigID(config_id: i64) -> i64;
    pub fn SzConfigMgr_replaceDefaultConfigID(current_default_config_id: i64, new_default_config_id: i64) -> i64;

    pub fn SzConfigMgr_getLastException(buffer: *mut c_char, size: size_t) -> i64;
    pub fn SzConfigMgr_getLastExceptionCode() -> i64;
    pub fn SzConfigMgr_clearLastException();
}

// =============================================================================
// Diagnostic (SzDiagnostic_*)
// =============================================================================

#[cfg(feature = "link-libsz")]
extern "C" {
    pub fn SzDiagnostic_init(instance_name: *const c_char, settings: *const c_char, verbose_logging: i64) -> i64;
    pub fn SzDiagnostic_initWithConfigID(
        instance_name: *const c_char,
        settings: *const c_char,
        config_id: i64,
        verbose_logging: i64,
    ) -> i64;
    pub fn SzDiagnostic_reinit(config_id: i64) -> i64;
    pub fn SzDiagnostic_destroy() -> i64;
    pub fn SzDiagnostic_checkDatastorePerformance(
        seconds_to_run: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn SzDiagnostic_getDatastoreInfo(response: *mut *mut c_char, size: *mut size_t, resize: ResizeFn) -> i64;
    pub fn SzDiagnostic_getFeature(
        feature_id: i64,
        response: *mut *mut c_char,
        size: *mut size_t,
        resize: ResizeFn,
    ) -> i64;
    pub fn SzDiagnostic_purgeRepository() -> i64;

    pub fn SzDiagnostic_getLastException(buffer: *mut c_char, size: size_t) -> i64;
    pub fn SzDiagnostic_getLastExceptionCode() -> i64;
    pub fn SzDiagnostic_clearLastException();
}

// =============================================================================
// Product (SzProduct_*)
// =============================================================================

#[cfg(feature = "link-libsz")]
extern "C" {
    pub fn SzProduct_init(instance_name: *const c_char, settings: *const c_char, verbose_logging: i64) -> i64;
    pub fn SzProduct_destroy() -> i64;
    /// Returns a pointer to a static, library-owned string. Do not free.
    pub fn SzProduct_getLicense() -> *const c_char;
    /// Returns a pointer to a static, library-owned string. Do not free.
    pub fn SzProduct_getVersion() -> *const c_char;

    pub fn SzProduct_getLastException(buffer: *mut c_char, size: size_t) -> i64;
    pub fn SzProduct_getLastExceptionCode() -> i64;
    pub fn SzProduct_clearLastException();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_buffer_allocates_and_grows() {
        unsafe {
            let first = sz_resize_buffer(std::ptr::null_mut(), 16);
            assert!(!first.is_null());
            let grown = sz_resize_buffer(first, 4096);
            assert!(!grown.is_null());
            libc::free(grown);
        }
    }
}
