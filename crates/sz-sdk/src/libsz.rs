//! Production [`NativeLibrary`] backed by the vendor `libSz`.
//!
//! With the `link-libsz` feature every trait method forwards to the matching
//! `sz-sys` declaration. Without it, [`LibSz::load`] fails so that callers can
//! fall back to another implementation.

use crate::error::SzResult;
use crate::native::NativeLibrary;
use std::sync::Arc;

/// Handle on the process-wide native library.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibSz;

#[cfg(not(feature = "link-libsz"))]
impl LibSz {
    /// Returns the linked native library.
    ///
    /// # Errors
    ///
    /// Always fails: this build was compiled without `link-libsz`.
    pub fn load() -> SzResult<Arc<dyn NativeLibrary>> {
        tracing::warn!("libSz is not linked (link-libsz feature disabled)");
        Err(crate::error::SzError::config(
            "libSz is not linked; rebuild sz-sdk with the link-libsz feature",
        ))
    }
}

#[cfg(feature = "link-libsz")]
impl LibSz {
    /// Returns the linked native library.
    pub fn load() -> SzResult<Arc<dyn NativeLibrary>> {
        Ok(Arc::new(LibSz))
    }
}

#[cfg(feature = "link-libsz")]
pub use linked::{LibSzConfig, LibSzConfigManager, LibSzDiagnostic, LibSzEngine, LibSzProduct};

#[cfg(feature = "link-libsz")]
impl NativeLibrary for LibSz {
    fn engine(&self) -> Arc<dyn crate::native::EngineApi> {
        Arc::new(LibSzEngine)
    }

    fn config(&self) -> Arc<dyn crate::native::ConfigApi> {
        Arc::new(LibSzConfig)
    }

    fn config_manager(&self) -> Arc<dyn crate::native::ConfigManagerApi> {
        Arc::new(LibSzConfigManager)
    }

    fn diagnostic(&self) -> Arc<dyn crate::native::DiagnosticApi> {
        Arc::new(LibSzDiagnostic)
    }

    fn product(&self) -> Arc<dyn crate::native::ProductApi> {
        Arc::new(LibSzProduct)
    }
}

#[cfg(feature = "link-libsz")]
mod linked {
    use crate::native::{
        ConfigApi, ConfigManagerApi, DiagnosticApi, EngineApi, ExceptionApi, NativeBuffer, NativeResponse,
        ProductApi,
    };
    use libc::{c_char, size_t};
    use std::ffi::CStr;
    use sz_sys as sys;

    /// Size of the buffers used for last-exception messages and export fragments.
    const FIXED_BUFFER_SIZE: usize = 65_535;

    /// Runs a data-bearing call with a freshly owned response buffer.
    fn with_buffer(call: impl FnOnce(*mut *mut c_char, *mut size_t, sys::ResizeFn) -> i64) -> NativeResponse {
        let mut buffer = NativeBuffer::new();
        let return_code = call(buffer.ptr_mut(), buffer.size_mut(), sys::sz_resize_buffer);
        NativeResponse::new(return_code, buffer.to_bytes())
    }

    /// Runs a call that fills a caller-owned fixed buffer.
    fn with_fixed_buffer(call: impl FnOnce(*mut c_char, size_t) -> i64) -> (i64, Vec<u8>) {
        let mut buffer = vec![0u8; FIXED_BUFFER_SIZE];
        let return_code = call(buffer.as_mut_ptr().cast(), buffer.len());
        let end = buffer.iter().position(|b| *b == 0).unwrap_or(buffer.len());
        buffer.truncate(end);
        (return_code, buffer)
    }

    fn with_out<T: Default>(call: impl FnOnce(*mut T) -> i64) -> NativeResponse<T> {
        let mut value = T::default();
        let return_code = call(&mut value);
        NativeResponse::new(return_code, value)
    }

    macro_rules! exception_api {
        ($ty:ty, $code:path, $message:path, $clear:path) => {
            impl ExceptionApi for $ty {
                fn get_last_exception_code(&self) -> i64 {
                    // Safety: no arguments; reads library-global state.
                    unsafe { $code() }
                }

                fn get_last_exception(&self) -> Vec<u8> {
                    // Safety: the buffer outlives the call and its length is passed along.
                    with_fixed_buffer(|buf, size| unsafe { $message(buf, size) }).1
                }

                fn clear_last_exception(&self) -> i64 {
                    // Safety: no arguments; resets library-global state.
                    unsafe { $clear() };
                    0
                }
            }
        };
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct LibSzEngine;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct LibSzConfig;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct LibSzConfigManager;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct LibSzDiagnostic;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct LibSzProduct;

    exception_api!(
        LibSzEngine,
        sys::Sz_getLastExceptionCode,
        sys::Sz_getLastException,
        sys::Sz_clearLastException
    );
    exception_api!(
        LibSzConfig,
        sys::SzConfig_getLastExceptionCode,
        sys::SzConfig_getLastException,
        sys::SzConfig_clearLastException
    );
    exception_api!(
        LibSzConfigManager,
        sys::SzConfigMgr_getLastExceptionCode,
        sys::SzConfigMgr_getLastException,
        sys::SzConfigMgr_clearLastException
    );
    exception_api!(
        LibSzDiagnostic,
        sys::SzDiagnostic_getLastExceptionCode,
        sys::SzDiagnostic_getLastException,
        sys::SzDiagnostic_clearLastException
    );
    exception_api!(
        LibSzProduct,
        sys::SzProduct_getLastExceptionCode,
        sys::SzProduct_getLastException,
        sys::SzProduct_clearLastException
    );

    // Safety (applies to every unsafe block below): all pointers are either
    // borrowed from live `CStr`s or point at guards owned by this frame, and
    // the library does not retain them past the call.

    impl EngineApi for LibSzEngine {
        fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64 {
            unsafe { sys::Sz_init(instance_name.as_ptr(), settings.as_ptr(), verbose_logging) }
        }

        fn init_with_config_id(
            &self,
            instance_name: &CStr,
            settings: &CStr,
            config_id: i64,
            verbose_logging: i64,
        ) -> i64 {
            unsafe { sys::Sz_initWithConfigID(instance_name.as_ptr(), settings.as_ptr(), config_id, verbose_logging) }
        }

        fn reinit(&self, config_id: i64) -> i64 {
            unsafe { sys::Sz_reinit(config_id) }
        }

        fn destroy(&self) -> i64 {
            unsafe { sys::Sz_destroy() }
        }

        fn prime_engine(&self) -> i64 {
            unsafe { sys::Sz_primeEngine() }
        }

        fn get_active_config_id(&self) -> NativeResponse<i64> {
            with_out(|id| unsafe { sys::Sz_getActiveConfigID(id) })
        }

        fn get_stats(&self) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe { sys::Sz_getStats(buf, size, resize) })
        }

        fn add_record(&self, data_source_code: &CStr, record_id: &CStr, record_definition: &CStr) -> i64 {
            unsafe { sys::Sz_addRecord(data_source_code.as_ptr(), record_id.as_ptr(), record_definition.as_ptr()) }
        }

        fn add_record_with_info(
            &self,
            data_source_code: &CStr,
            record_id: &CStr,
            record_definition: &CStr,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_addRecordWithInfo(
                    data_source_code.as_ptr(),
                    record_id.as_ptr(),
                    record_definition.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn delete_record(&self, data_source_code: &CStr, record_id: &CStr) -> i64 {
            unsafe { sys::Sz_deleteRecord(data_source_code.as_ptr(), record_id.as_ptr()) }
        }

        fn delete_record_with_info(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_deleteRecordWithInfo(data_source_code.as_ptr(), record_id.as_ptr(), flags, buf, size, resize)
            })
        }

        fn reevaluate_record(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> i64 {
            unsafe { sys::Sz_reevaluateRecord(data_source_code.as_ptr(), record_id.as_ptr(), flags) }
        }

        fn reevaluate_record_with_info(
            &self,
            data_source_code: &CStr,
            record_id: &CStr,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_reevaluateRecordWithInfo(
                    data_source_code.as_ptr(),
                    record_id.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn reevaluate_entity(&self, entity_id: i64, flags: i64) -> i64 {
            unsafe { sys::Sz_reevaluateEntity(entity_id, flags) }
        }

        fn reevaluate_entity_with_info(&self, entity_id: i64, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_reevaluateEntityWithInfo(entity_id, flags, buf, size, resize)
            })
        }

        fn count_redo_records(&self) -> i64 {
            unsafe { sys::Sz_countRedoRecords() }
        }

        fn get_redo_record(&self) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe { sys::Sz_getRedoRecord(buf, size, resize) })
        }

        fn process_redo_record(&self, redo_record: &CStr) -> i64 {
            unsafe { sys::Sz_processRedoRecord(redo_record.as_ptr()) }
        }

        fn process_redo_record_with_info(&self, redo_record: &CStr) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_processRedoRecordWithInfo(redo_record.as_ptr(), buf, size, resize)
            })
        }

        fn get_entity_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_getEntityByEntityID_V2(entity_id, flags, buf, size, resize)
            })
        }

        fn get_entity_by_record_id(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_getEntityByRecordID_V2(data_source_code.as_ptr(), record_id.as_ptr(), flags, buf, size, resize)
            })
        }

        fn get_record(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_getRecord_V2(data_source_code.as_ptr(), record_id.as_ptr(), flags, buf, size, resize)
            })
        }

        fn get_record_preview(&self, record_definition: &CStr, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_getRecordPreview(record_definition.as_ptr(), flags, buf, size, resize)
            })
        }

        fn get_virtual_entity_by_record_id(&self, record_keys: &CStr, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_getVirtualEntityByRecordID_V2(record_keys.as_ptr(), flags, buf, size, resize)
            })
        }

        fn how_entity_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_howEntityByEntityID_V2(entity_id, flags, buf, size, resize)
            })
        }

        fn find_interesting_entities_by_entity_id(&self, entity_id: i64, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findInterestingEntitiesByEntityID(entity_id, flags, buf, size, resize)
            })
        }

        fn find_interesting_entities_by_record_id(
            &self,
            data_source_code: &CStr,
            record_id: &CStr,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findInterestingEntitiesByRecordID(
                    data_source_code.as_ptr(),
                    record_id.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn find_network_by_entity_id(
            &self,
            entity_ids: &CStr,
            max_degrees: i64,
            build_out_degrees: i64,
            build_out_max_entities: i64,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findNetworkByEntityID_V2(
                    entity_ids.as_ptr(),
                    max_degrees,
                    build_out_degrees,
                    build_out_max_entities,
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn find_network_by_record_id(
            &self,
            record_keys: &CStr,
            max_degrees: i64,
            build_out_degrees: i64,
            build_out_max_entities: i64,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findNetworkByRecordID_V2(
                    record_keys.as_ptr(),
                    max_degrees,
                    build_out_degrees,
                    build_out_max_entities,
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn find_path_by_entity_id(
            &self,
            start_entity_id: i64,
            end_entity_id: i64,
            max_degrees: i64,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findPathByEntityID_V2(start_entity_id, end_entity_id, max_degrees, flags, buf, size, resize)
            })
        }

        fn find_path_by_entity_id_with_avoids(
            &self,
            start_entity_id: i64,
            end_entity_id: i64,
            max_degrees: i64,
            avoid_entity_ids: &CStr,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findPathByEntityIDWithAvoids_V2(
                    start_entity_id,
                    end_entity_id,
                    max_degrees,
                    avoid_entity_ids.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn find_path_by_entity_id_including_source(
            &self,
            start_entity_id: i64,
            end_entity_id: i64,
            max_degrees: i64,
            avoid_entity_ids: &CStr,
            required_data_sources: &CStr,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findPathByEntityIDIncludingSource_V2(
                    start_entity_id,
                    end_entity_id,
                    max_degrees,
                    avoid_entity_ids.as_ptr(),
                    required_data_sources.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn find_path_by_record_id(
            &self,
            start: (&CStr, &CStr),
            end: (&CStr, &CStr),
            max_degrees: i64,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findPathByRecordID_V2(
                    start.0.as_ptr(),
                    start.1.as_ptr(),
                    end.0.as_ptr(),
                    end.1.as_ptr(),
                    max_degrees,
                    flags,
                    buf,
                    size,
                    resize,
                )
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
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findPathByRecordIDWithAvoids_V2(
                    start.0.as_ptr(),
                    start.1.as_ptr(),
                    end.0.as_ptr(),
                    end.1.as_ptr(),
                    max_degrees,
                    avoid_record_keys.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
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
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_findPathByRecordIDIncludingSource_V2(
                    start.0.as_ptr(),
                    start.1.as_ptr(),
                    end.0.as_ptr(),
                    end.1.as_ptr(),
                    max_degrees,
                    avoid_record_keys.as_ptr(),
                    required_data_sources.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn search_by_attributes(&self, attributes: &CStr, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_searchByAttributes_V2(attributes.as_ptr(), flags, buf, size, resize)
            })
        }

        fn search_by_attributes_with_profile(
            &self,
            attributes: &CStr,
            search_profile: &CStr,
            flags: i64,
        ) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_searchByAttributes_V3(attributes.as_ptr(), search_profile.as_ptr(), flags, buf, size, resize)
            })
        }

        fn why_entities(&self, entity_id1: i64, entity_id2: i64, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_whyEntities_V2(entity_id1, entity_id2, flags, buf, size, resize)
            })
        }

        fn why_record_in_entity(&self, data_source_code: &CStr, record_id: &CStr, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_whyRecordInEntity_V2(data_source_code.as_ptr(), record_id.as_ptr(), flags, buf, size, resize)
            })
        }

        fn why_records(&self, first: (&CStr, &CStr), second: (&CStr, &CStr), flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_whyRecords_V2(
                    first.0.as_ptr(),
                    first.1.as_ptr(),
                    second.0.as_ptr(),
                    second.1.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn why_search(&self, attributes: &CStr, entity_id: i64, search_profile: &CStr, flags: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::Sz_whySearch_V2(
                    attributes.as_ptr(),
                    entity_id,
                    search_profile.as_ptr(),
                    flags,
                    buf,
                    size,
                    resize,
                )
            })
        }

        fn export_csv_entity_report(&self, csv_column_list: &CStr, flags: i64) -> NativeResponse<usize> {
            with_out(|handle| unsafe { sys::Sz_exportCSVEntityReport(csv_column_list.as_ptr(), flags, handle) })
        }

        fn export_json_entity_report(&self, flags: i64) -> NativeResponse<usize> {
            with_out(|handle| unsafe { sys::Sz_exportJSONEntityReport(flags, handle) })
        }

        fn fetch_next(&self, export_handle: usize) -> NativeResponse {
            let (return_code, bytes) =
                with_fixed_buffer(|buf, size| unsafe { sys::Sz_fetchNext(export_handle, buf, size) });
            NativeResponse::new(return_code, bytes)
        }

        fn close_export_report(&self, export_handle: usize) -> i64 {
            unsafe { sys::Sz_closeExportReport(export_handle) }
        }
    }

    impl ConfigApi for LibSzConfig {
        fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64 {
            unsafe { sys::SzConfig_init(instance_name.as_ptr(), settings.as_ptr(), verbose_logging) }
        }

        fn destroy(&self) -> i64 {
            unsafe { sys::SzConfig_destroy() }
        }

        fn create(&self) -> NativeResponse<usize> {
            with_out(|handle| unsafe { sys::SzConfig_create(handle) })
        }

        fn load(&self, config_definition: &CStr) -> NativeResponse<usize> {
            with_out(|handle| unsafe { sys::SzConfig_load(config_definition.as_ptr(), handle) })
        }

        fn save(&self, config_handle: usize) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe { sys::SzConfig_save(config_handle, buf, size, resize) })
        }

        fn close(&self, config_handle: usize) -> i64 {
            unsafe { sys::SzConfig_close(config_handle) }
        }

        fn list_data_sources(&self, config_handle: usize) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe { sys::SzConfig_listDataSources(config_handle, buf, size, resize) })
        }

        fn add_data_source(&self, config_handle: usize, data_source_definition: &CStr) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::SzConfig_addDataSource(config_handle, data_source_definition.as_ptr(), buf, size, resize)
            })
        }

        fn delete_data_source(&self, config_handle: usize, data_source_definition: &CStr) -> i64 {
            unsafe { sys::SzConfig_deleteDataSource(config_handle, data_source_definition.as_ptr()) }
        }
    }

    impl ConfigManagerApi for LibSzConfigManager {
        fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64 {
            unsafe { sys::SzConfigMgr_init(instance_name.as_ptr(), settings.as_ptr(), verbose_logging) }
        }

        fn destroy(&self) -> i64 {
            unsafe { sys::SzConfigMgr_destroy() }
        }

        fn add_config(&self, config_definition: &CStr, config_comment: &CStr) -> NativeResponse<i64> {
            with_out(|id| unsafe { sys::SzConfigMgr_addConfig(config_definition.as_ptr(), config_comment.as_ptr(), id) })
        }

        fn get_config(&self, config_id: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe { sys::SzConfigMgr_getConfig(config_id, buf, size, resize) })
        }

        fn get_config_list(&self) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe { sys::SzConfigMgr_getConfigList(buf, size, resize) })
        }

        fn get_default_config_id(&self) -> NativeResponse<i64> {
            with_out(|id| unsafe { sys::SzConfigMgr_getDefaultConfigID(id) })
        }

        fn set_default_config_id(&self, config_id: i64) -> i64 {
            unsafe { sys::SzConfigMgr_setDefaultConfigID(config_id) }
        }

        fn replace_default_config_id(&self, current_default_config_id: i64, new_default_config_id: i64) -> i64 {
            unsafe { sys::SzConfigMgr_replaceDefaultConfigID(current_default_config_id, new_default_config_id) }
        }
    }

    impl DiagnosticApi for LibSzDiagnostic {
        fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64 {
            unsafe { sys::SzDiagnostic_init(instance_name.as_ptr(), settings.as_ptr(), verbose_logging) }
        }

        fn init_with_config_id(
            &self,
            instance_name: &CStr,
            settings: &CStr,
            config_id: i64,
            verbose_logging: i64,
        ) -> i64 {
            unsafe {
                sys::SzDiagnostic_initWithConfigID(instance_name.as_ptr(), settings.as_ptr(), config_id, verbose_logging)
            }
        }

        fn reinit(&self, config_id: i64) -> i64 {
            unsafe { sys::SzDiagnostic_reinit(config_id) }
        }

        fn destroy(&self) -> i64 {
            unsafe { sys::SzDiagnostic_destroy() }
        }

        fn check_datastore_performance(&self, seconds_to_run: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe {
                sys::SzDiagnostic_checkDatastorePerformance(seconds_to_run, buf, size, resize)
            })
        }

        fn get_datastore_info(&self) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe { sys::SzDiagnostic_getDatastoreInfo(buf, size, resize) })
        }

        fn get_feature(&self, feature_id: i64) -> NativeResponse {
            with_buffer(|buf, size, resize| unsafe { sys::SzDiagnostic_getFeature(feature_id, buf, size, resize) })
        }

        fn purge_repository(&self) -> i64 {
            unsafe { sys::SzDiagnostic_purgeRepository() }
        }
    }

    impl ProductApi for LibSzProduct {
        fn init(&self, instance_name: &CStr, settings: &CStr, verbose_logging: i64) -> i64 {
            unsafe { sys::SzProduct_init(instance_name.as_ptr(), settings.as_ptr(), verbose_logging) }
        }

        fn destroy(&self) -> i64 {
            unsafe { sys::SzProduct_destroy() }
        }

        fn get_license(&self) -> NativeResponse {
            static_string(unsafe { sys::SzProduct_getLicense() })
        }

        fn get_version(&self) -> NativeResponse {
            static_string(unsafe { sys::SzProduct_getVersion() })
        }
    }

    /// Copies a library-owned static string; these must not be freed.
    fn static_string(ptr: *const c_char) -> NativeResponse {
        if ptr.is_null() {
            return NativeResponse::failed(-1);
        }
        NativeResponse::ok(unsafe { CStr::from_ptr(ptr) }.to_bytes().to_vec())
    }
}

#[cfg(all(test, not(feature = "link-libsz")))]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_link_feature_fails() {
        let err = LibSz::load().err().unwrap();
        assert!(matches!(err, crate::error::SzError::Config { .. }));
    }
}

#[cfg(all(test, not(feature = "link-libsz")))]
mod tests_load {
    use super::*;
    use crate::error::SzError;

    #[test]
    fn test_load_without_link_feature() {
        let err = LibSz::load().err().unwrap();
        assert!(matches!(err, SzError::Config { .. }));
        assert!(err.to_string().contains("link-libsz"));
    }
}
