//! Engine client: records, entities, search, explanations and export.

use crate::component::{client_common, details, Component};
use crate::error::{ExceptionCodeTable, SzResult};
use crate::export::{EntityReportStream, ExportFormat, ExportHandle, ExportReport};
use crate::flags::{InfoMode, SzFlags};
use crate::native::{c_arg, EngineApi, NativeResponse};
use std::fmt;
use std::sync::Arc;

/// Component id of the engine in message ids.
pub const ENGINE_COMPONENT_ID: u32 = 6004;

/// Client for the native resolution engine.
///
/// Cloning is cheap and clones share lifecycle, observers and trace state.
#[derive(Clone)]
pub struct SzEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    component: Component,
    api: Arc<dyn EngineApi>,
}

/// Optional documents steering find-path entry point selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathConstraints<'a> {
    /// `{"ENTITIES":[...]}` or `{"RECORDS":[...]}` to route around.
    pub avoid: &'a str,
    /// `{"DATA_SOURCES":[...]}` one of which must appear on the path.
    pub required_data_sources: &'a str,
}

impl<'a> PathConstraints<'a> {
    pub fn avoiding(avoid: &'a str) -> Self {
        Self {
            avoid,
            required_data_sources: "",
        }
    }

    pub fn requiring(avoid: &'a str, required_data_sources: &'a str) -> Self {
        Self {
            avoid,
            required_data_sources,
        }
    }

    fn variant(&self) -> PathVariant {
        if !self.required_data_sources.is_empty() {
            PathVariant::IncludingSource
        } else if !self.avoid.is_empty() {
            PathVariant::WithAvoids
        } else {
            PathVariant::Plain
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathVariant {
    Plain,
    WithAvoids,
    IncludingSource,
}

impl SzEngine {
    pub fn new(api: Arc<dyn EngineApi>) -> Self {
        Self::with_exception_codes(api, Arc::new(ExceptionCodeTable::default()))
    }

    pub fn with_exception_codes(api: Arc<dyn EngineApi>, codes: Arc<ExceptionCodeTable>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                component: Component::new("szengine", "SzEngine", ENGINE_COMPONENT_ID, codes),
                api,
            }),
        }
    }

    pub(crate) fn component(&self) -> &Component {
        &self.inner.component
    }

    fn api(&self) -> &dyn EngineApi {
        self.inner.api.as_ref()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Binds the engine to its settings.
    ///
    /// A positive `config_id` pins that configuration; otherwise the
    /// repository default is used.
    pub fn initialize(
        &self,
        instance_name: &str,
        settings: &str,
        config_id: i64,
        verbose_logging: i64,
    ) -> SzResult<()> {
        let c = self.component();
        c.call(
            "initialize",
            8025,
            || {
                details![
                    "instanceName" => instance_name,
                    "settings" => settings,
                    "configID" => config_id,
                    "verboseLogging" => verbose_logging,
                ]
            },
            || {
                let instance = c_arg("instance_name", instance_name)?;
                let settings = c_arg("settings", settings)?;
                if config_id > 0 {
                    c.invoke_status(self.api(), "initialize", 4042, |api| {
                        api.init_with_config_id(&instance, &settings, config_id, verbose_logging)
                    })?;
                } else {
                    c.invoke_status(self.api(), "initialize", 4041, |api| {
                        api.init(&instance, &settings, verbose_logging)
                    })?;
                }
                c.mark_initialized();
                Ok(())
            },
        )
    }

    pub fn reinitialize(&self, config_id: i64) -> SzResult<()> {
        let c = self.component();
        c.live_call("reinitialize", 8030, || details!["configID" => config_id], || {
            c.invoke_status(self.api(), "reinitialize", 4050, |api| api.reinit(config_id))
        })
    }

    /// Releases the native engine. Later calls fail with `Destroyed`.
    pub fn destroy(&self) -> SzResult<()> {
        let c = self.component();
        c.live_call("destroy", 8005, || details![], || {
            c.invoke_status(self.api(), "destroy", 4006, |api| api.destroy())?;
            c.mark_destroyed();
            Ok(())
        })
    }

    pub fn get_active_config_id(&self) -> SzResult<i64> {
        let c = self.component();
        c.live_call("get_active_config_id", 8017, || details![], || {
            c.invoke(self.api(), "get_active_config_id", 4028, |api| api.get_active_config_id())
        })
    }

    pub fn prime_engine(&self) -> SzResult<()> {
        let c = self.component();
        c.live_call("prime_engine", 8026, || details![], || {
            c.invoke_status(self.api(), "prime_engine", 4043, |api| api.prime_engine())
        })
    }

    pub fn get_stats(&self) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_stats", 8022, || details![], || {
            c.invoke_text(self.api(), "get_stats", 4054, |api| api.get_stats())
        })
    }

    // ========================================================================
    // Record mutation
    // ========================================================================

    /// Adds or replaces a record.
    ///
    /// Returns `""` in [`InfoMode::WithoutInfo`] and the affected-entities
    /// document in [`InfoMode::WithInfo`].
    pub fn add_record(
        &self,
        data_source_code: &str,
        record_id: &str,
        record_definition: &str,
        info: InfoMode,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        let flags = flags.without(SzFlags::WITH_INFO);
        c.live_call(
            "add_record",
            8001,
            || details!["dataSourceCode" => data_source_code, "recordID" => record_id, "infoMode" => info],
            || {
                let ds = c_arg("data_source_code", data_source_code)?;
                let id = c_arg("record_id", record_id)?;
                let definition = c_arg("record_definition", record_definition)?;
                match info {
                    InfoMode::WithoutInfo => {
                        c.invoke_status(self.api(), "add_record", 4001, |api| api.add_record(&ds, &id, &definition))?;
                        Ok(String::new())
                    }
                    InfoMode::WithInfo => c.invoke_text(self.api(), "add_record_with_info", 4002, |api| {
                        api.add_record_with_info(&ds, &id, &definition, flags.bits())
                    }),
                }
            },
        )
    }

    pub fn delete_record(
        &self,
        data_source_code: &str,
        record_id: &str,
        info: InfoMode,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        let flags = flags.without(SzFlags::WITH_INFO);
        c.live_call(
            "delete_record",
            8004,
            || details!["dataSourceCode" => data_source_code, "recordID" => record_id, "infoMode" => info],
            || {
                let ds = c_arg("data_source_code", data_source_code)?;
                let id = c_arg("record_id", record_id)?;
                match info {
                    InfoMode::WithoutInfo => {
                        c.invoke_status(self.api(), "delete_record", 4004, |api| api.delete_record(&ds, &id))?;
                        Ok(String::new())
                    }
                    InfoMode::WithInfo => c.invoke_text(self.api(), "delete_record_with_info", 4005, |api| {
                        api.delete_record_with_info(&ds, &id, flags.bits())
                    }),
                }
            },
        )
    }

    pub fn reevaluate_entity(&self, entity_id: i64, info: InfoMode, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        let flags = flags.without(SzFlags::WITH_INFO);
        c.live_call(
            "reevaluate_entity",
            8028,
            || details!["entityID" => entity_id, "infoMode" => info, "flags" => flags],
            || match info {
                InfoMode::WithoutInfo => {
                    c.invoke_status(self.api(), "reevaluate_entity", 4046, |api| {
                        api.reevaluate_entity(entity_id, flags.bits())
                    })?;
                    Ok(String::new())
                }
                InfoMode::WithInfo => c.invoke_text(self.api(), "reevaluate_entity_with_info", 4047, |api| {
                    api.reevaluate_entity_with_info(entity_id, flags.bits())
                }),
            },
        )
    }

    pub fn reevaluate_record(
        &self,
        data_source_code: &str,
        record_id: &str,
        info: InfoMode,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        let flags = flags.without(SzFlags::WITH_INFO);
        c.live_call(
            "reevaluate_record",
            8029,
            || {
                details![
                    "dataSourceCode" => data_source_code,
                    "recordID" => record_id,
                    "infoMode" => info,
                    "flags" => flags,
                ]
            },
            || {
                let ds = c_arg("data_source_code", data_source_code)?;
                let id = c_arg("record_id", record_id)?;
                match info {
                    InfoMode::WithoutInfo => {
                        c.invoke_status(self.api(), "reevaluate_record", 4048, |api| {
                            api.reevaluate_record(&ds, &id, flags.bits())
                        })?;
                        Ok(String::new())
                    }
                    InfoMode::WithInfo => c.invoke_text(self.api(), "reevaluate_record_with_info", 4049, |api| {
                        api.reevaluate_record_with_info(&ds, &id, flags.bits())
                    }),
                }
            },
        )
    }

    // ========================================================================
    // Redo queue
    // ========================================================================

    pub fn count_redo_records(&self) -> SzResult<i64> {
        let c = self.component();
        c.live_call("count_redo_records", 8003, || details![], || {
            let (count, ()) = c.invoke_non_negative(self.api(), "count_redo_records", 4062, |api| {
                NativeResponse::new(api.count_redo_records(), ())
            })?;
            Ok(count)
        })
    }

    /// Next queued redo record, or `""` when the queue is empty.
    pub fn get_redo_record(&self) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_redo_record", 8021, || details![], || {
            c.invoke_text(self.api(), "get_redo_record", 4036, |api| api.get_redo_record())
        })
    }

    pub fn process_redo_record(&self, redo_record: &str, info: InfoMode) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "process_redo_record",
            8027,
            || details!["redoRecord" => redo_record, "infoMode" => info],
            || {
                let redo = c_arg("redo_record", redo_record)?;
                match info {
                    InfoMode::WithoutInfo => {
                        c.invoke_status(self.api(), "process_redo_record", 4044, |api| {
                            api.process_redo_record(&redo)
                        })?;
                        Ok(String::new())
                    }
                    InfoMode::WithInfo => c.invoke_text(self.api(), "process_redo_record_with_info", 4045, |api| {
                        api.process_redo_record_with_info(&redo)
                    }),
                }
            },
        )
    }

    // ========================================================================
    // Entity and record retrieval
    // ========================================================================

    pub fn get_entity_by_entity_id(&self, entity_id: i64, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "get_entity_by_entity_id",
            8018,
            || details!["entityID" => entity_id, "flags" => flags],
            || {
                c.invoke_text(self.api(), "get_entity_by_entity_id", 4030, |api| {
                    api.get_entity_by_entity_id(entity_id, flags.bits())
                })
            },
        )
    }

    pub fn get_entity_by_record_id(&self, data_source_code: &str, record_id: &str, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "get_entity_by_record_id",
            8019,
            || details!["dataSourceCode" => data_source_code, "recordID" => record_id, "flags" => flags],
            || {
                let ds = c_arg("data_source_code", data_source_code)?;
                let id = c_arg("record_id", record_id)?;
                c.invoke_text(self.api(), "get_entity_by_record_id", 4032, |api| {
                    api.get_entity_by_record_id(&ds, &id, flags.bits())
                })
            },
        )
    }

    pub fn get_record(&self, data_source_code: &str, record_id: &str, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "get_record",
            8020,
            || details!["dataSourceCode" => data_source_code, "recordID" => record_id, "flags" => flags],
            || {
                let ds = c_arg("data_source_code", data_source_code)?;
                let id = c_arg("record_id", record_id)?;
                c.invoke_text(self.api(), "get_record", 4035, |api| api.get_record(&ds, &id, flags.bits()))
            },
        )
    }

    /// Describes how a record would be interpreted without loading it.
    pub fn get_record_preview(&self, record_definition: &str, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_record_preview", 8035, || details!["flags" => flags], || {
            let definition = c_arg("record_definition", record_definition)?;
            c.invoke_text(self.api(), "get_record_preview", 4061, |api| {
                api.get_record_preview(&definition, flags.bits())
            })
        })
    }

    /// Resolves a hypothetical entity from a set of loaded records.
    pub fn get_virtual_entity_by_record_id(&self, record_keys: &str, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "get_virtual_entity_by_record_id",
            8023,
            || details!["recordKeys" => record_keys, "flags" => flags],
            || {
                let keys = c_arg("record_keys", record_keys)?;
                c.invoke_text(self.api(), "get_virtual_entity_by_record_id", 4038, |api| {
                    api.get_virtual_entity_by_record_id(&keys, flags.bits())
                })
            },
        )
    }

    pub fn how_entity_by_entity_id(&self, entity_id: i64, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "how_entity_by_entity_id",
            8024,
            || details!["entityID" => entity_id, "flags" => flags],
            || {
                c.invoke_text(self.api(), "how_entity_by_entity_id", 4040, |api| {
                    api.how_entity_by_entity_id(entity_id, flags.bits())
                })
            },
        )
    }

    // ========================================================================
    // Interesting entities, networks and paths
    // ========================================================================

    pub fn find_interesting_entities_by_entity_id(&self, entity_id: i64, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "find_interesting_entities_by_entity_id",
            8011,
            || details!["entityID" => entity_id, "flags" => flags],
            || {
                c.invoke_text(self.api(), "find_interesting_entities_by_entity_id", 4010, |api| {
                    api.find_interesting_entities_by_entity_id(entity_id, flags.bits())
                })
            },
        )
    }

    pub fn find_interesting_entities_by_record_id(
        &self,
        data_source_code: &str,
        record_id: &str,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "find_interesting_entities_by_record_id",
            8012,
            || details!["dataSourceCode" => data_source_code, "recordID" => record_id, "flags" => flags],
            || {
                let ds = c_arg("data_source_code", data_source_code)?;
                let id = c_arg("record_id", record_id)?;
                c.invoke_text(self.api(), "find_interesting_entities_by_record_id", 4011, |api| {
                    api.find_interesting_entities_by_record_id(&ds, &id, flags.bits())
                })
            },
        )
    }

    /// Network around a set of entities, given as `{"ENTITIES":[...]}`.
    pub fn find_network_by_entity_id(
        &self,
        entity_ids: &str,
        max_degrees: i64,
        build_out_degrees: i64,
        build_out_max_entities: i64,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "find_network_by_entity_id",
            8013,
            || {
                details![
                    "entityIDs" => entity_ids,
                    "maxDegrees" => max_degrees,
                    "buildOutDegrees" => build_out_degrees,
                    "buildOutMaxEntities" => build_out_max_entities,
                    "flags" => flags,
                ]
            },
            || {
                let ids = c_arg("entity_ids", entity_ids)?;
                c.invoke_text(self.api(), "find_network_by_entity_id", 4013, |api| {
                    api.find_network_by_entity_id(
                        &ids,
                        max_degrees,
                        build_out_degrees,
                        build_out_max_entities,
                        flags.bits(),
                    )
                })
            },
        )
    }

    /// Network around a set of records, given as `{"RECORDS":[...]}`.
    pub fn find_network_by_record_id(
        &self,
        record_keys: &str,
        max_degrees: i64,
        build_out_degrees: i64,
        build_out_max_entities: i64,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "find_network_by_record_id",
            8014,
            || {
                details![
                    "recordKeys" => record_keys,
                    "maxDegrees" => max_degrees,
                    "buildOutDegrees" => build_out_degrees,
                    "buildOutMaxEntities" => build_out_max_entities,
                    "flags" => flags,
                ]
            },
            || {
                let keys = c_arg("record_keys", record_keys)?;
                c.invoke_text(self.api(), "find_network_by_record_id", 4015, |api| {
                    api.find_network_by_record_id(
                        &keys,
                        max_degrees,
                        build_out_degrees,
                        build_out_max_entities,
                        flags.bits(),
                    )
                })
            },
        )
    }

    /// Shortest path between two entities.
    ///
    /// Required data sources select the including-source entry point, then a
    /// non-empty avoid list selects the with-avoids entry point. `max_degrees`
    /// is forwarded unchecked.
    pub fn find_path_by_entity_id(
        &self,
        start_entity_id: i64,
        end_entity_id: i64,
        max_degrees: i64,
        constraints: PathConstraints<'_>,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "find_path_by_entity_id",
            8015,
            || {
                details![
                    "startEntityID" => start_entity_id,
                    "endEntityID" => end_entity_id,
                    "maxDegrees" => max_degrees,
                    "avoidEntityIDs" => constraints.avoid,
                    "requiredDataSources" => constraints.required_data_sources,
                    "flags" => flags,
                ]
            },
            || {
                let api = self.api();
                match constraints.variant() {
                    PathVariant::Plain => c.invoke_text(api, "find_path_by_entity_id", 4017, |api| {
                        api.find_path_by_entity_id(start_entity_id, end_entity_id, max_degrees, flags.bits())
                    }),
                    PathVariant::WithAvoids => {
                        let avoid = c_arg("avoid_entity_ids", constraints.avoid)?;
                        c.invoke_text(api, "find_path_by_entity_id_with_avoids", 4021, |api| {
                            api.find_path_by_entity_id_with_avoids(
                                start_entity_id,
                                end_entity_id,
                                max_degrees,
                                &avoid,
                                flags.bits(),
                            )
                        })
                    }
                    PathVariant::IncludingSource => {
                        let avoid = c_arg("avoid_entity_ids", constraints.avoid)?;
                        let required = c_arg("required_data_sources", constraints.required_data_sources)?;
                        c.invoke_text(api, "find_path_by_entity_id_including_source", 4025, |api| {
                            api.find_path_by_entity_id_including_source(
                                start_entity_id,
                                end_entity_id,
                                max_degrees,
                                &avoid,
                                &required,
                                flags.bits(),
                            )
                        })
                    }
                }
            },
        )
    }

    /// Shortest path between the entities holding two records.
    #[allow(clippy::too_many_arguments)]
    pub fn find_path_by_record_id(
        &self,
        start_data_source_code: &str,
        start_record_id: &str,
        end_data_source_code: &str,
        end_record_id: &str,
        max_degrees: i64,
        constraints: PathConstraints<'_>,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "find_path_by_record_id",
            8016,
            || {
                details![
                    "startDataSourceCode" => start_data_source_code,
                    "startRecordID" => start_record_id,
                    "endDataSourceCode" => end_data_source_code,
                    "endRecordID" => end_record_id,
                    "maxDegrees" => max_degrees,
                    "avoidRecordKeys" => constraints.avoid,
                    "requiredDataSources" => constraints.required_data_sources,
                    "flags" => flags,
                ]
            },
            || {
                let start_ds = c_arg("start_data_source_code", start_data_source_code)?;
                let start_id = c_arg("start_record_id", start_record_id)?;
                let end_ds = c_arg("end_data_source_code", end_data_source_code)?;
                let end_id = c_arg("end_record_id", end_record_id)?;
                let start = (start_ds.as_c_str(), start_id.as_c_str());
                let end = (end_ds.as_c_str(), end_id.as_c_str());
                let api = self.api();
                match constraints.variant() {
                    PathVariant::Plain => c.invoke_text(api, "find_path_by_record_id", 4019, |api| {
                        api.find_path_by_record_id(start, end, max_degrees, flags.bits())
                    }),
                    PathVariant::WithAvoids => {
                        let avoid = c_arg("avoid_record_keys", constraints.avoid)?;
                        c.invoke_text(api, "find_path_by_record_id_with_avoids", 4023, |api| {
                            api.find_path_by_record_id_with_avoids(start, end, max_degrees, &avoid, flags.bits())
                        })
                    }
                    PathVariant::IncludingSource => {
                        let avoid = c_arg("avoid_record_keys", constraints.avoid)?;
                        let required = c_arg("required_data_sources", constraints.required_data_sources)?;
                        c.invoke_text(api, "find_path_by_record_id_including_source", 4027, |api| {
                            api.find_path_by_record_id_including_source(
                                start,
                                end,
                                max_degrees,
                                &avoid,
                                &required,
                                flags.bits(),
                            )
                        })
                    }
                }
            },
        )
    }

    // ========================================================================
    // Search and explanations
    // ========================================================================

    /// Searches by attributes. An empty `search_profile` uses the default
    /// profile entry point.
    pub fn search_by_attributes(&self, attributes: &str, search_profile: &str, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "search_by_attributes",
            8031,
            || details!["attributes" => attributes, "searchProfile" => search_profile, "flags" => flags],
            || {
                let attrs = c_arg("attributes", attributes)?;
                if search_profile.is_empty() {
                    c.invoke_text(self.api(), "search_by_attributes", 4052, |api| {
                        api.search_by_attributes(&attrs, flags.bits())
                    })
                } else {
                    let profile = c_arg("search_profile", search_profile)?;
                    c.invoke_text(self.api(), "search_by_attributes_with_profile", 4053, |api| {
                        api.search_by_attributes_with_profile(&attrs, &profile, flags.bits())
                    })
                }
            },
        )
    }

    pub fn why_entities(&self, entity_id1: i64, entity_id2: i64, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "why_entities",
            8032,
            || details!["entityID1" => entity_id1, "entityID2" => entity_id2, "flags" => flags],
            || {
                c.invoke_text(self.api(), "why_entities", 4056, |api| {
                    api.why_entities(entity_id1, entity_id2, flags.bits())
                })
            },
        )
    }

    pub fn why_record_in_entity(&self, data_source_code: &str, record_id: &str, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "why_record_in_entity",
            8033,
            || details!["dataSourceCode" => data_source_code, "recordID" => record_id, "flags" => flags],
            || {
                let ds = c_arg("data_source_code", data_source_code)?;
                let id = c_arg("record_id", record_id)?;
                c.invoke_text(self.api(), "why_record_in_entity", 4058, |api| {
                    api.why_record_in_entity(&ds, &id, flags.bits())
                })
            },
        )
    }

    pub fn why_records(
        &self,
        data_source_code1: &str,
        record_id1: &str,
        data_source_code2: &str,
        record_id2: &str,
        flags: SzFlags,
    ) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "why_records",
            8034,
            || {
                details![
                    "dataSourceCode1" => data_source_code1,
                    "recordID1" => record_id1,
                    "dataSourceCode2" => data_source_code2,
                    "recordID2" => record_id2,
                    "flags" => flags,
                ]
            },
            || {
                let ds1 = c_arg("data_source_code1", data_source_code1)?;
                let id1 = c_arg("record_id1", record_id1)?;
                let ds2 = c_arg("data_source_code2", data_source_code2)?;
                let id2 = c_arg("record_id2", record_id2)?;
                c.invoke_text(self.api(), "why_records", 4060, |api| {
                    api.why_records(
                        (ds1.as_c_str(), id1.as_c_str()),
                        (ds2.as_c_str(), id2.as_c_str()),
                        flags.bits(),
                    )
                })
            },
        )
    }

    /// Explains why an entity did or did not match a search.
    pub fn why_search(&self, attributes: &str, entity_id: i64, search_profile: &str, flags: SzFlags) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "why_search",
            8036,
            || {
                details![
                    "attributes" => attributes,
                    "entityID" => entity_id,
                    "searchProfile" => search_profile,
                    "flags" => flags,
                ]
            },
            || {
                let attrs = c_arg("attributes", attributes)?;
                let profile = c_arg("search_profile", search_profile)?;
                c.invoke_text(self.api(), "why_search", 4064, |api| {
                    api.why_search(&attrs, entity_id, &profile, flags.bits())
                })
            },
        )
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Opens a CSV export. An empty column list selects the default columns.
    ///
    /// The caller owns the handle and must pass it to
    /// [`close_export_report`](Self::close_export_report) exactly once.
    pub fn export_csv_entity_report(&self, csv_column_list: &str, flags: SzFlags) -> SzResult<ExportHandle> {
        let c = self.component();
        c.live_call(
            "export_csv_entity_report",
            8006,
            || details!["csvColumnList" => csv_column_list, "flags" => flags],
            || {
                let columns = c_arg("csv_column_list", csv_column_list)?;
                let raw = c.invoke(self.api(), "export_csv_entity_report", 4007, |api| {
                    api.export_csv_entity_report(&columns, flags.bits())
                })?;
                Ok(ExportHandle::from_raw(raw))
            },
        )
    }

    /// Opens a JSON lines export.
    pub fn export_json_entity_report(&self, flags: SzFlags) -> SzResult<ExportHandle> {
        let c = self.component();
        c.live_call("export_json_entity_report", 8008, || details!["flags" => flags], || {
            let raw = c.invoke(self.api(), "export_json_entity_report", 4008, |api| {
                api.export_json_entity_report(flags.bits())
            })?;
            Ok(ExportHandle::from_raw(raw))
        })
    }

    /// Next fragment of an open export; `""` marks the end of the report.
    pub fn fetch_next(&self, export_handle: ExportHandle) -> SzResult<String> {
        let c = self.component();
        c.live_call("fetch_next", 8010, || details!["exportHandle" => export_handle], || {
            let (_, bytes) = c.invoke_non_negative(self.api(), "fetch_next", 4009, |api| {
                api.fetch_next(export_handle.as_raw())
            })?;
            c.decode("fetch_next", bytes)
        })
    }

    pub fn close_export_report(&self, export_handle: ExportHandle) -> SzResult<()> {
        let c = self.component();
        c.live_call("close_export_report", 8002, || details!["exportHandle" => export_handle], || {
            c.invoke_status(self.api(), "close_export_report", 4003, |api| {
                api.close_export_report(export_handle.as_raw())
            })
        })
    }

    /// Opens a CSV export whose handle is closed when the report is dropped.
    pub fn export_csv_report(&self, csv_column_list: &str, flags: SzFlags) -> SzResult<ExportReport> {
        let format = ExportFormat::Csv {
            csv_column_list: csv_column_list.to_string(),
        };
        ExportReport::open(self, &format, flags)
    }

    pub fn export_json_report(&self, flags: SzFlags) -> SzResult<ExportReport> {
        ExportReport::open(self, &ExportFormat::Json, flags)
    }

    /// Streams a CSV export from a blocking task of the current runtime.
    ///
    /// # Errors
    ///
    /// Fails when called outside a Tokio runtime. Export failures arrive as
    /// the last item of the stream.
    pub fn export_csv_entity_report_stream(
        &self,
        csv_column_list: &str,
        flags: SzFlags,
    ) -> SzResult<EntityReportStream> {
        self.component().ensure_live()?;
        let format = ExportFormat::Csv {
            csv_column_list: csv_column_list.to_string(),
        };
        EntityReportStream::spawn(self, format, flags)
    }

    pub fn export_json_entity_report_stream(&self, flags: SzFlags) -> SzResult<EntityReportStream> {
        self.component().ensure_live()?;
        EntityReportStream::spawn(self, ExportFormat::Json, flags)
    }
}

client_common!(SzEngine);

impl fmt::Debug for SzEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SzEngine")
            .field("component", &self.inner.component)
            .finish()
    }
}
