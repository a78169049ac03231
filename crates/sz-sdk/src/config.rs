//! Configuration client: in-memory configuration documents and data sources.

use crate::component::{client_common, details, Component};
use crate::error::{ExceptionCodeTable, SzError, SzResult};
use crate::native::{c_arg, ConfigApi};
use std::fmt;
use std::sync::Arc;

/// Component id of the configuration client in message ids.
pub const CONFIG_COMPONENT_ID: u32 = 6001;

/// Opaque token for one in-memory configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigHandle(usize);

impl ConfigHandle {
    pub fn from_raw(raw: usize) -> Self {
        ConfigHandle(raw)
    }

    pub fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client for building and editing configuration documents.
#[derive(Clone)]
pub struct SzConfig {
    inner: Arc<ConfigInner>,
}

struct ConfigInner {
    component: Component,
    api: Arc<dyn ConfigApi>,
}

/// `{"DSRC_CODE": "<code>"}`
fn data_source_definition(data_source_code: &str) -> SzResult<String> {
    serde_json::to_string(&serde_json::json!({ "DSRC_CODE": data_source_code }))
        .map_err(|e| SzError::invalid_argument("data_source_code", e.to_string()))
}

impl SzConfig {
    pub fn new(api: Arc<dyn ConfigApi>) -> Self {
        Self::with_exception_codes(api, Arc::new(ExceptionCodeTable::default()))
    }

    pub fn with_exception_codes(api: Arc<dyn ConfigApi>, codes: Arc<ExceptionCodeTable>) -> Self {
        Self {
            inner: Arc::new(ConfigInner {
                component: Component::new("szconfig", "SzConfig", CONFIG_COMPONENT_ID, codes),
                api,
            }),
        }
    }

    pub(crate) fn component(&self) -> &Component {
        &self.inner.component
    }

    fn api(&self) -> &dyn ConfigApi {
        self.inner.api.as_ref()
    }

    pub fn initialize(&self, instance_name: &str, settings: &str, verbose_logging: i64) -> SzResult<()> {
        let c = self.component();
        c.call(
            "initialize",
            8007,
            || details!["instanceName" => instance_name, "settings" => settings, "verboseLogging" => verbose_logging],
            || {
                let instance = c_arg("instance_name", instance_name)?;
                let settings = c_arg("settings", settings)?;
                c.invoke_status(self.api(), "initialize", 4007, |api| {
                    api.init(&instance, &settings, verbose_logging)
                })?;
                c.mark_initialized();
                Ok(())
            },
        )
    }

    pub fn destroy(&self) -> SzResult<()> {
        let c = self.component();
        c.live_call("destroy", 8005, || details![], || {
            c.invoke_status(self.api(), "destroy", 4005, |api| api.destroy())?;
            c.mark_destroyed();
            Ok(())
        })
    }

    /// Creates a configuration from the installed template.
    pub fn create_config(&self) -> SzResult<ConfigHandle> {
        let c = self.component();
        c.live_call("create_config", 8003, || details![], || {
            let raw = c.invoke(self.api(), "create_config", 4003, |api| api.create())?;
            Ok(ConfigHandle::from_raw(raw))
        })
    }

    /// Loads a configuration document into a new handle.
    pub fn import_config(&self, config_definition: &str) -> SzResult<ConfigHandle> {
        let c = self.component();
        c.live_call("import_config", 8009, || details![], || {
            let definition = c_arg("config_definition", config_definition)?;
            let raw = c.invoke(self.api(), "import_config", 4009, |api| api.load(&definition))?;
            Ok(ConfigHandle::from_raw(raw))
        })
    }

    /// Serializes the configuration behind a handle.
    pub fn export_config(&self, config_handle: ConfigHandle) -> SzResult<String> {
        let c = self.component();
        c.live_call("export_config", 8006, || details!["configHandle" => config_handle], || {
            c.invoke_text(self.api(), "export_config", 4010, |api| api.save(config_handle.as_raw()))
        })
    }

    pub fn close_config(&self, config_handle: ConfigHandle) -> SzResult<()> {
        let c = self.component();
        c.live_call("close_config", 8002, || details!["configHandle" => config_handle], || {
            c.invoke_status(self.api(), "close_config", 4002, |api| api.close(config_handle.as_raw()))
        })
    }

    /// Registers a data source code; returns the native acknowledgement.
    pub fn add_data_source(&self, config_handle: ConfigHandle, data_source_code: &str) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "add_data_source",
            8001,
            || details!["configHandle" => config_handle, "dataSourceCode" => data_source_code],
            || {
                let definition = c_arg("data_source_code", &data_source_definition(data_source_code)?)?;
                c.invoke_text(self.api(), "add_data_source", 4001, |api| {
                    api.add_data_source(config_handle.as_raw(), &definition)
                })
            },
        )
    }

    pub fn delete_data_source(&self, config_handle: ConfigHandle, data_source_code: &str) -> SzResult<()> {
        let c = self.component();
        c.live_call(
            "delete_data_source",
            8004,
            || details!["configHandle" => config_handle, "dataSourceCode" => data_source_code],
            || {
                let definition = c_arg("data_source_code", &data_source_definition(data_source_code)?)?;
                c.invoke_status(self.api(), "delete_data_source", 4004, |api| {
                    api.delete_data_source(config_handle.as_raw(), &definition)
                })
            },
        )
    }

    /// `{"DATA_SOURCES":[...]}` for the configuration behind a handle.
    pub fn get_data_sources(&self, config_handle: ConfigHandle) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_data_sources", 8008, || details!["configHandle" => config_handle], || {
            c.invoke_text(self.api(), "get_data_sources", 4008, |api| {
                api.list_data_sources(config_handle.as_raw())
            })
        })
    }

    /// Template configuration whose handle closes on drop.
    pub fn create_session(&self) -> SzResult<ConfigSession> {
        let handle = self.create_config()?;
        Ok(ConfigSession::new(self.clone(), handle))
    }

    /// Imported configuration whose handle closes on drop.
    pub fn import_session(&self, config_definition: &str) -> SzResult<ConfigSession> {
        let handle = self.import_config(config_definition)?;
        Ok(ConfigSession::new(self.clone(), handle))
    }
}

client_common!(SzConfig);

impl fmt::Debug for SzConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SzConfig")
            .field("component", &self.inner.component)
            .finish()
    }
}

/// An open configuration handle, closed when dropped.
pub struct ConfigSession {
    config: SzConfig,
    handle: ConfigHandle,
    closed: bool,
}

impl ConfigSession {
    fn new(config: SzConfig, handle: ConfigHandle) -> Self {
        Self {
            config,
            handle,
            closed: false,
        }
    }

    pub fn handle(&self) -> ConfigHandle {
        self.handle
    }

    pub fn add_data_source(&self, data_source_code: &str) -> SzResult<String> {
        self.config.add_data_source(self.handle, data_source_code)
    }

    pub fn delete_data_source(&self, data_source_code: &str) -> SzResult<()> {
        self.config.delete_data_source(self.handle, data_source_code)
    }

    pub fn get_data_sources(&self) -> SzResult<String> {
        self.config.get_data_sources(self.handle)
    }

    pub fn export_config(&self) -> SzResult<String> {
        self.config.export_config(self.handle)
    }

    /// Closes the handle now and reports the outcome.
    pub fn close(mut self) -> SzResult<()> {
        self.closed = true;
        self.config.close_config(self.handle)
    }
}

impl Drop for ConfigSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.config.close_config(self.handle) {
            tracing::warn!(handle = %self.handle, error = %e, "Failed to close configuration handle on drop");
        }
    }
}

impl fmt::Debug for ConfigSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSession")
            .field("handle", &self.handle)
            .field("closed", &self.closed)
            .finish()
    }
}
