//! Configuration manager client: the repository's registry of configurations.

use crate::component::{client_common, details, Component};
use crate::config::{ConfigSession, SzConfig};
use crate::error::{ExceptionCodeTable, SzResult};
use crate::native::{c_arg, ConfigManagerApi};
use std::fmt;
use std::sync::Arc;

/// Component id of the configuration manager in message ids.
pub const CONFIG_MANAGER_COMPONENT_ID: u32 = 6002;

/// Client for registering configurations and choosing the default.
///
/// Operations that yield an editable configuration go through the paired
/// [`SzConfig`].
#[derive(Clone)]
pub struct SzConfigManager {
    inner: Arc<ConfigManagerInner>,
}

struct ConfigManagerInner {
    component: Component,
    api: Arc<dyn ConfigManagerApi>,
    config: SzConfig,
}

impl SzConfigManager {
    pub fn new(api: Arc<dyn ConfigManagerApi>, config: SzConfig) -> Self {
        Self::with_exception_codes(api, config, Arc::new(ExceptionCodeTable::default()))
    }

    pub fn with_exception_codes(
        api: Arc<dyn ConfigManagerApi>,
        config: SzConfig,
        codes: Arc<ExceptionCodeTable>,
    ) -> Self {
        Self {
            inner: Arc::new(ConfigManagerInner {
                component: Component::new("szconfigmanager", "SzConfigManager", CONFIG_MANAGER_COMPONENT_ID, codes),
                api,
                config,
            }),
        }
    }

    pub(crate) fn component(&self) -> &Component {
        &self.inner.component
    }

    fn api(&self) -> &dyn ConfigManagerApi {
        self.inner.api.as_ref()
    }

    pub fn initialize(&self, instance_name: &str, settings: &str, verbose_logging: i64) -> SzResult<()> {
        let c = self.component();
        c.call(
            "initialize",
            8006,
            || details!["instanceName" => instance_name, "settings" => settings, "verboseLogging" => verbose_logging],
            || {
                let instance = c_arg("instance_name", instance_name)?;
                let settings = c_arg("settings", settings)?;
                c.invoke_status(self.api(), "initialize", 4006, |api| {
                    api.init(&instance, &settings, verbose_logging)
                })?;
                c.mark_initialized();
                Ok(())
            },
        )
    }

    pub fn destroy(&self) -> SzResult<()> {
        let c = self.component();
        c.live_call("destroy", 8002, || details![], || {
            c.invoke_status(self.api(), "destroy", 4002, |api| api.destroy())?;
            c.mark_destroyed();
            Ok(())
        })
    }

    /// Stores a configuration document and returns its new id.
    pub fn register_config(&self, config_definition: &str, config_comment: &str) -> SzResult<i64> {
        let c = self.component();
        c.live_call("register_config", 8001, || details!["configComment" => config_comment], || {
            let definition = c_arg("config_definition", config_definition)?;
            let comment = c_arg("config_comment", config_comment)?;
            c.invoke(self.api(), "register_config", 4001, |api| api.add_config(&definition, &comment))
        })
    }

    /// Configuration document stored under `config_id`.
    pub fn get_config(&self, config_id: i64) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_config", 8009, || details!["configID" => config_id], || {
            c.invoke_text(self.api(), "get_config", 4003, |api| api.get_config(config_id))
        })
    }

    /// `{"CONFIGS":[...]}` listing every registered configuration.
    pub fn get_configs(&self) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_configs", 8004, || details![], || {
            c.invoke_text(self.api(), "get_configs", 4004, |api| api.get_config_list())
        })
    }

    /// Default configuration id, `0` when none is set.
    pub fn get_default_config_id(&self) -> SzResult<i64> {
        let c = self.component();
        c.live_call("get_default_config_id", 8005, || details![], || {
            c.invoke(self.api(), "get_default_config_id", 4005, |api| api.get_default_config_id())
        })
    }

    pub fn set_default_config_id(&self, config_id: i64) -> SzResult<()> {
        let c = self.component();
        c.live_call("set_default_config_id", 8008, || details!["configID" => config_id], || {
            c.invoke_status(self.api(), "set_default_config_id", 4008, |api| {
                api.set_default_config_id(config_id)
            })
        })
    }

    /// Compare-and-swap of the default id; fails if the current default is
    /// no longer `current_default_config_id`.
    pub fn replace_default_config_id(
        &self,
        current_default_config_id: i64,
        new_default_config_id: i64,
    ) -> SzResult<()> {
        let c = self.component();
        c.live_call(
            "replace_default_config_id",
            8007,
            || {
                details![
                    "currentDefaultConfigID" => current_default_config_id,
                    "newDefaultConfigID" => new_default_config_id,
                ]
            },
            || {
                c.invoke_status(self.api(), "replace_default_config_id", 4007, |api| {
                    api.replace_default_config_id(current_default_config_id, new_default_config_id)
                })
            },
        )
    }

    /// Opens an editable copy of a registered configuration.
    pub fn create_config_from_config_id(&self, config_id: i64) -> SzResult<ConfigSession> {
        let c = self.component();
        c.live_call("create_config_from_config_id", 8003, || details!["configID" => config_id], || {
            let definition = self.get_config(config_id)?;
            self.inner.config.import_session(&definition)
        })
    }

    /// Opens an editable configuration from a document.
    pub fn create_config_from_string(&self, config_definition: &str) -> SzResult<ConfigSession> {
        let c = self.component();
        c.live_call("create_config_from_string", 8010, || details![], || {
            self.inner.config.import_session(config_definition)
        })
    }

    /// Opens an editable configuration from the installed template.
    pub fn create_config_from_template(&self) -> SzResult<ConfigSession> {
        let c = self.component();
        c.live_call("create_config_from_template", 8003, || details![], || {
            self.inner.config.create_session()
        })
    }

    /// Registers a configuration and makes it the default. Returns its id.
    pub fn set_default_config(&self, config_definition: &str, config_comment: &str) -> SzResult<i64> {
        let c = self.component();
        c.live_call("set_default_config", 8011, || details!["configComment" => config_comment], || {
            let config_id = self.register_config(config_definition, config_comment)?;
            self.set_default_config_id(config_id)?;
            tracing::debug!(config_id, "Registered new default configuration");
            Ok(config_id)
        })
    }
}

client_common!(SzConfigManager);

impl fmt::Debug for SzConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SzConfigManager")
            .field("component", &self.inner.component)
            .finish()
    }
}
