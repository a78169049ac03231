//! Diagnostic client: repository information, performance check and purge.

use crate::component::{client_common, details, Component};
use crate::error::{ExceptionCodeTable, SzResult};
use crate::native::{c_arg, DiagnosticApi};
use std::fmt;
use std::sync::Arc;

/// Component id of the diagnostic client in message ids.
pub const DIAGNOSTIC_COMPONENT_ID: u32 = 6003;

#[derive(Clone)]
pub struct SzDiagnostic {
    inner: Arc<DiagnosticInner>,
}

struct DiagnosticInner {
    component: Component,
    api: Arc<dyn DiagnosticApi>,
}

impl SzDiagnostic {
    pub fn new(api: Arc<dyn DiagnosticApi>) -> Self {
        Self::with_exception_codes(api, Arc::new(ExceptionCodeTable::default()))
    }

    pub fn with_exception_codes(api: Arc<dyn DiagnosticApi>, codes: Arc<ExceptionCodeTable>) -> Self {
        Self {
            inner: Arc::new(DiagnosticInner {
                component: Component::new("szdiagnostic", "SzDiagnostic", DIAGNOSTIC_COMPONENT_ID, codes),
                api,
            }),
        }
    }

    pub(crate) fn component(&self) -> &Component {
        &self.inner.component
    }

    fn api(&self) -> &dyn DiagnosticApi {
        self.inner.api.as_ref()
    }

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
            8005,
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
                    c.invoke_status(self.api(), "initialize", 4006, |api| {
                        api.init_with_config_id(&instance, &settings, config_id, verbose_logging)
                    })?;
                } else {
                    c.invoke_status(self.api(), "initialize", 4005, |api| {
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
        c.live_call("reinitialize", 8008, || details!["configID" => config_id], || {
            c.invoke_status(self.api(), "reinitialize", 4008, |api| api.reinit(config_id))
        })
    }

    pub fn destroy(&self) -> SzResult<()> {
        let c = self.component();
        c.live_call("destroy", 8002, || details![], || {
            c.invoke_status(self.api(), "destroy", 4002, |api| api.destroy())?;
            c.mark_destroyed();
            Ok(())
        })
    }

    /// Runs a timed insert benchmark against the datastore.
    pub fn check_datastore_performance(&self, seconds_to_run: i64) -> SzResult<String> {
        let c = self.component();
        c.live_call(
            "check_datastore_performance",
            8001,
            || details!["secondsToRun" => seconds_to_run],
            || {
                c.invoke_text(self.api(), "check_datastore_performance", 4001, |api| {
                    api.check_datastore_performance(seconds_to_run)
                })
            },
        )
    }

    pub fn get_datastore_info(&self) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_datastore_info", 8003, || details![], || {
            c.invoke_text(self.api(), "get_datastore_info", 4003, |api| api.get_datastore_info())
        })
    }

    /// Internal feature document, for support diagnostics only.
    pub fn get_feature(&self, feature_id: i64) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_feature", 8004, || details!["featureID" => feature_id], || {
            c.invoke_text(self.api(), "get_feature", 4004, |api| api.get_feature(feature_id))
        })
    }

    /// Deletes every record and entity in the repository.
    pub fn purge_repository(&self) -> SzResult<()> {
        let c = self.component();
        c.live_call("purge_repository", 8007, || details![], || {
            tracing::warn!("Purging all records from the repository");
            c.invoke_status(self.api(), "purge_repository", 4007, |api| api.purge_repository())
        })
    }
}

client_common!(SzDiagnostic);

impl fmt::Debug for SzDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SzDiagnostic")
            .field("component", &self.inner.component)
            .finish()
    }
}
