//! Product client: license and version documents.

use crate::component::{client_common, details, Component};
use crate::error::{ExceptionCodeTable, SzError, SzResult};
use crate::native::{c_arg, ProductApi};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Component id of the product client in message ids.
pub const PRODUCT_COMPONENT_ID: u32 = 6006;

#[derive(Clone)]
pub struct SzProduct {
    inner: Arc<ProductInner>,
}

struct ProductInner {
    component: Component,
    api: Arc<dyn ProductApi>,
}

/// Fields of the version document callers commonly need.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductVersion {
    #[serde(rename = "PRODUCT_NAME", default)]
    pub product_name: String,
    #[serde(rename = "VERSION")]
    pub version: String,
    #[serde(rename = "BUILD_VERSION", default)]
    pub build_version: String,
    #[serde(rename = "BUILD_DATE", default)]
    pub build_date: String,
}

impl SzProduct {
    pub fn new(api: Arc<dyn ProductApi>) -> Self {
        Self::with_exception_codes(api, Arc::new(ExceptionCodeTable::default()))
    }

    pub fn with_exception_codes(api: Arc<dyn ProductApi>, codes: Arc<ExceptionCodeTable>) -> Self {
        Self {
            inner: Arc::new(ProductInner {
                component: Component::new("szproduct", "SzProduct", PRODUCT_COMPONENT_ID, codes),
                api,
            }),
        }
    }

    pub(crate) fn component(&self) -> &Component {
        &self.inner.component
    }

    fn api(&self) -> &dyn ProductApi {
        self.inner.api.as_ref()
    }

    pub fn initialize(&self, instance_name: &str, settings: &str, verbose_logging: i64) -> SzResult<()> {
        let c = self.component();
        c.call(
            "initialize",
            8004,
            || details!["instanceName" => instance_name, "settings" => settings, "verboseLogging" => verbose_logging],
            || {
                let instance = c_arg("instance_name", instance_name)?;
                let settings = c_arg("settings", settings)?;
                c.invoke_status(self.api(), "initialize", 4003, |api| {
                    api.init(&instance, &settings, verbose_logging)
                })?;
                c.mark_initialized();
                Ok(())
            },
        )
    }

    pub fn destroy(&self) -> SzResult<()> {
        let c = self.component();
        c.live_call("destroy", 8001, || details![], || {
            c.invoke_status(self.api(), "destroy", 4001, |api| api.destroy())?;
            c.mark_destroyed();
            Ok(())
        })
    }

    pub fn get_license(&self) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_license", 8002, || details![], || {
            // Static native string; a null pointer is the only failure.
            c.invoke_text(self.api(), "get_license", 4002, |api| api.get_license())
        })
    }

    /// Version document, e.g. `{"PRODUCT_NAME":"Senzing SDK","VERSION":"4.0.0",...}`.
    pub fn get_version(&self) -> SzResult<String> {
        let c = self.component();
        c.live_call("get_version", 8003, || details![], || {
            c.invoke_text(self.api(), "get_version", 4004, |api| api.get_version())
        })
    }

    /// [`get_version`](Self::get_version), parsed.
    pub fn version_info(&self) -> SzResult<ProductVersion> {
        let document = self.get_version()?;
        serde_json::from_str(&document).map_err(|e| SzError::config(format!("unexpected version document: {}", e)))
    }
}

client_common!(SzProduct);

impl fmt::Debug for SzProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SzProduct")
            .field("component", &self.inner.component)
            .finish()
    }
}
