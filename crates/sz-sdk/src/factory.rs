//! Abstract factory creating initialized clients over one native library.
//!
//! Each client kind is created and initialized at most once per factory;
//! later requests return a clone sharing the same state.

use crate::config::SzConfig;
use crate::configmanager::SzConfigManager;
use crate::diagnostic::SzDiagnostic;
use crate::engine::SzEngine;
use crate::error::{ExceptionCodeTable, SzError, SzResult};
use crate::native::NativeLibrary;
use crate::product::SzProduct;
use crate::settings::SdkConfig;
use crate::trace::SzLogLevel;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Component id of the factory in message ids.
pub const FACTORY_COMPONENT_ID: u32 = 6000;

pub struct SzAbstractFactory {
    library: Arc<dyn NativeLibrary>,
    instance_name: String,
    settings: String,
    config_id: AtomicI64,
    verbose_logging: i64,
    log_level: SzLogLevel,
    codes: Arc<ExceptionCodeTable>,
    destroyed: AtomicBool,
    engine: Mutex<Option<SzEngine>>,
    config: Mutex<Option<SzConfig>>,
    config_manager: Mutex<Option<SzConfigManager>>,
    diagnostic: Mutex<Option<SzDiagnostic>>,
    product: Mutex<Option<SzProduct>>,
}

impl SzAbstractFactory {
    pub fn new(
        library: Arc<dyn NativeLibrary>,
        instance_name: &str,
        settings: &str,
        config_id: i64,
        verbose_logging: i64,
    ) -> Self {
        Self {
            library,
            instance_name: instance_name.to_string(),
            settings: settings.to_string(),
            config_id: AtomicI64::new(config_id),
            verbose_logging,
            log_level: SzLogLevel::default(),
            codes: Arc::new(ExceptionCodeTable::default()),
            destroyed: AtomicBool::new(false),
            engine: Mutex::new(None),
            config: Mutex::new(None),
            config_manager: Mutex::new(None),
            diagnostic: Mutex::new(None),
            product: Mutex::new(None),
        }
    }

    /// Builds a factory from client configuration.
    pub fn from_config(library: Arc<dyn NativeLibrary>, config: &SdkConfig) -> SzResult<Self> {
        config.validate()?;
        let settings = config.settings_json()?;
        let factory = Self::new(
            library,
            &config.instance_name,
            &settings,
            config.config_id,
            config.verbose_logging,
        )
        .with_exception_codes(config.exception_codes()?)
        .with_log_level(config.log_level.parse()?);
        tracing::debug!(
            instance_name = %config.instance_name,
            config_id = config.config_id,
            log_level = %config.log_level,
            "Created client factory"
        );
        Ok(factory)
    }

    /// Replaces the exception code table handed to every client.
    pub fn with_exception_codes(mut self, codes: ExceptionCodeTable) -> Self {
        self.codes = Arc::new(codes);
        self
    }

    /// Log level applied to every client on creation.
    pub fn with_log_level(mut self, log_level: SzLogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn config_id(&self) -> i64 {
        self.config_id.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> SzResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(SzError::Destroyed {
                component: "SzAbstractFactory",
            });
        }
        Ok(())
    }

    pub fn create_engine(&self) -> SzResult<SzEngine> {
        self.ensure_live()?;
        let mut slot = self.engine.lock();
        if let Some(engine) = slot.as_ref() {
            return Ok(engine.clone());
        }
        let engine = SzEngine::with_exception_codes(self.library.engine(), Arc::clone(&self.codes));
        engine.set_log_level(self.log_level.as_str())?;
        engine.initialize(&self.instance_name, &self.settings, self.config_id(), self.verbose_logging)?;
        tracing::debug!(instance_name = %self.instance_name, "Engine client initialized");
        *slot = Some(engine.clone());
        Ok(engine)
    }

    pub fn create_config(&self) -> SzResult<SzConfig> {
        self.ensure_live()?;
        let mut slot = self.config.lock();
        if let Some(config) = slot.as_ref() {
            return Ok(config.clone());
        }
        let config = SzConfig::with_exception_codes(self.library.config(), Arc::clone(&self.codes));
        config.set_log_level(self.log_level.as_str())?;
        config.initialize(&self.instance_name, &self.settings, self.verbose_logging)?;
        *slot = Some(config.clone());
        Ok(config)
    }

    /// Creates the configuration manager together with its paired config client.
    pub fn create_config_manager(&self) -> SzResult<SzConfigManager> {
        self.ensure_live()?;
        let config = self.create_config()?;
        let mut slot = self.config_manager.lock();
        if let Some(manager) = slot.as_ref() {
            return Ok(manager.clone());
        }
        let manager =
            SzConfigManager::with_exception_codes(self.library.config_manager(), config, Arc::clone(&self.codes));
        manager.set_log_level(self.log_level.as_str())?;
        manager.initialize(&self.instance_name, &self.settings, self.verbose_logging)?;
        *slot = Some(manager.clone());
        Ok(manager)
    }

    pub fn create_diagnostic(&self) -> SzResult<SzDiagnostic> {
        self.ensure_live()?;
        let mut slot = self.diagnostic.lock();
        if let Some(diagnostic) = slot.as_ref() {
            return Ok(diagnostic.clone());
        }
        let diagnostic = SzDiagnostic::with_exception_codes(self.library.diagnostic(), Arc::clone(&self.codes));
        diagnostic.set_log_level(self.log_level.as_str())?;
        diagnostic.initialize(&self.instance_name, &self.settings, self.config_id(), self.verbose_logging)?;
        *slot = Some(diagnostic.clone());
        Ok(diagnostic)
    }

    pub fn create_product(&self) -> SzResult<SzProduct> {
        self.ensure_live()?;
        let mut slot = self.product.lock();
        if let Some(product) = slot.as_ref() {
            return Ok(product.clone());
        }
        let product = SzProduct::with_exception_codes(self.library.product(), Arc::clone(&self.codes));
        product.set_log_level(self.log_level.as_str())?;
        product.initialize(&self.instance_name, &self.settings, self.verbose_logging)?;
        *slot = Some(product.clone());
        Ok(product)
    }

    /// Switches the engine and diagnostic clients to another configuration.
    ///
    /// Clients created afterwards are initialized with `config_id` as well.
    pub fn reinitialize(&self, config_id: i64) -> SzResult<()> {
        self.ensure_live()?;
        self.config_id.store(config_id, Ordering::Release);
        if let Some(engine) = self.engine.lock().as_ref() {
            engine.reinitialize(config_id)?;
        }
        if let Some(diagnostic) = self.diagnostic.lock().as_ref() {
            diagnostic.reinitialize(config_id)?;
        }
        tracing::info!(config_id, "Reinitialized clients");
        Ok(())
    }

    /// Destroys every client this factory created.
    ///
    /// All clients are attempted; the first failure is returned.
    pub fn destroy(&self) -> SzResult<()> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Err(SzError::Destroyed {
                component: "SzAbstractFactory",
            });
        }

        let mut first_error: Option<SzError> = None;
        let mut record = |result: SzResult<()>, client: &str| {
            if let Err(e) = result {
                tracing::warn!(client, error = %e, "Failed to destroy client");
                first_error.get_or_insert(e);
            }
        };

        if let Some(engine) = self.engine.lock().take() {
            record(engine.destroy(), "engine");
        }
        if let Some(manager) = self.config_manager.lock().take() {
            record(manager.destroy(), "config_manager");
        }
        if let Some(config) = self.config.lock().take() {
            record(config.destroy(), "config");
        }
        if let Some(diagnostic) = self.diagnostic.lock().take() {
            record(diagnostic.destroy(), "diagnostic");
        }
        if let Some(product) = self.product.lock().take() {
            record(product.destroy(), "product");
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for SzAbstractFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SzAbstractFactory")
            .field("instance_name", &self.instance_name)
            .field("config_id", &self.config_id())
            .field("verbose_logging", &self.verbose_logging)
            .field("log_level", &self.log_level)
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish()
    }
}
