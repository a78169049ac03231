//! Safe bindings for the Senzing entity resolution engine.
//!
//! All resolution, matching and graph work happens inside the vendor's
//! native library. This crate marshals arguments across its C ABI, owns the
//! response buffers, classifies failures and reports each call to optional
//! observers:
//!
//! - [`SzEngine`]: records, entities, search, why/how and export
//! - [`SzConfig`] / [`SzConfigManager`]: configuration documents and registry
//! - [`SzDiagnostic`] / [`SzProduct`]: repository and product information
//! - [`SzAbstractFactory`]: creates initialized clients from [`SdkConfig`]
//!
//! # Architecture
//!
//! ```text
//! caller ──► client method ──► marshal (&CStr) ──► NativeLibrary trait
//!                                                     │
//!              ┌─── NATIVE_CALL_LOCK held ────────────┤
//!              │ status != 0 ─► read code, message, clear
//!              └──────────────────────────────────────┘
//!                 │
//!                 ├─► SzError (classified by ExceptionCodeTable)
//!                 ├─► trace exit event (when TRACE)
//!                 └─► observers (fire-and-forget)
//! ```
//!
//! The native seam is a set of traits ([`EngineApi`], [`ConfigApi`], ...).
//! [`LibSz`] implements them over `sz-sys` when the `link-libsz` feature is
//! enabled; tests use an in-memory implementation.
//!
//! # Example
//!
//! ```ignore
//! use sz_sdk::{InfoMode, LibSz, SdkConfig, SzAbstractFactory, SzFlags};
//!
//! let factory = SzAbstractFactory::from_config(LibSz::load()?, &SdkConfig::load()?)?;
//! let engine = factory.create_engine()?;
//! engine.add_record("CUSTOMERS", "1001", record_json, InfoMode::WithoutInfo, SzFlags::NO_FLAGS)?;
//! let entity = engine.get_entity_by_record_id("CUSTOMERS", "1001", SzFlags::ENTITY_DEFAULT_FLAGS)?;
//! ```

mod component;
mod config;
mod configmanager;
mod diagnostic;
mod engine;
mod error;
mod export;
mod factory;
mod flags;
mod libsz;
mod native;
mod observer;
mod product;
mod settings;
mod trace;

pub use config::{ConfigHandle, ConfigSession, SzConfig, CONFIG_COMPONENT_ID};
pub use configmanager::{SzConfigManager, CONFIG_MANAGER_COMPONENT_ID};
pub use diagnostic::{SzDiagnostic, DIAGNOSTIC_COMPONENT_ID};
pub use engine::{PathConstraints, SzEngine, ENGINE_COMPONENT_ID};
pub use error::{
    exception_code, message_id, ErrorDetail, ErrorPayload, ExceptionCodeTable, SzError, SzErrorKind, SzResult,
    MESSAGE_ID_PREFIX,
};
pub use export::{EntityReportStream, ExportFormat, ExportHandle, ExportReport, EXPORT_CHANNEL_CAPACITY};
pub use factory::{SzAbstractFactory, FACTORY_COMPONENT_ID};
pub use flags::{InfoMode, SzFlags};
pub use libsz::LibSz;
pub use native::{
    ConfigApi, ConfigManagerApi, DiagnosticApi, EngineApi, ExceptionApi, NativeLibrary, NativeResponse, ProductApi,
    NO_ERROR,
};
pub use observer::{Notification, Observer, ObserverRegistry};
pub use product::{ProductVersion, SzProduct, PRODUCT_COMPONENT_ID};
pub use settings::{
    get_env, PipelineSettings, SdkConfig, SqlSettings, SzSettings, DEFAULT_CONFIG_PATH, ENV_DATABASE_URL,
    ENV_ENGINE_CONFIGURATION_JSON, ENV_LOG_LEVEL,
};
pub use trace::SzLogLevel;

#[cfg(feature = "link-libsz")]
pub use libsz::{LibSzConfig, LibSzConfigManager, LibSzDiagnostic, LibSzEngine, LibSzProduct};
