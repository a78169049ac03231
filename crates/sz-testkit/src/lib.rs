//! Test infrastructure for the Senzing bindings
//!
//! Provides:
//! - [`MockSenzing`], an in-memory native library behind the `sz-sdk` traits
//! - Record and configuration fixtures
//! - A recording observer for notification assertions
//! - Error verification helpers

pub mod fixtures;
pub mod mock;
mod recorder;
mod verification;

pub use fixtures::*;
pub use mock::{MockCall, MockSenzing};
pub use recorder::RecordingObserver;
pub use verification::*;

use std::sync::Once;
use sz_sdk::{SzAbstractFactory, SzEngine};

static INIT_LOGGING: Once = Once::new();

/// Routes `tracing` output to the test harness. Honors `RUST_LOG`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A fresh mock plus a factory over it.
pub fn mock_factory() -> (MockSenzing, SzAbstractFactory) {
    init_test_logging();
    let mock = MockSenzing::new();
    let factory = SzAbstractFactory::new(mock.library(), TEST_INSTANCE_NAME, &test_settings(), 0, 0);
    (mock, factory)
}

/// A fresh mock plus an initialized engine over it.
///
/// # Panics
///
/// Panics if the engine cannot be initialized, which only happens when the
/// mock itself is broken.
pub fn mock_engine() -> (MockSenzing, SzEngine) {
    init_test_logging();
    let mock = MockSenzing::new();
    let engine = SzEngine::new(mock.library().engine());
    engine
        .initialize(TEST_INSTANCE_NAME, &test_settings(), 0, 0)
        .expect("mock engine initializes");
    (mock, engine)
}
