//! State and call plumbing shared by every client.
//!
//! A [`Component`] owns the lifecycle flags, the observer registry and the
//! exception code table of one client, and implements the fixed shape every
//! public operation follows:
//!
//! 1. sample the entry time and, when tracing, log the arguments,
//! 2. run the native call under the process-wide call lock,
//! 3. on failure read the exception code and message, then clear them,
//! 4. when tracing, log the result and elapsed time,
//! 5. notify observers without waiting for them.

use crate::error::{ErrorPayload, ExceptionCodeTable, SzError, SzResult};
use crate::native::{native_call_lock, ExceptionApi, NativeResponse, NO_ERROR};
use crate::observer::{Notification, ObserverRegistry};
use crate::trace::{self, SzLogLevel};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Salient call arguments, used for trace output and observer details.
pub(crate) type Details = Vec<(&'static str, String)>;

macro_rules! details {
    () => {
        Vec::new()
    };
    ($($key:literal => $value:expr),+ $(,)?) => {
        vec![$(($key, $value.to_string())),+]
    };
}
pub(crate) use details;

pub(crate) struct Component {
    name: &'static str,
    display_name: &'static str,
    id: u32,
    log_level: RwLock<SzLogLevel>,
    initialized: AtomicBool,
    destroyed: AtomicBool,
    origin: RwLock<String>,
    observers: ObserverRegistry,
    codes: Arc<ExceptionCodeTable>,
}

impl Component {
    pub(crate) fn new(
        name: &'static str,
        display_name: &'static str,
        id: u32,
        codes: Arc<ExceptionCodeTable>,
    ) -> Self {
        Self {
            name,
            display_name,
            id,
            log_level: RwLock::new(SzLogLevel::default()),
            initialized: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            origin: RwLock::new(String::new()),
            observers: ObserverRegistry::new(),
            codes,
        }
    }

    pub(crate) fn ensure_live(&self) -> SzResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(SzError::Destroyed {
                component: self.display_name,
            });
        }
        Ok(())
    }

    pub(crate) fn mark_initialized(&self) {
        self.destroyed.store(false, Ordering::Release);
        self.initialized.store(true, Ordering::Release);
    }

    pub(crate) fn mark_destroyed(&self) {
        self.initialized.store(false, Ordering::Release);
        self.destroyed.store(true, Ordering::Release);
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub(crate) fn is_trace(&self) -> bool {
        self.log_level().is_trace()
    }

    pub(crate) fn log_level(&self) -> SzLogLevel {
        *self.log_level.read()
    }

    /// Whether events at `level` pass this client's log level.
    pub(crate) fn logs_at(&self, level: SzLogLevel) -> bool {
        level >= self.log_level()
    }

    pub(crate) fn set_log_level(&self, name: &str) -> SzResult<SzLogLevel> {
        let level: SzLogLevel = name.parse()?;
        *self.log_level.write() = level;
        Ok(level)
    }

    pub(crate) fn origin(&self) -> String {
        self.origin.read().clone()
    }

    pub(crate) fn set_origin(&self, origin: &str) {
        *self.origin.write() = origin.to_string();
    }

    pub(crate) fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    /// Runs one public operation with tracing and observer notification.
    ///
    /// `details` is only evaluated when tracing is on or observers exist.
    pub(crate) fn call<T, D, F>(&self, method: &'static str, message_number: u32, details: D, body: F) -> SzResult<T>
    where
        T: fmt::Debug,
        D: FnOnce() -> Details,
        F: FnOnce() -> SzResult<T>,
    {
        let tracing_on = self.is_trace();
        let observing = self.observers.is_active();
        let details = if tracing_on || observing { details() } else { Vec::new() };

        let entry_time = Instant::now();
        if tracing_on {
            trace::entry(self.name, method, &details);
        }

        let result = body();

        if tracing_on {
            trace::exit(self.name, method, &result, entry_time.elapsed());
        }
        if observing {
            self.notify(message_number, details, result.as_ref().err());
        }
        result
    }

    /// Same as [`Component::call`], but fails fast once destroyed.
    pub(crate) fn live_call<T, D, F>(
        &self,
        method: &'static str,
        message_number: u32,
        details: D,
        body: F,
    ) -> SzResult<T>
    where
        T: fmt::Debug,
        D: FnOnce() -> Details,
        F: FnOnce() -> SzResult<T>,
    {
        self.ensure_live()?;
        self.call(method, message_number, details, body)
    }

    pub(crate) fn notify(&self, message_number: u32, details: Details, error: Option<&SzError>) {
        let notification = Notification::new(self.origin(), self.id, message_number)
            .with_details(details)
            .with_error(error);
        self.observers.notify(&notification);
    }

    /// Invokes a native call whose non-zero status means failure.
    pub(crate) fn invoke<E, T, C>(&self, api: &E, function: &'static str, error_number: u32, call: C) -> SzResult<T>
    where
        E: ExceptionApi + ?Sized,
        C: FnOnce(&E) -> NativeResponse<T>,
    {
        let _guard = native_call_lock();
        let response = call(api);
        if response.return_code != NO_ERROR {
            return Err(self.post_mortem(api, function, error_number, response.return_code));
        }
        Ok(response.value)
    }

    /// Invokes a native call whose negative status means failure.
    ///
    /// The non-negative status is returned alongside the value because some
    /// entry points use it as a count.
    pub(crate) fn invoke_non_negative<E, T, C>(
        &self,
        api: &E,
        function: &'static str,
        error_number: u32,
        call: C,
    ) -> SzResult<(i64, T)>
    where
        E: ExceptionApi + ?Sized,
        C: FnOnce(&E) -> NativeResponse<T>,
    {
        let _guard = native_call_lock();
        let response = call(api);
        if response.return_code < 0 {
            return Err(self.post_mortem(api, function, error_number, response.return_code));
        }
        Ok((response.return_code, response.value))
    }

    /// Invokes a status-only native call.
    pub(crate) fn invoke_status<E, C>(&self, api: &E, function: &'static str, error_number: u32, call: C) -> SzResult<()>
    where
        E: ExceptionApi + ?Sized,
        C: FnOnce(&E) -> i64,
    {
        self.invoke(api, function, error_number, |api| NativeResponse::new(call(api), ()))
    }

    /// Invokes a native call returning a string response.
    pub(crate) fn invoke_text<E, C>(&self, api: &E, function: &'static str, error_number: u32, call: C) -> SzResult<String>
    where
        E: ExceptionApi + ?Sized,
        C: FnOnce(&E) -> NativeResponse,
    {
        let bytes = self.invoke(api, function, error_number, call)?;
        self.decode(function, bytes)
    }

    pub(crate) fn decode(&self, function: &'static str, bytes: Vec<u8>) -> SzResult<String> {
        String::from_utf8(bytes).map_err(|_| SzError::InvalidUtf8 {
            function: self.qualified(function),
        })
    }

    fn qualified(&self, function: &str) -> String {
        format!("{}.{}", self.name, function)
    }

    /// Reads and clears the last exception. Must run under the call lock.
    ///
    /// # Panics
    ///
    /// Panics if the native layer fails to clear its exception state, since
    /// every later error report would be attributed to the wrong call.
    fn post_mortem<E>(&self, api: &E, function: &'static str, error_number: u32, status: i64) -> SzError
    where
        E: ExceptionApi + ?Sized,
    {
        let code = api.get_last_exception_code();
        let message = String::from_utf8_lossy(&api.get_last_exception()).into_owned();
        let cleared = api.clear_last_exception();
        if cleared != NO_ERROR {
            panic!(
                "{}: clearing the native last exception failed with status {}",
                self.qualified(function),
                cleared
            );
        }

        let kind = self.codes.classify(code);
        if self.logs_at(SzLogLevel::Debug) {
            tracing::debug!(
                component = self.name,
                function,
                code,
                status,
                kind = %kind,
                "Native call failed"
            );
        }
        SzError::Native {
            kind,
            code,
            status,
            payload: ErrorPayload::new(self.qualified(function), self.id, error_number, code, &message),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("initialized", &self.is_initialized())
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .field("observers", &self.observers)
            .finish()
    }
}

/// Generates the observer, origin and log level methods every client shares.
macro_rules! client_common {
    ($client:ty) => {
        impl $client {
            /// Sets the log level.
            ///
            /// `TRACE` turns on per-call entry/exit events and `DEBUG` turns
            /// on the native failure event. `INFO` and above keep both off;
            /// the client emits nothing of its own at those levels.
            ///
            /// # Errors
            ///
            /// Returns [`SzError::InvalidArgument`](crate::SzError::InvalidArgument)
            /// for an unknown level name.
            pub fn set_log_level(&self, log_level_name: &str) -> $crate::error::SzResult<()> {
                let component = self.component();
                let result = component.set_log_level(log_level_name).map(|_| ());
                if component.observers().is_active() {
                    component.notify(
                        8703,
                        $crate::component::details!["logLevel" => log_level_name],
                        result.as_ref().err(),
                    );
                }
                result
            }

            /// The level last accepted by [`set_log_level`](Self::set_log_level).
            pub fn log_level(&self) -> $crate::SzLogLevel {
                self.component().log_level()
            }

            /// Adds an observer notified after every call.
            pub fn register_observer(
                &self,
                observer: std::sync::Arc<dyn $crate::observer::Observer>,
            ) -> $crate::error::SzResult<()> {
                let component = self.component();
                let observer_id = observer.id().to_string();
                let result = component.observers().register(observer);
                if component.observers().is_active() {
                    component.notify(
                        8702,
                        $crate::component::details!["observerID" => observer_id],
                        result.as_ref().err(),
                    );
                }
                result
            }

            /// Removes an observer. The departing observer still receives the
            /// notification announcing its removal.
            pub fn unregister_observer(&self, observer_id: &str) -> $crate::error::SzResult<()> {
                let component = self.component();
                if component.observers().is_active() {
                    component.notify(8704, $crate::component::details!["observerID" => observer_id], None);
                }
                component.observers().unregister(observer_id)
            }

            /// Sets the origin tag included in every notification.
            pub fn set_observer_origin(&self, origin: &str) {
                self.component().set_origin(origin);
            }

            pub fn get_observer_origin(&self) -> String {
                self.component().origin()
            }

            pub fn is_initialized(&self) -> bool {
                self.component().is_initialized()
            }
        }
    };
}
pub(crate) use client_common;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SzErrorKind;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicI64;

    #[derive(Default)]
    struct FakeExceptions {
        code: i64,
        message: &'static str,
        clear_status: i64,
        clears: AtomicI64,
    }

    impl ExceptionApi for FakeExceptions {
        fn get_last_exception_code(&self) -> i64 {
            self.code
        }

        fn get_last_exception(&self) -> Vec<u8> {
            self.message.as_bytes().to_vec()
        }

        fn clear_last_exception(&self) -> i64 {
            self.clears.fetch_add(1, Ordering::SeqCst);
            self.clear_status
        }
    }

    fn component() -> Component {
        Component::new("szengine", "SzEngine", 6004, Arc::new(ExceptionCodeTable::default()))
    }

    #[test]
    fn test_invoke_success_does_not_touch_exception_state() {
        let api = FakeExceptions::default();
        let value = component()
            .invoke(&api, "get_stats", 4054, |_| NativeResponse::ok(7))
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(api.clears.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invoke_failure_classifies_and_clears_once() {
        let api = FakeExceptions {
            code: 33,
            message: "Unknown record",
            ..Default::default()
        };
        let err = component()
            .invoke_text(&api, "get_record", 4035, |_| NativeResponse::failed(-2))
            .unwrap_err();
        assert_eq!(api.clears.load(Ordering::SeqCst), 1);
        assert_eq!(err.kind(), Some(SzErrorKind::NotFound));
        assert_eq!(
            err.to_string(),
            r#"{"function":"szengine.get_record","error":{"id":"SZSDK60044035","reason":"SENZ0033|Unknown record"}}"#
        );
    }

    #[test]
    fn test_invoke_non_negative_passes_count() {
        let api = FakeExceptions::default();
        let (count, _) = component()
            .invoke_non_negative(&api, "count_redo_records", 4062, |_| NativeResponse::new(5, ()))
            .unwrap();
        assert_eq!(count, 5);
        assert!(component()
            .invoke_non_negative(&api, "count_redo_records", 4062, |_| NativeResponse::new(-1, ()))
            .is_err());
    }

    #[test]
    #[should_panic(expected = "clearing the native last exception failed")]
    fn test_failed_clear_panics() {
        let api = FakeExceptions {
            code: 1,
            message: "boom",
            clear_status: -1,
            ..Default::default()
        };
        let _ = component().invoke_status(&api, "destroy", 4006, |_| -1);
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = component().decode("fetch_next", vec![0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, SzError::InvalidUtf8 { ref function } if function == "szengine.fetch_next"));
    }

    #[test]
    fn test_live_call_after_destroy() {
        let component = component();
        component.mark_initialized();
        assert!(component.is_initialized());
        component.mark_destroyed();
        let err = component
            .live_call("get_stats", 8022, || details![], || Ok(()))
            .unwrap_err();
        assert_eq!(err.to_string(), "this SzEngine has been destroyed");
    }

    #[test]
    fn test_set_log_level_toggles_trace() {
        let component = component();
        component.set_log_level("TRACE").unwrap();
        assert!(component.is_trace());
        component.set_log_level("INFO").unwrap();
        assert!(!component.is_trace());
        assert!(component.set_log_level("LOUD").is_err());
    }

    #[test]
    fn test_log_level_gates_debug_events() {
        let component = component();
        assert_eq!(component.log_level(), SzLogLevel::Info);
        assert!(!component.logs_at(SzLogLevel::Debug));
        assert!(component.logs_at(SzLogLevel::Warn));

        component.set_log_level("debug").unwrap();
        assert!(component.logs_at(SzLogLevel::Debug));
        assert!(!component.is_trace());

        // A rejected name keeps the previous level.
        assert!(component.set_log_level("VERBOSE").is_err());
        assert_eq!(component.log_level(), SzLogLevel::Debug);

        component.set_log_level("ERROR").unwrap();
        assert!(!component.logs_at(SzLogLevel::Warn));
        assert!(component.logs_at(SzLogLevel::Fatal));
    }

    #[test]
    fn test_details_macro() {
        let details: Details = details!["entityID" => 1, "flags" => "0"];
        assert_eq!(details, vec![("entityID", "1".to_string()), ("flags", "0".to_string())]);
    }
}
