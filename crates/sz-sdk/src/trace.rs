//! Per-call entry/exit tracing and log level names.

use crate::error::{SzError, SzResult};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Log level names accepted by `set_log_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SzLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl SzLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SzLogLevel::Trace => "TRACE",
            SzLogLevel::Debug => "DEBUG",
            SzLogLevel::Info => "INFO",
            SzLogLevel::Warn => "WARN",
            SzLogLevel::Error => "ERROR",
            SzLogLevel::Fatal => "FATAL",
            SzLogLevel::Panic => "PANIC",
        }
    }

    pub fn is_trace(&self) -> bool {
        *self == SzLogLevel::Trace
    }
}

impl FromStr for SzLogLevel {
    type Err = SzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(SzLogLevel::Trace),
            "DEBUG" => Ok(SzLogLevel::Debug),
            "INFO" => Ok(SzLogLevel::Info),
            "WARN" => Ok(SzLogLevel::Warn),
            "ERROR" => Ok(SzLogLevel::Error),
            "FATAL" => Ok(SzLogLevel::Fatal),
            "PANIC" => Ok(SzLogLevel::Panic),
            _ => Err(SzError::invalid_argument(
                "log_level",
                format!("{} is not one of TRACE, DEBUG, INFO, WARN, ERROR, FATAL, PANIC", s),
            )),
        }
    }
}

impl fmt::Display for SzLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `key=value` rendering of call arguments.
struct Args<'a>(&'a [(&'static str, String)]);

impl fmt::Display for Args<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

pub(crate) fn entry(component: &'static str, method: &'static str, args: &[(&'static str, String)]) {
    tracing::trace!(target: "sz_sdk::trace", component, method, args = %Args(args), "entry");
}

pub(crate) fn exit<T: fmt::Debug>(
    component: &'static str,
    method: &'static str,
    result: &SzResult<T>,
    elapsed: Duration,
) {
    let elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    match result {
        Ok(value) => {
            tracing::trace!(target: "sz_sdk::trace", component, method, elapsed_us, ok = ?value, "exit")
        }
        Err(error) => {
            tracing::trace!(target: "sz_sdk::trace", component, method, elapsed_us, error = %error, "exit")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_log_level_parse() {
        assert_eq!("TRACE".parse::<SzLogLevel>().unwrap(), SzLogLevel::Trace);
        assert_eq!("warn".parse::<SzLogLevel>().unwrap(), SzLogLevel::Warn);
        assert!("VERBOSE".parse::<SzLogLevel>().is_err());
    }

    #[test]
    fn test_log_level_round_trip_names() {
        for level in [
            SzLogLevel::Trace,
            SzLogLevel::Debug,
            SzLogLevel::Info,
            SzLogLevel::Warn,
            SzLogLevel::Error,
            SzLogLevel::Fatal,
            SzLogLevel::Panic,
        ] {
            assert_eq!(level.as_str().parse::<SzLogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_args_rendering() {
        let args = vec![("dataSourceCode", "CUSTOMERS".to_string()), ("recordID", "1001".to_string())];
        assert_eq!(Args(&args).to_string(), "dataSourceCode=CUSTOMERS, recordID=1001");
        assert_eq!(Args(&[]).to_string(), "");
    }
}
