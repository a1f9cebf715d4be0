//! Structured Logging - JSON-formatted logs for machine parsing
//!
//! Completion runs inside an interactive prompt, so nothing in the engine
//! prints on its own: every diagnostic goes through here as one JSON line on
//! stderr (and optionally a file).
//!
//! Usage:
//!   use completion_core::structured_log::{log_event, LogLevel};
//!
//!   log_event(LogLevel::Warn, "RUNNER", "generator_timeout", json!({
//!       "script": "softwareupdate --list-full-installers",
//!       "timeout_ms": 5000
//!   }));
//!
//! Output:
//!   {"timestamp":"2026-10-16T12:34:56Z","level":"warn","component":"RUNNER","event":"generator_timeout","data":{...}}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
    static ref LOG_CONFIG: Mutex<LogConfig> = Mutex::new(LogConfig::default());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub component: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Logger settings. Also the `log` section of the engine config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    #[serde(alias = "json")]
    pub json_output: bool,
    #[serde(alias = "file")]
    pub file_path: Option<PathBuf>,
    pub min_level: LogLevel,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json_output: true,
            file_path: None,
            min_level: LogLevel::Warn,
        }
    }
}

/// Initialize the structured logger
pub fn init_logger(config: LogConfig) {
    if let Some(path) = &config.file_path {
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(path) {
            if let Ok(mut log_file) = LOG_FILE.lock() {
                *log_file = Some(file);
            }
        }
    }

    if let Ok(mut cfg) = LOG_CONFIG.lock() {
        *cfg = config;
    }
}

/// Log an event with structured data
pub fn log_event(level: LogLevel, component: &str, event: &str, data: serde_json::Value) {
    log_entry(level, component, event, None, Some(data));
}

/// Log a message with optional data
pub fn log_message(
    level: LogLevel,
    component: &str,
    event: &str,
    message: &str,
    data: Option<serde_json::Value>,
) {
    log_entry(level, component, event, Some(message.to_string()), data);
}

fn log_entry(
    level: LogLevel,
    component: &str,
    event: &str,
    message: Option<String>,
    data: Option<serde_json::Value>,
) {
    let config = match LOG_CONFIG.lock() {
        Ok(guard) => (*guard).clone(),
        Err(_) => LogConfig::default(),
    };

    if level < config.min_level {
        return;
    }

    let entry = LogEntry {
        timestamp: Utc::now(),
        level: level.as_str().to_string(),
        component: component.to_string(),
        event: event.to_string(),
        message,
        data,
    };

    let output = render(&entry, config.json_output);

    eprintln!("{}", output);

    if let Ok(mut log_file) = LOG_FILE.lock() {
        if let Some(ref mut file) = *log_file {
            let _ = writeln!(file, "{}", output);
        }
    }
}

fn render(entry: &LogEntry, json: bool) -> String {
    if json {
        return serde_json::to_string(entry).unwrap_or_else(|_| format!("{:?}", entry));
    }

    // [COMPONENT] event: message {data}
    let msg = entry.message.as_deref().unwrap_or("");
    let data_str = entry
        .data
        .as_ref()
        .map(|d| format!(" {}", d))
        .unwrap_or_default();

    format!("[{}] {}: {}{}", entry.component, entry.event, msg, data_str)
}

#[macro_export]
macro_rules! slog_debug {
    ($component:expr, $event:expr, $data:expr) => {
        $crate::structured_log::log_event(
            $crate::structured_log::LogLevel::Debug,
            $component,
            $event,
            $data,
        )
    };
    ($component:expr, $event:expr, $msg:expr, $data:expr) => {
        $crate::structured_log::log_message(
            $crate::structured_log::LogLevel::Debug,
            $component,
            $event,
            $msg,
            $data,
        )
    };
}

#[macro_export]
macro_rules! slog_warn {
    ($component:expr, $event:expr, $data:expr) => {
        $crate::structured_log::log_event(
            $crate::structured_log::LogLevel::Warn,
            $component,
            $event,
            $data,
        )
    };
    ($component:expr, $event:expr, $msg:expr, $data:expr) => {
        $crate::structured_log::log_message(
            $crate::structured_log::LogLevel::Warn,
            $component,
            $event,
            $msg,
            $data,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: "warn".to_string(),
            component: "RUNNER".to_string(),
            event: "generator_failed".to_string(),
            message: Some("exit status 1".to_string()),
            data: Some(serde_json::json!({"script": "false"})),
        }
    }

    #[test]
    fn test_json_rendering() {
        let line = render(&entry(), true);
        assert!(line.contains("\"level\":\"warn\""));
        assert!(line.contains("\"component\":\"RUNNER\""));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_plain_rendering() {
        let line = render(&entry(), false);
        assert!(line.starts_with("[RUNNER] generator_failed: exit status 1"));
        assert!(line.contains("\"script\":\"false\""));
    }

    #[test]
    fn test_level_ordering_and_parsing() {
        assert!(LogLevel::Debug < LogLevel::Warn);
        assert!(LogLevel::Error > LogLevel::Info);
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
