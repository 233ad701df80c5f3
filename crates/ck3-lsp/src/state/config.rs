//! Server configuration from `initializationOptions` and
//! `workspace/didChangeConfiguration`.

use serde_json::Value;
use std::path::PathBuf;

/// Tunable server behavior. Every field has a sensible default so an empty
/// (or absent) options payload configures a working server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Master switch for semantic validation (syntax always runs).
    pub validation_enabled: bool,
    /// Style and convention hints (CK38xx/CK39xx families).
    pub style_checks: bool,
    /// Fixed debounce override in milliseconds; `None` = adaptive by size.
    pub debounce_override_ms: Option<u64>,
    /// Game log directory to tail, when the log watcher is wanted.
    pub log_watch_path: Option<PathBuf>,
    /// Cap on completion items returned per request.
    pub max_completion_items: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            validation_enabled: true,
            style_checks: true,
            debounce_override_ms: None,
            log_watch_path: None,
            max_completion_items: 200,
        }
    }
}

impl ServerConfig {
    /// Merge a configuration payload over the current values. Unknown keys
    /// are ignored.
    pub fn apply(&mut self, options: &Value) {
        if let Some(enabled) = options.get("validation").and_then(Value::as_bool) {
            self.validation_enabled = enabled;
        }
        if let Some(style) = options.get("styleChecks").and_then(Value::as_bool) {
            self.style_checks = style;
        }
        match options.get("debounceMs") {
            Some(Value::Number(n)) => self.debounce_override_ms = n.as_u64(),
            Some(Value::Null) => self.debounce_override_ms = None,
            _ => {}
        }
        if let Some(path) = options.get("logWatchPath").and_then(Value::as_str) {
            self.log_watch_path =
                if path.is_empty() { None } else { Some(PathBuf::from(path)) };
        }
        if let Some(max) = options.get("maxCompletionItems").and_then(Value::as_u64) {
            self.max_completion_items = max as usize;
        }
    }

    /// Build from an optional `initializationOptions` value.
    pub fn from_initialization_options(options: Option<&Value>) -> Self {
        let mut config = Self::default();
        if let Some(options) = options {
            config.apply(options);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_live() {
        let config = ServerConfig::default();
        assert!(config.validation_enabled);
        assert!(config.debounce_override_ms.is_none());
    }

    #[test]
    fn apply_merges_known_keys() {
        let mut config = ServerConfig::default();
        config.apply(&json!({
            "validation": false,
            "debounceMs": 50,
            "logWatchPath": "/tmp/logs",
            "unknownKey": true
        }));
        assert!(!config.validation_enabled);
        assert_eq!(config.debounce_override_ms, Some(50));
        assert_eq!(config.log_watch_path, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn null_debounce_resets_to_adaptive() {
        let mut config = ServerConfig::default();
        config.apply(&json!({"debounceMs": 100}));
        config.apply(&json!({"debounceMs": null}));
        assert!(config.debounce_override_ms.is_none());
    }
}
