//! Build event types for JSON output.
//!
//! These events are emitted one JSON object per line when using
//! `--message-format=json`.
//!
//! # Event Types
//!
//! - `builder-started`: A builder began its config fan-out
//! - `config-started`: One config of a builder started building
//! - `config-installed`: One config finished installing
//! - `builder-finished`: A builder completed (success or failure)
//! - `builder-skipped`: A builder was excluded by the selection
//! - `pipeline-finished`: The whole run completed
//! - `diagnostic`: A free-form message
//!
//! # Stability
//!
//! New fields may be added, but existing fields should not be removed or renamed.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

/// A build event emitted during the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    #[serde(rename = "builder-started")]
    BuilderStarted {
        builder: String,
        /// Number of configs the builder fans out over
        configs: usize,
    },

    #[serde(rename = "config-started")]
    ConfigStarted {
        builder: String,
        config: String,
        index: usize,
    },

    #[serde(rename = "config-installed")]
    ConfigInstalled {
        builder: String,
        config: String,
        install_dir: PathBuf,
    },

    #[serde(rename = "builder-finished")]
    BuilderFinished {
        builder: String,
        success: bool,
        duration_ms: u64,
    },

    #[serde(rename = "builder-skipped")]
    BuilderSkipped { builder: String },

    #[serde(rename = "pipeline-finished")]
    PipelineFinished {
        success: bool,
        duration_ms: u64,
        builders_built: u64,
    },

    /// A generic diagnostic message.
    #[serde(rename = "diagnostic")]
    Diagnostic {
        /// Severity level ("error", "warning", "note")
        level: String,
        message: String,
    },
}

impl BuildEvent {
    pub fn builder_started(builder: impl Into<String>, configs: usize) -> Self {
        BuildEvent::BuilderStarted {
            builder: builder.into(),
            configs,
        }
    }

    pub fn config_started(builder: impl Into<String>, config: impl Into<String>, index: usize) -> Self {
        BuildEvent::ConfigStarted {
            builder: builder.into(),
            config: config.into(),
            index,
        }
    }

    pub fn config_installed(
        builder: impl Into<String>,
        config: impl Into<String>,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        BuildEvent::ConfigInstalled {
            builder: builder.into(),
            config: config.into(),
            install_dir: install_dir.into(),
        }
    }

    pub fn builder_finished(builder: impl Into<String>, success: bool, duration_ms: u64) -> Self {
        BuildEvent::BuilderFinished {
            builder: builder.into(),
            success,
            duration_ms,
        }
    }

    pub fn skipped(builder: impl Into<String>) -> Self {
        BuildEvent::BuilderSkipped {
            builder: builder.into(),
        }
    }

    pub fn pipeline_finished(success: bool, duration_ms: u64, builders_built: u64) -> Self {
        BuildEvent::PipelineFinished {
            success,
            duration_ms,
            builders_built,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        BuildEvent::Diagnostic {
            level: "warning".to_string(),
            message: message.into(),
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Receives build events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BuildEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &BuildEvent) {}
}

/// Writes each event as one JSON line to stdout.
#[derive(Debug, Default)]
pub struct JsonLinesSink {
    lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new() -> Self {
        JsonLinesSink::default()
    }
}

impl EventSink for JsonLinesSink {
    fn emit(&self, event: &BuildEvent) {
        // Parallel configs must not interleave partial lines.
        let _guard = self.lock.lock();
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", event.to_json());
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<BuildEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        CollectingSink::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &BuildEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_installed_serialization() {
        let event = BuildEvent::config_installed("libunwind", "android-arm", "/out/lib/libunwind-arm-install");
        let json = event.to_json();
        assert!(json.contains("\"reason\":\"config-installed\""));
        assert!(json.contains("\"builder\":\"libunwind\""));
        assert!(json.contains("libunwind-arm-install"));
    }

    #[test]
    fn test_finished_serialization() {
        let event = BuildEvent::builder_finished("stage1", true, 2340);
        let json = event.to_json();
        assert!(json.contains("\"reason\":\"builder-finished\""));
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"duration_ms\":2340"));
    }

    #[test]
    fn test_skipped_serialization() {
        let json = BuildEvent::skipped("swig").to_json();
        assert_eq!(json, r#"{"reason":"builder-skipped","builder":"swig"}"#);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(&BuildEvent::builder_started("stage2", 1));
        sink.emit(&BuildEvent::warning("selection `foo` matched no builder"));
        assert_eq!(sink.events().len(), 2);
    }
}
