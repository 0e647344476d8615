//! Wall-clock timing of build steps.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::util::fs::write_string;

/// Durations of named steps, in completion order.
#[derive(Debug, Default)]
pub struct BuildTimes {
    entries: Mutex<Vec<(String, Duration)>>,
}

impl BuildTimes {
    pub fn new() -> Self {
        BuildTimes::default()
    }

    /// Run `f` and record how long it took under `name`.
    pub fn time<T>(&self, name: impl Into<String>, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    pub fn record(&self, name: impl Into<String>, duration: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((name.into(), duration));
        }
    }

    pub fn entries(&self) -> Vec<(String, Duration)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// One `name: seconds` line per step.
    pub fn report(&self) -> String {
        self.entries()
            .iter()
            .map(|(name, duration)| format!("{}: {:.2}s\n", name, duration.as_secs_f64()))
            .collect()
    }

    /// Write the report to `build_times.txt` (or wherever `path` points).
    pub fn write_report(&self, path: &Path) -> Result<()> {
        write_string(path, &self.report())
    }
}
