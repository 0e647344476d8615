//! Test utilities for toolstage unit tests.
//!
//! The main piece is [`RecordingRunner`], a [`ProcessRunner`] that records
//! every invocation instead of spawning it. Expectations can make matching
//! commands fail or produce output, and hooks can create the files a real
//! tool would have written.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolstage::test_support::{RecordingRunner, CommandPattern, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let runner = RecordingRunner::new();
//!     runner.expect(
//!         CommandPattern::StartsWith("xcrun".into()),
//!         MockProcessOutput::success("/sdk\n"),
//!     );
//!     // Hand `runner` to a BuildEnv...
//! }
//! ```

pub mod fixtures;

use std::sync::Mutex;

use crate::core::error::{BuildError, BuildResult};
use crate::util::process::{Invocation, ProcessOutput, ProcessRunner};

pub use fixtures::*;

/// Canned result for a matched command.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockProcessOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success_status(&self) -> bool {
        self.status == 0
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching a command line (`program arg arg ...`).
#[derive(Debug, Clone)]
pub enum CommandPattern {
    Exact(String),
    StartsWith(String),
    Contains(String),
    Regex(String),
    Any,
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
            CommandPattern::Any => true,
        }
    }
}

type Hook = Box<dyn Fn(&Invocation) + Send + Sync>;

/// Records invocations instead of running them.
#[derive(Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    expectations: Mutex<Vec<(CommandPattern, MockProcessOutput)>>,
    hooks: Mutex<Vec<(CommandPattern, Hook)>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    /// Return `output` for commands matching `pattern`. First match wins.
    pub fn expect(&self, pattern: CommandPattern, output: MockProcessOutput) -> &Self {
        self.expectations.lock().unwrap().push((pattern, output));
        self
    }

    /// Run `hook` for every command matching `pattern`, before its output is
    /// returned.
    pub fn on_command(
        &self,
        pattern: CommandPattern,
        hook: impl Fn(&Invocation) + Send + Sync + 'static,
    ) -> &Self {
        self.hooks.lock().unwrap().push((pattern, Box::new(hook)));
        self
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(Invocation::display_command)
            .collect()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Invocations whose program file name is `name`.
    pub fn invocations_of(&self, name: &str) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|inv| {
                inv.get_program()
                    .file_name()
                    .map(|n| n.to_string_lossy() == name)
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> BuildResult<ProcessOutput> {
        let cmd = invocation.display_command();
        self.invocations.lock().unwrap().push(invocation.clone());

        for (pattern, hook) in self.hooks.lock().unwrap().iter() {
            if pattern.matches(&cmd) {
                hook(invocation);
            }
        }

        let output = self
            .expectations
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| pattern.matches(&cmd))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();

        if !output.success_status() {
            return Err(BuildError::ExternalTool {
                command: cmd,
                code: Some(output.status),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(ProcessOutput {
            code: Some(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_records_calls_in_order() {
        let runner = RecordingRunner::new();
        runner.run(&Invocation::new("cmake").arg("-GNinja")).unwrap();
        runner.run(&Invocation::new("ninja").arg("install")).unwrap();

        assert_eq!(runner.calls(), vec!["cmake -GNinja", "ninja install"]);
        assert_eq!(runner.invocations_of("ninja").len(), 1);
    }

    #[test]
    fn test_expectation_output_and_failure() {
        let runner = RecordingRunner::new();
        runner
            .expect(
                CommandPattern::StartsWith("xcrun".to_string()),
                MockProcessOutput::success("/sdk\n"),
            )
            .expect(
                CommandPattern::Contains("install".to_string()),
                MockProcessOutput::failure(2, "no rule to make target"),
            );

        let out = runner.run(&Invocation::new("xcrun").arg("--show-sdk-path")).unwrap();
        assert_eq!(out.stdout, "/sdk\n");

        let err = runner.run(&Invocation::new("make").arg("install")).unwrap_err();
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn test_hooks_run_for_matches() {
        let runner = RecordingRunner::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        runner.on_command(CommandPattern::Regex(r"^make\b".to_string()), move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        runner.run(&Invocation::new("make").arg("-j4")).unwrap();
        runner.run(&Invocation::new("cmake")).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
