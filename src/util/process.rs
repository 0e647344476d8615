//! Subprocess execution.
//!
//! Builders never spawn processes themselves. They describe an [`Invocation`]
//! and hand it to a [`ProcessRunner`], which blocks until the tool exits.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use crate::core::error::{BuildError, BuildResult};
use crate::util::hash::Fingerprint;

/// A fully described external command.
///
/// Environment entries are overrides on top of the parent environment and are
/// kept sorted so the same invocation always renders the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl Invocation {
    /// Create a new invocation of the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Invocation {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables.
    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Render a standalone shell script that reproduces this invocation.
    pub fn to_script(&self) -> String {
        let mut script = String::from("#!/bin/bash\nset -e\n");
        script.push_str(&format!("# fingerprint: {}\n", self.fingerprint()));
        if let Some(cwd) = &self.cwd {
            script.push_str(&format!("cd {}\n", shell_quote(&cwd.display().to_string())));
        }
        for (key, value) in &self.env {
            script.push_str(&format!("export {}={}\n", key, shell_quote(value)));
        }
        let mut line = vec![shell_quote(&self.program.display().to_string())];
        line.extend(self.args.iter().map(|a| shell_quote(a)));
        script.push_str(&line.join(" \\\n    "));
        script.push('\n');
        script
    }

    /// Stable digest of program, arguments, environment and working directory.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.program.display().to_string())
            .update_strs(self.args.iter().map(String::as_str))
            .update_map(&self.env)
            .update_opt(self.cwd.as_ref().map(|c| c.display().to_string()).as_deref());
        fp.finish_short()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools on behalf of builders.
///
/// Implementations block until the tool exits and turn a non-zero exit into
/// [`BuildError::ExternalTool`] carrying the captured output.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> BuildResult<ProcessOutput>;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        SystemRunner
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> BuildResult<ProcessOutput> {
        tracing::debug!("running `{}`", invocation.display_command());

        let mut cmd = invocation.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|source| BuildError::Spawn {
            program: invocation.get_program().to_path_buf(),
            source,
        })?;
        let output = child.wait_with_output().map_err(|source| BuildError::Spawn {
            program: invocation.get_program().to_path_buf(),
            source,
        })?;

        let result = ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(BuildError::ExternalTool {
                command: invocation.display_command(),
                code: result.code,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }
}

/// Logs and records invocations without running anything.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    invocations: Mutex<Vec<Invocation>>,
}

impl DryRunRunner {
    pub fn new() -> Self {
        DryRunRunner::default()
    }

    /// Everything that would have run, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

impl ProcessRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> BuildResult<ProcessOutput> {
        tracing::info!("[dry-run] {}", invocation.display_command());
        if let Ok(mut list) = self.invocations.lock() {
            list.push(invocation.clone());
        }
        Ok(ProcessOutput {
            code: Some(0),
            ..ProcessOutput::default()
        })
    }
}

/// Quote a word for a POSIX shell if it needs it.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find CMake.
pub fn find_cmake() -> Option<PathBuf> {
    find_executable("cmake")
}

/// Find a make implementation.
pub fn find_make() -> Option<PathBuf> {
    find_executable("make").or_else(|| find_executable("gmake"))
}

/// Find Ninja.
pub fn find_ninja() -> Option<PathBuf> {
    find_executable("ninja")
}
