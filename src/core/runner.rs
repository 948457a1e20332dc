//! Subprocess execution behind a trait.
//!
//! `CommandRunner` is the seam every external tool call goes through.
//! `ProcessRunner` spawns real processes; `MockRunner` records invocations
//! and answers them from a responder closure.

use std::cell::RefCell;
use std::fmt;
use std::process::{Command, ExitStatus, Stdio};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::shell;

/// A program plus its arguments, passed to the OS without a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell::quote_arg(&self.program))?;
        if !self.args.is_empty() {
            write!(f, " {}", shell::quote_args(&self.args))?;
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Prefers stderr, falls back to stdout if stderr is empty.
    pub fn error_text(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim().to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }

    /// Stdout followed by stderr, for tools whose diagnostics span both.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

pub trait CommandRunner {
    /// Run to completion, capturing stdout and stderr.
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run attached to the terminal and return the exit code.
    fn interactive(&self, invocation: &Invocation) -> Result<i32>;
}

pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
        tracing::debug!("Running {}", invocation);

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(invocation, e))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: exit_code_of(output.status),
        })
    }

    fn interactive(&self, invocation: &Invocation) -> Result<i32> {
        tracing::debug!("Running interactively {}", invocation);

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| spawn_error(invocation, e))?;

        Ok(exit_code_of(status))
    }
}

/// Exit code of a finished process; death by signal N reports 128 + N.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

fn spawn_error(invocation: &Invocation, err: std::io::Error) -> Error {
    Error::internal_io(
        format!("Failed to run {}: {}", invocation.program, err),
        Some(invocation.program.clone()),
    )
    .with_hint(format!("Is '{}' installed and on PATH?", invocation.program))
}

type Responder = Box<dyn Fn(&Invocation) -> CommandOutput>;

/// Test double that records every invocation and answers from a closure.
pub struct MockRunner {
    responder: Responder,
    calls: RefCell<Vec<Invocation>>,
}

impl MockRunner {
    /// Every command succeeds with empty output.
    pub fn new() -> Self {
        Self::with_responder(|_| CommandOutput::success(""))
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&Invocation) -> CommandOutput + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Recorded invocations rendered as command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.to_string()).collect()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        Ok((self.responder)(invocation))
    }

    fn interactive(&self, invocation: &Invocation) -> Result<i32> {
        self.calls.borrow_mut().push(invocation.clone());
        Ok((self.responder)(invocation).exit_code)
    }
}
