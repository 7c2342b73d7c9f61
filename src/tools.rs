//! Invocation of the external tools the pipeline drives.
//!
//! Each tool module builds [`Invocation`]s; a [`ToolRunner`] executes them.
//! The pipeline only ever talks to the runner trait, so tests substitute a
//! runner that records invocations and fabricates outputs instead of
//! spawning processes.

pub mod mosdepth;
pub mod samtools;
pub mod verifybamid;

use std::ffi::OsStr;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use tracing::debug;
use tracing::info;
use tracing::trace;

use crate::errors::QcError;

/// Number of trailing stderr lines kept as diagnostics for a failed tool.
const DIAGNOSTIC_LINES: usize = 20;

//============//
// Invocation //
//============//

/// A fully specified command line for one external tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    tool: &'static str,
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl Invocation {
    /// Creates a new [`Invocation`] of `program`, referred to as `tool` in
    /// logs and errors.
    pub fn new<P: Into<PathBuf>>(tool: &'static str, program: P) -> Self {
        Invocation {
            tool,
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends a `--flag value` pair.
    pub fn option<S: AsRef<OsStr>>(self, flag: &str, value: S) -> Self {
        self.arg(flag).arg(value)
    }

    /// Sets an environment variable for the child process.
    pub fn env<K: AsRef<OsStr>, V: AsRef<OsStr>>(mut self, key: K, value: V) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// The name of the tool.
    pub fn tool(&self) -> &'static str {
        self.tool
    }

    /// The executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The arguments, in order.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// The extra environment variables.
    pub fn envs(&self) -> &[(OsString, OsString)] {
        &self.envs
    }

    /// The value following `flag` in the arguments, if any.
    pub fn option_value(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    /// The command line as it would be typed in a shell (for logging).
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Runs the invocation to completion. Failing to start the process and
    /// exiting unsuccessfully are both reported as
    /// [`QcError::ExternalToolFailure`].
    pub fn run<R>(&self, runner: &R) -> Result<ToolOutput, QcError>
    where
        R: ToolRunner + ?Sized,
    {
        info!("  [*] Running {}.", self.tool);
        debug!("    [*] {}", self.command_line());

        let output = runner
            .execute(self)
            .map_err(|e| QcError::ExternalToolFailure {
                tool: String::from(self.tool),
                status: String::from("could not be started"),
                diagnostics: e.to_string(),
            })?;

        if !output.success() {
            return Err(QcError::ExternalToolFailure {
                tool: String::from(self.tool),
                status: output.status(),
                diagnostics: output.diagnostics(),
            });
        }

        Ok(output)
    }
}

//========//
// Output //
//========//

/// What a finished tool run left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// The exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,

    /// Everything the tool wrote to stderr.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited with code zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// A human-readable exit status.
    pub fn status(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => String::from("terminated by signal"),
        }
    }

    /// The last lines of stderr, joined with ` | `.
    pub fn diagnostics(&self) -> String {
        let lines: Vec<&str> = self
            .stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();

        if lines.is_empty() {
            return String::from("no diagnostic output");
        }

        let start = lines.len().saturating_sub(DIAGNOSTIC_LINES);
        lines[start..].join(" | ")
    }
}

//========//
// Runner //
//========//

/// Executes [`Invocation`]s.
pub trait ToolRunner {
    /// Runs the invocation and waits for it to exit. An `Err` means the
    /// process could not be started at all.
    fn execute(&self, invocation: &Invocation) -> io::Result<ToolOutput>;
}

/// Runs tools as child processes, blocking until they exit.
#[derive(Debug, Default)]
pub struct SubprocessRunner;

impl ToolRunner for SubprocessRunner {
    fn execute(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
        let output = Command::new(invocation.program())
            .args(invocation.args())
            .envs(invocation.envs().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            trace!("    [{}] {}", invocation.tool(), line);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stderr.lines() {
            debug!("    [{}] {}", invocation.tool(), line);
        }

        Ok(ToolOutput {
            code: output.status.code(),
            stderr,
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! A [`ToolRunner`] that never spawns anything.

    use std::cell::RefCell;

    use super::*;

    /// Records every invocation and answers with a caller-supplied closure,
    /// which may also write whatever output files the real tool would have.
    pub struct RecordingRunner<F>
    where
        F: Fn(&Invocation) -> io::Result<ToolOutput>,
    {
        calls: RefCell<Vec<Invocation>>,
        respond: F,
    }

    impl<F> RecordingRunner<F>
    where
        F: Fn(&Invocation) -> io::Result<ToolOutput>,
    {
        pub fn new(respond: F) -> Self {
            RecordingRunner {
                calls: RefCell::new(Vec::new()),
                respond,
            }
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.borrow().clone()
        }

        pub fn count(&self, tool: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.tool() == tool).count()
        }
    }

    impl<F> ToolRunner for RecordingRunner<F>
    where
        F: Fn(&Invocation) -> io::Result<ToolOutput>,
    {
        fn execute(&self, invocation: &Invocation) -> io::Result<ToolOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            (self.respond)(invocation)
        }
    }

    pub fn succeeded() -> io::Result<ToolOutput> {
        Ok(ToolOutput {
            code: Some(0),
            stderr: String::new(),
        })
    }

    pub fn failed(stderr: &str) -> io::Result<ToolOutput> {
        Ok(ToolOutput {
            code: Some(1),
            stderr: String::from(stderr),
        })
    }
}
