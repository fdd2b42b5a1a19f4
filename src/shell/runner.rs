//! Child process execution for the infrastructure tools.
//!
//! Standard output and standard error are drained by two concurrent readers
//! so a chatty child never blocks on a full pipe. Both readers finish before
//! the exit status is collected. Output is echoed live when requested;
//! otherwise it is shown only if the command fails.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{ExecutionError, OrchestratorError, Result};

use super::console::Console;

/// One command to run.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<String>,
    dir: PathBuf,
    echo: bool,
    success_codes: Vec<i32>,
}

impl Invocation {
    /// Creates an invocation of `program` in `dir`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            dir: dir.into(),
            echo: false,
            success_codes: vec![0],
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Streams output to the console while the command runs.
    #[must_use]
    pub const fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Exit codes treated as success.
    #[must_use]
    pub fn success_codes(mut self, codes: &[i32]) -> Self {
        self.success_codes = codes.to_vec();
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map_or_else(|| self.program.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Captured result of a command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs tool commands and resolves tool binaries.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    console: Arc<Console>,
    search_path: Option<OsString>,
}

impl CommandRunner {
    /// Creates a runner resolving tools on `$PATH`.
    #[must_use]
    pub fn new(console: Arc<Console>) -> Self {
        Self {
            console,
            search_path: None,
        }
    }

    /// Resolves tools on `search_path` instead of `$PATH`.
    #[must_use]
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Finds an executable named `tool` on the search path.
    #[must_use]
    pub fn lookup(&self, tool: &str) -> Option<PathBuf> {
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"))?;
        std::env::split_paths(&search_path)
            .map(|dir| dir.join(tool))
            .find(|candidate| is_executable(candidate))
    }

    /// Finds `tool` or fails with a remediation hint.
    ///
    /// # Errors
    ///
    /// Returns `ToolNotFound` if the tool is not on the search path.
    pub fn require(&self, tool: &str, hint: &str) -> Result<PathBuf> {
        self.lookup(tool)
            .ok_or_else(|| OrchestratorError::tool_not_found(tool, hint))
    }

    /// Runs an invocation to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started or exits with a
    /// code outside the invocation's success codes.
    pub async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let name = invocation.program_name();
        debug!(
            "Running {} {} in {}",
            name,
            invocation.args.join(" "),
            invocation.dir.display()
        );

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed {
                program: name.clone(),
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout, stderr) = tokio::join!(
            drain(stdout, &self.console, invocation.echo),
            drain(stderr, &self.console, invocation.echo),
        );

        let status = child.wait().await?;
        let output = CommandOutput {
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout?).into_owned(),
            stderr: String::from_utf8_lossy(&stderr?).into_owned(),
        };

        let succeeded = output
            .code
            .is_some_and(|code| invocation.success_codes.contains(&code));
        if succeeded {
            return Ok(output);
        }

        if !invocation.echo {
            self.console.write_block(output.stdout.as_bytes())?;
            self.console.write_block(output.stderr.as_bytes())?;
        }
        Err(ExecutionError::CommandFailed {
            program: name,
            args: invocation.args.join(" "),
            dir: invocation.dir.clone(),
            status: status.to_string(),
            stderr: output.stderr,
        }
        .into())
    }
}

/// Reads a child stream to the end, echoing each line when asked.
async fn drain<R>(reader: Option<R>, console: &Console, echo: bool) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    let mut captured = Vec::new();
    if !echo {
        let mut reader = reader;
        reader.read_to_end(&mut captured).await?;
        return Ok(captured);
    }

    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        console.write_block(&line)?;
        captured.extend_from_slice(&line);
    }
    Ok(captured)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
