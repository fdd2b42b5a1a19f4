//! Approval policy for destructive or costly actions.
//!
//! [`ApprovalGate`] decides whether an action proceeds automatically, after
//! the operator answers `y`, or never. Terminal input is behind the
//! [`Prompter`] trait so tests can script the answers.

use serde::Serialize;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{error, info};

/// How proposed changes to cloud infrastructure are approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyBehavior {
    /// Proceed without asking.
    Automatic,
    /// Ask the operator before every change.
    PromptBeforeApply,
    /// Never make changes.
    Never,
}

impl ApplyBehavior {
    /// Resolves the behavior from the auto-approve setting.
    #[must_use]
    pub const fn from_auto_approve(auto_approve: bool) -> Self {
        if auto_approve {
            Self::Automatic
        } else {
            Self::PromptBeforeApply
        }
    }
}

/// Source of operator answers.
///
/// `ask` is a blocking call. It is made from async code, so implementations
/// that wait on a terminal should go through [`blocking`].
pub trait Prompter: Send + Sync {
    /// Shows `prompt` and returns one line of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input stream fails or is closed.
    fn ask(&self, prompt: &str) -> io::Result<String>;
}

/// Prompter reading from standard input, prompting on standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&self, prompt: &str) -> io::Result<String> {
        blocking(|| {
            let mut stderr = io::stderr().lock();
            write!(stderr, "{prompt}")?;
            stderr.flush()?;

            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input stream closed"));
            }
            Ok(line)
        })
    }
}

/// Runs blocking work without stalling the other tasks of a multi-threaded
/// tokio runtime. Outside such a runtime `f` simply runs in place.
pub fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(f),
        _ => f(),
    }
}

/// Prompter replaying canned answers; an empty script reads as a closed stream.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Creates a prompter that answers with `answers` in order.
    #[must_use]
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, prompt: &str) -> io::Result<String> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left"))
    }
}

/// Resolves whether a proposed action may proceed.
#[derive(Clone)]
pub struct ApprovalGate {
    behavior: ApplyBehavior,
    prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for ApprovalGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalGate")
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}

impl ApprovalGate {
    /// Creates a gate for `behavior` reading answers from `prompter`.
    #[must_use]
    pub fn new(behavior: ApplyBehavior, prompter: Arc<dyn Prompter>) -> Self {
        Self { behavior, prompter }
    }

    /// Creates a gate that prompts on the terminal.
    #[must_use]
    pub fn interactive(behavior: ApplyBehavior) -> Self {
        Self::new(behavior, Arc::new(StdinPrompter))
    }

    /// The behavior this gate enforces.
    #[must_use]
    pub const fn behavior(&self) -> ApplyBehavior {
        self.behavior
    }

    /// Decides whether to proceed.
    ///
    /// `Automatic` proceeds and `Never` refuses, both without prompting.
    /// `PromptBeforeApply` asks until the answer is `y` or `n`; an input
    /// error counts as `n`.
    #[must_use]
    pub fn decide(&self, prompt: &str) -> bool {
        match self.behavior {
            ApplyBehavior::Automatic => true,
            ApplyBehavior::Never => false,
            ApplyBehavior::PromptBeforeApply => self.ask_yes_no(prompt),
        }
    }

    fn ask_yes_no(&self, prompt: &str) -> bool {
        let question = format!("{} [y/n]: ", prompt.trim_end());
        loop {
            match self.prompter.ask(&question) {
                Ok(answer) => match answer.trim().to_lowercase().as_str() {
                    "y" => return true,
                    "n" => return false,
                    _ => info!("Please answer \"y\" or \"n\""),
                },
                Err(e) => {
                    error!("Failed to read operator response: {e}");
                    return false;
                }
            }
        }
    }
}
