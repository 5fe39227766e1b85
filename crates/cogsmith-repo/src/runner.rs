//! Subprocess execution
//!
//! Every git and pip invocation goes through a [`ProcessRunner`]. The
//! [`SystemRunner`] runs real processes on tokio's blocking pool, bounded by
//! a semaphore; the [`ScriptedRunner`] answers from canned responses and
//! records what was asked of it.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Semaphore;

use crate::error::{RepoError, Result};

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code (-1 when the process was killed by a signal)
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Trimmed stdout
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Runs an argument vector as a subprocess
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `argv` (program first) with extra environment variables
    ///
    /// A non-zero exit code is not an error here; callers decide what a
    /// failure means.
    async fn run(&self, argv: &[String], env: &[(String, String)]) -> Result<ProcessOutput>;
}

// ============ System Runner ============

/// Runs real processes, at most `threads` at a time
#[derive(Debug, Clone)]
pub struct SystemRunner {
    permits: Arc<Semaphore>,
}

impl SystemRunner {
    pub fn new(threads: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(threads.max(1))),
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, argv: &[String], env: &[(String, String)]) -> Result<ProcessOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| RepoError::Spawn {
            program: String::new(),
            message: "empty command".to_string(),
        })?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| RepoError::Other(format!("process pool closed: {}", e)))?;

        tracing::debug!(command = %argv.join(" "), "running subprocess");

        let mut command = std::process::Command::new(program);
        command
            .args(args)
            .envs(env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null());

        let output = tokio::task::spawn_blocking(move || command.output())
            .await
            .map_err(|e| RepoError::Other(format!("subprocess task failed: {}", e)))?
            .map_err(|e| RepoError::Spawn {
                program: program.clone(),
                message: e.to_string(),
            })?;

        let result = ProcessOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            tracing::debug!(
                command = %argv.join(" "),
                status = result.status,
                stderr = %result.stderr.trim(),
                "subprocess exited with failure"
            );
        }

        Ok(result)
    }
}

// ============ Scripted Runner ============

type Responder = Arc<dyn Fn(&[String]) -> ProcessOutput + Send + Sync>;

/// One invocation seen by a [`ScriptedRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl RecordedCall {
    /// Whether the pattern tokens appear in this call's argv, in order
    pub fn matches(&self, pattern: &[&str]) -> bool {
        matches_pattern(&self.argv, pattern)
    }
}

fn matches_pattern(argv: &[String], pattern: &[&str]) -> bool {
    let mut tokens = argv.iter();
    pattern
        .iter()
        .all(|wanted| tokens.any(|token| token == wanted))
}

/// In-memory runner for tests
///
/// Responses are matched by pattern: a pattern matches when all its tokens
/// appear in the argv in the same order. The most recently registered match
/// wins; unmatched calls succeed with empty output.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    responses: Arc<RwLock<Vec<(Vec<String>, Responder)>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls matching `pattern` with a fixed output
    pub fn respond(&self, pattern: &[&str], output: ProcessOutput) -> &Self {
        self.respond_with(pattern, move |_| output.clone())
    }

    /// Answer calls matching `pattern` by running `responder`
    ///
    /// The responder may touch the filesystem to simulate what the real
    /// command would have done.
    pub fn respond_with<F>(&self, pattern: &[&str], responder: F) -> &Self
    where
        F: Fn(&[String]) -> ProcessOutput + Send + Sync + 'static,
    {
        let pattern = pattern.iter().map(|s| s.to_string()).collect();
        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern, Arc::new(responder)));
        self
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Calls whose argv matches `pattern`
    pub fn calls_matching(&self, pattern: &[&str]) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.matches(pattern))
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, argv: &[String], env: &[(String, String)]) -> Result<ProcessOutput> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                argv: argv.to_vec(),
                env: env.to_vec(),
            });

        let responder = {
            let responses = self.responses.read().unwrap_or_else(PoisonError::into_inner);
            responses
                .iter()
                .rev()
                .find(|(pattern, _)| {
                    let pattern: Vec<&str> = pattern.iter().map(String::as_str).collect();
                    matches_pattern(argv, &pattern)
                })
                .map(|(_, responder)| Arc::clone(responder))
        };

        Ok(match responder {
            Some(responder) => responder(argv),
            None => ProcessOutput::ok(""),
        })
    }
}
