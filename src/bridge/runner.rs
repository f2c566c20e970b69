//! Subprocess execution of the `s9s` binary.
//!
//! [`build_argv`] decides the final argument vector (standalone directives vs
//! connected invocations), [`Runner`] spawns the process under a timeout and
//! folds every outcome (spawn failure, non-zero exit, timeout) into an
//! [`ExecutionResult`]. Nothing here returns an error to the caller.

use std::future::Future;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::env::{
    self, CC_HOST, CC_KEYFILE, CC_PASS, CC_PORT, CC_USER, ConnectionSettings, EnvSnapshot,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Exit code reported when the real one is unavailable.
pub const UNAVAILABLE_EXIT_CODE: i32 = 1;

/// Appended to every connected invocation.
pub const RPC_TLS_FLAG: &str = "--rpc-tls";

/// Directives that run without a controller connection.
const STANDALONE_DIRECTIVES: [&str; 2] = ["--version", "--help"];

/// Connection flags in the order they are rendered.
const CONNECTION_FLAGS: [(&str, &str); 5] = [
    (CC_HOST, "--controller"),
    (CC_PORT, "--controller-port"),
    (CC_USER, "--cmon-user"),
    (CC_PASS, "--password"),
    (CC_KEYFILE, "--private-key-file"),
];

/// How long to keep reading pipes once the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/* ---- Request / Result ---- */

/// One `s9s` invocation: argument tokens plus an optional timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    tokens: Vec<String>,
    timeout: Option<Duration>,
}

impl ExecutionRequest {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Effective timeout (the override, or [`DEFAULT_TIMEOUT`]).
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// `--version` / `--help` need no controller connection.
    pub fn is_standalone(&self) -> bool {
        self.tokens
            .first()
            .is_some_and(|t| STANDALONE_DIRECTIVES.contains(&t.as_str()))
    }
}

/// Normalized outcome of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn spawn_failure(binary: &str, err: &std::io::Error) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("failed to spawn '{binary}': {err}"),
            exit_code: UNAVAILABLE_EXIT_CODE,
        }
    }
}

/* ---- Argument construction ---- */

/// Final argument vector for `request`.
///
/// Standalone directives pass through untouched. Connected invocations get
/// the connection flags for every present setting, then the caller tokens,
/// then [`RPC_TLS_FLAG`]. The trailing flag is appended even when the caller
/// already passed a conflicting one; s9s is assumed to let the last flag win.
pub fn build_argv(request: &ExecutionRequest, settings: &ConnectionSettings) -> Vec<String> {
    if request.is_standalone() {
        return request.tokens().to_vec();
    }
    let mut argv: Vec<String> = CONNECTION_FLAGS
        .iter()
        .filter_map(|(key, flag)| settings.get(key).map(|v| format!("{flag}={v}")))
        .collect();
    argv.extend(request.tokens().iter().cloned());
    argv.push(RPC_TLS_FLAG.to_string());
    argv
}

/// Copy of `argv` safe to log.
fn redacted(argv: &[String]) -> Vec<String> {
    argv.iter()
        .map(|a| {
            if a.starts_with("--password=") {
                "--password=***".to_string()
            } else {
                a.clone()
            }
        })
        .collect()
}

/* ---- Executor seam ---- */

/// Something that can run an [`ExecutionRequest`].
///
/// Implementations must never fail: every problem is encoded in the result.
pub trait Executor: Send + Sync {
    fn execute(&self, request: ExecutionRequest) -> impl Future<Output = ExecutionResult> + Send;
}

#[derive(Debug, Clone, Default)]
enum EnvSource {
    /// Re-read the process environment on every call.
    #[default]
    Process,
    Fixed(EnvSnapshot),
}

/// Spawns the real `s9s` binary.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    source: EnvSource,
}

impl Runner {
    /// Runner reading the live process environment at each invocation.
    pub fn from_process_env() -> Self {
        Self::default()
    }

    /// Runner resolving settings and the binary from a fixed snapshot.
    pub fn with_env(snapshot: EnvSnapshot) -> Self {
        Self {
            source: EnvSource::Fixed(snapshot),
        }
    }

    fn snapshot(&self) -> EnvSnapshot {
        match &self.source {
            EnvSource::Process => EnvSnapshot::capture(),
            EnvSource::Fixed(s) => s.clone(),
        }
    }

    pub async fn run(&self, request: &ExecutionRequest) -> ExecutionResult {
        let snapshot = self.snapshot();
        let settings = env::resolve(&snapshot);
        let binary = env::binary(&snapshot);
        let argv = build_argv(request, &settings);
        let timeout = request.timeout();

        debug!(
            binary = %binary,
            argv = ?redacted(&argv),
            connected = !request.is_standalone() && !settings.is_empty(),
            timeout_s = timeout.as_secs(),
            "spawning s9s"
        );
        let started = Instant::now();

        let mut command = Command::new(&binary);
        command
            .args(&argv)
            .envs(settings.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(binary = %binary, error = %err, "failed to spawn s9s");
                return ExecutionResult::spawn_failure(&binary, &err);
            }
        };

        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        let mut note = None;
        let exit_code = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status.code().unwrap_or(UNAVAILABLE_EXIT_CODE),
            Ok(Err(err)) => {
                warn!(error = %err, "failed waiting for s9s");
                note = Some(format!("failed waiting for '{binary}': {err}"));
                UNAVAILABLE_EXIT_CODE
            }
            Err(_) => {
                warn!(timeout_s = timeout.as_secs(), "s9s timed out, killing");
                if let Err(err) = child.kill().await {
                    warn!(error = %err, "failed to kill timed out s9s");
                }
                note = Some(format!(
                    "s9s timed out after {}s; output may be truncated",
                    timeout.as_secs()
                ));
                UNAVAILABLE_EXIT_CODE
            }
        };

        let stdout = stdout.finish().await;
        let mut stderr = stderr.finish().await;
        if let Some(note) = note {
            if !stderr.is_empty() {
                stderr.push('\n');
            }
            stderr.push_str(&note);
        }

        debug!(
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "s9s finished"
        );

        ExecutionResult {
            stdout,
            stderr,
            exit_code,
        }
    }
}

impl Executor for Runner {
    async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        self.run(&request).await
    }
}

/* ---- Pipe capture ---- */

/// Background reader accumulating a child pipe so partial output survives a kill.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let task = tokio::spawn(async move {
            let Some(mut reader) = reader else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buf, task }
    }

    /// Collected text with a single trailing newline removed.
    async fn finish(self) -> String {
        let mut task = self.task;
        if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
            // a grandchild still holds the pipe open
            task.abort();
        }
        let bytes = std::mem::take(&mut *self.buf.lock().unwrap_or_else(PoisonError::into_inner));
        let mut text = String::from_utf8_lossy(&bytes).into_owned();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        text
    }
}
