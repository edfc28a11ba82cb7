//! Deadline-bounded child process execution.
//!
//! One contract, two implementations: on unix the child gets a SIGTERM at
//! the deadline and a SIGKILL if it ignores that for the grace period; the
//! portable fallback goes straight to a hard kill. Either way the child is
//! guaranteed reaped before `run` returns, so a timed-out probe never
//! lingers and corrupts the next measurement.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use occ_types::ProbeError;
use tracing::{debug, warn};

/// How often the supervising thread polls the child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Grace period between SIGTERM and SIGKILL on unix.
const KILL_GRACE: Duration = Duration::from_secs(3);

/// Outcome of one bounded execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Completed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    TimedOut,
}

/// Executes one external command per call, blocking until it exits or the
/// deadline elapses. No retry lives at this layer.
pub trait BoundedRunner: Send + Sync {
    fn run(
        &self,
        executable: &Path,
        args: &[String],
        deadline: Duration,
    ) -> Result<RunResult, ProbeError>;

    /// Implementation name, for startup logs.
    fn name(&self) -> &'static str;
}

/// Unix runner: polls for exit, escalates SIGTERM then SIGKILL at the
/// deadline.
#[cfg(unix)]
pub struct SignalRunner;

#[cfg(unix)]
impl BoundedRunner for SignalRunner {
    fn run(
        &self,
        executable: &Path,
        args: &[String],
        deadline: Duration,
    ) -> Result<RunResult, ProbeError> {
        supervise(executable, args, deadline, terminate_with_signals)
    }

    fn name(&self) -> &'static str {
        "signal"
    }
}

/// Portable runner: polls for exit, hard-kills at the deadline.
pub struct PollRunner;

impl BoundedRunner for PollRunner {
    fn run(
        &self,
        executable: &Path,
        args: &[String],
        deadline: Duration,
    ) -> Result<RunResult, ProbeError> {
        supervise(executable, args, deadline, terminate_hard)
    }

    fn name(&self) -> &'static str {
        "poll"
    }
}

/// Runner for the current platform, selected once at startup.
pub fn default_runner() -> Box<dyn BoundedRunner> {
    #[cfg(unix)]
    {
        Box::new(SignalRunner)
    }
    #[cfg(not(unix))]
    {
        Box::new(PollRunner)
    }
}

fn command_string(executable: &Path, args: &[String]) -> String {
    let mut parts = vec![executable.display().to_string()];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}

/// Shared supervision loop; only the termination policy differs between
/// runners.
fn supervise(
    executable: &Path,
    args: &[String],
    deadline: Duration,
    terminate: fn(&mut Child),
) -> Result<RunResult, ProbeError> {
    let command = command_string(executable, args);
    debug!(%command, deadline_secs = deadline.as_secs_f64(), "spawning probe");

    let mut child = Command::new(executable)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProbeError::LaunchFailed {
            command: command.clone(),
            source,
        })?;

    // Drain pipes on background threads so a chatty child can never block
    // on a full pipe while we wait for it.
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= deadline {
                    warn!(%command, "probe hit deadline, terminating");
                    terminate(&mut child);
                    join_reader(stdout_reader);
                    join_reader(stderr_reader);
                    return Ok(RunResult::TimedOut);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                terminate(&mut child);
                join_reader(stdout_reader);
                join_reader(stderr_reader);
                return Err(ProbeError::WaitFailed { command, source });
            }
        }
    };

    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);

    match status.code() {
        Some(exit_code) => Ok(RunResult::Completed {
            exit_code,
            stdout,
            stderr,
        }),
        // Killed by something other than us before the deadline.
        None => Err(ProbeError::KilledBySignal { command }),
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut reader| {
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = reader.read_to_end(&mut buffer);
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(unix)]
fn terminate_with_signals(child: &mut Child) {
    let pid = child.id() as libc::pid_t;
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    let grace_start = Instant::now();
    while grace_start.elapsed() < KILL_GRACE {
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn terminate_hard(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
