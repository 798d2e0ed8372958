//! Child process execution with a hard deadline.

use crate::RuntimeError;
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// Stdout and stderr are drained on helper threads so a chatty child (a
/// `nix build -L` log) cannot block on a full pipe while we poll. The
/// deadline also bounds collecting that output: a background process that
/// inherited the pipes cannot hold the caller past `timeout`.
pub fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
) -> Result<CommandOutput, RuntimeError> {
    let command = describe(&cmd);
    debug!("running {command} (timeout {}s)", timeout.as_secs());

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!("{command} exceeded {}s, killing", timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            return Err(RuntimeError::Timeout {
                command,
                secs: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let (Some(stdout), Some(stderr)) = (collect(stdout, deadline), collect(stderr, deadline))
    else {
        warn!("{command} left its output pipes open past {}s", timeout.as_secs());
        return Err(RuntimeError::Timeout {
            command,
            secs: timeout.as_secs(),
        });
    };

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

/// Like [`run_with_timeout`], but a non-zero exit is an error.
pub fn run_checked(cmd: Command, timeout: Duration) -> Result<CommandOutput, RuntimeError> {
    let command = describe(&cmd);
    let output = run_with_timeout(cmd, timeout)?;
    if !output.success() {
        return Err(RuntimeError::CommandFailed {
            command,
            code: output.status.code().unwrap_or(-1),
            stderr: output.stderr.trim().to_owned(),
        });
    }
    Ok(output)
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Output of one drained pipe, or `None` if it is still open at `deadline`.
fn collect(pipe: Option<mpsc::Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(rx) = pipe else {
        return Some(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
    }
}

pub(crate) fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}
