//! Process spawning, deadline enforcement and output capture
//!
//! Standard output and standard error are drained by their own tasks from the
//! moment the child starts. Waiting for exit and reading the pipes must not be
//! sequential: a child that fills a pipe buffer blocks until someone reads it,
//! and would then never exit.

use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::sandbox::SandboxError;
use crate::sandbox::command::SandboxCommand;

/// How long drains may keep reading after the process tree was terminated
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// How long to wait for a killed child to be reaped
const REAP_GRACE: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 8192;

/// Bytes captured from one output stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub bytes: Vec<u8>,
    /// More data arrived than the capture limit allowed
    pub truncated: bool,
}

impl Captured {
    fn push(&mut self, chunk: &[u8], limit: usize) {
        let room = limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    /// Decode as UTF-8, replacing invalid sequences
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Everything observed about one child run
#[derive(Debug)]
pub struct RunOutput {
    /// Exit status, absent when the deadline elapsed first
    pub status: Option<ExitStatus>,
    pub stdout: Captured,
    pub stderr: Captured,
    pub timed_out: bool,
    pub elapsed: Duration,
}

impl RunOutput {
    /// Exit code if the process exited normally
    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|status| status.code())
    }

    /// Signal that killed the process, if any
    pub fn signal(&self) -> Option<i32> {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            self.status.and_then(|status| status.signal())
        }
        #[cfg(not(unix))]
        {
            None
        }
    }
}

/// A spawned child together with the process group it leads
///
/// The group is only signalled while its leader is unreaped. An unreaped
/// leader keeps the group id reserved, so a recycled pid is never hit.
#[derive(Debug)]
pub struct ProcessTree {
    child: Child,
    /// Process group id (equal to the child's pid on Unix)
    pgid: Option<u32>,
    reaped: bool,
    group_killed: bool,
    terminated: bool,
}

impl ProcessTree {
    /// Spawn the command as the leader of a new process group
    #[instrument(skip(command), fields(argv = ?command.argv()))]
    pub fn spawn(command: &SandboxCommand) -> Result<Self, SandboxError> {
        let mut cmd = command.build().ok_or(SandboxError::EmptyCommand)?;
        let child = cmd.spawn().map_err(SandboxError::SpawnFailed)?;
        let pgid = child.id();

        debug!(pid = ?pgid, "spawned process");

        Ok(Self {
            child,
            pgid,
            reaped: false,
            group_killed: false,
            terminated: false,
        })
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Wait for the direct child to exit
    ///
    /// On Linux the descendants left in the group are killed between the
    /// leader's exit and its reaping.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        #[cfg(target_os = "linux")]
        if let Some(pid) = self.pgid
            && !self.reaped
        {
            wait_exited(pid).await?;
            self.kill_group();
        }

        let status = self.child.wait().await?;
        self.reaped = true;
        Ok(status)
    }

    /// SIGKILL every process in the group, once
    fn kill_group(&mut self) {
        if self.group_killed {
            return;
        }
        self.group_killed = true;

        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            use nix::errno::Errno;
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
                Ok(()) => debug!(pgid, "killed process group"),
                // Group already empty
                Err(Errno::ESRCH) => {}
                Err(e) => warn!(pgid, error = %e, "failed to kill process group"),
            }
        }
    }

    /// Forcibly terminate the child and all of its descendants.
    ///
    /// Best effort: failures are logged and swallowed. Safe to call more than
    /// once and after the direct child has exited.
    pub fn terminate(&mut self) {
        self.terminated = true;

        // TODO: outside Linux the group is killed after the leader was reaped,
        // which can signal a recycled group id; needs a non-reaping wait there.
        self.kill_group();

        if !self.reaped
            && let Err(e) = self.child.start_kill()
        {
            debug!(error = %e, "failed to kill child");
        }
    }
}

/// Block until the child has exited without reaping it
#[cfg(target_os = "linux")]
async fn wait_exited(pid: u32) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::wait::{Id, WaitPidFlag, waitid};
    use nix::unistd::Pid;

    tokio::task::spawn_blocking(move || {
        loop {
            match waitid(
                Id::Pid(Pid::from_raw(pid as i32)),
                WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT,
            ) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(std::io::Error::from(e)),
            }
        }
    })
    .await
    .map_err(std::io::Error::other)?
}

impl Drop for ProcessTree {
    fn drop(&mut self) {
        if !self.terminated {
            self.terminate();
        }
    }
}

/// Read a stream to the end, keeping at most `limit` bytes, until cancelled
async fn drain<R>(
    mut reader: R,
    stream: &'static str,
    limit: usize,
    mut cancel: watch::Receiver<bool>,
) -> Result<Captured, SandboxError>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        tokio::select! {
            biased;

            _ = cancel.wait_for(|cancelled| *cancelled) => break,

            read = reader.read(&mut buf) => {
                let n = read.map_err(|source| SandboxError::ReadFailed { stream, source })?;
                if n == 0 {
                    break;
                }
                captured.push(&buf[..n], limit);
            }
        }
    }

    Ok(captured)
}

/// Write the input (if any) and close stdin so the child sees end-of-input
fn feed_stdin(stdin: Option<ChildStdin>, input: &[u8]) -> Option<tokio::task::JoinHandle<()>> {
    let mut handle = stdin?;
    let input = input.to_vec();

    Some(tokio::spawn(async move {
        if !input.is_empty()
            && let Err(e) = handle.write_all(&input).await
        {
            // The child may exit without reading its input
            debug!(error = %e, "stdin write stopped early");
        }
        let _ = handle.shutdown().await;
    }))
}

/// Run a command to completion or until `deadline` elapses.
///
/// When the deadline elapses first the whole process tree is killed and the
/// output captured so far is returned with `timed_out` set. After a normal
/// exit, descendants left behind in the process group are killed as well.
#[instrument(skip(command, input), fields(argv = ?command.argv()))]
pub async fn run_with_deadline(
    command: &SandboxCommand,
    input: &[u8],
    deadline: Duration,
    max_output: usize,
) -> Result<RunOutput, SandboxError> {
    let start = Instant::now();
    let mut tree = ProcessTree::spawn(command)?;

    let stdout = tree.take_stdout().ok_or(SandboxError::MissingPipe("stdout"))?;
    let stderr = tree.take_stderr().ok_or(SandboxError::MissingPipe("stderr"))?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let stdout_task = tokio::spawn(drain(stdout, "stdout", max_output, cancel_rx.clone()));
    let stderr_task = tokio::spawn(drain(stderr, "stderr", max_output, cancel_rx));
    let stdin_task = feed_stdin(tree.take_stdin(), input);

    let waited = tokio::select! {
        status = tree.wait() => Some(status),
        _ = tokio::time::sleep(deadline) => None,
    };
    let elapsed = start.elapsed();
    let timed_out = waited.is_none();

    if timed_out {
        debug!(?deadline, "deadline elapsed, terminating process tree");
    }
    tree.terminate();
    if timed_out && tokio::time::timeout(REAP_GRACE, tree.wait()).await.is_err() {
        warn!("killed process was not reaped in time");
    }

    let collect = async { tokio::join!(stdout_task, stderr_task) };
    tokio::pin!(collect);
    let (stdout, stderr) = match tokio::time::timeout(DRAIN_GRACE, &mut collect).await {
        Ok(joined) => joined,
        Err(_) => {
            // A descendant outside the process group still holds a pipe open
            warn!("output pipes still open after termination, cancelling drains");
            let _ = cancel_tx.send(true);
            collect.await
        }
    };

    if let Some(task) = stdin_task {
        task.abort();
    }

    let status = waited.transpose().map_err(SandboxError::WaitFailed)?;

    let output = RunOutput {
        status,
        stdout: stdout??,
        stderr: stderr??,
        timed_out,
        elapsed,
    };

    debug!(
        exit_code = ?output.exit_code(),
        signal = ?output.signal(),
        timed_out,
        elapsed = ?elapsed,
        "process finished"
    );

    Ok(output)
}
