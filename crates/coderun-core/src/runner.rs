//! Child process runner
//!
//! Runs one command line in a working directory with:
//! - piped stdin, written by its own task and then closed
//! - stdout and stderr drained concurrently into capped accumulators
//! - a wall-clock timeout that kills the child's whole process group
//! - a bounded grace period for the drains once the child is gone

use crate::result::{ProcessResult, KILLED_EXIT_CODE};
use crate::{CoderunError, ExecutionConfig, Result};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;

// Upper bound on bytes buffered for a single unterminated line.
const CHUNK_LIMIT: u64 = 64 * 1024;

/// Allocation-failure diagnostics of the supported runtimes
const RESOURCE_MARKERS: &[&str] = &[
    "OutOfMemoryError",
    "Cannot allocate memory",
    "MemoryError",
    "JavaScript heap out of memory",
    "std::bad_alloc",
    "memory allocation of",
    "runtime: out of memory",
];

/// Whether `stderr` looks like the runtime ran out of memory
pub fn looks_like_resource_exhaustion(stderr: &str) -> bool {
    RESOURCE_MARKERS.iter().any(|marker| stderr.contains(marker))
}

/// Output accumulator capped at a number of characters
#[derive(Debug, Default)]
struct Captured {
    text: String,
    chars: usize,
    truncated: bool,
}

impl Captured {
    fn push(&mut self, s: &str, limit: usize) {
        if s.is_empty() {
            return;
        }
        let room = limit.saturating_sub(self.chars);
        if room == 0 {
            self.truncated = true;
            return;
        }
        match s.char_indices().nth(room) {
            None => {
                self.text.push_str(s);
                self.chars += s.chars().count();
            }
            Some((cut, _)) => {
                self.text.push_str(&s[..cut]);
                self.chars = limit;
                self.truncated = true;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    max_output: usize,
    drain_grace: Duration,
    env: Vec<(String, String)>,
}

impl ProcessRunner {
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            max_output: config.max_output_size,
            drain_grace: config.drain_grace,
            env: config.env.clone(),
        }
    }

    /// Run `command` inside `work_dir`, killing it once `timeout` elapses
    pub async fn run(
        &self,
        command: &[String],
        work_dir: &Path,
        stdin: &str,
        timeout: Duration,
    ) -> Result<ProcessResult> {
        let (program, args) = command.split_first().ok_or(CoderunError::EmptyCommand)?;

        let mut cmd = Command::new(resolve_program(program, work_dir));
        cmd.args(args)
            .current_dir(work_dir)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| CoderunError::Spawn {
            program: program.clone(),
            source,
        })?;
        let start = Instant::now();
        let pid = child.id();
        tracing::debug!(?pid, program = %program, "process spawned");

        let stdin_task = match child.stdin.take() {
            Some(pipe) if !stdin.is_empty() => Some(tokio::spawn(feed_stdin(pipe, stdin.to_owned()))),
            // Dropping the pipe closes it, signalling end of input.
            _ => None,
        };

        let stdout = Arc::new(Mutex::new(Captured::default()));
        let stderr = Arc::new(Mutex::new(Captured::default()));
        let drains = [
            child
                .stdout
                .take()
                .map(|s| tokio::spawn(drain(s, Arc::clone(&stdout), self.max_output))),
            child
                .stderr
                .take()
                .map(|s| tokio::spawn(drain(s, Arc::clone(&stderr), self.max_output))),
        ];

        let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => (status?, false),
            Err(_) => {
                tracing::debug!(?pid, timeout_ms = timeout.as_millis(), "timeout elapsed, killing");
                kill_process_group(pid);
                if let Err(e) = child.start_kill() {
                    tracing::debug!(error = %e, "start_kill after group kill");
                }
                (child.wait().await?, true)
            }
        };
        let duration = start.elapsed();

        // Descendants left behind by a child that exited on its own.
        if !timed_out {
            kill_process_group(pid);
        }

        self.join_drains(drains).await;
        if let Some(task) = stdin_task {
            task.abort();
        }

        let stdout = std::mem::take(&mut *stdout.lock());
        let stderr = std::mem::take(&mut *stderr.lock());

        let exit_code = if timed_out {
            KILLED_EXIT_CODE
        } else {
            status
                .code()
                .unwrap_or_else(|| status.signal().map_or(KILLED_EXIT_CODE, |sig| -sig))
        };

        let result = ProcessResult {
            exit_code,
            resource_exceeded: looks_like_resource_exhaustion(&stderr.text),
            stdout: stdout.text,
            stderr: stderr.text,
            stdout_truncated: stdout.truncated,
            stderr_truncated: stderr.truncated,
            duration,
            timed_out,
        };

        tracing::debug!(
            ?pid,
            exit_code = result.exit_code,
            timed_out = result.timed_out,
            elapsed_ms = duration.as_millis(),
            "process finished"
        );

        Ok(result)
    }

    async fn join_drains(&self, drains: [Option<JoinHandle<()>>; 2]) {
        let deadline = tokio::time::Instant::now() + self.drain_grace;
        for mut task in drains.into_iter().flatten() {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "output drain failed"),
                Err(_) => {
                    tracing::warn!(
                        grace_ms = self.drain_grace.as_millis(),
                        "output drain did not finish in time, abandoning"
                    );
                    task.abort();
                }
            }
        }
    }
}

/// Relative paths like `./main` name files in the working directory
fn resolve_program(program: &str, work_dir: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && program.contains('/') {
        work_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pid, error = %e, "failed to kill process group"),
    }
}

async fn feed_stdin(mut pipe: ChildStdin, input: String) {
    if let Err(e) = pipe.write_all(input.as_bytes()).await {
        // The child may exit without reading its input.
        tracing::debug!(error = %e, "stdin write interrupted");
        return;
    }
    if let Err(e) = pipe.shutdown().await {
        tracing::debug!(error = %e, "stdin close failed");
    }
}

/// Read `stream` line by line into `sink` until EOF
async fn drain<R>(stream: R, sink: Arc<Mutex<Captured>>, limit: usize)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut chunk = Vec::new();
    let mut pending = Vec::new();
    let mut open_line = false;

    loop {
        chunk.clear();
        match (&mut reader).take(CHUNK_LIMIT).read_until(b'\n', &mut chunk).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "error reading child output");
                break;
            }
        }

        let ends_line = chunk.last() == Some(&b'\n');
        if ends_line {
            chunk.pop();
            if chunk.last() == Some(&b'\r') {
                chunk.pop();
            }
        }
        pending.extend_from_slice(&chunk);

        let text = decode_prefix(&mut pending, ends_line);
        let mut sink = sink.lock();
        sink.push(&text, limit);
        if ends_line {
            sink.push("\n", limit);
        }
        open_line = !ends_line;
    }

    if open_line || !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending);
        let mut sink = sink.lock();
        sink.push(&text, limit);
        sink.push("\n", limit);
    }
}

/// Decode as much of `pending` as is complete UTF-8, keeping a split
/// trailing sequence for the next chunk unless `flush` is set.
fn decode_prefix(pending: &mut Vec<u8>, flush: bool) -> String {
    let split = if flush {
        pending.len()
    } else {
        match std::str::from_utf8(pending) {
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            _ => pending.len(),
        }
    };
    let text = String::from_utf8_lossy(&pending[..split]).into_owned();
    pending.drain(..split);
    text
}
