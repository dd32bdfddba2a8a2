//! Helpers for running external tools.
//!
//! Three shapes of invocation are needed:
//! - run to completion and collect output (mux, pad, thumbnail)
//! - run with a deadline, killing the process on expiry (probes)
//! - stream stdout line by line while stderr drains on a helper thread
//!   (the subtitle burn with `-progress pipe:1`)

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::error::{ToolError, ToolResult};

/// Lines of stderr kept for error messages.
pub const STDERR_TAIL_LINES: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Render a command for logs: program followed by its arguments.
pub fn command_line(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| {
        let arg = a.to_string_lossy();
        if arg.contains(' ') {
            format!("\"{}\"", arg)
        } else {
            arg.into_owned()
        }
    }));
    parts.join(" ")
}

/// Run to completion, returning stdout. Non-zero exit becomes
/// [`ToolError::Failed`] with the stderr tail.
pub fn run(cmd: &mut Command, tool: &str) -> ToolResult<Vec<u8>> {
    tracing::debug!("$ {}", command_line(cmd));

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ToolError::spawn(tool, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::failed(
            tool,
            exit_code(output.status),
            tail_lines(&stderr, STDERR_TAIL_LINES),
        ));
    }

    Ok(output.stdout)
}

/// Run with a deadline. On expiry the child is killed and reaped.
pub fn run_with_timeout(cmd: &mut Command, tool: &str, timeout: Duration) -> ToolResult<Vec<u8>> {
    tracing::debug!("$ {} (timeout {:?})", command_line(cmd), timeout);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ToolError::spawn(tool, e))?;

    let stdout_reader = child.stdout.take().map(read_all);
    let stderr_reader = child.stderr.take().map(read_all);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!("{} killed after {:?}", tool, timeout);
                return Err(ToolError::Timeout {
                    tool: tool.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(ToolError::io(format!("waiting for {}", tool), e)),
        }
    };

    let stdout = join_reader(stdout_reader);
    if !status.success() {
        let stderr = join_reader(stderr_reader);
        return Err(ToolError::failed(
            tool,
            exit_code(status),
            tail_lines(&String::from_utf8_lossy(&stderr), STDERR_TAIL_LINES),
        ));
    }

    Ok(stdout)
}

/// Run while feeding every stdout line to `on_line`.
///
/// Stderr is drained concurrently into a bounded tail so a chatty encoder
/// can never block on a full pipe.
pub fn run_streaming(
    cmd: &mut Command,
    tool: &str,
    on_line: &mut dyn FnMut(&str),
) -> ToolResult<()> {
    tracing::debug!("$ {}", command_line(cmd));

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ToolError::spawn(tool, e))?;

    let stderr_tail = child
        .stderr
        .take()
        .map(|stderr| drain_tail(stderr, STDERR_TAIL_LINES));

    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => on_line(String::from_utf8_lossy(&buf).trim_end()),
                Err(e) => {
                    tracing::warn!("Stopped reading {} output: {}", tool, e);
                    break;
                }
            }
        }
    }

    let status = child
        .wait()
        .map_err(|e| ToolError::io(format!("waiting for {}", tool), e))?;

    let tail = stderr_tail
        .and_then(|handle| handle.join().ok())
        .map(|lines| lines.into_iter().collect::<Vec<_>>().join("\n"))
        .unwrap_or_default();

    if !status.success() {
        return Err(ToolError::failed(tool, exit_code(status), tail));
    }

    Ok(())
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn read_all<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn drain_tail<R: Read + Send + 'static>(reader: R, limit: usize) -> JoinHandle<VecDeque<String>> {
    thread::spawn(move || {
        let mut tail = VecDeque::with_capacity(limit);
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if tail.len() == limit {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
        }
        tail
    })
}

/// Last `limit` non-empty lines of `text`.
pub fn tail_lines(text: &str, limit: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..].join("\n")
}
