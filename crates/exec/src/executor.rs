use crate::error::{ErrorKind, Result};
use crate::tools::{Tool, Tools};
use exn::ResultExt;
use std::ffi::OsStr;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::instrument;

/// Wall-clock limit for a buffered tool invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Which output stream a chunk was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
}

/// Runs external tools resolved through an immutable [`Tools`] table.
///
/// Cheap to clone; the tool table is shared.
#[derive(Clone, Debug)]
pub struct Executor {
    tools: Arc<Tools>,
    timeout: Duration,
}
impl Executor {
    pub fn new(tools: Tools) -> Self {
        Self { tools: Arc::new(tools), timeout: DEFAULT_TIMEOUT }
    }

    /// Overrides the buffered-mode timeout. Intended for tests.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tools(&self) -> &Tools {
        &self.tools
    }

    /// Runs a tool to completion, buffering both output streams in memory.
    ///
    /// Returns the captured stdout when the tool exits with code zero. A
    /// non-zero exit yields [`ErrorKind::ToolExecutionFailed`] carrying the
    /// captured stderr. If the tool is still running when the timeout elapses
    /// it is killed and [`ErrorKind::Timeout`] is returned; whatever it had
    /// written so far is discarded.
    #[instrument(skip_all, fields(%tool))]
    pub async fn run<I, S>(&self, tool: Tool, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = self.command(tool, args)?;
        // Dropping the wait future on timeout drops the child, which kills it.
        command.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        let child = spawn(&mut command, tool)?;
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.or_raise(|| ErrorKind::Io(tool.to_string()))?,
            Err(_) => {
                tracing::error!(timeout = ?self.timeout, "Tool timed out; killed");
                exn::bail!(ErrorKind::Timeout { tool: tool.to_string(), timeout: self.timeout });
            },
        };
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !stderr.is_empty() {
            tracing::debug!(stderr = %stderr.trim_end(), "Tool wrote to stderr");
        }
        if !output.status.success() {
            tracing::error!(code = ?output.status.code(), stderr = %stderr.trim_end(), "Tool failed");
            exn::bail!(ErrorKind::ToolExecutionFailed { tool: tool.to_string(), code: output.status.code(), stderr });
        }
        tracing::trace!(stdout = %stdout.trim_end(), "Tool finished");
        Ok(stdout)
    }

    /// Runs a tool without a timeout, handing output to `on_chunk` one line
    /// at a time as it arrives.
    ///
    /// A chunk is a complete line including its `\n`, except for trailing
    /// output the tool never terminated. Invalid UTF-8 is replaced per line.
    /// Each stream gets its own listener task. Chunks from one stream reach the
    /// callback in the order they were read, but there is no ordering between
    /// stdout and stderr. The call returns once the process exits; it does not
    /// wait for the listeners to drain, so the callback must not rely on being
    /// called after this returns.
    #[instrument(skip_all, fields(%tool))]
    pub async fn stream<I, S, F>(&self, tool: Tool, args: I, on_chunk: F) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
        F: Fn(Channel, &str) + Send + Sync + 'static,
    {
        let mut command = self.command(tool, args)?;
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = spawn(&mut command, tool)?;
        let on_chunk = Arc::new(on_chunk);
        listen(&mut child, Channel::Stdout, on_chunk.clone());
        listen(&mut child, Channel::Stderr, on_chunk);
        let status = child.wait().await.or_raise(|| ErrorKind::Io(tool.to_string()))?;
        if !status.success() {
            tracing::error!(code = ?status.code(), "Tool failed");
            exn::bail!(ErrorKind::ToolExecutionFailed {
                tool: tool.to_string(),
                code: status.code(),
                stderr: String::new()
            });
        }
        Ok(())
    }

    fn command<I, S>(&self, tool: Tool, args: I) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program: PathBuf = self.tools.get(tool).program()?;
        let mut command = Command::new(&program);
        command.args(args).stdin(Stdio::null());
        let rendered: Vec<_> = command.as_std().get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        tracing::info!(program = %program.display(), args = ?rendered, "Running external tool");
        Ok(command)
    }
}

fn spawn(command: &mut Command, tool: Tool) -> Result<Child> {
    match command.spawn() {
        Ok(child) => Ok(child),
        Err(e) if e.kind() == IoErrorKind::NotFound => exn::bail!(ErrorKind::ToolNotFound(tool.to_string())),
        Err(e) => Err(e).or_raise(|| ErrorKind::Io(tool.to_string())),
    }
}

fn listen<F>(child: &mut Child, channel: Channel, on_chunk: Arc<F>)
where
    F: Fn(Channel, &str) + Send + Sync + 'static,
{
    match channel {
        Channel::Stdout => {
            if let Some(reader) = child.stdout.take() {
                tokio::spawn(pump(reader, channel, on_chunk));
            }
        },
        Channel::Stderr => {
            if let Some(reader) = child.stderr.take() {
                tokio::spawn(pump(reader, channel, on_chunk));
            }
        },
    }
}

async fn pump<R, F>(reader: R, channel: Channel, on_chunk: Arc<F>)
where
    R: AsyncRead + Unpin,
    F: Fn(Channel, &str) + Send + Sync + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => on_chunk(channel, &String::from_utf8_lossy(&line)),
            Err(e) => {
                tracing::debug!(?channel, error = %e, "Stopped reading tool output");
                break;
            },
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tools::ToolPath;
    use std::sync::Mutex;

    /// Borrows the ffmpeg slot to run `/bin/sh`, so tests can script anything.
    fn shell() -> Executor {
        Executor::new(Tools::default().with(Tool::Ffmpeg, ToolPath::Configured(PathBuf::from("/bin/sh"))))
    }

    #[tokio::test]
    async fn test_buffered_returns_stdout() {
        let out = shell().run(Tool::Ffmpeg, ["-c", "printf 'hello'; printf 'noise' >&2"]).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_buffered_failure_carries_stderr() {
        let err = shell().run(Tool::Ffmpeg, ["-c", "echo partial; echo 'bad input' >&2; exit 3"]).await.unwrap_err();
        match &*err {
            ErrorKind::ToolExecutionFailed { tool, code, stderr } => {
                assert_eq!(tool, "ffmpeg");
                assert_eq!(*code, Some(3));
                assert_eq!(stderr, "bad input\n");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_buffered_timeout() {
        let executor = shell().with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = executor.run(Tool::Ffmpeg, ["-c", "echo early; sleep 10"]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Timeout { timeout, .. } if *timeout == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_configured_tool() {
        let executor =
            Executor::new(Tools::default().with(Tool::Mkvmerge, ToolPath::Configured(PathBuf::from("/nope/mkvmerge"))));
        let err = executor.run(Tool::Mkvmerge, ["-J"]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolNotFound(name) if name == "mkvmerge"));
    }

    #[tokio::test]
    async fn test_stream_preserves_per_channel_order() {
        let seen: Arc<Mutex<Vec<(Channel, String)>>> = Arc::default();
        let sink = seen.clone();
        shell()
            .stream(Tool::Ffmpeg, ["-c", "printf one; sleep 0.1; printf two; printf err >&2"], move |channel, chunk| {
                sink.lock().unwrap().push((channel, chunk.to_string()))
            })
            .await
            .unwrap();
        // Listeners aren't awaited by `stream`; give them a moment to drain.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let seen = seen.lock().unwrap();
        let stdout: String = seen.iter().filter(|(c, _)| *c == Channel::Stdout).map(|(_, s)| s.as_str()).collect();
        let stderr: String = seen.iter().filter(|(c, _)| *c == Channel::Stderr).map(|(_, s)| s.as_str()).collect();
        assert_eq!(stdout, "onetwo");
        assert_eq!(stderr, "err");
    }

    #[tokio::test]
    async fn test_stream_delivers_whole_lines() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = seen.clone();
        // The multi-byte character straddles the pipe's first 4 KiB.
        let script = "printf '%4095s' '' | tr ' ' a; printf '\\343\\201\\202 end\\nnext\\ntail'";
        shell()
            .stream(Tool::Ffmpeg, ["-c", script], move |channel, chunk| {
                if channel == Channel::Stdout {
                    sink.lock().unwrap().push(chunk.to_string());
                }
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, [format!("{}\u{3042} end\n", "a".repeat(4095)), "next\n".to_string(), "tail".to_string()]);
        assert!(!seen.iter().any(|line| line.contains('\u{FFFD}')));
    }

    #[tokio::test]
    async fn test_stream_non_zero_exit() {
        let err = shell().stream(Tool::Ffmpeg, ["-c", "exit 2"], |_, _| {}).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ToolExecutionFailed { code: Some(2), .. }));
    }
}
