use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use super::types::{CommandLine, OutputChunk, RunOptions, RunOutput, Stream};
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const CHUNK_SIZE: usize = 8 * 1024;

/// Receives output chunks from a started process. Called from reader threads.
pub type ChunkHandler = Arc<dyn Fn(OutputChunk) + Send + Sync>;

/// A long-lived child started with [`CommandRunner::start`].
pub trait AttachedProcess: Send {
    /// `true` until the child has exited.
    fn is_running(&mut self) -> bool;

    /// Best-effort kill. Errors (already exited) are ignored.
    fn kill(&mut self);

    /// Block until the child exits and all of its output has been delivered.
    fn wait(&mut self) -> Option<i32>;
}

/// Executes external commands.
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output. A non-zero exit is not an error.
    fn run(&self, command: &CommandLine, options: RunOptions) -> Result<RunOutput>;

    /// Spawn and return immediately; output is pushed into `on_chunk`.
    fn start(
        &self,
        command: &CommandLine,
        on_chunk: ChunkHandler,
    ) -> Result<Box<dyn AttachedProcess>>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn(command: &CommandLine) -> Result<Child> {
        debug!(command = %command, "spawning");
        Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                command: command.to_string(),
                source,
            })
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine, options: RunOptions) -> Result<RunOutput> {
        let mut child = Self::spawn(command)?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        // Drain both pipes concurrently so a chatty child can't block on a full pipe.
        let stdout_handle = std::thread::spawn(move || read_all(stdout));
        let stderr_handle = std::thread::spawn(move || read_all(stderr));

        let mut timed_out = false;
        let status = match options.timeout {
            None => Some(child.wait()?),
            Some(timeout) => {
                let start = Instant::now();
                loop {
                    if let Some(status) = child.try_wait()? {
                        break Some(status);
                    }
                    if start.elapsed() > timeout {
                        timed_out = true;
                        let _ = child.kill();
                        let _ = child.wait();
                        break None;
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        let exit_code = status.and_then(|s| s.code());
        debug!(command = %command, ?exit_code, timed_out, "finished");

        Ok(RunOutput {
            success: exit_code == Some(0),
            exit_code,
            stdout,
            stderr,
            timed_out,
        })
    }

    fn start(
        &self,
        command: &CommandLine,
        on_chunk: ChunkHandler,
    ) -> Result<Box<dyn AttachedProcess>> {
        let mut child = Self::spawn(command)?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let on_out = on_chunk.clone();
        let readers = vec![
            std::thread::spawn(move || pump(stdout, Stream::Stdout, on_out)),
            std::thread::spawn(move || pump(stderr, Stream::Stderr, on_chunk)),
        ];

        Ok(Box::new(SystemProcess { child, readers }))
    }
}

struct SystemProcess {
    child: Child,
    readers: Vec<JoinHandle<()>>,
}

impl AttachedProcess for SystemProcess {
    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn kill(&mut self) {
        let _ = self.child.kill();
    }

    fn wait(&mut self) -> Option<i32> {
        let status = self.child.wait().ok();
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        status.and_then(|s| s.code())
    }
}

fn read_all(mut reader: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Forward everything `reader` yields as chunks until EOF.
fn pump(mut reader: impl Read, stream: Stream, on_chunk: ChunkHandler) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => on_chunk(OutputChunk {
                stream,
                data: buf[..n].to_vec(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh", ["-c", script])
    }

    #[test]
    fn run_captures_stdout_and_exit_code() {
        let out = SystemRunner
            .run(&sh("echo abc123; echo oops >&2; exit 3"), RunOptions::unbounded())
            .unwrap();
        assert_eq!(out.stdout, "abc123\n");
        assert_eq!(out.stderr, "oops\n");
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success);
        assert!(!out.timed_out);
    }

    #[test]
    fn run_missing_binary_is_spawn_error() {
        let cmd = CommandLine::new("definitely-not-a-real-binary-xyz", ["run"]);
        let err = SystemRunner.run(&cmd, RunOptions::unbounded()).unwrap_err();
        match err {
            Error::Spawn { command, .. } => {
                assert_eq!(command, "definitely-not-a-real-binary-xyz run")
            }
            other => panic!("expected Spawn, got {other:?}"),
        }
    }

    #[test]
    fn run_kills_on_timeout() {
        let out = SystemRunner
            .run(
                &sh("exec sleep 5"),
                RunOptions::with_timeout(Duration::from_millis(100)),
            )
            .unwrap();
        assert!(out.timed_out);
        assert!(!out.success);
        assert_eq!(out.exit_code, None);
    }

    #[test]
    fn start_streams_tagged_chunks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut process = SystemRunner
            .start(
                &sh("printf hello; printf warn >&2"),
                Arc::new(move |chunk: OutputChunk| sink.lock().unwrap().push(chunk)),
            )
            .unwrap();

        assert_eq!(process.wait(), Some(0));
        assert!(!process.is_running());

        let seen = seen.lock().unwrap();
        let out: Vec<u8> = seen
            .iter()
            .filter(|c| c.stream == Stream::Stdout)
            .flat_map(|c| c.data.clone())
            .collect();
        let err: Vec<u8> = seen
            .iter()
            .filter(|c| c.stream == Stream::Stderr)
            .flat_map(|c| c.data.clone())
            .collect();
        assert_eq!(out, b"hello");
        assert_eq!(err, b"warn");
    }

    #[test]
    fn kill_stops_running_process() {
        let mut process = SystemRunner
            .start(&sh("exec sleep 5"), Arc::new(|_: OutputChunk| {}))
            .unwrap();
        assert!(process.is_running());
        process.kill();
        process.wait();
        assert!(!process.is_running());
    }
}
