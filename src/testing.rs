//! Scripted doubles for the runner, the attached process and the console.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::console::Console;
use crate::docker::{
    AttachedProcess, ChunkHandler, CommandLine, CommandRunner, OutputChunk, RunOptions, RunOutput,
};
use crate::error::{Error, Result};

/// Reports running for `running_polls` calls, then exited.
#[derive(Debug, Default, Clone)]
pub struct ScriptedProcess {
    pub running_polls: usize,
    pub polls: Arc<AtomicUsize>,
    pub killed: Arc<AtomicBool>,
}

impl ScriptedProcess {
    pub fn running_for(running_polls: usize) -> Self {
        Self {
            running_polls,
            ..Self::default()
        }
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

impl AttachedProcess for ScriptedProcess {
    fn is_running(&mut self) -> bool {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        n < self.running_polls && !self.was_killed()
    }

    fn kill(&mut self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    fn wait(&mut self) -> Option<i32> {
        Some(0)
    }
}

/// Answers `run` calls from a queue and `start` calls with a [`ScriptedProcess`],
/// recording every command line it sees.
#[derive(Default)]
pub struct ScriptedRunner {
    pub outputs: Mutex<VecDeque<Result<RunOutput>>>,
    pub runs: Mutex<Vec<(CommandLine, RunOptions)>>,
    pub starts: Mutex<Vec<CommandLine>>,
    pub chunks: Vec<OutputChunk>,
    pub process: ScriptedProcess,
    pub fail_start: bool,
    /// How long a `kill` run takes before it returns.
    pub kill_delay: Duration,
    pub finished_kills: AtomicUsize,
    /// Called at the top of every `start`.
    pub before_start: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(self, output: RunOutput) -> Self {
        self.outputs.lock().unwrap().push_back(Ok(output));
        self
    }

    pub fn with_error(self, err: Error) -> Self {
        self.outputs.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<OutputChunk>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn with_process(mut self, process: ScriptedProcess) -> Self {
        self.process = process;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn slow_kill(mut self, delay: Duration) -> Self {
        self.kill_delay = delay;
        self
    }

    pub fn with_start_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_start = Some(Box::new(hook));
        self
    }

    /// `kill` runs that have returned to their caller.
    pub fn finished_kills(&self) -> usize {
        self.finished_kills.load(Ordering::SeqCst)
    }

    /// Every `run` invocation as a space-joined argv.
    pub fn run_lines(&self) -> Vec<String> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .map(|(cmd, _)| cmd.argv().join(" "))
            .collect()
    }

    pub fn start_lines(&self) -> Vec<String> {
        self.starts
            .lock()
            .unwrap()
            .iter()
            .map(|cmd| cmd.argv().join(" "))
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CommandLine, options: RunOptions) -> Result<RunOutput> {
        self.runs.lock().unwrap().push((command.clone(), options));
        let is_kill = command.args.first().is_some_and(|arg| arg == "kill");
        if is_kill {
            std::thread::sleep(self.kill_delay);
        }
        let output = self
            .outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RunOutput::ok("")));
        if is_kill {
            self.finished_kills.fetch_add(1, Ordering::SeqCst);
        }
        output
    }

    fn start(
        &self,
        command: &CommandLine,
        on_chunk: ChunkHandler,
    ) -> Result<Box<dyn AttachedProcess>> {
        self.starts.lock().unwrap().push(command.clone());
        if let Some(hook) = &self.before_start {
            hook();
        }
        if self.fail_start {
            return Err(Error::Spawn {
                command: command.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        for chunk in &self.chunks {
            on_chunk(chunk.clone());
        }
        Ok(Box::new(self.process.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Info(String),
    Command(String),
    Plain(String),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RecordingConsole {
    pub events: Mutex<Vec<ConsoleEvent>>,
}

impl RecordingConsole {
    pub fn events(&self) -> Vec<ConsoleEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: ConsoleEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Console for RecordingConsole {
    fn info(&self, message: &str) {
        self.push(ConsoleEvent::Info(message.to_string()));
    }

    fn command(&self, command: &CommandLine) {
        self.push(ConsoleEvent::Command(command.argv().join(" ")));
    }

    fn stdout(&self, data: &[u8]) {
        self.push(ConsoleEvent::Plain(String::from_utf8_lossy(data).into_owned()));
    }

    fn stderr(&self, data: &[u8]) {
        self.push(ConsoleEvent::Error(String::from_utf8_lossy(data).into_owned()));
    }
}
