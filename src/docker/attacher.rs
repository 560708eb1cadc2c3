use std::sync::Arc;

use tracing::info;

use crate::console::Console;
use crate::error::{Error, Result};

use super::run::{AttachedProcess, CommandRunner};
use super::types::{CommandLine, OutputChunk, Runtime, Stream};

pub fn attach_command(runtime: &Runtime, container_id: &str) -> CommandLine {
    runtime.command(["attach", container_id])
}

/// Send a chunk to the console channel matching its stream.
pub fn route_chunk(console: &dyn Console, chunk: &OutputChunk) {
    match chunk.stream {
        Stream::Stdout => console.stdout(&chunk.data),
        Stream::Stderr => console.stderr(&chunk.data),
    }
}

/// Attach to the container's stdout and stderr and stream them to `console`.
pub fn attach(
    runner: &dyn CommandRunner,
    runtime: &Runtime,
    console: Arc<dyn Console>,
    container_id: &str,
) -> Result<Box<dyn AttachedProcess>> {
    if container_id.is_empty() {
        return Err(Error::attach(container_id, "no container id"));
    }

    let cmd = attach_command(runtime, container_id);
    console.info("Attaching to container...");
    console.command(&cmd);

    let sink = console.clone();
    let process = runner
        .start(&cmd, Arc::new(move |chunk: OutputChunk| route_chunk(sink.as_ref(), &chunk)))
        .map_err(|e| Error::attach(container_id, e.to_string()))?;

    info!(container_id, "attached");
    Ok(process)
}
