// Container runtime plumbing: command execution, launch, attach, cleanup on interrupt.

pub mod attacher;
pub mod engine;
pub mod guardian;
pub mod launcher;
pub mod run;
pub mod types;

pub use attacher::{attach, attach_command, route_chunk};
pub use engine::ensure_available;
pub use guardian::{Guardian, InterruptAction, kill_command, kill_container};
pub use launcher::{launch, launch_command, parse_container_id, run_args};
pub use run::{AttachedProcess, ChunkHandler, CommandRunner, SystemRunner};
pub use types::{CommandLine, OutputChunk, RunOptions, RunOutput, Runtime, Stream};
