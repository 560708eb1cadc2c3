use tracing::info;

use crate::console::Console;
use crate::error::{Error, Result};

use super::run::CommandRunner;
use super::types::{CommandLine, RunOptions, Runtime};

/// `run -d <run_arguments...> <image>`. The image must stay last.
pub fn run_args(image: &str, run_arguments: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(run_arguments.len() + 3);
    args.extend(["run".to_string(), "-d".to_string()]);
    args.extend(run_arguments.iter().cloned());
    args.push(image.to_string());
    args
}

pub fn launch_command(runtime: &Runtime, image: &str, run_arguments: &[String]) -> CommandLine {
    runtime.command(run_args(image, run_arguments))
}

/// Strip every line break from `run -d` output. `None` if nothing is left.
pub fn parse_container_id(output: &str) -> Option<String> {
    let id: String = output.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Start the container detached and return its id.
///
/// Blocks for as long as the runtime needs; pulling an image can take minutes.
pub fn launch(
    runner: &dyn CommandRunner,
    runtime: &Runtime,
    console: &dyn Console,
    image: &str,
    run_arguments: &[String],
) -> Result<String> {
    let cmd = launch_command(runtime, image, run_arguments);

    console.info("Launching container (this might take a bit)...");
    console.command(&cmd);

    let out = runner.run(&cmd, RunOptions::unbounded())?;
    let id = parse_container_id(&out.stdout)
        .ok_or_else(|| Error::launch(cmd.to_string(), &out.stderr, out.exit_code))?;

    info!(container_id = %id, image, "container launched");
    Ok(id)
}
