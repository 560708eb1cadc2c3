use std::time::Duration;

use crate::error::{Error, Result};

use super::run::CommandRunner;
use super::types::{CommandLine, RunOptions, Runtime};

const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(15);

/// `<runtime> version`, which exits non-zero when the daemon cannot be reached.
pub fn probe_command(runtime: &Runtime) -> CommandLine {
    runtime.command(["version"])
}

/// Verify that the runtime daemon is reachable before launching anything.
pub fn ensure_available(runner: &dyn CommandRunner, runtime: &Runtime) -> Result<()> {
    let cmd = probe_command(runtime);
    let out = runner.run(&cmd, RunOptions::with_timeout(PREFLIGHT_TIMEOUT))?;

    if out.timed_out {
        return Err(Error::RuntimeUnavailable {
            runtime: runtime.binary().to_string(),
            detail: format!("`{cmd}` timed out"),
        });
    }
    if !out.success {
        let stderr = out.stderr.trim();
        let detail = if stderr.is_empty() {
            "daemon is not running".to_string()
        } else {
            stderr.to_string()
        };
        return Err(Error::RuntimeUnavailable {
            runtime: runtime.binary().to_string(),
            detail,
        });
    }
    Ok(())
}
