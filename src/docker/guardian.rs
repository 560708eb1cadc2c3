use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::console::Console;
use crate::error::{Error, Result};
use crate::session::SharedSession;

use super::run::CommandRunner;
use super::types::{CommandLine, RunOptions, Runtime};

/// What a single interrupt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptAction {
    /// `kill <id>` was issued (its outcome is not reported).
    Killed(String),
    /// No container id yet, nothing to clean up.
    Skipped,
}

pub fn kill_command(runtime: &Runtime, container_id: &str) -> CommandLine {
    runtime.command(["kill", container_id])
}

/// Synchronously kill a container. Any failure comes back as [`Error::Kill`].
pub fn kill_container(
    runner: &dyn CommandRunner,
    runtime: &Runtime,
    container_id: &str,
    timeout: Duration,
) -> Result<()> {
    let fail = |reason: String| Error::Kill {
        container_id: container_id.to_string(),
        reason,
    };

    if container_id.is_empty() {
        return Err(fail("no container id".into()));
    }

    let cmd = kill_command(runtime, container_id);
    let out = runner
        .run(&cmd, RunOptions::with_timeout(timeout))
        .map_err(|e| fail(e.to_string()))?;

    if out.timed_out {
        return Err(fail(format!("`{cmd}` timed out after {timeout:?}")));
    }
    if !out.success {
        return Err(fail(out.stderr.trim().to_string()));
    }
    Ok(())
}

/// Kills the session's container when the user interrupts or the process is
/// asked to terminate.
pub struct Guardian {
    runner: Arc<dyn CommandRunner>,
    runtime: Runtime,
    console: Arc<dyn Console>,
    session: SharedSession,
    kill_timeout: Duration,
}

impl Guardian {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        runtime: Runtime,
        console: Arc<dyn Console>,
        session: SharedSession,
        kill_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            runtime,
            console,
            session,
            kill_timeout,
        }
    }

    /// Handle one interrupt. Safe to call any number of times.
    pub fn on_interrupt(&self) -> InterruptAction {
        // Held until the kill returns; the controller waits on it before exiting.
        let Some(pending) = self.session.interrupt() else {
            info!("interrupted before a container id was known, nothing to kill");
            return InterruptAction::Skipped;
        };
        let container_id = pending.container_id().to_string();

        self.console.info("\nTerminating container");
        match kill_container(
            self.runner.as_ref(),
            &self.runtime,
            &container_id,
            self.kill_timeout,
        ) {
            Ok(()) => info!(container_id = %container_id, "container killed"),
            // Usually the container is already gone (second Ctrl+C).
            Err(e) => warn!(error = %e, "ignoring failed cleanup kill"),
        }
        drop(pending);
        InterruptAction::Killed(container_id)
    }

    /// Route SIGINT and SIGTERM to [`Guardian::on_interrupt`] on a dedicated thread.
    ///
    /// Once installed, these signals no longer terminate the process; the
    /// controller notices the interrupted session and returns instead.
    #[cfg(unix)]
    pub fn install(self) -> Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| Error::SignalHandler {
            reason: e.to_string(),
        })?;

        std::thread::Builder::new()
            .name("interrupt-guardian".into())
            .spawn(move || {
                for signal in signals.forever() {
                    debug!(signal, "received signal");
                    self.on_interrupt();
                }
            })?;
        Ok(())
    }

    /// Route console control events (Ctrl+C, close, shutdown) to
    /// [`Guardian::on_interrupt`].
    #[cfg(not(unix))]
    pub fn install(self) -> Result<()> {
        ctrlc::set_handler(move || {
            debug!("received console control event");
            self.on_interrupt();
        })
        .map_err(|e| Error::SignalHandler {
            reason: e.to_string(),
        })
    }
}
