use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ServeConfig;
use crate::console::Console;
use crate::docker::{
    self, AttachedProcess, CommandLine, CommandRunner, Guardian, Runtime, attacher, launcher,
};
use crate::error::Result;

use super::{ContainerSession, SharedSession};

/// How a serve run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The attached container stopped on its own.
    Exited,
    /// SIGINT/SIGTERM arrived and the container was killed.
    Interrupted,
}

/// Drives one container from launch to exit.
pub struct Controller {
    runner: Arc<dyn CommandRunner>,
    console: Arc<dyn Console>,
    runtime: Runtime,
    session: ContainerSession,
    poll_interval: Duration,
    kill_timeout: Duration,
    preflight: bool,
}

impl Controller {
    pub fn new(
        config: &ServeConfig,
        project_root: &Path,
        runner: Arc<dyn CommandRunner>,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            runner,
            console,
            runtime: Runtime::new(config.runtime.clone()),
            session: ContainerSession::new(
                config.image.clone(),
                config.run_arguments(project_root),
            ),
            poll_interval: config.poll_interval(),
            kill_timeout: config.kill_timeout(),
            preflight: config.preflight,
        }
    }

    pub fn session(&self) -> &ContainerSession {
        &self.session
    }

    /// The `run -d` command this controller will issue.
    pub fn launch_command(&self) -> CommandLine {
        launcher::launch_command(
            &self.runtime,
            self.session.image(),
            self.session.run_arguments(),
        )
    }

    /// A guardian bound to this controller's session.
    pub fn guardian(&self) -> Guardian {
        Guardian::new(
            self.runner.clone(),
            self.runtime.clone(),
            self.console.clone(),
            self.session.shared().clone(),
            self.kill_timeout,
        )
    }

    /// Install the interrupt guardian, then serve until the container stops.
    pub fn run(&self) -> Result<SessionOutcome> {
        self.guardian().install()?;
        self.serve()
    }

    /// Launch, attach and wait. Expects the guardian to be installed already.
    pub fn serve(&self) -> Result<SessionOutcome> {
        let shared = self.session.shared();

        if self.preflight {
            docker::ensure_available(self.runner.as_ref(), &self.runtime)?;
        }

        let container_id = match launcher::launch(
            self.runner.as_ref(),
            &self.runtime,
            self.console.as_ref(),
            self.session.image(),
            self.session.run_arguments(),
        ) {
            Ok(id) => id,
            // Ctrl+C reaches the `run` child too; its failure is the interrupt, not an error.
            Err(e) if shared.is_interrupted() => {
                info!(error = %e, "launch interrupted");
                return Ok(interrupted(shared));
            }
            Err(e) => return Err(e),
        };

        if shared.publish(&container_id) {
            // The guardian fired while launch was blocking and had no id to kill.
            self.console.info("\nTerminating container");
            self.kill(&container_id);
            return Ok(interrupted(shared));
        }

        let mut process = match attacher::attach(
            self.runner.as_ref(),
            &self.runtime,
            self.console.clone(),
            &container_id,
        ) {
            Ok(process) => process,
            // The guardian fired after publish and has the container covered.
            Err(e) if shared.is_interrupted() => {
                info!(error = %e, "attach interrupted");
                return Ok(interrupted(shared));
            }
            Err(e) => {
                // Nobody is watching the container any more.
                self.kill(&container_id);
                return Err(e);
            }
        };

        Ok(wait_for_exit(process.as_mut(), shared, self.poll_interval))
    }

    fn kill(&self, container_id: &str) {
        if let Err(e) = docker::kill_container(
            self.runner.as_ref(),
            &self.runtime,
            container_id,
            self.kill_timeout,
        ) {
            warn!(error = %e, "ignoring failed cleanup kill");
        }
    }
}

/// Poll `process` every `poll_interval` until it exits or the session is interrupted.
///
/// `is_running` is called exactly once per iteration, so a process that
/// reports running N times is polled N + 1 times.
pub fn wait_for_exit(
    process: &mut dyn AttachedProcess,
    session: &SharedSession,
    poll_interval: Duration,
) -> SessionOutcome {
    loop {
        if !process.is_running() {
            let exit_code = process.wait();
            debug!(?exit_code, "attached process exited");
            // A guardian kill also ends the attach process.
            return if session.is_interrupted() {
                interrupted(session)
            } else {
                SessionOutcome::Exited
            };
        }
        if session.is_interrupted() {
            process.kill();
            process.wait();
            return interrupted(session);
        }
        std::thread::sleep(poll_interval);
    }
}

/// The process may exit once this returns, so any guardian kill must be done by then.
fn interrupted(session: &SharedSession) -> SessionOutcome {
    session.wait_for_cleanup();
    SessionOutcome::Interrupted
}
