use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Everything needed to serve a project from a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Runtime CLI, e.g. `docker` or `podman`.
    pub runtime: String,
    /// `<namespace>/<repo>[:<tag>]`. Without a tag the runtime resolves `latest`.
    pub image: String,
    /// Port mappings, each passed as `--publish=<mapping>`.
    pub publish: Vec<String>,
    /// Where the project root is mounted inside the container.
    pub mount_target: String,
    /// Passed to `run` verbatim after the publish and volume flags.
    pub extra_args: Vec<String>,
    pub poll_interval_ms: u64,
    /// Bound on the cleanup `kill`. Must be at least one second.
    pub kill_timeout_secs: u64,
    /// Check that the runtime daemon answers before launching.
    pub preflight: bool,
}

impl ServeConfig {
    /// Arguments placed between `run -d` and the image name.
    pub fn run_arguments(&self, project_root: &Path) -> Vec<String> {
        let mut args: Vec<String> = self
            .publish
            .iter()
            .map(|mapping| format!("--publish={mapping}"))
            .collect();
        args.push(format!(
            "--volume={}:{}",
            project_root.display(),
            self.mount_target
        ));
        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_secs(self.kill_timeout_secs)
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image: "eduard44/vertex".to_string(),
            publish: vec!["80:80".to_string()],
            mount_target: "/var/www/vertex".to_string(),
            extra_args: Vec::new(),
            poll_interval_ms: 100,
            kill_timeout_secs: 10,
            preflight: true,
        }
    }
}
