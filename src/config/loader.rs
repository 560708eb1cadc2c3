use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

use super::types::ServeConfig;

/// Name of the per-project config file, looked up in the project root.
pub const CONFIG_FILE: &str = ".vertex.yml";

/// The settings a project file may override. Absent keys keep their current value.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub runtime: Option<String>,
    pub image: Option<String>,
    pub publish: Option<Vec<String>>,
    pub mount_target: Option<String>,
    pub extra_args: Option<Vec<String>>,
    pub poll_interval_ms: Option<u64>,
    pub kill_timeout_secs: Option<u64>,
    pub preflight: Option<bool>,
}

impl ConfigFile {
    /// Load the config file from the given directory, if there is one.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        // An empty file is a valid "no overrides" file.
        if contents.trim().is_empty() {
            return Ok(Some(Self::default()));
        }
        // A comment-only document deserializes as `None`.
        let file: Option<Self> =
            serde_yaml::from_str(&contents).map_err(|source| Error::Config {
                path: path.clone(),
                source,
            })?;
        let file = file.unwrap_or_default();
        file.validate(&path)?;
        Ok(Some(file))
    }

    fn validate(&self, path: &Path) -> Result<()> {
        // A zero timeout kills the cleanup `kill` before it can run.
        if self.kill_timeout_secs == Some(0) {
            return Err(Error::InvalidConfig {
                path: path.to_path_buf(),
                reason: "kill_timeout_secs must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn apply(self, cfg: &mut ServeConfig) {
        if let Some(runtime) = self.runtime {
            cfg.runtime = runtime;
        }
        if let Some(image) = self.image {
            cfg.image = image;
        }
        if let Some(publish) = self.publish {
            cfg.publish = publish;
        }
        if let Some(mount_target) = self.mount_target {
            cfg.mount_target = mount_target;
        }
        if let Some(extra_args) = self.extra_args {
            cfg.extra_args = extra_args;
        }
        if let Some(ms) = self.poll_interval_ms {
            cfg.poll_interval_ms = ms;
        }
        if let Some(secs) = self.kill_timeout_secs {
            cfg.kill_timeout_secs = secs;
        }
        if let Some(preflight) = self.preflight {
            cfg.preflight = preflight;
        }
    }
}

/// Defaults overlaid with the project's config file.
pub fn load(project_root: &Path) -> Result<ServeConfig> {
    let mut cfg = ServeConfig::default();
    if let Some(file) = ConfigFile::load(project_root)? {
        file.apply(&mut cfg);
    }
    Ok(cfg)
}
