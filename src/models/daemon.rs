use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Container runtime daemon configuration (`/etc/docker/daemon.json`).
/// Only the data root is managed; the file is written wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeDaemonConfig {
    #[serde(rename = "data-root")]
    pub data_root: PathBuf,
}

impl RuntimeDaemonConfig {
    /// Data root placed in a `docker` directory under the storage mount
    pub fn under_mount(mount_point: &Path) -> Self {
        Self {
            data_root: mount_point.join("docker"),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)
            .context("Failed to serialize daemon configuration")?;
        json.push('\n');
        Ok(json)
    }
}
