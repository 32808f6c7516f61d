// Run configuration
// Read from a key=value rc file; every key has a default so the file is optional.

use crate::error::ProvisionError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostprep/rc";

const SUPPORTED_FILESYSTEMS: &[&str] = &["ext4", "ext3", "xfs", "btrfs"];

/// Settings for one provisioning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mount_point: PathBuf,
    pub filesystem: String,
    pub volume_label: String,
    pub settle_secs: u64,
    pub gpu_driver_package: String,
    pub gpu_ppa: String,
    pub platform_installer_url: String,
    pub tool_packages: Vec<String>,
    pub reboot_delay_secs: u64,
    pub operator_user: Option<String>,
    pub paths: HostPaths,
}

/// Locations of the system files the pipeline reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    pub fstab: PathBuf,
    pub os_release: PathBuf,
    pub docker_daemon_config: PathBuf,
    pub apt_sources_dir: PathBuf,
    pub apt_keyrings_dir: PathBuf,
    pub toolkit_keyrings_dir: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            fstab: PathBuf::from("/etc/fstab"),
            os_release: PathBuf::from("/etc/os-release"),
            docker_daemon_config: PathBuf::from("/etc/docker/daemon.json"),
            apt_sources_dir: PathBuf::from("/etc/apt/sources.list.d"),
            apt_keyrings_dir: PathBuf::from("/etc/apt/keyrings"),
            toolkit_keyrings_dir: PathBuf::from("/usr/share/keyrings"),
        }
    }
}

impl HostPaths {
    pub fn docker_keyring(&self) -> PathBuf {
        self.apt_keyrings_dir.join("docker.gpg")
    }

    pub fn toolkit_keyring(&self) -> PathBuf {
        self.toolkit_keyrings_dir.join("nvidia-container-toolkit-keyring.gpg")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mount_point: PathBuf::from("/mnt/docker-storage"),
            filesystem: "ext4".to_string(),
            volume_label: "docker-storage".to_string(),
            settle_secs: 2,
            gpu_driver_package: "nvidia-driver-535".to_string(),
            gpu_ppa: "ppa:graphics-drivers/ppa".to_string(),
            platform_installer_url: "https://get.casaos.io".to_string(),
            tool_packages: ["htop", "iotop", "nethogs", "ncdu", "tree", "git", "vim", "curl", "wget", "net-tools"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            reboot_delay_secs: 10,
            operator_user: None,
            paths: HostPaths::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (or the default location), falling back to
    /// defaults when the file does not exist. The operator user defaults to
    /// `SUDO_USER`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut settings = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("Invalid config file: {}", config_path.display()))?
        } else if path.is_some() {
            return Err(ProvisionError::Config(format!(
                "config file not found: {}",
                config_path.display()
            ))
            .into());
        } else {
            log::debug!("no config at {}, using defaults", config_path.display());
            Self::default()
        };

        if settings.operator_user.is_none() {
            settings.operator_user = std::env::var("SUDO_USER")
                .ok()
                .filter(|user| !user.is_empty() && user != "root");
        }
        Ok(settings)
    }

    /// Parse rc file contents on top of the defaults
    pub fn parse(contents: &str) -> Result<Self, ProvisionError> {
        let mut settings = Self::default();

        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                ProvisionError::Config(format!("line {}: expected key=value, got '{}'", index + 1, line))
            })?;
            let key = key.trim();
            let value = value.trim();

            match key {
                "storage.mount_point" => settings.mount_point = absolute_path(key, value)?,
                "storage.filesystem" => {
                    if !SUPPORTED_FILESYSTEMS.contains(&value) {
                        return Err(ProvisionError::Config(format!(
                            "storage.filesystem must be one of {}, got '{}'",
                            SUPPORTED_FILESYSTEMS.join(", "),
                            value
                        )));
                    }
                    settings.filesystem = value.to_string();
                }
                "storage.label" => settings.volume_label = non_empty(key, value)?,
                "storage.settle_secs" => settings.settle_secs = number(key, value)?,
                "gpu.driver_package" => settings.gpu_driver_package = non_empty(key, value)?,
                "gpu.ppa" => settings.gpu_ppa = non_empty(key, value)?,
                "platform.installer_url" => {
                    if !value.starts_with("https://") {
                        return Err(ProvisionError::Config(format!(
                            "platform.installer_url must use https, got '{}'",
                            value
                        )));
                    }
                    settings.platform_installer_url = value.to_string();
                }
                "tools.packages" => {
                    settings.tool_packages = value
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "reboot.delay_secs" => settings.reboot_delay_secs = number(key, value)?,
                "operator.user" => settings.operator_user = Some(non_empty(key, value)?),
                "paths.fstab" => settings.paths.fstab = absolute_path(key, value)?,
                "paths.os_release" => settings.paths.os_release = absolute_path(key, value)?,
                "paths.docker_daemon_config" => {
                    settings.paths.docker_daemon_config = absolute_path(key, value)?
                }
                "paths.apt_sources_dir" => settings.paths.apt_sources_dir = absolute_path(key, value)?,
                "paths.apt_keyrings_dir" => settings.paths.apt_keyrings_dir = absolute_path(key, value)?,
                "paths.toolkit_keyrings_dir" => {
                    settings.paths.toolkit_keyrings_dir = absolute_path(key, value)?
                }
                _ => log::warn!("ignoring unknown config key '{}' on line {}", key, index + 1),
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Checks that span several keys
    pub fn validate(&self) -> Result<(), ProvisionError> {
        let limit = label_limit(&self.filesystem);
        if self.volume_label.len() > limit {
            return Err(ProvisionError::Config(format!(
                "storage.label '{}' is {} bytes; {} labels hold at most {}",
                self.volume_label,
                self.volume_label.len(),
                self.filesystem,
                limit
            )));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn reboot_delay(&self) -> Duration {
        Duration::from_secs(self.reboot_delay_secs)
    }

    /// Force flag for `mkfs.<fs>`
    pub fn mkfs_force_flag(&self) -> &'static str {
        match self.filesystem.as_str() {
            "xfs" | "btrfs" => "-f",
            _ => "-F",
        }
    }
}

/// Longest volume label `mkfs.<fs>` accepts, in bytes
fn label_limit(filesystem: &str) -> usize {
    match filesystem {
        "xfs" => 12,
        "btrfs" => 255,
        _ => 16,
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, ProvisionError> {
    if value.is_empty() {
        Err(ProvisionError::Config(format!("{} cannot be empty", key)))
    } else {
        Ok(value.to_string())
    }
}

fn number(key: &str, value: &str) -> Result<u64, ProvisionError> {
    value
        .parse::<u64>()
        .map_err(|_| ProvisionError::Config(format!("{} must be a whole number of seconds, got '{}'", key, value)))
}

fn absolute_path(key: &str, value: &str) -> Result<PathBuf, ProvisionError> {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(ProvisionError::Config(format!("{} must be an absolute path, got '{}'", key, value)))
    }
}
