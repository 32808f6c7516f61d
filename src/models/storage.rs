// Storage models: enumerated block devices, the validated provisioning
// target, and the mount-table record derived from it.

use crate::error::ProvisionError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Mount points that mark a disk as the one the host boots from
const SYSTEM_MOUNT_POINTS: &[&str] = &["/", "/boot", "/boot/efi", "[SWAP]"];

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<BlockDevice>,
}

/// One device row from `lsblk --json`.
///
/// Older lsblk emits a single `mountpoint`, newer versions a `mountpoints`
/// array that may contain nulls. Both are accepted.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BlockDevice {
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    mountpoints: Vec<Option<String>>,
    #[serde(default)]
    pub children: Vec<BlockDevice>,
}

impl BlockDevice {
    /// Parse the JSON document printed by `lsblk --json`
    pub fn parse_lsblk(json: &str) -> Result<Vec<BlockDevice>> {
        let output: LsblkOutput = serde_json::from_str(json)
            .context("Failed to parse lsblk output")?;
        Ok(output.blockdevices)
    }

    pub fn mount_points(&self) -> Vec<&str> {
        let mut points: Vec<&str> = self.mountpoints.iter().flatten().map(String::as_str).collect();
        if let Some(point) = self.mountpoint.as_deref() {
            if !points.contains(&point) {
                points.push(point);
            }
        }
        points
    }

    pub fn is_disk(&self) -> bool {
        self.kind.as_deref() == Some("disk")
    }

    /// True when this device or any child backs the running system
    pub fn is_system_disk(&self) -> bool {
        self.mount_points().iter().any(|point| SYSTEM_MOUNT_POINTS.contains(point))
            || self.children.iter().any(BlockDevice::is_system_disk)
    }

    /// True when this device or any child is mounted anywhere
    pub fn has_mounts(&self) -> bool {
        !self.mount_points().is_empty() || self.children.iter().any(BlockDevice::has_mounts)
    }

    pub fn size_label(&self) -> &str {
        self.size.as_deref().unwrap_or("?")
    }

    pub fn model_label(&self) -> &str {
        self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()).unwrap_or("unknown model")
    }
}

/// A whole disk that passed validation and may be repartitioned.
///
/// The only constructor is [`StorageTarget::validate`], so holding one means
/// the name was cross-checked against the enumerated device list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    name: String,
    size: String,
    model: String,
}

impl StorageTarget {
    pub fn validate(input: &str, devices: &[BlockDevice]) -> Result<Self, ProvisionError> {
        let trimmed = input.trim();
        let name = trimmed.strip_prefix("/dev/").unwrap_or(trimmed);
        let reject = |reason: &str| ProvisionError::InvalidStorageTarget {
            name: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(reject("no device name given"));
        }
        if name.contains('/') || name.chars().any(char::is_whitespace) {
            return Err(reject("expected a bare device name such as 'sdb'"));
        }

        let device = devices
            .iter()
            .find(|device| device.name == name)
            .ok_or_else(|| reject("not found in the block device list"))?;

        if !device.is_disk() {
            return Err(reject("not a whole disk (select the disk, not a partition)"));
        }
        if device.is_system_disk() {
            return Err(reject("this disk holds the running system"));
        }
        if device.has_mounts() {
            return Err(reject("the disk has mounted filesystems"));
        }

        Ok(Self {
            name: name.to_string(),
            size: device.size_label().to_string(),
            model: device.model_label().to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn device_path(&self) -> String {
        format!("/dev/{}", self.name)
    }

    /// Path of the single partition created on this disk.
    /// Names ending in a digit (nvme0n1, mmcblk0) take a `p` separator.
    pub fn partition_path(&self) -> String {
        let ends_with_digit = self.name.chars().last().map_or(false, |c| c.is_ascii_digit());
        if ends_with_digit {
            format!("/dev/{}p1", self.name)
        } else {
            format!("/dev/{}1", self.name)
        }
    }
}

/// One persistent mount-table entry, always keyed by filesystem UUID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    pub uuid: String,
    pub mount_point: PathBuf,
    pub filesystem: String,
    pub options: String,
}

impl MountRecord {
    pub fn new(uuid: impl Into<String>, mount_point: impl Into<PathBuf>, filesystem: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            mount_point: mount_point.into(),
            filesystem: filesystem.into(),
            options: "defaults".to_string(),
        }
    }

    pub fn fstab_line(&self) -> String {
        format!(
            "UUID={} {} {} {} 0 2",
            self.uuid,
            self.mount_point.display(),
            self.filesystem,
            self.options
        )
    }
}

/// Rewrite mount-table contents so exactly one entry targets the record's
/// mount point. Returns the new contents and the number of entries dropped.
pub fn apply_mount_record(existing: &str, record: &MountRecord) -> (String, usize) {
    let mut replaced = 0;
    let mut output = String::new();

    for line in existing.lines() {
        if targets_mount_point(line, &record.mount_point) {
            replaced += 1;
            continue;
        }
        output.push_str(line);
        output.push('\n');
    }

    output.push_str(&record.fstab_line());
    output.push('\n');
    (output, replaced)
}

fn targets_mount_point(line: &str, mount_point: &Path) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return false;
    }
    let mut fields = trimmed.split_whitespace();
    match (fields.next(), fields.next()) {
        (Some(_), Some(point)) => Path::new(point) == mount_point,
        _ => false,
    }
}
