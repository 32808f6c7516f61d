// Storage provisioning: partition, format and persistently mount a second
// disk for container data.
//
// Destructive. After the second confirmation every command failure aborts
// the run; partially written disks are left for the operator to inspect.

use crate::error::ProvisionError;
use crate::host::Invocation;
use crate::models::{apply_mount_record, BlockDevice, Flag, MountRecord, StorageTarget};
use crate::pipeline::{Stage, StageContext, StageOutcome};
use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;

pub struct StorageStage;

impl Stage for StorageStage {
    fn name(&self) -> &'static str {
        "Storage drive"
    }

    fn writes(&self) -> &'static [Flag] {
        &[Flag::StorageConfigured]
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome> {
        let devices = list_block_devices(ctx)?;
        print_device_table(ctx, &devices)?;

        if !ctx.console.confirm("Do you want to configure a second drive for Docker storage?")? {
            ctx.state.record_storage_configured(false)?;
            return Ok(StageOutcome::Skipped("second drive not configured".to_string()));
        }

        let answer = ctx.console.ask("Enter the drive name to use (e.g. sdb):")?;
        let target = match StorageTarget::validate(&answer, &devices) {
            Ok(target) => target,
            Err(e @ ProvisionError::InvalidStorageTarget { .. }) => {
                ctx.console.error(&e.to_string())?;
                ctx.state.record_storage_configured(false)?;
                return Ok(StageOutcome::Skipped("no valid drive selected".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        ctx.console.warning(&format!(
            "ALL DATA on {} ({}, {}) will be permanently erased!",
            target.device_path(),
            target.size(),
            target.model()
        ))?;
        let question = format!("Are you absolutely sure you want to format {}?", target.device_path());
        if !ctx.console.confirm(&question)? {
            ctx.state.record_storage_configured(false)?;
            return Ok(StageOutcome::Skipped("drive formatting cancelled".to_string()));
        }

        provision(ctx, &target)?;
        ctx.state.record_storage_configured(true)?;
        ctx.console.success(&format!(
            "{} mounted at {}",
            target.partition_path(),
            ctx.settings.mount_point.display()
        ))?;
        Ok(StageOutcome::Completed)
    }
}

fn list_block_devices(ctx: &mut StageContext<'_, '_>) -> Result<Vec<BlockDevice>> {
    let json = ctx.host.capture(
        &Invocation::new("lsblk", ["--json", "--output", "NAME,SIZE,TYPE,MODEL,MOUNTPOINT"]).read_only(),
    )?;
    BlockDevice::parse_lsblk(&json)
}

fn print_device_table(ctx: &mut StageContext<'_, '_>, devices: &[BlockDevice]) -> Result<()> {
    ctx.console.info("Available drives:")?;
    ctx.console.line(&format!("  {:<12} {:>8}  {:<28} {}", "NAME", "SIZE", "MODEL", "NOTE"))?;
    for device in devices.iter().filter(|d| d.is_disk()) {
        let note = if device.is_system_disk() {
            "system disk"
        } else if device.has_mounts() {
            "in use"
        } else {
            ""
        };
        ctx.console.line(&format!(
            "  {:<12} {:>8}  {:<28} {}",
            device.name,
            device.size_label(),
            device.model_label(),
            note
        ))?;
    }
    Ok(())
}

/// The destructive sequence. No rollback on failure.
fn provision(ctx: &mut StageContext<'_, '_>, target: &StorageTarget) -> Result<()> {
    let settings = ctx.settings;
    // Refuse before the disk is touched; mkfs would only fail after partitioning
    settings.validate()?;
    let device = target.device_path();
    let partition = target.partition_path();
    let mount_point = settings.mount_point.display().to_string();

    ctx.console.info(&format!("Creating GPT partition table on {}...", device))?;
    ctx.host.run(&Invocation::new("parted", ["-s", device.as_str(), "mklabel", "gpt"]))?;
    ctx.host.run(&Invocation::new(
        "parted",
        ["-s", "-a", "optimal", device.as_str(), "mkpart", "primary", settings.filesystem.as_str(), "0%", "100%"],
    ))?;

    // Give the kernel time to publish the new partition node
    ctx.host.run(&Invocation::new("partprobe", [device.as_str()]))?;
    ctx.host.sleep(settings.settle_delay());

    ctx.console.info(&format!("Formatting {} as {}...", partition, settings.filesystem))?;
    ctx.host.run(&Invocation::new(
        &format!("mkfs.{}", settings.filesystem),
        [settings.mkfs_force_flag(), "-L", settings.volume_label.as_str(), partition.as_str()],
    ))?;

    ctx.host.create_dir_all(&settings.mount_point)?;

    let blkid = Invocation::new("blkid", ["-s", "UUID", "-o", "value", partition.as_str()]);
    let uuid = ctx.host.capture(&blkid)?.trim().to_string();
    if uuid.is_empty() {
        return Err(ProvisionError::MissingOutput {
            command: blkid.command_line(),
        }
        .into());
    }
    log::info!("{} has filesystem UUID {}", partition, uuid);

    let record = MountRecord::new(uuid, settings.mount_point.clone(), settings.filesystem.clone());
    write_mount_record(ctx, &record)?;

    ctx.host.run(&Invocation::new("mount", ["-a"]))?;

    match settings.operator_user.as_deref() {
        Some(user) => {
            let owner = format!("{}:{}", user, user);
            ctx.host.run(&Invocation::new("chown", [owner.as_str(), mount_point.as_str()]))?;
        }
        None => ctx.console.warning(&format!(
            "No operator user known; {} stays owned by root",
            mount_point
        ))?,
    }
    ctx.host.run(&Invocation::new("chmod", ["755", mount_point.as_str()]))?;
    Ok(())
}

/// Back up the mount table, then rewrite it with `record` as the only entry
/// for its mount point
fn write_mount_record(ctx: &mut StageContext<'_, '_>, record: &MountRecord) -> Result<()> {
    let settings = ctx.settings;
    let fstab = &settings.paths.fstab;
    let existing = ctx.host.read_file(fstab)?;

    if existing.is_some() {
        let backup = backup_path(fstab);
        ctx.host
            .copy_file(fstab, &backup)
            .context("Failed to back up the mount table")?;
        ctx.console.info(&format!("Saved previous mount table to {}", backup.display()))?;
    }

    let (contents, replaced) = apply_mount_record(existing.as_deref().unwrap_or(""), record);
    if replaced > 0 {
        ctx.console.warning(&format!(
            "Replaced {} existing mount entr{} for {}",
            replaced,
            if replaced == 1 { "y" } else { "ies" },
            record.mount_point.display()
        ))?;
    }
    ctx.host.write_file(fstab, &contents)?;
    ctx.console.info(&format!("Added to {}: {}", fstab.display(), record.fstab_line()))?;
    Ok(())
}

fn backup_path(fstab: &std::path::Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let name = fstab
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fstab".to_string());
    fstab.with_file_name(format!("{}.hostprep-{}.bak", name, stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_backup_path_sits_next_to_fstab() {
        let backup = backup_path(Path::new("/etc/fstab"));
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(backup.parent(), Some(Path::new("/etc")));
        assert!(name.starts_with("fstab.hostprep-"));
        assert!(name.ends_with(".bak"));
        assert_eq!(name.len(), "fstab.hostprep-".len() + 14 + ".bak".len());
    }
}
