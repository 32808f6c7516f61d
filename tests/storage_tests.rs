// Storage provisioning stage tests
// The stage runs alone against the fake host; answers script the prompts.

use acceptance_framework::*;
use hostprep::error::ProvisionError;
use hostprep::pipeline::stages::StorageStage;
use hostprep::pipeline::StageOutcome;

fn storage_only(ctx: &mut ProvisionTestContext, answers: &[&str]) -> RunResult {
    ctx.run_stages(vec![Box::new(StorageStage)], answers)
}

#[test]
fn test_declined_first_gate_mutates_nothing() {
    let mut ctx = ProvisionTestContext::new();
    let run = storage_only(&mut ctx, &["n"]);

    let report = run.report();
    assert_eq!(report.state.storage_configured().unwrap(), false);
    assert!(matches!(report.outcome("Storage drive"), Some(StageOutcome::Skipped(_))));
    assert!(!ctx.host.mutated_anything(), "events: {:#?}", ctx.host.events);
    ThenBuilder::new(&ctx).file_equals("/etc/fstab", FSTAB);
    // The device list is still shown
    assert!(run.transcript.contains("WDC WD40EFRX"));
    assert!(run.transcript.contains("system disk"));
}

#[test]
fn test_empty_answer_declines() {
    let mut ctx = ProvisionTestContext::new();
    let run = storage_only(&mut ctx, &[""]);
    assert_eq!(run.report().state.storage_configured().unwrap(), false);
    assert!(!ctx.host.mutated_anything());
}

#[test]
fn test_unknown_device_is_refused_without_mutation() {
    let mut ctx = ProvisionTestContext::new();
    let run = storage_only(&mut ctx, &["y", "sdz", "y"]);

    assert_eq!(run.report().state.storage_configured().unwrap(), false);
    assert!(run.transcript.contains("invalid storage target 'sdz'"));
    assert!(!ctx.host.mutated_anything());
}

#[test]
fn test_system_disk_is_refused() {
    let mut ctx = ProvisionTestContext::new();
    let run = storage_only(&mut ctx, &["y", "sda", "y"]);

    assert_eq!(run.report().state.storage_configured().unwrap(), false);
    assert!(run.transcript.contains("holds the running system"));
    ThenBuilder::new(&ctx).did_not_run("parted").did_not_run("mkfs");
}

#[test]
fn test_declined_second_gate_mutates_nothing() {
    let mut ctx = ProvisionTestContext::new();
    let run = storage_only(&mut ctx, &["y", "sdb", "n"]);

    assert_eq!(run.report().state.storage_configured().unwrap(), false);
    assert!(run.transcript.contains("ALL DATA on /dev/sdb (3.6T, WDC WD40EFRX) will be permanently erased"));
    assert!(run.transcript.contains("Are you absolutely sure you want to format /dev/sdb? (y/N):"));
    assert!(!ctx.host.mutated_anything());
}

#[test]
fn test_confirmed_storage_adds_one_uuid_entry() {
    let mut ctx = ProvisionTestContext::new();
    let run = storage_only(&mut ctx, &["y", "/dev/sdb", "y"]);

    assert_eq!(run.report().state.storage_configured().unwrap(), true);

    let fstab = ctx.host.file("/etc/fstab").unwrap().to_string();
    let expected = format!("UUID={} /mnt/docker-storage ext4 defaults 0 2", SDB_UUID);
    assert_eq!(fstab.matches("/mnt/docker-storage").count(), 1);
    assert!(fstab.ends_with(&format!("{}\n", expected)));
    assert!(fstab.starts_with(FSTAB));
    assert!(!fstab.contains("/dev/sdb"), "entry must not use the device name");

    ThenBuilder::new(&ctx)
        .ran("mount -a")
        .ran("chown casa:casa /mnt/docker-storage")
        .ran("chmod 755 /mnt/docker-storage");
}

#[test]
fn test_destructive_sequence_order() {
    let mut ctx = ProvisionTestContext::new();
    storage_only(&mut ctx, &["y", "sdb", "y"]).report();

    let lines = ctx.host.command_lines();
    let expected = [
        "lsblk --json --output NAME,SIZE,TYPE,MODEL,MOUNTPOINT",
        "parted -s /dev/sdb mklabel gpt",
        "parted -s -a optimal /dev/sdb mkpart primary ext4 0% 100%",
        "partprobe /dev/sdb",
        "mkfs.ext4 -F -L docker-storage /dev/sdb1",
        "blkid -s UUID -o value /dev/sdb1",
        "mount -a",
        "chown casa:casa /mnt/docker-storage",
        "chmod 755 /mnt/docker-storage",
    ];
    assert_eq!(lines, expected);

    // Settle delay between partitioning and formatting
    let probe = ctx.host.run_position("partprobe /dev/sdb").unwrap();
    let sleep = ctx.host.position(|e| *e == Event::Sleep(2)).unwrap();
    let mkfs = ctx.host.run_position("mkfs.ext4 -F -L docker-storage /dev/sdb1").unwrap();
    assert!(probe < sleep && sleep < mkfs);

    // Mount table is written before mounting
    let write = ctx.host.write_position("/etc/fstab").unwrap();
    let mount = ctx.host.run_position("mount -a").unwrap();
    assert!(write < mount);
}

#[test]
fn test_mount_table_is_backed_up() {
    let mut ctx = ProvisionTestContext::new();
    storage_only(&mut ctx, &["y", "sdb", "y"]).report();

    let backup = ctx
        .host
        .files
        .keys()
        .find(|p| p.to_string_lossy().starts_with("/etc/fstab.hostprep-"))
        .cloned()
        .expect("no mount table backup");
    assert_eq!(ctx.host.files[&backup], FSTAB);
}

#[test]
fn test_existing_entry_for_mount_point_is_replaced() {
    let mut ctx = ProvisionTestContext::new();
    let previous = format!("{}UUID=deadbeef-old /mnt/docker-storage ext4 defaults 0 2\n", FSTAB);
    ctx.host.files.insert("/etc/fstab".into(), previous);

    let run = storage_only(&mut ctx, &["y", "sdb", "y"]);
    run.report();

    let fstab = ctx.host.file("/etc/fstab").unwrap();
    assert!(!fstab.contains("deadbeef-old"));
    assert_eq!(fstab.matches("/mnt/docker-storage").count(), 1);
    assert!(run.transcript.contains("Replaced 1 existing mount entry"));
}

#[test]
fn test_nvme_partition_naming() {
    let mut ctx = ProvisionTestContext::new();
    storage_only(&mut ctx, &["y", "nvme0n1", "y"]).report();

    ThenBuilder::new(&ctx)
        .ran("mkfs.ext4 -F -L docker-storage /dev/nvme0n1p1")
        .did_not_run("mkfs.ext4 -F -L docker-storage /dev/nvme0n11");
}

#[test]
fn test_format_failure_aborts_without_mount_entry() {
    let mut ctx = ProvisionTestContext::new();
    ctx.host.fail("mkfs.ext4", 1);

    let run = storage_only(&mut ctx, &["y", "sdb", "y"]);
    let err = run.error();
    assert!(format!("{:#}", err).contains("Stage 'Storage drive' failed"));
    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::ExternalCommand { code: Some(1), .. })
    ));

    // Partitioning happened and is left for inspection; nothing after it ran
    ThenBuilder::new(&ctx)
        .ran("parted -s /dev/sdb mklabel gpt")
        .did_not_run("mount")
        .never_wrote("/etc/fstab")
        .file_equals("/etc/fstab", FSTAB);
}

#[test]
fn test_missing_uuid_aborts() {
    let mut ctx = ProvisionTestContext::new();
    ctx.host.output("blkid", "\n");

    let run = storage_only(&mut ctx, &["y", "sdb", "y"]);
    assert!(matches!(
        run.error().downcast_ref::<ProvisionError>(),
        Some(ProvisionError::MissingOutput { .. })
    ));
    ThenBuilder::new(&ctx).never_wrote("/etc/fstab");
}

#[test]
fn test_without_operator_user_ownership_stays_root() {
    let mut ctx = ProvisionTestContext::new();
    ctx.settings.operator_user = None;

    let run = storage_only(&mut ctx, &["y", "sdb", "y"]);
    run.report();
    assert!(run.transcript.contains("stays owned by root"));
    ThenBuilder::new(&ctx)
        .did_not_run("chown")
        .ran("chmod 755 /mnt/docker-storage");
}

#[test]
fn test_custom_filesystem_and_mount_point() {
    let mut ctx = ProvisionTestContext::new();
    ctx.settings.filesystem = "xfs".to_string();
    ctx.settings.volume_label = "docker-data".to_string();
    ctx.settings.mount_point = "/srv/containers".into();

    storage_only(&mut ctx, &["y", "sdb", "y"]).report();
    ThenBuilder::new(&ctx)
        .ran("parted -s -a optimal /dev/sdb mkpart primary xfs 0% 100%")
        .ran("mkfs.xfs -f -L docker-data /dev/sdb1")
        .file_contains("/etc/fstab", &format!("UUID={} /srv/containers xfs defaults 0 2", SDB_UUID));
}

#[test]
fn test_label_too_long_for_filesystem_leaves_disk_untouched() {
    let mut ctx = ProvisionTestContext::new();
    ctx.settings.filesystem = "xfs".to_string();

    let run = storage_only(&mut ctx, &["y", "sdb", "y"]);
    assert!(matches!(
        run.error().downcast_ref::<ProvisionError>(),
        Some(ProvisionError::Config(_))
    ));
    assert!(!ctx.host.mutated_anything(), "events: {:#?}", ctx.host.events);
    ThenBuilder::new(&ctx).did_not_run("parted").did_not_run("mkfs");
}
