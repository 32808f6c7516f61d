// Container runtime: install Docker CE from the vendor repository and, when
// a storage volume exists, move its data root onto it.

use crate::host::{Host, Invocation, OsRelease};
use crate::models::{AptSource, Flag, RuntimeDaemonConfig};
use crate::pipeline::stages::{apt_install, apt_update, install_keyring, systemctl};
use crate::pipeline::{Stage, StageContext, StageOutcome};
use anyhow::{anyhow, Context, Result};

const DOCKER_GPG_URL: &str = "https://download.docker.com/linux/ubuntu/gpg";

const PREREQUISITES: &[&str] = &["ca-certificates", "curl", "gnupg", "lsb-release"];

const DOCKER_PACKAGES: &[&str] = &[
    "docker-ce",
    "docker-ce-cli",
    "containerd.io",
    "docker-buildx-plugin",
    "docker-compose-plugin",
];

pub struct ContainerRuntimeStage;

impl Stage for ContainerRuntimeStage {
    fn name(&self) -> &'static str {
        "Docker"
    }

    fn reads(&self) -> &'static [Flag] {
        &[Flag::StorageConfigured]
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome> {
        let settings = ctx.settings;
        let paths = &settings.paths;

        ctx.console.info("Installing Docker prerequisites...")?;
        apt_install(ctx.host, PREREQUISITES)?;

        ctx.host.create_dir_all(&paths.apt_keyrings_dir)?;
        let keyring = paths.docker_keyring();
        install_keyring(ctx.host, DOCKER_GPG_URL, &keyring)?;

        let arch = ctx
            .host
            .capture(&Invocation::new("dpkg", ["--print-architecture"]).read_only())?;
        let codename = read_os_release(ctx.host, &paths.os_release)?.codename()?;
        let source = AptSource::docker(&paths.apt_sources_dir, &keyring, &arch, &codename);
        ctx.host.write_file(&source.path, &source.contents)?;

        ctx.console.info("Installing Docker Engine...")?;
        apt_update(ctx.host)?;
        apt_install(ctx.host, DOCKER_PACKAGES)?;
        systemctl(ctx.host, "enable", "docker")?;
        systemctl(ctx.host, "start", "docker")?;

        if let Some(user) = settings.operator_user.as_deref() {
            ctx.host.run(&Invocation::new("usermod", ["-aG", "docker", user]))?;
            ctx.console.info(&format!("Added {} to the docker group (takes effect at next login)", user))?;
        }
        ctx.console.success("Docker installed and running")?;

        if ctx.state.storage_configured()? {
            relocate_data_root(ctx)?;
        } else {
            ctx.console.info("Docker keeps its default data root")?;
        }
        Ok(StageOutcome::Completed)
    }
}

/// Point Docker's data root at the storage volume. The daemon must be
/// stopped while the configuration changes underneath it.
fn relocate_data_root(ctx: &mut StageContext<'_, '_>) -> Result<()> {
    let settings = ctx.settings;
    let config = RuntimeDaemonConfig::under_mount(&settings.mount_point);
    let config_path = &settings.paths.docker_daemon_config;

    ctx.console.info(&format!("Moving Docker data root to {}...", config.data_root.display()))?;
    systemctl(ctx.host, "stop", "docker")?;
    ctx.host.create_dir_all(&config.data_root)?;
    if let Some(parent) = config_path.parent() {
        ctx.host.create_dir_all(parent)?;
    }
    ctx.host.write_file(config_path, &config.to_json()?)?;
    systemctl(ctx.host, "start", "docker")?;

    ctx.console.success(&format!("Docker data root is now {}", config.data_root.display()))?;
    Ok(())
}

pub(crate) fn read_os_release(host: &mut dyn Host, path: &std::path::Path) -> Result<OsRelease> {
    let data = host
        .read_file(path)?
        .ok_or_else(|| anyhow!("{} not found", path.display()))
        .context("Cannot determine the OS release")?;
    Ok(OsRelease::parse(&data))
}
