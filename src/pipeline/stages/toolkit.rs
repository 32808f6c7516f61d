use crate::host::Invocation;
use crate::models::{AptSource, Flag};
use crate::pipeline::stages::docker::read_os_release;
use crate::pipeline::stages::{apt_install, apt_update, fetch, install_keyring, systemctl};
use crate::pipeline::{Stage, StageContext, StageOutcome};
use anyhow::Result;

const TOOLKIT_GPG_URL: &str = "https://nvidia.github.io/libnvidia-container/gpgkey";

/// Wire Docker to the GPU driver through the NVIDIA container toolkit.
/// Performs no actions at all unless the driver stage installed a driver.
pub struct GpuToolkitStage;

impl Stage for GpuToolkitStage {
    fn name(&self) -> &'static str {
        "NVIDIA container toolkit"
    }

    fn reads(&self) -> &'static [Flag] {
        &[Flag::GpuConfigured]
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome> {
        if !ctx.state.gpu_configured()? {
            return Ok(StageOutcome::Skipped("GPU drivers were not installed".to_string()));
        }
        let paths = &ctx.settings.paths;

        let distribution = read_os_release(ctx.host, &paths.os_release)?.distribution()?;
        log::info!("toolkit repository for distribution {}", distribution);

        ctx.console.info("Adding the NVIDIA container toolkit repository...")?;
        let keyring = paths.toolkit_keyring();
        ctx.host.create_dir_all(&paths.toolkit_keyrings_dir)?;
        install_keyring(ctx.host, TOOLKIT_GPG_URL, &keyring)?;

        let list_url = format!(
            "https://nvidia.github.io/libnvidia-container/{}/libnvidia-container.list",
            distribution
        );
        let vendor_list = fetch(ctx.host, &list_url)?;
        let source = AptSource::nvidia_toolkit(&paths.apt_sources_dir, &keyring, &vendor_list);
        ctx.host.write_file(&source.path, &source.contents)?;

        ctx.console.info("Installing nvidia-container-toolkit...")?;
        apt_update(ctx.host)?;
        apt_install(ctx.host, &["nvidia-container-toolkit"])?;

        ctx.host.run(&Invocation::new("nvidia-ctk", ["runtime", "configure", "--runtime=docker"]))?;
        systemctl(ctx.host, "restart", "docker")?;

        ctx.console.success("Docker can now run GPU containers (--gpus all)")?;
        Ok(StageOutcome::Completed)
    }
}
