use crate::host::Invocation;
use crate::models::Flag;
use crate::pipeline::stages::{apt_install, apt_update};
use crate::pipeline::{Stage, StageContext, StageOutcome};
use anyhow::Result;

/// Optional proprietary GPU driver install. The driver only loads after a
/// reboot, which is recorded here and acted on by the summary stage.
pub struct GpuDriverStage;

impl Stage for GpuDriverStage {
    fn name(&self) -> &'static str {
        "GPU drivers"
    }

    fn writes(&self) -> &'static [Flag] {
        &[Flag::GpuConfigured, Flag::RebootRequired]
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome> {
        let package = ctx.settings.gpu_driver_package.as_str();
        let question = format!("Do you want to install NVIDIA GPU drivers ({})?", package);
        if !ctx.console.confirm(&question)? {
            ctx.state.record_gpu_configured(false)?;
            ctx.state.record_reboot_required(false)?;
            return Ok(StageOutcome::Skipped("GPU drivers not installed".to_string()));
        }

        ctx.console.info(&format!("Adding {}...", ctx.settings.gpu_ppa))?;
        ctx.host.run(&Invocation::new("add-apt-repository", ["-y", ctx.settings.gpu_ppa.as_str()]))?;
        apt_update(ctx.host)?;

        ctx.console.info(&format!("Installing {}...", package))?;
        apt_install(ctx.host, &[package])?;

        ctx.state.record_gpu_configured(true)?;
        ctx.state.record_reboot_required(true)?;
        ctx.console.success("GPU drivers installed")?;
        ctx.console.warning("A reboot is required before the driver is active")?;
        Ok(StageOutcome::Completed)
    }
}
