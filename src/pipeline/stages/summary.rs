use crate::cli::output::yes_no;
use crate::host::Invocation;
use crate::models::Flag;
use crate::pipeline::{Stage, StageContext, StageOutcome};
use anyhow::Result;

/// Final report, then the reboot the GPU driver needs
pub struct SummaryStage;

impl Stage for SummaryStage {
    fn name(&self) -> &'static str {
        "Summary"
    }

    fn reads(&self) -> &'static [Flag] {
        &[
            Flag::StorageConfigured,
            Flag::GpuConfigured,
            Flag::RebootRequired,
            Flag::ServerAddress,
        ]
    }

    fn writes(&self) -> &'static [Flag] {
        &[Flag::ServerAddress]
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome> {
        let settings = ctx.settings;
        let storage = ctx.state.storage_configured()?;
        let gpu = ctx.state.gpu_configured()?;

        let addresses = ctx
            .host
            .capture(&Invocation::new("hostname", ["-I"]).read_only())?;
        ctx.state.record_server_address(first_address(&addresses))?;
        let address = ctx.state.server_address()?.to_string();

        let palette = ctx.console.palette();
        ctx.console.line(&palette.bold("Installation complete"))?;
        ctx.console.success(&format!("CasaOS web interface: http://{}", address))?;
        ctx.console.line(&format!("  Storage drive configured: {}", yes_no(storage)))?;
        ctx.console.line(&format!("  GPU drivers configured:   {}", yes_no(gpu)))?;

        if storage {
            let mount_point = settings.mount_point.display().to_string();
            ctx.console.info(&format!("Storage usage for {}:", mount_point))?;
            let usage = ctx
                .host
                .capture(&Invocation::new("df", ["-h", mount_point.as_str()]).read_only())?;
            for line in usage.lines() {
                ctx.console.line(&format!("  {}", line))?;
            }
            ctx.console.line(&format!(
                "  Docker data root: {}",
                settings.mount_point.join("docker").display()
            ))?;
        }

        ctx.console.line("")?;
        ctx.console.info("Check Docker with: docker ps")?;
        if gpu {
            ctx.console.info("After rebooting, check the GPU with: nvidia-smi")?;
            ctx.console.info(
                "Test GPU containers with: docker run --rm --gpus all nvidia/cuda:12.2.0-base-ubuntu22.04 nvidia-smi",
            )?;
        }

        if !ctx.state.reboot_required()? {
            return Ok(StageOutcome::Completed);
        }

        ctx.console.warning("A reboot is required to load the GPU drivers")?;
        if ctx.console.confirm("Reboot now?")? {
            ctx.console.info(&format!(
                "Rebooting in {} seconds... (Ctrl+C to cancel)",
                settings.reboot_delay_secs
            ))?;
            ctx.host.sleep(settings.reboot_delay());
            ctx.host.run(&Invocation::new("reboot", Vec::<String>::new()))?;
        } else {
            ctx.console.warning("Please reboot manually before using GPU containers: sudo reboot")?;
        }
        Ok(StageOutcome::Completed)
    }
}

/// First address printed by `hostname -I`
fn first_address(output: &str) -> &str {
    output.split_whitespace().next().unwrap_or("localhost")
}
