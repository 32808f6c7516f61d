use crate::host::Invocation;
use crate::pipeline::stages::fetch;
use crate::pipeline::{Stage, StageContext, StageOutcome};
use anyhow::{Context, Result};

/// Install CasaOS with its upstream installer script.
/// The installer is opaque: it brings up a web UI on port 80.
pub struct PlatformStage;

impl Stage for PlatformStage {
    fn name(&self) -> &'static str {
        "CasaOS"
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome> {
        let url = ctx.settings.platform_installer_url.as_str();
        ctx.console.info(&format!("Downloading the CasaOS installer from {}...", url))?;
        let script = fetch(ctx.host, url)?;

        ctx.console.info("Running the CasaOS installer (this can take a few minutes)...")?;
        ctx.host
            .run(&Invocation::new("bash", ["-s"]).stdin(script))
            .context("CasaOS installer failed")?;

        ctx.console.success("CasaOS installed")?;
        Ok(StageOutcome::Completed)
    }
}
