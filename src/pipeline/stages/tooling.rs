use crate::pipeline::stages::apt_install;
use crate::pipeline::{Stage, StageContext, StageOutcome};
use anyhow::Result;

/// Optional diagnostic and convenience packages
pub struct ToolingStage;

impl Stage for ToolingStage {
    fn name(&self) -> &'static str {
        "Additional tools"
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome> {
        let packages = &ctx.settings.tool_packages;
        if packages.is_empty() {
            return Ok(StageOutcome::Skipped("no additional tools configured".to_string()));
        }

        let question = format!("Install additional tools ({})?", packages.join(", "));
        if !ctx.console.confirm(&question)? {
            return Ok(StageOutcome::Skipped("additional tools not installed".to_string()));
        }

        apt_install(ctx.host, packages)?;
        ctx.console.success("Additional tools installed")?;
        Ok(StageOutcome::Completed)
    }
}
