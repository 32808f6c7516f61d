use crate::host::Invocation;
use crate::pipeline::stages::apt_update;
use crate::pipeline::{Stage, StageContext, StageOutcome};
use anyhow::Result;

/// Refresh the package index and upgrade everything installed.
/// Later installs assume this succeeded.
pub struct SystemUpdateStage;

impl Stage for SystemUpdateStage {
    fn name(&self) -> &'static str {
        "System update"
    }

    fn run(&self, ctx: &mut StageContext<'_, '_>) -> Result<StageOutcome> {
        ctx.console.info("Updating package index and upgrading installed packages...")?;
        apt_update(ctx.host)?;
        ctx.host.run(&Invocation::apt_get(["upgrade", "-y"]))?;
        ctx.console.success("System packages are up to date")?;
        Ok(StageOutcome::Completed)
    }
}
