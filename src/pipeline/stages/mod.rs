// Concrete provisioning stages, in execution order

pub mod update;
pub mod storage;
pub mod gpu;
pub mod docker;
pub mod toolkit;
pub mod platform;
pub mod tooling;
pub mod summary;

pub use update::SystemUpdateStage;
pub use storage::StorageStage;
pub use gpu::GpuDriverStage;
pub use docker::ContainerRuntimeStage;
pub use toolkit::GpuToolkitStage;
pub use platform::PlatformStage;
pub use tooling::ToolingStage;
pub use summary::SummaryStage;

use crate::host::{Host, Invocation};
use crate::pipeline::Stage;
use anyhow::{Context, Result};
use std::path::Path;

/// The full provisioning run
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(SystemUpdateStage),
        Box::new(StorageStage),
        Box::new(GpuDriverStage),
        Box::new(ContainerRuntimeStage),
        Box::new(GpuToolkitStage),
        Box::new(PlatformStage),
        Box::new(ToolingStage),
        Box::new(SummaryStage),
    ]
}

pub(crate) fn apt_install<S: AsRef<str>>(host: &mut dyn Host, packages: &[S]) -> Result<()> {
    let mut args = vec!["install".to_string(), "-y".to_string()];
    args.extend(packages.iter().map(|p| p.as_ref().to_string()));
    host.run(&Invocation::apt_get(args))
}

pub(crate) fn apt_update(host: &mut dyn Host) -> Result<()> {
    host.run(&Invocation::apt_get(["update"]))
}

/// Download a document over HTTPS
pub(crate) fn fetch(host: &mut dyn Host, url: &str) -> Result<String> {
    host.capture(&Invocation::new("curl", ["-fsSL", url]))
        .with_context(|| format!("Failed to download {}", url))
}

/// Download an armored signing key and store it dearmored at `keyring`
pub(crate) fn install_keyring(host: &mut dyn Host, url: &str, keyring: &Path) -> Result<()> {
    let armored = fetch(host, url)?;
    let keyring = keyring.display().to_string();
    host.run(&Invocation::new("gpg", ["--batch", "--yes", "--dearmor", "-o", keyring.as_str()]).stdin(armored))
        .with_context(|| format!("Failed to install signing key {}", keyring))
}

pub(crate) fn systemctl(host: &mut dyn Host, action: &str, unit: &str) -> Result<()> {
    host.run(&Invocation::new("systemctl", [action, unit]))
}
