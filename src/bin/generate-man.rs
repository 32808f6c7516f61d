// Writes the hostprep(1) man page

use anyhow::{Context, Result};
use clap::CommandFactory;
use hostprep::cli::Cli;
use std::path::PathBuf;

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;

    let man = clap_mangen::Man::new(Cli::command());
    let mut buffer = Vec::new();
    man.render(&mut buffer).context("Failed to render man page")?;

    let path = out_dir.join("hostprep.1");
    std::fs::write(&path, buffer)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}
