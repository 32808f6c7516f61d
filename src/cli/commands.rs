use crate::cli::output::Palette;
use crate::cli::prompt::Console;
use crate::config::Settings;
use crate::host::{require_elevated_privileges, DryRunHost, Host, LocalHost, OsRelease};
use crate::pipeline::stages::default_stages;
use crate::pipeline::{Pipeline, PipelineReport};
use anyhow::Result;
use clap::Parser;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostprep")]
#[command(about = "Provision an Ubuntu host into a GPU-capable Docker server with CasaOS")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (key=value); defaults to /etc/hostprep/rc when present
    #[arg(long, env = "HOSTPREP_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Print every change instead of making it
    #[arg(long)]
    pub dry_run: bool,
    /// More diagnostic logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    let palette = Palette::detect();
    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout(), palette);

    if cli.dry_run {
        let mut host = DryRunHost::new(palette);
        provision(&mut host, &mut console, &settings, true)?;
    } else {
        let mut host = LocalHost::new();
        provision(&mut host, &mut console, &settings, false)?;
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(default_level);
    // A logger may already be installed when embedded in tests
    let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}

/// Interactive provisioning run.
///
/// Shows the plan, asks for consent, checks privileges and then runs every
/// stage. Returns `None` when the operator cancels at the first prompt.
pub fn provision(
    host: &mut dyn Host,
    console: &mut Console<'_>,
    settings: &Settings,
    dry_run: bool,
) -> Result<Option<PipelineReport>> {
    let pipeline = Pipeline::new(default_stages())?;
    let release = host.read_file(&settings.paths.os_release)?.map(|data| OsRelease::parse(&data));
    print_banner(console, &pipeline, settings, release.as_ref(), dry_run)?;

    if !console.confirm("Continue with installation?")? {
        console.line("Installation cancelled.")?;
        return Ok(None);
    }

    if dry_run {
        log::info!("dry run: skipping privilege check");
    } else {
        require_elevated_privileges(host)?;
    }

    let report = pipeline.run(host, console, settings)?;
    Ok(Some(report))
}

fn print_banner(
    console: &mut Console<'_>,
    pipeline: &Pipeline,
    settings: &Settings,
    release: Option<&OsRelease>,
    dry_run: bool,
) -> Result<()> {
    let palette = console.palette();
    console.line(&palette.heading("GPU Docker server setup (Docker + NVIDIA + CasaOS)"))?;
    match release {
        Some(release) => console.line(&format!("Target system: {}", release.pretty_name()))?,
        None => console.warning(&format!(
            "{} not found; this installer expects Ubuntu",
            settings.paths.os_release.display()
        ))?,
    }
    console.line("")?;
    console.line("This installer will:")?;
    for (index, name) in pipeline.stage_names().iter().enumerate() {
        console.line(&format!("  {}. {}", index + 1, name))?;
    }
    console.line("")?;
    console.line(&format!(
        "Storage drives are mounted at {} and formatted as {}.",
        settings.mount_point.display(),
        settings.filesystem
    ))?;
    console.warning("Formatting a drive destroys all data on it. You will be asked before every destructive step.")?;
    if dry_run {
        console.warning("DRY RUN: commands and file changes are printed, nothing is modified.")?;
    }
    Ok(())
}
