// Host effects: external commands and filesystem writes
//
// Every system mutation the pipeline performs goes through the `Host` trait,
// so the same stages drive the real machine, a dry run, or a test double.

pub mod dry_run;
pub mod local;
pub mod os_release;

pub use dry_run::DryRunHost;
pub use local::LocalHost;
pub use os_release::OsRelease;

use crate::error::ProvisionError;
use anyhow::Result;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// A single external command with its arguments, environment and stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
    pub read_only: bool,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(|arg| arg.as_ref().to_string()).collect(),
            env: Vec::new(),
            stdin: None,
            read_only: false,
        }
    }

    /// `apt-get` with prompts suppressed
    pub fn apt_get<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new("apt-get", args).env("DEBIAN_FRONTEND", "noninteractive")
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Mark the command as a probe with no side effects
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Command line as shown to the operator and in logs
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Effects the provisioning stages need from the machine they run on.
pub trait Host {
    /// Run a command to completion; a non-zero exit is an error
    fn run(&mut self, invocation: &Invocation) -> Result<()>;

    /// Run a command and return its stdout
    fn capture(&mut self, invocation: &Invocation) -> Result<String>;

    /// Read a file, `None` when it does not exist
    fn read_file(&self, path: &Path) -> Result<Option<String>>;

    fn write_file(&mut self, path: &Path, contents: &str) -> Result<()>;

    fn copy_file(&mut self, from: &Path, to: &Path) -> Result<()>;

    fn create_dir_all(&mut self, path: &Path) -> Result<()>;

    fn effective_uid(&self) -> Result<u32>;

    fn sleep(&mut self, duration: Duration);
}

/// Abort unless running with administrative rights
pub fn require_elevated_privileges(host: &dyn Host) -> Result<()> {
    let uid = host.effective_uid()?;
    log::debug!("effective uid: {}", uid);
    if uid != 0 {
        return Err(ProvisionError::Privilege.into());
    }
    Ok(())
}

/// Effective uid from the contents of `/proc/self/status`
pub fn parse_effective_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find(|line| line.starts_with("Uid:"))
        .and_then(|line| line.split_whitespace().nth(2))
        .and_then(|value| value.parse::<u32>().ok())
}
