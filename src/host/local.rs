use crate::error::ProvisionError;
use crate::host::{parse_effective_uid, Host, Invocation};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// The machine this process runs on.
///
/// Commands inherit stderr so the tool's own diagnostics reach the operator
/// unchanged; `run` also inherits stdout.
pub struct LocalHost;

impl LocalHost {
    pub fn new() -> Self {
        LocalHost
    }

    fn command(invocation: &Invocation) -> Command {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        command.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        command
    }

    fn execute(invocation: &Invocation, stdout: Stdio) -> Result<std::process::Output> {
        log::debug!("exec: {}", invocation);
        let mut child = Self::command(invocation)
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ProvisionError::Spawn {
                command: invocation.command_line(),
                source,
            })?;

        if let Some(input) = &invocation.stdin {
            let mut pipe = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("Failed to open stdin for {}", invocation.program))?;
            pipe.write_all(input.as_bytes())
                .with_context(|| format!("Failed to write stdin of {}", invocation.program))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for {}", invocation.program))?;

        if !output.status.success() {
            log::debug!("{} exited with {:?}", invocation.program, output.status.code());
            return Err(ProvisionError::ExternalCommand {
                command: invocation.command_line(),
                code: output.status.code(),
            }
            .into());
        }
        Ok(output)
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for LocalHost {
    fn run(&mut self, invocation: &Invocation) -> Result<()> {
        Self::execute(invocation, Stdio::inherit())?;
        Ok(())
    }

    fn capture(&mut self, invocation: &Invocation) -> Result<String> {
        let output = Self::execute(invocation, Stdio::piped())?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> Result<()> {
        log::debug!("write: {} ({} bytes)", path.display(), contents.len());
        fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> Result<()> {
        log::debug!("copy: {} -> {}", from.display(), to.display());
        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
        Ok(())
    }

    fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))
    }

    fn effective_uid(&self) -> Result<u32> {
        let status = fs::read_to_string("/proc/self/status")
            .context("Failed to read /proc/self/status")?;
        parse_effective_uid(&status)
            .ok_or_else(|| anyhow!("No Uid line in /proc/self/status"))
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture_stdout() {
        let mut host = LocalHost::new();
        let output = host.capture(&Invocation::new("echo", ["hello"])).unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn test_stdin_is_forwarded() {
        let mut host = LocalHost::new();
        let output = host
            .capture(&Invocation::new("cat", Vec::<String>::new()).stdin("piped text"))
            .unwrap();
        assert_eq!(output, "piped text");
    }

    #[test]
    fn test_failure_carries_exit_code() {
        let mut host = LocalHost::new();
        let err = host
            .run(&Invocation::new("sh", ["-c", "exit 3"]))
            .unwrap_err();
        match err.downcast_ref::<ProvisionError>() {
            Some(ProvisionError::ExternalCommand { code, .. }) => assert_eq!(*code, Some(3)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut host = LocalHost::new();
        let err = host
            .run(&Invocation::new("hostprep-no-such-program", Vec::<String>::new()))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProvisionError>(),
            Some(ProvisionError::Spawn { .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("daemon.json");
        let mut host = LocalHost::new();

        assert_eq!(host.read_file(&path).unwrap(), None);
        host.create_dir_all(path.parent().unwrap()).unwrap();
        host.write_file(&path, "{}\n").unwrap();
        assert_eq!(host.read_file(&path).unwrap().as_deref(), Some("{}\n"));
    }

    #[test]
    fn test_effective_uid_readable() {
        let host = LocalHost::new();
        assert!(host.effective_uid().is_ok());
    }
}
