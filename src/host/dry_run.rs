use crate::cli::output::Palette;
use crate::host::{Host, Invocation, LocalHost};
use anyhow::Result;
use std::path::Path;
use std::time::Duration;

/// Placeholder returned for captured commands that are not safe to run
pub const DRY_RUN_PLACEHOLDER: &str = "dry-run";

/// Prints every mutation instead of performing it.
///
/// Read-only probes still run on the real machine so device listings and
/// addresses in the preview are accurate.
pub struct DryRunHost {
    inner: LocalHost,
    palette: Palette,
}

impl DryRunHost {
    pub fn new(palette: Palette) -> Self {
        Self {
            inner: LocalHost::new(),
            palette,
        }
    }

    fn announce(&self, action: &str) {
        println!("{}", self.palette.dim(&format!("[dry-run] {}", action)));
    }
}

impl Host for DryRunHost {
    fn run(&mut self, invocation: &Invocation) -> Result<()> {
        self.announce(&invocation.command_line());
        Ok(())
    }

    fn capture(&mut self, invocation: &Invocation) -> Result<String> {
        if invocation.read_only {
            return self.inner.capture(invocation);
        }
        self.announce(&invocation.command_line());
        Ok(DRY_RUN_PLACEHOLDER.to_string())
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>> {
        self.inner.read_file(path)
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> Result<()> {
        self.announce(&format!("write {}:", path.display()));
        for line in contents.lines() {
            println!("    {}", line);
        }
        Ok(())
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> Result<()> {
        self.announce(&format!("cp {} {}", from.display(), to.display()));
        Ok(())
    }

    fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        self.announce(&format!("mkdir -p {}", path.display()));
        Ok(())
    }

    fn effective_uid(&self) -> Result<u32> {
        self.inner.effective_uid()
    }

    fn sleep(&mut self, duration: Duration) {
        self.announce(&format!("sleep {}", duration.as_secs()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mutations_are_not_performed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fstab");
        let mut host = DryRunHost::new(Palette::plain());

        host.write_file(&path, "UUID=x /mnt ext4 defaults 0 2\n").unwrap();
        host.create_dir_all(&temp_dir.path().join("mnt")).unwrap();
        host.run(&Invocation::new("sh", ["-c", "exit 1"])).unwrap();

        assert!(!path.exists());
        assert!(!temp_dir.path().join("mnt").exists());
    }

    #[test]
    fn test_capture_placeholder_unless_read_only() {
        let mut host = DryRunHost::new(Palette::plain());
        let blkid = Invocation::new("blkid", ["-s", "UUID", "-o", "value", "/dev/sdb1"]);
        assert_eq!(host.capture(&blkid).unwrap(), DRY_RUN_PLACEHOLDER);

        let probe = Invocation::new("echo", ["probe"]).read_only();
        assert_eq!(host.capture(&probe).unwrap().trim(), "probe");
    }
}
