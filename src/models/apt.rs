// Package repository definitions written under sources.list.d

use std::path::{Path, PathBuf};

/// A deb source file owned by this tool.
///
/// Files are always written whole, so a second run replaces the entry
/// instead of appending a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptSource {
    pub path: PathBuf,
    pub contents: String,
}

impl AptSource {
    /// Docker CE repository for the host's architecture and release codename
    pub fn docker(sources_dir: &Path, keyring: &Path, arch: &str, codename: &str) -> Self {
        Self {
            path: sources_dir.join("docker.list"),
            contents: format!(
                "deb [arch={} signed-by={}] https://download.docker.com/linux/ubuntu {} stable\n",
                arch.trim(),
                keyring.display(),
                codename
            ),
        }
    }

    /// NVIDIA container toolkit repository, built from the vendor's list file
    pub fn nvidia_toolkit(sources_dir: &Path, keyring: &Path, vendor_list: &str) -> Self {
        Self {
            path: sources_dir.join("nvidia-container-toolkit.list"),
            contents: signed_by_rewrite(vendor_list, keyring),
        }
    }
}

/// Pin every `deb https://` line to a keyring via `signed-by`, replacing the
/// deprecated apt-key trust model. Lines already carrying options are kept.
pub fn signed_by_rewrite(list: &str, keyring: &Path) -> String {
    let mut output = String::new();
    for line in list.lines() {
        match line.trim_start().strip_prefix("deb https://") {
            Some(rest) => {
                output.push_str(&format!("deb [signed-by={}] https://{}", keyring.display(), rest));
            }
            None => output.push_str(line),
        }
        output.push('\n');
    }
    output
}
