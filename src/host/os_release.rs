use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Fields of `/etc/os-release` used to pick vendor repositories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    values: HashMap<String, String>,
}

impl OsRelease {
    pub fn parse(data: &str) -> Self {
        let mut values = HashMap::new();
        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), trim_os_value(value));
            }
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Distribution identifier as the NVIDIA repositories expect it, e.g. `ubuntu22.04`
    pub fn distribution(&self) -> Result<String> {
        let id = self.get("ID").ok_or_else(|| anyhow!("os-release has no ID"))?;
        let version = self
            .get("VERSION_ID")
            .ok_or_else(|| anyhow!("os-release has no VERSION_ID"))?;
        Ok(format!("{}{}", id, version))
    }

    /// Release codename, e.g. `jammy`
    pub fn codename(&self) -> Result<String> {
        self.get("VERSION_CODENAME")
            .or_else(|| self.get("UBUNTU_CODENAME"))
            .map(str::to_string)
            .ok_or_else(|| anyhow!("os-release has no VERSION_CODENAME"))
    }

    pub fn pretty_name(&self) -> &str {
        self.get("PRETTY_NAME").or_else(|| self.get("NAME")).unwrap_or("unknown")
    }
}

fn trim_os_value(value: &str) -> String {
    value.trim().trim_matches('"').trim_matches('\'').to_string()
}
