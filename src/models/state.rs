use crate::error::ProvisionError;
use std::fmt;

/// Named slots of pipeline state that stages produce and consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    StorageConfigured,
    GpuConfigured,
    RebootRequired,
    ServerAddress,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::StorageConfigured => "storage_configured",
            Flag::GpuConfigured => "gpu_configured",
            Flag::RebootRequired => "reboot_required",
            Flag::ServerAddress => "server_address",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-stage state for a single run.
///
/// Every slot starts empty and may be written once. Reading an empty slot is
/// an error rather than a silent `false`, so a stage ordered before its
/// producer fails loudly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineState {
    storage_configured: Option<bool>,
    gpu_configured: Option<bool>,
    reboot_required: Option<bool>,
    server_address: Option<String>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_storage_configured(&mut self, value: bool) -> Result<(), ProvisionError> {
        set_once(&mut self.storage_configured, value, Flag::StorageConfigured)
    }

    pub fn record_gpu_configured(&mut self, value: bool) -> Result<(), ProvisionError> {
        set_once(&mut self.gpu_configured, value, Flag::GpuConfigured)
    }

    pub fn record_reboot_required(&mut self, value: bool) -> Result<(), ProvisionError> {
        set_once(&mut self.reboot_required, value, Flag::RebootRequired)
    }

    pub fn record_server_address(&mut self, value: impl Into<String>) -> Result<(), ProvisionError> {
        set_once(&mut self.server_address, value.into(), Flag::ServerAddress)
    }

    pub fn storage_configured(&self) -> Result<bool, ProvisionError> {
        self.storage_configured.ok_or(ProvisionError::FlagUnset(Flag::StorageConfigured))
    }

    pub fn gpu_configured(&self) -> Result<bool, ProvisionError> {
        self.gpu_configured.ok_or(ProvisionError::FlagUnset(Flag::GpuConfigured))
    }

    pub fn reboot_required(&self) -> Result<bool, ProvisionError> {
        self.reboot_required.ok_or(ProvisionError::FlagUnset(Flag::RebootRequired))
    }

    pub fn server_address(&self) -> Result<&str, ProvisionError> {
        self.server_address
            .as_deref()
            .ok_or(ProvisionError::FlagUnset(Flag::ServerAddress))
    }

    /// Whether a slot has been written, without failing on empty slots
    pub fn is_recorded(&self, flag: Flag) -> bool {
        match flag {
            Flag::StorageConfigured => self.storage_configured.is_some(),
            Flag::GpuConfigured => self.gpu_configured.is_some(),
            Flag::RebootRequired => self.reboot_required.is_some(),
            Flag::ServerAddress => self.server_address.is_some(),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, flag: Flag) -> Result<(), ProvisionError> {
    if slot.is_some() {
        return Err(ProvisionError::FlagAlreadySet(flag));
    }
    *slot = Some(value);
    Ok(())
}
