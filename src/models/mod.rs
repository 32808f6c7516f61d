// Domain models for the provisioning run
// Process-lifetime values; nothing here is persisted except through the
// artifacts the stages write.

pub mod state;
pub mod storage;
pub mod daemon;
pub mod apt;

pub use state::*;
pub use storage::*;
pub use daemon::*;
pub use apt::*;
