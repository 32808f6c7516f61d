// Error reporting and exit codes

use crate::error::ProvisionError;

/// Exit code for internal errors that are not a ProvisionError
pub const INTERNAL_ERROR_CODE: i32 = 2;

/// Map an error from `run` to the process exit code.
/// A failed external command exits with that command's own status.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<ProvisionError>() {
        Some(provision_error) => provision_error.exit_code(),
        None => INTERNAL_ERROR_CODE,
    }
}

/// Render an error and its cause chain for stderr
pub fn format_error_chain(error: &anyhow::Error) -> String {
    let mut message = format!("Error: {}", error);
    let mut causes = error.chain().skip(1).peekable();
    if causes.peek().is_some() {
        message.push_str("\n\nCaused by:");
        for (indent, cause) in causes.enumerate() {
            message.push_str(&format!("\n{:indent$}  {}", "", cause, indent = indent));
        }
    }
    message
}
