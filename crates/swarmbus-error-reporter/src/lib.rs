//! Maps [`BusError`] to user-facing messages and CLI exit codes.
//!
//! | Exit Code | Error |
//! |---|---|
//! | 1 | `PipelineUnrepairable` — general failure |
//! | 2 | `Config` — invalid CLI arguments / configuration |
//! | 10 | `Timeout` — request timed out |
//! | 11 | `NoListener` — no listener registered for the message's root/version |
//! | 12 | `CorrelationMissing` — reply has no resolvable target |
//! | 74 | `Io` — filesystem/IO failure |
//!
//! Library code returns `BusError` and never calls `std::process::exit()`;
//! only the CLI binary consults this crate.

use swarmbus_utils::BusError;

/// A process exit code. The numeric values are part of this crate's public
/// API and stable across 0.x releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const INTERNAL: ExitCode = ExitCode(1);
    pub const CLI_ARGS: ExitCode = ExitCode(2);
    pub const TIMEOUT: ExitCode = ExitCode(10);
    pub const NO_LISTENER: ExitCode = ExitCode(11);
    pub const CORRELATION_MISSING: ExitCode = ExitCode(12);
    pub const IO: ExitCode = ExitCode(74);

    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

/// Renders `err` as a one-line, human-readable message.
pub fn display_for_user(err: &BusError) -> String {
    match err {
        BusError::PipelineUnrepairable { reason } => {
            format!("the message could not be repaired into valid XML: {reason}")
        }
        BusError::Timeout => "the request timed out waiting for a reply".to_string(),
        BusError::NoListener { root, version } => {
            format!("no listener is registered for `<{root}>` version `{version}`")
        }
        BusError::CorrelationMissing => {
            "the reply has no in-reply-to target; pass --in-reply-to or use original_id".to_string()
        }
        BusError::Config(reason) => format!("configuration error: {reason}"),
        BusError::Io(e) => format!("I/O error: {e}"),
    }
}

/// Maps `err` to the process exit code the CLI should use.
pub fn to_exit_code(err: &BusError) -> ExitCode {
    match err {
        BusError::PipelineUnrepairable { .. } => ExitCode::INTERNAL,
        BusError::Timeout => ExitCode::TIMEOUT,
        BusError::NoListener { .. } => ExitCode::NO_LISTENER,
        BusError::CorrelationMissing => ExitCode::CORRELATION_MISSING,
        BusError::Config(_) => ExitCode::CLI_ARGS,
        BusError::Io(_) => ExitCode::IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_timeout_exit_code() {
        assert_eq!(to_exit_code(&BusError::Timeout), ExitCode::TIMEOUT);
    }

    #[test]
    fn no_listener_message_names_root_and_version() {
        let err = BusError::NoListener { root: "cad-task".to_string(), version: "1.0".to_string() };
        let message = display_for_user(&err);
        assert!(message.contains("cad-task"));
        assert!(message.contains("1.0"));
        assert_eq!(to_exit_code(&err), ExitCode::NO_LISTENER);
    }

    #[test]
    fn config_error_maps_to_cli_args() {
        let err = BusError::Config("bad toml".to_string());
        assert_eq!(to_exit_code(&err), ExitCode::CLI_ARGS);
    }

    #[test]
    fn correlation_missing_has_actionable_message() {
        let message = display_for_user(&BusError::CorrelationMissing);
        assert!(message.contains("in-reply-to"));
    }
}
