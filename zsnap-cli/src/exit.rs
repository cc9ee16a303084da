//! Exit codes for the zsnap CLI.

use crate::commands::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments.
    pub const INVALID_ARGS: i32 = 1;
    /// Configuration unreadable, malformed or invalid.
    pub const CONFIG_ERROR: i32 = 2;
    /// A `zfs` or `zpool` call failed.
    pub const ZFS_ERROR: i32 = 3;
    /// Some filesystems failed, the rest were processed.
    pub const PARTIAL_FAILURE: i32 = 4;
    /// A managed snapshot name could not be parsed.
    pub const PARSE_ERROR: i32 = 5;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::ConfigLoad(_) | CommandError::Config(_) => codes::CONFIG_ERROR,
        CommandError::Policy(e) if e.is_parse_error() => codes::PARSE_ERROR,
        CommandError::Policy(_) | CommandError::PoolStatus(_) => codes::ZFS_ERROR,
        CommandError::PartialFailure { .. } => codes::PARTIAL_FAILURE,
        CommandError::Output(_) => codes::ZFS_ERROR,
    }
}
