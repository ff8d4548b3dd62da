//! Stable process exit codes.

/// The agent reported `success == true`.
pub const OK: i32 = 0;
/// The agent reported failure, or a usage/fatal error occurred.
pub const FAILED: i32 = 1;
/// Interrupted by SIGINT (128 + 2).
pub const INTERRUPTED: i32 = 130;
