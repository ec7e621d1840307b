// Guard constants (ADR: No magic values)
use std::time::Duration;

/// Namespace prefix of every internally built guard unit name.
/// User-declared resources never carry it.
pub const GUARD_UNIT_PREFIX: &str = "scriptguard";

/// The single exit status a guard unit treats as success
pub const GUARD_SUCCESS_EXIT_CODE: i32 = 0;

/// Environment variable carrying the word-size marker of the guard process
pub const PROCESSOR_ARCHITECTURE_VAR: &str = "PROCESSOR_ARCHITECTURE";

/// Grace period between SIGTERM and SIGKILL when a guard exceeds its timeout
pub const TERMINATION_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// How long captured output may keep draining after the guard process exited.
/// Background children that inherited the pipes do not hold up the result.
pub const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(100);
