/// Idle per-student locks are pruned once the lock map grows past this size.
pub const MAX_IDLE_USER_LOCKS: usize = 1000;

pub const MAX_CAS_RETRIES: u32 = 20;

/// Expected answer time assumed when an answer event omits it.
pub const DEFAULT_EXPECTED_TIME_SECS: f64 = 60.0;

/// Number of ranked questions the replay harness prints.
pub const DEFAULT_PREVIEW_SIZE: usize = 3;
