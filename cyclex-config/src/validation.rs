//! Custom validation functions for configuration.

use std::collections::HashSet;

use validator::ValidationError;

use crate::schedule::SubtaskConfig;

/// Overrun handling modes accepted in `schedule.overrun`.
pub const OVERRUN_POLICIES: [&str; 3] = ["ignore", "warn", "abort"];

/// Subtask bodies accepted in `schedule.subtasks[].kind`.
pub const SUBTASK_KINDS: [&str; 2] = ["noop", "spin"];

/// Validate overrun policy name.
pub fn validate_overrun_policy(policy: &str) -> Result<(), ValidationError> {
    if OVERRUN_POLICIES.contains(&policy.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_overrun_policy"))
    }
}

/// Validate subtask kind.
pub fn validate_subtask_kind(kind: &str) -> Result<(), ValidationError> {
    if SUBTASK_KINDS.contains(&kind.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_subtask_kind"))
    }
}

/// Subtask names end up in log fields and thread-local spans; keep them short
/// and printable.
pub fn validate_subtask_name(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= 32
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_subtask_name"))
    }
}

/// Reject tables that reuse a subtask name.
pub fn validate_unique_names(subtasks: &[SubtaskConfig]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(subtasks.len());
    if subtasks.iter().all(|s| seen.insert(s.name.as_str())) {
        Ok(())
    } else {
        Err(ValidationError::new("duplicate_subtask_name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrun_policy_names() {
        assert!(validate_overrun_policy("warn").is_ok());
        assert!(validate_overrun_policy("ABORT").is_ok());
        assert!(validate_overrun_policy("skip").is_err());
    }

    #[test]
    fn test_subtask_names() {
        assert!(validate_subtask_name("sensor_read-1").is_ok());
        assert!(validate_subtask_name("").is_err());
        assert!(validate_subtask_name("has space").is_err());
        assert!(validate_subtask_name(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let task = |name: &str| SubtaskConfig {
            name: name.into(),
            interval_us: 10,
            kind: "noop".into(),
            busy_us: 0,
        };
        assert!(validate_unique_names(&[task("a"), task("b")]).is_ok());
        assert!(validate_unique_names(&[task("a"), task("a")]).is_err());
    }
}
