//! Standard exit codes for CLI operations

#![allow(dead_code)]

/// Success - no object graded at or below the threshold
pub const SUCCESS: i32 = 0;

/// Grading failure - at least one object graded at or below the threshold
pub const GRADE_FAILURE: i32 = 1;

/// Usage or configuration error
pub const CONFIG_ERROR: i32 = 2;
