//! Common validation utilities.

use chrono::{DateTime, Utc};
use validator::ValidationError;

/// Validates that an incident window does not end before it starts.
pub fn validate_time_window(
    t_start: DateTime<Utc>,
    t_end: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if t_end >= t_start {
        Ok(())
    } else {
        let mut err = ValidationError::new("time_window");
        err.message = Some("End time must not be before start time".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_time_window_ordered() {
        let start = Utc::now();
        assert!(validate_time_window(start, start + Duration::minutes(5)).is_ok());
    }

    #[test]
    fn test_validate_time_window_zero_length() {
        let start = Utc::now();
        assert!(validate_time_window(start, start).is_ok());
    }

    #[test]
    fn test_validate_time_window_reversed() {
        let start = Utc::now();
        let err = validate_time_window(start, start - Duration::seconds(1)).unwrap_err();
        assert_eq!(err.code, "time_window");
    }
}
