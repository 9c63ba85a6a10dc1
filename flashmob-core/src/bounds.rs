use std::ops::RangeInclusive;

use thiserror::Error;

/// Allowed session durations, in minutes
pub const DURATION_MINUTES: RangeInclusive<i32> = 30..=180;
/// Allowed values for the participant cap of a session
pub const MAX_PARTICIPANTS: RangeInclusive<i32> = 3..=8;
/// The longest message body accepted, counted in characters after trimming
pub const MESSAGE_MAX_CHARS: usize = 500;
/// The largest search radius accepted, in miles
pub const MAX_SEARCH_RADIUS: f64 = 500.0;

#[derive(Debug, Error, PartialEq)]
pub enum BoundsError {
    #[error("Duration must be between 30 and 180 minutes, got {0}")]
    Duration(i32),
    #[error("Max participants must be between 3 and 8, got {0}")]
    MaxParticipants(i32),
    #[error("Search radius must be between 0 and 500 miles, got {0}")]
    Radius(f64),
    #[error("Max distance must be more than 0 and at most 500 miles, got {0}")]
    MaxDistance(f64),
    #[error("Message cannot be empty")]
    EmptyMessage,
    #[error("Message cannot be longer than 500 characters, got {0}")]
    MessageTooLong(usize),
}

pub fn validate_duration(minutes: i32) -> Result<i32, BoundsError> {
    DURATION_MINUTES
        .contains(&minutes)
        .then_some(minutes)
        .ok_or(BoundsError::Duration(minutes))
}

pub fn validate_max_participants(count: i32) -> Result<i32, BoundsError> {
    MAX_PARTICIPANTS
        .contains(&count)
        .then_some(count)
        .ok_or(BoundsError::MaxParticipants(count))
}

/// NaN and infinite radii are refused along with out-of-range ones.
pub fn validate_radius(miles: f64) -> Result<f64, BoundsError> {
    if miles.is_finite() && (0.0..=MAX_SEARCH_RADIUS).contains(&miles) {
        Ok(miles)
    } else {
        Err(BoundsError::Radius(miles))
    }
}

/// The distance a user is willing to travel can't be zero, unlike a search radius
pub fn validate_max_distance(miles: f64) -> Result<f64, BoundsError> {
    match validate_radius(miles) {
        Ok(miles) if miles > 0. => Ok(miles),
        _ => Err(BoundsError::MaxDistance(miles)),
    }
}

/// Trims a message body and checks its length.
pub fn message_body(body: &str) -> Result<&str, BoundsError> {
    let trimmed = body.trim();
    let length = trimmed.chars().count();

    if length == 0 {
        return Err(BoundsError::EmptyMessage);
    }

    if length > MESSAGE_MAX_CHARS {
        return Err(BoundsError::MessageTooLong(length));
    }

    Ok(trimmed)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_session_bounds() {
        assert_eq!(validate_duration(30), Ok(30));
        assert_eq!(validate_duration(180), Ok(180));
        assert_eq!(validate_duration(29), Err(BoundsError::Duration(29)));
        assert_eq!(validate_duration(181), Err(BoundsError::Duration(181)));

        assert_eq!(validate_max_participants(3), Ok(3));
        assert_eq!(validate_max_participants(8), Ok(8));
        assert!(validate_max_participants(2).is_err());
        assert!(validate_max_participants(9).is_err());
    }

    #[test]
    fn test_radius() {
        assert_eq!(validate_radius(0.), Ok(0.));
        assert_eq!(validate_radius(10.), Ok(10.));
        assert!(validate_radius(-1.).is_err());
        assert!(validate_radius(f64::NAN).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
        assert!(validate_radius(500.1).is_err());

        assert_eq!(validate_max_distance(500.), Ok(500.));
        assert_eq!(validate_max_distance(0.), Err(BoundsError::MaxDistance(0.)));
    }

    #[test]
    fn test_message_body() {
        assert_eq!(message_body("  hello  "), Ok("hello"));
        assert_eq!(message_body("   \n\t"), Err(BoundsError::EmptyMessage));
        assert_eq!(message_body(""), Err(BoundsError::EmptyMessage));

        let exact = format!("  {}  ", "a".repeat(500));
        assert_eq!(message_body(&exact).map(str::len), Ok(500));

        let too_long = "a".repeat(501);
        assert_eq!(
            message_body(&too_long),
            Err(BoundsError::MessageTooLong(501))
        );
    }

    #[test]
    fn test_message_length_counts_characters() {
        // 500 multi-byte characters are still 500 characters
        let accents = "é".repeat(500);
        assert!(message_body(&accents).is_ok());
    }
}
