use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaxAgeError {
    #[error("Unknown time unit in max age {0:?} (use one of d, w, m, y)")]
    UnknownUnit(String),
    #[error("Max age {0:?} must start with an integer, for example 1m = 1 month or 15w = 15 weeks")]
    InvalidMagnitude(String),
}

/// How old the last OK observation may be before a file is checked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxAge {
    days: i64,
}

impl MaxAge {
    #[allow(dead_code)]
    pub fn from_days(days: i64) -> Self {
        MaxAge { days }
    }

    pub fn days(&self) -> i64 {
        self.days
    }
}

fn days_per_unit(unit: char) -> Option<i64> {
    match unit.to_ascii_lowercase() {
        'd' => Some(1),
        'w' => Some(7),
        'm' => Some(30),
        'y' => Some(365),
        _ => None,
    }
}

impl FromStr for MaxAge {
    type Err = MaxAgeError;

    /// Parses `<integer><unit>` such as `1m` or `15w`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = s
            .chars()
            .last()
            .ok_or_else(|| MaxAgeError::UnknownUnit(s.to_string()))?;
        let per_unit = days_per_unit(unit).ok_or_else(|| MaxAgeError::UnknownUnit(s.to_string()))?;

        let magnitude = &s[..s.len() - unit.len_utf8()];
        if magnitude.is_empty() || !magnitude.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MaxAgeError::InvalidMagnitude(s.to_string()));
        }

        let days = magnitude
            .parse::<i64>()
            .ok()
            .and_then(|n| n.checked_mul(per_unit))
            .ok_or_else(|| MaxAgeError::InvalidMagnitude(s.to_string()))?;

        Ok(MaxAge { days })
    }
}

impl fmt::Display for MaxAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(s: &str) -> i64 {
        s.parse::<MaxAge>().unwrap().days()
    }

    #[test]
    fn test_units() {
        assert_eq!(days("3d"), 3);
        assert_eq!(days("15w"), 105);
        assert_eq!(days("1m"), 30);
        assert_eq!(days("2y"), 730);
        assert_eq!(days("0d"), 0);
    }

    #[test]
    fn test_unit_is_case_insensitive() {
        assert_eq!(days("2W"), 14);
    }

    #[test]
    fn test_missing_unit() {
        assert_eq!(
            "3".parse::<MaxAge>(),
            Err(MaxAgeError::UnknownUnit("3".to_string()))
        );
    }

    #[test]
    fn test_unit_first() {
        assert_eq!(
            "x3".parse::<MaxAge>(),
            Err(MaxAgeError::UnknownUnit("x3".to_string()))
        );
    }

    #[test]
    fn test_bad_magnitude() {
        for input in ["d", "-1d", "1.5w", " 1m", "1xm"] {
            assert_eq!(
                input.parse::<MaxAge>(),
                Err(MaxAgeError::InvalidMagnitude(input.to_string())),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_empty() {
        assert!(matches!(
            "".parse::<MaxAge>(),
            Err(MaxAgeError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_overflow_is_rejected() {
        assert!(matches!(
            "99999999999999999999y".parse::<MaxAge>(),
            Err(MaxAgeError::InvalidMagnitude(_))
        ));
        assert!(matches!(
            "9223372036854775807y".parse::<MaxAge>(),
            Err(MaxAgeError::InvalidMagnitude(_))
        ));
    }
}
