//! Time and duration utilities.

use chrono::{DateTime, NaiveDateTime, Utc};
use genesis_types::{GenesisError, Result};

/// Parse a certificate validity period of the form `<posint>[ymdh]` into
/// whole days.
///
/// Years count as 365 days and months as 30; hours round up to a full day
/// since the store issues day-granular TTLs. A bare integer is taken as
/// days.
pub fn parse_valid_for(s: &str) -> Result<u32> {
    let s = s.trim();
    if s.is_empty() {
        return Err(GenesisError::Secret("Empty validity period".to_string()));
    }

    let (digits, unit) = match s.chars().last().unwrap() {
        c @ ('y' | 'm' | 'd' | 'h') => (&s[..s.len() - 1], Some(c)),
        c if c.is_ascii_digit() => (s, None),
        c => {
            return Err(GenesisError::Secret(format!(
                "Invalid validity period '{}': unknown unit '{}'",
                s, c
            )))
        }
    };

    let n: u32 = digits.parse().map_err(|_| {
        GenesisError::Secret(format!("Invalid validity period '{}': expected <posint>[ymdh]", s))
    })?;
    if n == 0 {
        return Err(GenesisError::Secret(format!(
            "Invalid validity period '{}': must be positive",
            s
        )));
    }

    Ok(match unit {
        Some('y') => n * 365,
        Some('m') => n * 30,
        Some('h') => n.div_ceil(24),
        _ => n,
    })
}

/// Parse an expiry date out of a store renewal report.
///
/// Accepts RFC3339, openssl's `notAfter` style (`Mar 14 12:00:00 2027 GMT`),
/// and a plain `YYYY-MM-DD HH:MM:SS` timestamp, all treated as UTC.
pub fn parse_expiry(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%b %e %H:%M:%S %Y GMT", "%b %e %H:%M:%S %Y UTC", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    Err(GenesisError::Validation(format!("Unparseable expiry date '{}'", s)))
}

/// Whole days from now until the given instant; negative if it has passed.
pub fn days_until(when: DateTime<Utc>) -> i64 {
    when.signed_duration_since(Utc::now()).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_for_units() {
        assert_eq!(parse_valid_for("2y").unwrap(), 730);
        assert_eq!(parse_valid_for("3m").unwrap(), 90);
        assert_eq!(parse_valid_for("90d").unwrap(), 90);
        assert_eq!(parse_valid_for("36h").unwrap(), 2);
        assert_eq!(parse_valid_for("12h").unwrap(), 1);
        assert_eq!(parse_valid_for("45").unwrap(), 45);
    }

    #[test]
    fn test_parse_valid_for_rejects_garbage() {
        assert!(parse_valid_for("").is_err());
        assert!(parse_valid_for("0d").is_err());
        assert!(parse_valid_for("-3d").is_err());
        assert!(parse_valid_for("3w").is_err());
        assert!(parse_valid_for("yd").is_err());
    }

    #[test]
    fn test_parse_expiry_formats() {
        assert!(parse_expiry("2027-03-14T12:00:00Z").is_ok());
        assert!(parse_expiry("Mar 14 12:00:00 2027 GMT").is_ok());
        assert!(parse_expiry("2027-03-14 12:00:00").is_ok());
        assert!(parse_expiry("not a date").is_err());
    }

    #[test]
    fn test_days_until() {
        use chrono::Duration;

        let future = Utc::now() + Duration::days(45);
        let days = days_until(future);
        assert!((44..=45).contains(&days));

        let past = Utc::now() - Duration::days(2);
        assert!(days_until(past) < 0);
    }
}
