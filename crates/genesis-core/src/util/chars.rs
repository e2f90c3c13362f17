//! Character policy expansion for random-string secrets.

use genesis_types::{GenesisError, Result};

/// Expand a character policy like `a-z0-9_` into its member characters.
///
/// `-` between two characters denotes an inclusive ASCII range; a leading or
/// trailing `-` is literal. Duplicates are collapsed, order preserved.
pub fn expand_charset(policy: &str) -> Result<Vec<char>> {
    let chars: Vec<char> = policy.chars().collect();
    let mut out: Vec<char> = Vec::new();
    let mut push = |c: char, out: &mut Vec<char>| {
        if !out.contains(&c) {
            out.push(c);
        }
    };

    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (lo, hi) = (chars[i], chars[i + 2]);
            if lo > hi {
                return Err(GenesisError::Secret(format!(
                    "Invalid character range '{}-{}' in policy '{}'",
                    lo, hi, policy
                )));
            }
            for c in lo..=hi {
                push(c, &mut out);
            }
            i += 3;
        } else {
            push(chars[i], &mut out);
            i += 1;
        }
    }

    if out.is_empty() {
        return Err(GenesisError::Secret(format!("Empty character policy '{}'", policy)));
    }
    Ok(out)
}

/// Whether every character of `value` is allowed by `policy`.
pub fn matches_charset(value: &str, policy: &str) -> Result<bool> {
    let allowed = expand_charset(policy)?;
    Ok(value.chars().all(|c| allowed.contains(&c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_ranges() {
        let set = expand_charset("a-c2").unwrap();
        assert_eq!(set, vec!['a', 'b', 'c', '2']);
    }

    #[test]
    fn test_literal_dash_at_edges() {
        let set = expand_charset("-ab-").unwrap();
        assert_eq!(set, vec!['-', 'a', 'b']);
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(expand_charset("z-a").is_err());
        assert!(expand_charset("").is_err());
    }

    #[test]
    fn test_matches_charset() {
        assert!(matches_charset("deadbeef", "a-f0-9").unwrap());
        assert!(!matches_charset("DEADBEEF", "a-f0-9").unwrap());
    }
}
