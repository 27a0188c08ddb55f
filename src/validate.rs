pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

pub fn valid_name(raw: Option<&str>) -> bool {
    raw.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Parses a raw form value into a score. Surrounding whitespace is ignored;
/// anything that is not a finite number in `[0, 100]` yields `None`.
pub fn parse_score(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    if !v.is_finite() {
        return None;
    }
    if (MIN_SCORE..=MAX_SCORE).contains(&v) {
        Some(v)
    } else {
        None
    }
}

pub fn valid_score(raw: &str) -> bool {
    parse_score(raw).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_requires_visible_text() {
        assert!(!valid_name(None));
        assert!(!valid_name(Some("")));
        assert!(!valid_name(Some("   \t ")));
        assert!(valid_name(Some("Alice")));
        assert!(valid_name(Some("  Mary Ann  ")));
    }

    #[test]
    fn score_accepts_closed_range() {
        assert!(valid_score("0"));
        assert!(valid_score("100"));
        assert!(valid_score("67.5"));
        assert!(valid_score(" 42 "));
        assert!(valid_score("99.999"));
    }

    #[test]
    fn score_rejects_garbage_and_out_of_range() {
        assert!(!valid_score(""));
        assert!(!valid_score("   "));
        assert!(!valid_score("abc"));
        assert!(!valid_score("-1"));
        assert!(!valid_score("-0.01"));
        assert!(!valid_score("100.01"));
        assert!(!valid_score("NaN"));
        assert!(!valid_score("inf"));
        assert!(!valid_score("1e400"));
    }

    #[test]
    fn parse_score_returns_value() {
        assert_eq!(parse_score("85"), Some(85.0));
        assert_eq!(parse_score("12.25"), Some(12.25));
        assert_eq!(parse_score("101"), None);
    }
}
