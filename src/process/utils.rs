use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens read as "no value", in addition to the empty field.
static MISSING_VALUE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:|#N/A|#N/A N/A|#NA|-1\.#IND|-1\.#QNAN|-NaN|-nan|1\.#IND|1\.#QNAN|<NA>|N/A|NA|NULL|NaN|None|n/a|nan|null)$",
    )
    .expect("missing-value pattern should compile")
});

/// The null pattern handed to the CSV reader.
pub fn missing_value_regex() -> Regex {
    MISSING_VALUE_PATTERN.clone()
}

pub fn is_missing(raw: &str) -> bool {
    MISSING_VALUE_PATTERN.is_match(raw)
}

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a numeric cell. Anything that is not a float is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = clean_str(raw);
    if is_missing(&cleaned) {
        return None;
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_str() {
        assert_eq!(clean_str("  Jo "), "Jo");
        assert_eq!(clean_str("\"quoted\""), "quoted");
        assert_eq!(clean_str("\""), "\"");
    }

    #[test]
    fn test_missing_tokens() {
        for token in ["", "NA", "N/A", "nan", "NULL", "None", "<NA>"] {
            assert!(is_missing(token), "{token:?} should be missing");
        }
        assert!(!is_missing("Nancy"));
        assert!(!is_missing(" "));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("150"), Some(150.0));
        assert_eq!(parse_number(" -73.95 "), Some(-73.95));
        assert_eq!(parse_number("$150.00"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }
}
