use serde_json::Value;

/// Normalize a raw name or address string for keying and scoring.
///
/// Lowercases, expands a literal `&` to `and`, drops every character that is
/// not a word character (letter, digit, underscore) or whitespace, and
/// collapses whitespace runs to a single space. Leading/trailing whitespace
/// survives as one space, matching the keys already in circulation.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_whitespace = false;
    for ch in input.chars() {
        if ch == '&' {
            out.push_str("and");
            in_whitespace = false;
        } else if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
                in_whitespace = true;
            }
        } else if ch.is_alphanumeric() || ch == '_' {
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
            in_whitespace = false;
        }
        // Any other punctuation is dropped outright.
    }
    out
}

/// Normalize a raw table cell. Only strings carry signal; numbers, nulls,
/// booleans and nested values normalize to the empty string rather than
/// failing the build.
pub fn normalize_value(value: &Value) -> String {
    match value {
        Value::String(s) => normalize(s),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_case_and_ampersand() {
        assert_eq!(normalize("ABC & Co."), normalize("abc and co"));
        assert_eq!(normalize("A&B"), "aandb");
    }

    #[test]
    fn test_normalize_punctuation_and_whitespace() {
        assert_eq!(normalize("Acme   Construction,\tInc."), "acme construction inc");
        assert_eq!(normalize("10 Main St, Queens NY"), "10 main st queens ny");
    }

    #[test]
    fn test_normalize_keeps_boundary_space() {
        // Collapse only; no trim.
        assert_eq!(normalize("  Acme  Co  "), " acme co ");
    }

    #[test]
    fn test_normalize_idempotent() {
        for s in ["  J&J Contracting, LLC. ", "ÉCOLE & FILS", "", "   ", "plain"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_normalize_value_non_strings() {
        assert_eq!(normalize_value(&json!(null)), "");
        assert_eq!(normalize_value(&json!(42)), "");
        assert_eq!(normalize_value(&json!(true)), "");
        assert_eq!(normalize_value(&json!(["a"])), "");
        assert_eq!(normalize_value(&json!("A & B")), "a and b");
    }
}
