use serde_json::Value;

// Flattens a JSON value into its display string. Arrays keep their
// non-empty elements, joined by `", "`.
pub fn normalize_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => normalize_str(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(normalize_value)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => normalize_str(&value.to_string()),
    }
}

pub fn normalize_str(value: &str) -> String {
    value.trim().to_string()
}

// Maps the usual checkbox spellings onto `YES`/`NO`. Anything else comes
// back trimmed but otherwise untouched.
pub fn to_yes_no(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" | "on" | "checked" => "YES".to_string(),
        "no" | "false" | "0" | "off" => "NO".to_string(),
        _ => trimmed.to_string(),
    }
}

// `YYYY-MM-DD` becomes `MM/DD/YYYY`. Other shapes are returned as-is.
pub fn format_date(value: &str) -> String {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    let is_iso = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(idx, b)| idx == 4 || idx == 7 || b.is_ascii_digit());
    if !is_iso {
        return trimmed.to_string();
    }
    format!("{}/{}/{}", &trimmed[5..7], &trimmed[8..10], &trimmed[0..4])
}

pub fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_value_flattens_json_shapes() {
        assert_eq!(normalize_value(&json!(["a", "", "b "])), "a, b");
        assert_eq!(normalize_value(&Value::Null), "");
        assert_eq!(normalize_value(&json!("  padded  ")), "padded");
        assert_eq!(normalize_value(&json!(250000)), "250000");
        assert_eq!(normalize_value(&json!(12.5)), "12.5");
        assert_eq!(normalize_value(&json!(true)), "true");
        assert_eq!(normalize_value(&json!([["x", null], "  ", 3])), "x, 3");
    }

    #[test]
    fn yes_no_coercion() {
        assert_eq!(to_yes_no("On"), "YES");
        assert_eq!(to_yes_no("checked"), "YES");
        assert_eq!(to_yes_no(" TRUE "), "YES");
        assert_eq!(to_yes_no("0"), "NO");
        assert_eq!(to_yes_no("off"), "NO");
        assert_eq!(to_yes_no(""), "");
        assert_eq!(to_yes_no("Maybe"), "Maybe");
        assert_eq!(to_yes_no("  Pending review "), "Pending review");
    }

    #[test]
    fn format_date_rewrites_only_iso_dates() {
        assert_eq!(format_date("2024-03-05"), "03/05/2024");
        assert_eq!(format_date(" 1999-12-31 "), "12/31/1999");
        assert_eq!(format_date("March 5"), "March 5");
        assert_eq!(format_date("2024-3-5"), "2024-3-5");
        assert_eq!(format_date("2024-03-05T10:00"), "2024-03-05T10:00");
        assert_eq!(format_date("abcd-ef-gh"), "abcd-ef-gh");
        assert_eq!(format_date("２０２４-03-05"), "２０２４-03-05");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn join_name_collapses_empty_parts() {
        assert_eq!(join_name(" Ada ", "Lovelace"), "Ada Lovelace");
        assert_eq!(join_name("", "Lovelace"), "Lovelace");
        assert_eq!(join_name("Ada", "  "), "Ada");
        assert_eq!(join_name("", ""), "");
    }
}
