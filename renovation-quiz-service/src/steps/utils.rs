use serde_json::Value;

/// Keystroke filter for whole-number inputs: digits only, or cleared.
pub fn is_digit_input(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            s.is_empty() || (s.chars().all(|c| c.is_ascii_digit()) && s.parse::<u64>().is_ok())
        }
        Value::Number(n) => n.is_u64(),
        _ => false,
    }
}

/// Filter for fields whose value must be one of `options`, or cleared.
pub fn is_choice_input(value: &Value, options: &[&str]) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || options.contains(&s.as_str()),
        _ => false,
    }
}

/// Read a whole number from a draft field. Empty or absent reads as `None`.
pub fn whole_number(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::String(s) if !s.is_empty() => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Read a non-empty string from a draft field.
pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}
