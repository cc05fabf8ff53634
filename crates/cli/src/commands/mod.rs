pub(crate) mod action;
pub(crate) mod events;
pub(crate) mod modify;
pub(crate) mod query;
pub(crate) mod types;

use serde_json::{Map, Value};

/// Splits `key=value`. The value is read as JSON and falls back to a plain
/// string, so `os=Linux` and `os="Linux"` mean the same.
pub(crate) fn parse_assignment(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected <key>=<value>, got '{}'", arg))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", arg));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

pub(crate) fn parse_assignments(args: &[String]) -> Result<Map<String, Value>, String> {
    args.iter().map(|a| parse_assignment(a)).collect()
}

pub(crate) fn print_json(value: &Value) -> Result<(), String> {
    let pretty = serde_json::to_string_pretty(value).map_err(|e| format!("serialization error: {}", e))?;
    println!("{}", pretty);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assignment_values_are_json_or_text() {
        assert_eq!(parse_assignment("vars.os=Linux").unwrap(), ("vars.os".into(), json!("Linux")));
        assert_eq!(parse_assignment("check_interval=30").unwrap().1, json!(30));
        assert_eq!(parse_assignment("groups=[\"a\"]").unwrap().1, json!(["a"]));
        assert_eq!(parse_assignment("note=a=b").unwrap().1, json!("a=b"));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }
}
