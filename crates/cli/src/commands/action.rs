use icinga2_iom::Session;
use serde_json::Value;

use super::{parse_assignments, print_json};
use crate::OutputFormat;

pub(crate) fn cmd_action(
    session: &Session,
    action: &str,
    type_name: &str,
    filter: Option<&str>,
    params: &[String],
    output: OutputFormat,
) -> Result<(), String> {
    let params = parse_assignments(params)?;
    let objects = session
        .objects(type_name, filter)
        .map_err(|e| e.to_string())?;
    let results = objects
        .action(action, Value::Object(params))
        .map_err(|e| e.to_string())?;

    match output {
        OutputFormat::Json => print_json(&Value::Array(results.to_values())),
        OutputFormat::Text => {
            if results.is_empty() {
                println!("no matching objects");
            }
            for result in results.iter() {
                let status = result
                    .get("status")
                    .ok()
                    .and_then(|s| s.as_str())
                    .unwrap_or("<no status>");
                println!("{}", status);
            }
            Ok(())
        }
    }
}
