use icinga2_api::path;
use icinga2_iom::Session;
use serde_json::Value;

use super::print_json;
use crate::OutputFormat;

pub(crate) fn cmd_query(
    session: &Session,
    type_name: &str,
    filter: Option<&str>,
    attrs: &[String],
    output: OutputFormat,
) -> Result<(), String> {
    let mut objects = session
        .objects(type_name, filter)
        .map_err(|e| e.to_string())?;
    if !attrs.is_empty() {
        let selected: Vec<&str> = attrs.iter().map(String::as_str).collect();
        objects = objects.select(&selected).map_err(|e| e.to_string())?;
    }
    let results = objects.results().map_err(|e| e.to_string())?;

    match output {
        OutputFormat::Json => print_json(&Value::Array(results.to_values())),
        OutputFormat::Text => {
            let keys: Vec<(&String, String)> = attrs
                .iter()
                .map(|a| (a, path::join(&objects.parse_attrs(a))))
                .collect();
            for result in results.iter() {
                println!("{}", result.name().unwrap_or("<unnamed>"));
                for (attr, key) in &keys {
                    match result.get(key) {
                        Ok(value) => println!("  {} = {}", attr, value),
                        Err(_) => println!("  {} (not set)", attr),
                    }
                }
            }
            Ok(())
        }
    }
}
