use icinga2_iom::{DeleteOptions, ModifyOptions, OperationReport, Session};
use serde_json::Value;

use super::{parse_assignments, print_json};
use crate::OutputFormat;

pub(crate) fn cmd_modify(
    session: &Session,
    type_name: &str,
    name: &str,
    assignments: &[String],
    output: OutputFormat,
) -> Result<(), String> {
    let changes = parse_assignments(assignments)?;
    let object = session.object(type_name, name).map_err(|e| e.to_string())?;
    let report = object
        .modify(Value::Object(changes), ModifyOptions::default())
        .map_err(|e| e.to_string())?;
    print_report(&report, output)
}

pub(crate) fn cmd_delete(
    session: &Session,
    type_name: &str,
    name: &str,
    cascade: bool,
    output: OutputFormat,
) -> Result<(), String> {
    let object = session.object(type_name, name).map_err(|e| e.to_string())?;
    let report = object
        .delete(DeleteOptions {
            cascade,
            no_invalidate: false,
        })
        .map_err(|e| e.to_string())?;
    print_report(&report, output)
}

fn print_report(report: &OperationReport, output: OutputFormat) -> Result<(), String> {
    match output {
        OutputFormat::Json => {
            print_json(&serde_json::to_value(&report.outcomes).map_err(|e| e.to_string())?)
        }
        OutputFormat::Text => {
            for outcome in &report.outcomes {
                match &outcome.name {
                    Some(name) => println!("{}: {}", name, outcome.status),
                    None => println!("{}", outcome.status),
                }
            }
            Ok(())
        }
    }
}
