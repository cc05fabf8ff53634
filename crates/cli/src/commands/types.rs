use icinga2_iom::{Form, Session};
use serde_json::{json, Value};

use super::print_json;
use crate::OutputFormat;

pub(crate) fn cmd_types(session: &Session, name: Option<&str>, output: OutputFormat) -> Result<(), String> {
    let types = session.types();
    let Some(name) = name else {
        let entries = types.descriptions().map_err(|e| e.to_string())?;
        return match output {
            OutputFormat::Json => print_json(&serde_json::to_value(&entries).map_err(|e| e.to_string())?),
            OutputFormat::Text => {
                for entry in &entries {
                    match &entry.base {
                        Some(base) => println!("{} ({}) : {}", entry.name, entry.plural(), base),
                        None => println!("{} ({})", entry.name, entry.plural()),
                    }
                }
                Ok(())
            }
        };
    };

    let class = types
        .resolve_object(name, Form::AsNamed)
        .map_err(|e| e.to_string())?;
    match output {
        OutputFormat::Json => print_json(&json!({
            "name": class.name,
            "plural_name": class.plural_name,
            "abstract": class.is_abstract,
            "ancestors": class.ancestors,
            "capabilities": {
                "modify": class.capabilities.modify,
                "delete": class.capabilities.delete,
                "actions": class.capabilities.actions,
            },
            "fields": serde_json::to_value(&class.fields).unwrap_or(Value::Null),
        })),
        OutputFormat::Text => {
            println!("{} ({})", class.name, class.plural_name);
            if !class.ancestors.is_empty() {
                println!("  ancestors: {}", class.ancestors.join(" > "));
            }
            for (field, desc) in &class.fields {
                let rank = "[]".repeat(desc.array_rank as usize);
                let mut flags = Vec::new();
                if !desc.can_view() {
                    flags.push("hidden");
                }
                if !desc.can_modify() {
                    flags.push("read-only");
                }
                if desc.is_config() {
                    flags.push("config");
                }
                if flags.is_empty() {
                    println!("  {}: {}{}", field, desc.type_name, rank);
                } else {
                    println!("  {}: {}{} ({})", field, desc.type_name, rank, flags.join(", "));
                }
            }
            Ok(())
        }
    }
}
