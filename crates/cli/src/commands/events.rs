use icinga2_http::{events_request, HttpTransport};

use crate::OutputFormat;

pub(crate) fn cmd_events(
    transport: &HttpTransport,
    queue: &str,
    types: &[String],
    filter: Option<&str>,
    limit: Option<usize>,
    output: OutputFormat,
) -> Result<(), String> {
    let types: Vec<&str> = types.iter().map(String::as_str).collect();
    let request = events_request(queue, &types, filter);
    let stream = transport
        .stream_events(&request)
        .map_err(|e| e.to_string())?;
    tracing::info!(queue, "Event stream opened");

    for event in stream.take(limit.unwrap_or(usize::MAX)) {
        let event = event.map_err(|e| e.to_string())?;
        match output {
            OutputFormat::Json => println!("{}", event.value()),
            OutputFormat::Text => {
                let kind = event.type_name().unwrap_or("event");
                let host = event.get("host").ok().and_then(|h| h.as_str());
                let service = event.get("service").ok().and_then(|s| s.as_str());
                match (host, service) {
                    (Some(h), Some(s)) => println!("{} {}!{}", kind, h, s),
                    (Some(h), None) => println!("{} {}", kind, h),
                    _ => println!("{}", kind),
                }
            }
        }
    }
    Ok(())
}
