//! Filter expressions selecting objects by name.

fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Filter matching exactly the named objects of one type.
///
/// `host`, `["a", "b"]` → `host.name=="a" || host.name=="b"`. Services are
/// addressed as `<host>!<service>` and match on both names. Returns `None`
/// when there is nothing to match.
pub fn objects_filter<I, S>(type_name: &str, names: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let type_name = type_name.to_lowercase();
    let parts: Vec<String> = names
        .into_iter()
        .map(|name| {
            let name = name.as_ref();
            match (type_name.as_str(), name.split_once('!')) {
                ("service", Some((host, service))) => format!(
                    "(host.name=={} && service.name=={})",
                    quote(host),
                    quote(service)
                ),
                _ => format!("{}.name=={}", type_name, quote(name)),
            }
        })
        .collect();

    if type_name.is_empty() || parts.is_empty() {
        None
    } else {
        Some(parts.join(" || "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosts_joined_with_or() {
        assert_eq!(
            objects_filter("Host", ["a", "b"]).unwrap(),
            "host.name==\"a\" || host.name==\"b\""
        );
    }

    #[test]
    fn services_match_host_and_service() {
        assert_eq!(
            objects_filter("Service", ["h1!ping", "h2!ssh"]).unwrap(),
            "(host.name==\"h1\" && service.name==\"ping\") || (host.name==\"h2\" && service.name==\"ssh\")"
        );
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(
            objects_filter("host", ["we\"ird"]).unwrap(),
            "host.name==\"we\\\"ird\""
        );
    }

    #[test]
    fn nothing_to_match() {
        assert_eq!(objects_filter("host", Vec::<String>::new()), None);
        assert_eq!(objects_filter("", ["a"]), None);
    }
}
