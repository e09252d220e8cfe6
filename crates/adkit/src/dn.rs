//! Distinguished name helpers.

/// Escape a value for use in a relative distinguished name (RFC 4514).
pub fn escape_rdn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (i == 0 && matches!(c, '#' | ' '))
            || (i == last && c == ' ');
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

/// Distinguished name of an organizational unit directly under `base_dn`.
pub fn ou_path(name: &str, base_dn: &str) -> String {
    format!("OU={},{}", escape_rdn_value(name), base_dn)
}

/// Build a domain DN from a DNS domain name ("corp.example" -> "DC=corp,DC=example").
pub fn domain_dn(dns_name: &str) -> Option<String> {
    let labels: Vec<&str> = dns_name
        .trim()
        .trim_end_matches('.')
        .split('.')
        .collect();
    if labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    Some(
        labels
            .iter()
            .map(|l| format!("DC={}", escape_rdn_value(l)))
            .collect::<Vec<_>>()
            .join(","),
    )
}
