#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Invalid domain name: {0}")]
pub struct InvalidDomainError(pub String);

/// Splits a comma-separated domain list. Pieces are trimmed and blanks are
/// dropped, order is kept. The first entry is the primary domain.
pub fn parse_domain_list(raw: Option<&str>) -> Vec<String> {
    let raw = match raw {
        Some(raw) => raw,
        None => return vec![],
    };

    return raw
        .split(',')
        .map(str::trim)
        .filter(|domain| !domain.is_empty())
        .map(String::from)
        .collect();
}

/// Hosted zone for `domain`. A two-label domain is its own zone (apex),
/// anything longer drops its first label, a single label is rejected.
pub fn derive_zone(domain: Option<&str>) -> Result<Option<String>, InvalidDomainError> {
    let domain = match domain {
        Some(domain) => domain,
        None => return Ok(None),
    };

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(InvalidDomainError(domain.to_string()));
    }

    if labels.len() == 2 {
        return Ok(Some(domain.to_string()));
    }

    return Ok(Some(labels[1..].join(".")));
}
