//! Endpoint path construction.

/// Joins `base` and `endpoint` with exactly one `/` between them.
///
/// A blank endpoint returns `base` unchanged.
pub fn full_url(base: &str, endpoint: &str) -> String {
    if endpoint.trim().is_empty() {
        return base.to_string();
    }

    if base.ends_with('/') {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        return format!("{base}{endpoint}");
    }

    if endpoint.starts_with('/') {
        format!("{base}{endpoint}")
    } else {
        format!("{base}/{endpoint}")
    }
}

/// Escapes spaces only; every other character is passed through.
pub fn encode_warden_name(name: &str) -> String {
    name.replace(' ', "%20")
}

pub fn iterations_endpoint(organization_id: &str, warden_name: &str) -> String {
    format!("organizations/{organization_id}/wardens/{warden_name}/iterations")
}

pub fn checks_endpoint(organization_id: &str, warden_id: &str) -> String {
    format!("organizations/{organization_id}/wardens/{warden_id}/checks")
}
