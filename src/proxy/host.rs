//! Upstream URL helpers.

/// Hostname of `url`: scheme, credentials, port, path and query stripped.
///
/// `http://api.example.com:8080/v1?x=1` gives `api.example.com`.
pub fn parse_host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    if let Some(bracketed) = host_port.strip_prefix('[') {
        // IPv6 literal
        return bracketed.split(']').next().unwrap_or_default();
    }
    host_port.split(':').next().unwrap_or_default()
}

/// Join a project's origin with the request path below the project segment.
pub fn target_url(url_prefix: &str, remainder: &str) -> String {
    if url_prefix.ends_with('/') {
        format!("{url_prefix}{remainder}")
    } else {
        format!("{url_prefix}/{remainder}")
    }
}
