//! URL normalization for restart-durable tab identity.
//!
//! Live tab ids are regenerated on restart; the normalized URL is the
//! secondary identity used by fingerprinting and sync re-resolution.
//! Normalization is deliberately conservative: lowercase scheme and host,
//! drop the fragment, drop one trailing slash. Query strings are preserved
//! because they distinguish meaningfully different pages.

/// Normalize a URL for identity comparison.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();

    // Fragment never affects page identity.
    let url = match url.split_once('#') {
        Some((before, _)) => before,
        None => url,
    };

    let normalized = match url.find("://") {
        Some(scheme_end) => {
            let (scheme, rest) = url.split_at(scheme_end);
            let rest = &rest[3..];
            let host_end = rest
                .find(['/', '?'])
                .unwrap_or(rest.len());
            let (host, tail) = rest.split_at(host_end);
            format!(
                "{}://{}{}",
                scheme.to_ascii_lowercase(),
                host.to_ascii_lowercase(),
                tail
            )
        }
        None => url.to_string(),
    };

    // "https://a.com/" and "https://a.com" are the same page.
    match normalized.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => normalized,
    }
}

/// True for URLs a freshly restored tab carries before its first navigation.
///
/// Used by the mid-restore heuristic: a window whose tabs are mostly
/// placeholders has not finished populating and must not be reconciled yet.
pub fn is_placeholder_url(url: &str) -> bool {
    let url = url.trim();
    url.is_empty()
        || url == "about:blank"
        || url.starts_with("chrome://newtab")
        || url.starts_with("chrome://new-tab-page")
        || url.starts_with("edge://newtab")
        || url.starts_with("about:newtab")
}
