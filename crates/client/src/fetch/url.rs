//! URL canonicalization and redirect target resolution.
//!
//! The canonical string is the record key, so two spellings of the same
//! URL share one record.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

fn check_scheme(url: &url::Url) -> Result<(), UrlError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

/// Canonicalize a URL string for use as a store key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    check_scheme(&parsed)?;

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve a `Location` header value against the URL that returned it.
///
/// Absolute, scheme-relative and path-relative locations are all accepted;
/// the result must still be http(s).
pub fn resolve_location(base: &url::Url, location: &str) -> Result<url::Url, UrlError> {
    let location = location.trim();
    if location.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = base.join(location).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    check_scheme(&resolved)?;
    resolved.set_fragment(None);

    Ok(resolved)
}
