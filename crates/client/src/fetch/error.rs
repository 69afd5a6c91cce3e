//! Fetch failure taxonomy.
//!
//! A `FetchError` never crosses the fetcher boundary as an `Err`: it travels
//! inside [`super::FetchOutcome::Failure`] and its `Display` output is what
//! gets stored as the record's error message.

use super::ssrf::SsrfError;
use super::url::UrlError;

/// Why a fetch did not produce content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The URL (or a redirect target) could not be parsed or has an unsupported scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// DNS, connect, TLS or read failure, with the transport's message.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Status outside 200-399.
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// A 3xx response without a `Location` header.
    #[error("redirect response is missing the Location header")]
    MissingLocationHeader,

    /// The redirect chain is longer than allowed.
    #[error("too many redirects (max {0})")]
    TooManyRedirects(usize),

    /// The body is larger than the configured limit.
    #[error("content too large: {actual} bytes exceeds the limit of {limit} bytes")]
    ContentTooLarge { actual: u64, limit: usize },

    /// The target resolves to a private or reserved address.
    #[error("blocked: {0}")]
    Blocked(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout(err.to_string()) } else { FetchError::Network(err.to_string()) }
    }
}

impl From<UrlError> for FetchError {
    fn from(err: UrlError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}

impl From<SsrfError> for FetchError {
    fn from(err: SsrfError) -> Self {
        match err {
            SsrfError::DnsError(msg) => FetchError::Network(format!("DNS resolution failed: {msg}")),
            SsrfError::DnsTimeout(after) => FetchError::Timeout(format!("DNS resolution timed out after {after:?}")),
            other => FetchError::Blocked(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(FetchError::TooManyRedirects(5).to_string().contains("redirect"));
        assert!(FetchError::MissingLocationHeader.to_string().contains("Location"));

        let err = FetchError::ContentTooLarge { actual: 6_000_000, limit: 5_242_880 };
        let msg = err.to_string();
        assert!(msg.contains("too large"));
        assert!(msg.contains("6000000"));
        assert!(msg.contains("5242880"));
    }

    #[test]
    fn test_from_url_error() {
        let err: FetchError = UrlError::Empty.into();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn test_from_ssrf_error() {
        let blocked: FetchError = SsrfError::BlockedIp("127.0.0.1".parse().unwrap()).into();
        assert!(matches!(blocked, FetchError::Blocked(_)));

        let dns: FetchError = SsrfError::DnsError("no such host".into()).into();
        assert!(matches!(dns, FetchError::Network(_)));

        let stalled: FetchError = SsrfError::DnsTimeout(std::time::Duration::from_secs(30)).into();
        assert!(matches!(stalled, FetchError::Timeout(_)));
    }
}
