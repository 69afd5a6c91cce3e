//! Single-request HTTP transport.
//!
//! A transport performs exactly one GET and never follows redirects; the
//! redirect loop lives in [`super::FetchClient`]. The size ceiling is
//! enforced here, while the body is still on the wire.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use url::Url;

use super::error::FetchError;
use super::ssrf;
use linkstash_core::Error;

/// What one GET returned.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Raw `Location` header value, not yet resolved.
    pub location: Option<String>,
    pub content_type: Option<String>,
    /// Body of a 2xx response; empty for every other status.
    pub body: Bytes,
}

/// One HTTP GET without redirect following.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`, reading at most `max_bytes` of a 2xx body.
    async fn get(&self, url: &Url, max_bytes: usize) -> Result<RawResponse, FetchError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: Client,
    timeout: Duration,
    block_private_addresses: bool,
}

impl HttpTransport {
    /// Build the underlying client with redirects disabled and a fixed timeout.
    pub fn new(user_agent: &str, timeout: Duration, block_private_addresses: bool) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, timeout, block_private_addresses })
    }
}

fn header_string(headers: &header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url, max_bytes: usize) -> Result<RawResponse, FetchError> {
        if self.block_private_addresses {
            ssrf::check_url(url, self.timeout).await?;
        }

        let mut response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await?;

        let status = response.status();
        let location = header_string(response.headers(), header::LOCATION);
        let content_type = header_string(response.headers(), header::CONTENT_TYPE);

        if !status.is_success() {
            return Ok(RawResponse { status, location, content_type, body: Bytes::new() });
        }

        if let Some(len) = response.content_length()
            && len > max_bytes as u64
        {
            return Err(FetchError::ContentTooLarge { actual: len, limit: max_bytes });
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            let received = body.len() + chunk.len();
            if received > max_bytes {
                tracing::debug!(url = %url, received, limit = max_bytes, "aborting oversized body");
                return Err(FetchError::ContentTooLarge { actual: received as u64, limit: max_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawResponse { status, location, content_type, body: body.freeze() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP/1.1 response per connection on a loopback port.
    async fn serve(response: &'static [u8]) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => read += n,
                    }
                }
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            }
        });

        Url::parse(&format!("http://{addr}/page")).unwrap()
    }

    fn transport() -> HttpTransport {
        HttpTransport::new("linkstash-test", Duration::from_secs(5), false).unwrap()
    }

    #[tokio::test]
    async fn test_reads_success_body() {
        let url = serve(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello").await;

        let response = transport().get(&url, 1024).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type.as_deref(), Some("text/plain"));
        assert_eq!(&response.body[..], b"hello");
    }

    #[tokio::test]
    async fn test_does_not_follow_redirects() {
        let url = serve(b"HTTP/1.1 301 Moved Permanently\r\nLocation: /elsewhere\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;

        let response = transport().get(&url, 1024).await.unwrap();
        assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.location.as_deref(), Some("/elsewhere"));
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_declared_length_over_limit() {
        let url = serve(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n").await;

        let result = transport().get(&url, 10).await;
        assert_eq!(result.unwrap_err(), FetchError::ContentTooLarge { actual: 100, limit: 10 });
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit() {
        let url = serve(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n0123456789abcdefghij").await;

        let result = transport().get(&url, 10).await;
        assert!(matches!(result, Err(FetchError::ContentTooLarge { limit: 10, .. })));
    }

    #[tokio::test]
    async fn test_blocks_loopback_when_enabled() {
        let url = serve(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok").await;
        let guarded = HttpTransport::new("linkstash-test", Duration::from_secs(5), true).unwrap();

        let result = guarded.get(&url, 1024).await;
        assert!(matches!(result, Err(FetchError::Blocked(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let result = transport().get(&url, 1024).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
