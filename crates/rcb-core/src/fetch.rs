//! HTTP implementation of [`AttachmentFetcher`].

use std::time::Duration;

use async_trait::async_trait;

use crate::{errors::Error, ports::AttachmentFetcher, Result};

#[derive(Clone, Debug)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self { http })
    }
}

// Attachment URLs may carry credentials (Telegram embeds the bot token), so
// errors are reported without the URL.
fn map_err(e: reqwest::Error) -> Error {
    Error::Fetch(e.without_url().to_string())
}

#[async_trait]
impl AttachmentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, max_bytes: u64) -> Result<Vec<u8>> {
        let mut resp = self.http.get(url).send().await.map_err(map_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("unexpected status {status}")));
        }

        if let Some(len) = resp.content_length() {
            if len > max_bytes {
                return Err(Error::Fetch(format!(
                    "body of {len} bytes exceeds limit of {max_bytes}"
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(map_err)? {
            if (body.len() + chunk.len()) as u64 > max_bytes {
                return Err(Error::Fetch(format!(
                    "body exceeds limit of {max_bytes} bytes"
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return its base URL.
    async fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let _ = sock.write_all(&response).await;
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/file.png")
    }

    fn response(status: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let url = serve_once(response("200 OK", b"pixels")).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        assert_eq!(fetcher.fetch(&url, 100).await.unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let url = serve_once(response("404 Not Found", b"nope")).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        assert!(matches!(
            fetcher.fetch(&url, 100).await,
            Err(Error::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn body_over_limit_is_an_error() {
        let url = serve_once(response("200 OK", &[0u8; 64])).await;
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        assert!(matches!(fetcher.fetch(&url, 10).await, Err(Error::Fetch(_))));
    }

    #[tokio::test]
    async fn error_does_not_leak_url() {
        let fetcher = HttpFetcher::new(Duration::from_millis(200)).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/botSECRET/file.png", 10)
            .await
            .unwrap_err();
        assert!(!err.to_string().contains("SECRET"));
    }
}
