//! [`AttachmentFetcher`] for Telegram `file_id` sources.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{prelude::*, RequestError};

use rcb_core::{errors::Error, ports::AttachmentFetcher, Result};

/// Looks up the file with `getFile`, then downloads it through `http`.
pub struct TelegramFileFetcher {
    bot: Bot,
    http: Arc<dyn AttachmentFetcher>,
}

impl TelegramFileFetcher {
    pub fn new(bot: Bot, http: Arc<dyn AttachmentFetcher>) -> Self {
        Self { bot, http }
    }

    /// Download link for a `getFile` path. Contains the token; never log it.
    fn file_url(&self, path: &str) -> Result<reqwest::Url> {
        self.bot
            .api_url()
            .join(&format!("/file/bot{}/{path}", self.bot.token()))
            .map_err(|e| Error::Fetch(format!("telegram file url error: {e}")))
    }
}

// Network errors render the request URL, which carries the token.
fn describe(e: &RequestError) -> String {
    match e {
        RequestError::Network(_) => "network error".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl AttachmentFetcher for TelegramFileFetcher {
    async fn fetch(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(file_id)
            .await
            .map_err(|e| Error::Fetch(format!("getFile failed: {}", describe(&e))))?;

        let url = self.file_url(&file.path)?;
        self.http.fetch(url.as_str(), max_bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct RecordingFetcher {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AttachmentFetcher for RecordingFetcher {
        async fn fetch(&self, source: &str, _max_bytes: u64) -> Result<Vec<u8>> {
            self.urls.lock().unwrap().push(source.to_string());
            Ok(b"jpeg".to_vec())
        }
    }

    /// Answer one Bot API request with `json` and return the API base URL.
    async fn bot_api_once(json: &'static str) -> reqwest::Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();

            // Drain the request (headers + body) before answering.
            let mut req = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = sock.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&req);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let body_len = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if req.len() >= head_end + 4 + body_len {
                        break;
                    }
                }
            }

            let resp = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{json}",
                json.len()
            );
            let _ = sock.write_all(resp.as_bytes()).await;
            let _ = sock.shutdown().await;
        });
        reqwest::Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[tokio::test]
    async fn resolves_file_id_then_downloads() {
        let api = bot_api_once(
            r#"{"ok":true,"result":{"file_id":"AgAD","file_unique_id":"u1","file_size":4,"file_path":"photos/file_7.jpg"}}"#,
        )
        .await;
        let http = Arc::new(RecordingFetcher::default());
        let bot = Bot::new("123:abc").set_api_url(api.clone());
        let fetcher = TelegramFileFetcher::new(bot, http.clone());

        assert_eq!(fetcher.fetch("AgAD", 100).await.unwrap(), b"jpeg");
        assert_eq!(
            *http.urls.lock().unwrap(),
            vec![format!("{api}file/bot123:abc/photos/file_7.jpg")]
        );
    }

    #[tokio::test]
    async fn failed_lookup_is_a_fetch_error_without_download() {
        let api = bot_api_once(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: file is too big"}"#,
        )
        .await;
        let http = Arc::new(RecordingFetcher::default());
        let bot = Bot::new("123:abc").set_api_url(api);
        let fetcher = TelegramFileFetcher::new(bot, http.clone());

        let err = fetcher.fetch("AgAD", 100).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(!err.to_string().contains("123:abc"));
        assert!(http.urls.lock().unwrap().is_empty());
    }
}
