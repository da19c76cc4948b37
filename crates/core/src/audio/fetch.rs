use std::{future::Future, time::Duration};

use crate::{CodesongError, Result};

/// Retrieves the raw bytes of an audio resource.
pub trait AudioFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// HTTP(S) fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("codesong/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| CodesongError::msg(format!("failed to build http client: {err}")))?;
        Ok(Self { client })
    }
}

impl AudioFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let failure = |reason: String| CodesongError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| failure(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| failure(err.to_string()))?;
        tracing::debug!(url, bytes = bytes.len(), "audio fetched");
        Ok(bytes.to_vec())
    }
}

/// File extension of the resource, used as a container hint when decoding.
pub fn extension_hint(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Answers a single HTTP request with `response` and returns the URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/song.mp3")
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nID3ab",
        )
        .await;

        let bytes = fetcher().fetch(&url).await.unwrap();
        assert_eq!(bytes, b"ID3ab");
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let err = fetcher().fetch(&url).await.unwrap_err();

        assert_eq!(err.stage(), "fetch");
        let message = err.to_string();
        assert!(message.contains("404"), "{message}");
        assert!(message.contains(&url), "{message}");
    }

    #[tokio::test]
    async fn refused_connection_is_a_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/song.mp3");
        let err = fetcher().fetch(&url).await.unwrap_err();

        assert_eq!(err.stage(), "fetch");
        assert!(err.to_string().contains(&url));
    }

    #[test]
    fn extracts_extension_from_url() {
        assert_eq!(
            extension_hint("http://upload.kendev.my.id/files/1760670459531-089a.mp3").as_deref(),
            Some("mp3")
        );
        assert_eq!(
            extension_hint("https://host/song.OGG?token=abc").as_deref(),
            Some("ogg")
        );
    }

    #[test]
    fn no_hint_without_extension() {
        assert_eq!(extension_hint("https://host/stream"), None);
        assert_eq!(extension_hint("https://host.example/"), None);
    }
}
