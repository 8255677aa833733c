//! Generic HTTP object backend.
//!
//! Objects are read with a plain `GET <base>/<path>`. Any transport error or
//! non-2xx status is absence.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use std::time::Duration;

use crate::routing::RequestPath;
use crate::storage::{BackendKind, FetchOutcome, FetchedObject, Fetcher, StorageError};

pub struct SpacesBackend {
    client: reqwest::Client,
    base: String,
}

impl SpacesBackend {
    /// Create a backend rooted at `base_url`. `io_timeout` bounds connecting
    /// and every read, including each read of the body.
    pub fn new(base_url: &str, io_timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .connect_timeout(io_timeout)
            .read_timeout(io_timeout)
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Object URL for `path`.
    pub fn target_url(&self, path: &RequestPath) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn get(&self, path: &RequestPath) -> Result<FetchedObject, StorageError> {
        let response = self
            .client
            .get(self.target_url(path))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status(status.as_u16()));
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(FetchedObject {
            source: BackendKind::Spaces,
            body: Box::pin(body),
        })
    }
}

#[async_trait]
impl Fetcher for SpacesBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Spaces
    }

    async fn fetch(&self, path: &RequestPath) -> FetchOutcome {
        match self.get(path).await {
            Ok(object) => FetchOutcome::Found(object),
            Err(StorageError::Status(404)) => {
                tracing::debug!(backend = "do", path = %path, "Object not found");
                FetchOutcome::Absent
            }
            Err(e) => {
                tracing::warn!(backend = "do", path = %path, error = %e, "Spaces fetch failed");
                FetchOutcome::Absent
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::sanitize;
    use futures_util::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_target_url_strips_trailing_slashes() {
        let backend = SpacesBackend::with_client("https://space.example.com/data//", reqwest::Client::new());
        assert_eq!(
            backend.target_url(&sanitize("/archives/2024/a.tar.gz")),
            "https://space.example.com/data/archives/2024/a.tar.gz"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_absent() {
        // port 9 on localhost: nothing listens, connection is refused
        let backend = SpacesBackend::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let outcome = backend.fetch(&sanitize("latest.json")).await;
        assert!(matches!(outcome, FetchOutcome::Absent));
    }

    #[tokio::test]
    async fn test_body_that_goes_silent_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nabc")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let backend = SpacesBackend::new(&format!("http://{addr}"), Duration::from_millis(200)).unwrap();
        let FetchOutcome::Found(mut object) = backend.fetch(&sanitize("latest.json")).await else {
            panic!("expected the object");
        };
        assert_eq!(object.body.next().await.unwrap().unwrap().as_ref(), b"abc");

        let next = tokio::time::timeout(Duration::from_secs(5), object.body.next())
            .await
            .expect("a silent body must not hang");
        assert!(matches!(next, Some(Err(_))));
    }
}
