//! Streaming media download.
//!
//! Writes a resolved URL's body to disk chunk by chunk; the payload is never
//! held in memory as a whole.

mod types;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::error::TransferError;

pub use types::{DownloadConfig, DownloadEvent, CHUNK_SIZE};

/// Moves the bytes behind a direct URL into a local file.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    async fn download(&self, direct_url: &str, destination: &Path)
        -> Result<PathBuf, TransferError>;
}

/// HTTP downloader streaming through a fixed-size buffer.
pub struct StreamingDownloader {
    client: Client,
    refuse_existing: bool,
}

impl StreamingDownloader {
    pub fn new(config: &DownloadConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            refuse_existing: config.collision.refuses_existing(),
        })
    }

    async fn open(&self, destination: &Path) -> Result<File, TransferError> {
        let mut options = OpenOptions::new();
        options.write(true);
        if self.refuse_existing {
            options.create_new(true);
        } else {
            options.create(true).truncate(true);
        }

        match options.open(destination).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(
                TransferError::AlreadyExists(destination.display().to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl FileTransfer for StreamingDownloader {
    async fn download(
        &self,
        direct_url: &str,
        destination: &Path,
    ) -> Result<PathBuf, TransferError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut response = self.client.get(direct_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status(status));
        }
        let expected = response.content_length();

        let file = self.open(destination).await?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut received: u64 = 0;

        // Partial files stay on disk, so buffered bytes are flushed on every exit
        let streamed = loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    writer.write_all(&chunk).await?;
                    received += chunk.len() as u64;
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        writer.flush().await?;

        match (streamed, expected) {
            (_, Some(expected)) if received < expected => {
                warn!(
                    "Body of {} ended early ({} of {} bytes), keeping {}",
                    direct_url,
                    received,
                    expected,
                    destination.display()
                );
                return Err(TransferError::Truncated { received, expected });
            }
            (Err(e), _) => return Err(e.into()),
            (Ok(()), _) => {}
        }

        debug!("Wrote {} bytes from {}", received, direct_url);
        info!("Saved {}", destination.display());
        Ok(destination.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CollisionPolicy;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(collision: CollisionPolicy) -> StreamingDownloader {
        StreamingDownloader::new(&DownloadConfig::default().with_collision(collision)).unwrap()
    }

    #[tokio::test]
    async fn test_streams_body_into_new_directory() {
        let server = MockServer::start().await;
        let body = vec![7u8; 3 * CHUNK_SIZE + 17];
        Mock::given(method("GET"))
            .and(path("/media/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out/Clip.mp4");
        let url = format!("{}/media/clip.mp4", server.uri());

        let written = downloader(CollisionPolicy::Overwrite)
            .download(&url, &dest)
            .await
            .unwrap();
        assert_eq!(written, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[tokio::test]
    async fn test_non_success_status_is_transfer_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Clip.mp4");
        let err = downloader(CollisionPolicy::Overwrite)
            .download(&format!("{}/gone.mp4", server.uri()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Status(s) if s.as_u16() == 404));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Clip.mp4");
        std::fs::write(&dest, b"older and longer").unwrap();

        downloader(CollisionPolicy::Overwrite)
            .download(&format!("{}/a.mp4", server.uri()), &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_skip_existing_leaves_file_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Clip.mp4");
        std::fs::write(&dest, b"kept").unwrap();

        let err = downloader(CollisionPolicy::SkipExisting)
            .download(&format!("{}/a.mp4", server.uri()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::AlreadyExists(_)));
        assert_eq!(std::fs::read(&dest).unwrap(), b"kept");
    }

    /// Serve one raw HTTP response, then close the connection.
    async fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(&response).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/clip.mp4", addr)
    }

    #[tokio::test]
    async fn test_short_body_is_truncated_and_partial_file_kept() {
        let mut response =
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n".to_vec();
        response.extend_from_slice(&[1u8; 10]);
        let url = serve_once(response).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Clip.mp4");
        let err = downloader(CollisionPolicy::Overwrite)
            .download(&url, &dest)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::Truncated { received, expected: 100 } if received <= 10
        ));
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_broken_stream_keeps_partial_file() {
        let response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n5\r\nhello\r\n".to_vec();
        let url = serve_once(response).await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("Clip.mp4");
        let err = downloader(CollisionPolicy::Overwrite)
            .download(&url, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Network(_)));
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = downloader(CollisionPolicy::Overwrite)
            .download("http://127.0.0.1:9/clip.mp4", &dir.path().join("Clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Network(_)));
    }
}
