use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::DownloadError;
use crate::models::{AssetReference, AssetRole};
use crate::utils::{asset_file_name, extension_from_url};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Streams product images into a local directory.
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    client: reqwest::Client,
    dest_dir: PathBuf,
}

impl MediaDownloader {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            dest_dir: dest_dir.into(),
        })
    }

    /// Download `url` under the deterministic name for `(base_name, role, index)`.
    ///
    /// Returns `None` when the server answers with a non-success status or the
    /// transfer fails; the record is then stored without this asset.
    pub async fn download(
        &self,
        url: &str,
        base_name: &str,
        role: AssetRole,
        index: Option<usize>,
    ) -> Option<AssetReference> {
        match self.try_download(url, base_name, role, index).await {
            Ok(reference) => {
                info!("Image saved at {}", reference);
                Some(reference)
            }
            Err(e) => {
                warn!("Failed to download image {}: {}", url, e);
                None
            }
        }
    }

    async fn try_download(
        &self,
        url: &str,
        base_name: &str,
        role: AssetRole,
        index: Option<usize>,
    ) -> Result<AssetReference, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        tokio::fs::create_dir_all(&self.dest_dir).await?;
        let file_name = asset_file_name(base_name, role, index, &extension_from_url(url));
        let path = self.dest_dir.join(file_name);

        if let Err(e) = write_stream(&path, response).await {
            // Do not leave a truncated file behind.
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        Ok(AssetReference(path.to_string_lossy().into_owned()))
    }
}

async fn write_stream(path: &Path, response: reqwest::Response) -> Result<(), DownloadError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_writes_named_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/12345_aventus.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3, 4]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = MediaDownloader::new(dir.path().join("images")).unwrap();
        let url = format!("{}/img/12345_aventus.png", server.uri());

        let main = downloader
            .download(&url, "Aventus: No/1", AssetRole::Main, None)
            .await
            .unwrap();
        assert_eq!(main.file_name(), "Aventus No1_main.png");
        assert_eq!(std::fs::read(main.as_str()).unwrap(), vec![1u8, 2, 3, 4]);

        let extra = downloader
            .download(&url, "Aventus", AssetRole::Additional, Some(2))
            .await
            .unwrap();
        assert_eq!(extra.file_name(), "Aventus_additional_2.png");
    }

    #[tokio::test]
    async fn test_download_not_found_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let downloader = MediaDownloader::new(dir.path()).unwrap();
        let url = format!("{}/missing.jpg", server.uri());

        assert!(downloader.download(&url, "X", AssetRole::Main, None).await.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_unreachable_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = MediaDownloader::new(dir.path()).unwrap();
        assert!(downloader
            .download("http://127.0.0.1:9/x.jpg", "X", AssetRole::Main, None)
            .await
            .is_none());
    }
}
