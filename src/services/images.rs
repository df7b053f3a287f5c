use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Screenshot bytes downloaded for one job, kept only for the oracle call.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub source_url: String,
    pub bytes: Vec<u8>,
}

impl RawImage {
    pub fn new(source_url: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source_url: source_url.into(),
            bytes,
        }
    }

    /// MIME type sniffed from the magic bytes, `image/jpeg` when unknown.
    pub fn media_type(&self) -> &'static str {
        match image::guess_format(&self.bytes) {
            Ok(format) => format.to_mime_type(),
            Err(_) => "image/jpeg",
        }
    }
}

/// Source of job screenshots.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Download every URL in order, skipping the ones that fail.
    ///
    /// Errors only when nothing could be downloaded.
    async fn fetch_all(&self, urls: &[String]) -> Result<Vec<RawImage>, ImageError>;
}

/// Plain HTTP GET image downloader.
pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ImageError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(ImageError::Client)?;
        Ok(Self { http })
    }

    async fn fetch_one(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageSource for HttpImageFetcher {
    async fn fetch_all(&self, urls: &[String]) -> Result<Vec<RawImage>, ImageError> {
        let mut images = Vec::with_capacity(urls.len());

        for url in urls {
            match self.fetch_one(url).await {
                Ok(bytes) => {
                    tracing::debug!(url = %url, size = bytes.len(), "Downloaded image");
                    images.push(RawImage::new(url.as_str(), bytes));
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Skipping image that failed to download");
                }
            }
        }

        if images.is_empty() {
            return Err(ImageError::NoImagesAvailable {
                requested: urls.len(),
            });
        }

        Ok(images)
    }
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("image host returned {0}")]
    Status(StatusCode),
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("No images could be downloaded ({requested} requested)")]
    NoImagesAvailable { requested: usize },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_sniffing() {
        let png = RawImage::new("a.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec());
        assert_eq!(png.media_type(), "image/png");

        let jpeg = RawImage::new("a.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        assert_eq!(jpeg.media_type(), "image/jpeg");

        let unknown = RawImage::new("a.bin", b"not an image".to_vec());
        assert_eq!(unknown.media_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn test_empty_url_list() {
        let fetcher = HttpImageFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch_all(&[]).await.unwrap_err();
        assert!(matches!(err, ImageError::NoImagesAvailable { requested: 0 }));
    }

    #[tokio::test]
    async fn test_every_fetch_failing() {
        let fetcher = HttpImageFetcher::new(Duration::from_secs(2)).unwrap();
        let urls = vec![
            "not a url".to_string(),
            "http://127.0.0.1:1/missing.png".to_string(),
        ];
        let err = fetcher.fetch_all(&urls).await.unwrap_err();
        assert!(matches!(err, ImageError::NoImagesAvailable { requested: 2 }));
    }
}
