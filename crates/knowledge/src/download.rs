//! Downloads of cited source documents.

use odes_core::{AppConfig, AppError, AppResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fetches raw documents from `GET {rag_url}/download/{filename}`.
pub struct DocumentDownloader {
    base_url: String,
    client: reqwest::Client,
}

impl DocumentDownloader {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::new(
            config.rag_url.clone(),
            Duration::from_secs(config.retrieval.request_timeout_secs),
        )
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!(
            "{}/download/{}",
            self.base_url,
            urlencoding::encode(filename)
        )
    }

    /// Download a document. Failures are reported, never retried.
    pub async fn download(&self, filename: &str) -> AppResult<Vec<u8>> {
        if filename.trim().is_empty() {
            return Err(AppError::InvalidInput("Filename cannot be empty".to_string()));
        }

        let url = self.url_for(filename);
        tracing::info!(filename, "Downloading document");

        let failed = |reason: String| AppError::Download {
            filename: filename.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("server returned {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| failed(format!("failed to read body: {}", e)))?;

        tracing::debug!(filename, bytes = bytes.len(), "Document downloaded");
        Ok(bytes.to_vec())
    }

    /// Download a document and write it to `output`, or `./<filename>` when
    /// no output path is given. Returns the written path.
    pub async fn download_to(&self, filename: &str, output: Option<&Path>) -> AppResult<PathBuf> {
        let bytes = self.download(filename).await?;
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => default_output_path(filename),
        };
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Local file name for a downloaded document, stripped of any directories.
fn default_output_path(filename: &str) -> PathBuf {
    Path::new(filename)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("document"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader(base: &str) -> DocumentDownloader {
        DocumentDownloader::new(base, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_url_percent_encodes_filename() {
        let d = downloader("http://localhost:8082/");
        assert_eq!(
            d.url_for("Insurance Act 2015.pdf"),
            "http://localhost:8082/download/Insurance%20Act%202015.pdf"
        );
        assert_eq!(
            d.url_for("cases/R v Smith#1.pdf"),
            "http://localhost:8082/download/cases%2FR%20v%20Smith%231.pdf"
        );
    }

    #[test]
    fn test_default_output_path_strips_directories() {
        assert_eq!(default_output_path("../../etc/passwd"), PathBuf::from("passwd"));
        assert_eq!(default_output_path("act.pdf"), PathBuf::from("act.pdf"));
        assert_eq!(default_output_path(".."), PathBuf::from("document"));
    }

    #[tokio::test]
    async fn test_download_failure_is_reported() {
        let d = downloader("http://127.0.0.1:9");
        match d.download("act.pdf").await {
            Err(AppError::Download { filename, .. }) => assert_eq!(filename, "act.pdf"),
            other => panic!("expected download error, got {:?}", other.map(|b| b.len())),
        }
    }

    #[tokio::test]
    async fn test_empty_filename_rejected() {
        let d = downloader("http://127.0.0.1:9");
        assert!(matches!(d.download(" ").await, Err(AppError::InvalidInput(_))));
    }
}
