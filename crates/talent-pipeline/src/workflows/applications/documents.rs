use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::domain::DocumentRef;
use crate::config::DocumentConfig;
use crate::workflows::notifications::join_url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("document source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("document unreadable: {0}")]
    UnreadableDocument(String),
    #[error("invalid watermark settings: {0}")]
    InvalidWatermark(String),
}

/// Fetches raw document bytes from wherever the platform stored them.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, document: &DocumentRef) -> Result<Vec<u8>, DocumentError>;
}

/// Reads documents from the local storage root, falling back to HTTP for remote locations.
pub struct StorageDocumentSource {
    root: PathBuf,
    base_url: Option<String>,
    client: reqwest::Client,
}

impl StorageDocumentSource {
    pub fn new(config: &DocumentConfig) -> Self {
        Self {
            root: config.storage_root.clone(),
            base_url: config.base_url.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn local_path(&self, location: &str) -> Result<PathBuf, DocumentError> {
        let relative = Path::new(location.trim_start_matches('/'));
        if relative
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(DocumentError::SourceUnavailable(format!(
                "storage location '{location}' escapes the storage root"
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, DocumentError> {
        debug!(%url, "fetching remote document");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| DocumentError::SourceUnavailable(format!("{url}: {err}")))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| DocumentError::SourceUnavailable(format!("{url}: {err}")))?;
        Ok(bytes.to_vec())
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[async_trait]
impl DocumentSource for StorageDocumentSource {
    async fn fetch(&self, document: &DocumentRef) -> Result<Vec<u8>, DocumentError> {
        let location = document.storage_location.trim();
        if location.is_empty() {
            return Err(DocumentError::SourceUnavailable(format!(
                "document {} has no storage location",
                document.document_id
            )));
        }

        if is_remote(location) {
            return self.fetch_remote(location).await;
        }

        let path = self.local_path(location)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) => match &self.base_url {
                Some(base) if err.kind() == std::io::ErrorKind::NotFound => {
                    self.fetch_remote(&join_url(base, location)).await
                }
                _ => Err(DocumentError::SourceUnavailable(format!(
                    "{}: {err}",
                    path.display()
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(location: &str) -> DocumentRef {
        DocumentRef {
            document_id: "doc-1".to_string(),
            file_name: "cv.pdf".to_string(),
            storage_location: location.to_string(),
        }
    }

    fn source(root: &Path) -> StorageDocumentSource {
        StorageDocumentSource::new(&DocumentConfig {
            storage_root: root.to_path_buf(),
            base_url: None,
        })
    }

    #[tokio::test]
    async fn reads_documents_under_storage_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join("cvs")).expect("dir created");
        std::fs::write(dir.path().join("cvs/cv.pdf"), b"%PDF-1.5").expect("file written");

        let bytes = source(dir.path())
            .fetch(&document("/cvs/cv.pdf"))
            .await
            .expect("document read");
        assert_eq!(bytes, b"%PDF-1.5");
    }

    #[tokio::test]
    async fn missing_files_are_source_unavailable() {
        let dir = tempfile::tempdir().expect("temp dir");
        match source(dir.path()).fetch(&document("cvs/absent.pdf")).await {
            Err(DocumentError::SourceUnavailable(_)) => {}
            other => panic!("expected source unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_paths_escaping_the_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        match source(dir.path()).fetch(&document("../etc/passwd")).await {
            Err(DocumentError::SourceUnavailable(message)) => {
                assert!(message.contains("escapes"))
            }
            other => panic!("expected source unavailable, got {other:?}"),
        }
    }
}
