//! Corpus loaders for local files, directories and remote text

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::{Error, Result};
use crate::types::Document;

/// Reads the corpus into documents
///
/// Implementations:
/// - `FileLoader`: a plain-text file or a directory of them
/// - `HttpLoader`: a plain-text document served over http(s)
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load every document of the corpus
    async fn load(&self) -> Result<Vec<Document>>;

    /// Get loader name for logging
    fn name(&self) -> &str;
}

/// Pick a loader from the form of `corpus.source`
///
/// `timeout` bounds each remote fetch.
pub fn loader_for(config: &CorpusConfig, timeout: Duration) -> Result<Arc<dyn DocumentLoader>> {
    let source = config.source.trim();
    if source.starts_with("http://") || source.starts_with("https://") {
        Ok(Arc::new(HttpLoader::new(source, timeout)?))
    } else {
        Ok(Arc::new(FileLoader::new(source, config.extensions.clone())))
    }
}

/// Loads a single text file, or every matching file below a directory
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
    /// Lower-case extensions without the dot
    extensions: Vec<String>,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            path: path.into(),
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    /// Matching files below `root`, in sorted order
    fn walk(&self, root: PathBuf) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && self.matches_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl DocumentLoader for FileLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let meta = tokio::fs::metadata(&self.path).await.map_err(|e| {
            io::Error::new(e.kind(), format!("{}: {}", self.path.display(), e))
        })?;

        let files = if meta.is_dir() {
            let loader = self.clone();
            tokio::task::spawn_blocking(move || loader.walk(loader.path.clone()))
                .await
                .map_err(io::Error::other)??
        } else {
            vec![self.path.clone()]
        };

        let mut docs = Vec::with_capacity(files.len());
        for file in files {
            let text = tokio::fs::read_to_string(&file).await.map_err(|e| {
                io::Error::new(e.kind(), format!("{}: {}", file.display(), e))
            })?;
            tracing::debug!("Loaded {} ({} bytes)", file.display(), text.len());
            docs.push(Document::new(file.to_string_lossy(), text));
        }

        tracing::info!("Loaded {} document(s) from {}", docs.len(), self.path.display());
        Ok(docs)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Fetches one plain-text document from a URL
pub struct HttpLoader {
    url: String,
    client: reqwest::Client,
}

impl HttpLoader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    fn fetch_error(&self, err: reqwest::Error, fallback: io::ErrorKind) -> io::Error {
        let kind = if err.is_timeout() {
            io::ErrorKind::TimedOut
        } else {
            fallback
        };
        io::Error::new(kind, format!("{}: {}", self.url, err))
    }
}

#[async_trait]
impl DocumentLoader for HttpLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.fetch_error(e, io::ErrorKind::Other))?;

        if !response.status().is_success() {
            return Err(io::Error::other(format!(
                "{}: HTTP {}",
                self.url,
                response.status()
            ))
            .into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.fetch_error(e, io::ErrorKind::InvalidData))?;

        tracing::info!("Fetched corpus from {} ({} bytes)", self.url, text.len());
        Ok(vec![Document::new(self.url.clone(), text)])
    }

    fn name(&self) -> &str {
        "http"
    }
}
