//! Storage - persistence seam for projects, snapshots and transcripts

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{RunState, TranscriptEntry};
use crate::config::Config;
use crate::domain::{CodeSnippet, Project};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Which project document to read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFile {
    /// Periodic in-loop checkpoint, read back on resume
    Checkpoint,
    /// Final output written at the end of the run
    Output,
}

/// Persistence operations the driver depends on
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write the whole project document
    async fn save_project(&self, project: &Project, file: ProjectFile) -> Result<(), StorageError>;

    /// Read a project document; `Ok(None)` when it does not exist
    async fn load_project(&self, file: ProjectFile) -> Result<Option<Project>, StorageError>;

    /// Write the run-state snapshot
    async fn save_state(&self, state: &RunState) -> Result<(), StorageError>;

    /// Read the run-state snapshot; `Ok(None)` when it does not exist
    async fn load_state(&self) -> Result<Option<RunState>, StorageError>;

    /// Append one block to the transcript
    async fn append_transcript(&self, entry: &TranscriptEntry) -> Result<(), StorageError>;

    /// Write a snippet body to its own file
    async fn save_snippet(&self, snippet: &CodeSnippet) -> Result<PathBuf, StorageError>;

    /// Write the Markdown report next to the output document
    async fn save_report(&self, markdown: &str) -> Result<PathBuf, StorageError>;
}

/// Locations used by [`FileStorage`]
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub checkpoint: PathBuf,
    pub output: PathBuf,
    pub state: PathBuf,
    pub transcript: PathBuf,
    pub snippet_dir: PathBuf,
}

impl StoragePaths {
    /// Resolve all paths from the configuration; `output_name` is placed in the output dir
    pub fn from_config(config: &Config, output_name: &Path) -> Self {
        Self {
            checkpoint: config.checkpoint_path(),
            output: config.paths.output_dir.join(output_name),
            state: config.state_path(),
            transcript: config.transcript_path(),
            snippet_dir: config.snippet_dir(),
        }
    }

    /// Report path: the output document with an `.md` extension
    pub fn report(&self) -> PathBuf {
        self.output.with_extension("md")
    }
}

/// JSON and text files on the local filesystem
pub struct FileStorage {
    paths: StoragePaths,
}

impl FileStorage {
    pub fn new(paths: StoragePaths) -> Self {
        debug!(?paths, "FileStorage::new: called");
        Self { paths }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    fn project_path(&self, file: ProjectFile) -> &Path {
        match file {
            ProjectFile::Checkpoint => &self.paths.checkpoint,
            ProjectFile::Output => &self.paths.output,
        }
    }

    async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| StorageError::io(parent, e))?;
        }
        Ok(())
    }

    /// Write through a sibling temp file and rename over the target
    async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        debug!(path = %path.display(), bytes = contents.len(), "FileStorage::write_atomic: called");
        Self::ensure_parent(path).await?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents).await.map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, path).await.map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "FileStorage::read_json: file does not exist");
                return Ok(None);
            }
            Err(e) => return Err(StorageError::io(path, e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::json(path, e))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn save_project(&self, project: &Project, file: ProjectFile) -> Result<(), StorageError> {
        let path = self.project_path(file);
        debug!(path = %path.display(), ?file, "FileStorage::save_project: called");
        let json = serde_json::to_vec_pretty(project).map_err(|e| StorageError::json(path, e))?;
        Self::write_atomic(path, &json).await
    }

    async fn load_project(&self, file: ProjectFile) -> Result<Option<Project>, StorageError> {
        let path = self.project_path(file);
        debug!(path = %path.display(), ?file, "FileStorage::load_project: called");
        Self::read_json(path).await
    }

    async fn save_state(&self, state: &RunState) -> Result<(), StorageError> {
        debug!(iteration = state.iteration, "FileStorage::save_state: called");
        let path = &self.paths.state;
        let json = serde_json::to_vec_pretty(state).map_err(|e| StorageError::json(path, e))?;
        Self::write_atomic(path, &json).await
    }

    async fn load_state(&self) -> Result<Option<RunState>, StorageError> {
        debug!("FileStorage::load_state: called");
        Self::read_json(&self.paths.state).await
    }

    async fn append_transcript(&self, entry: &TranscriptEntry) -> Result<(), StorageError> {
        let path = &self.paths.transcript;
        debug!(iteration = entry.iteration, "FileStorage::append_transcript: called");
        Self::ensure_parent(path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| StorageError::io(path, e))?;
        file.write_all(entry.render().as_bytes())
            .await
            .map_err(|e| StorageError::io(path, e))?;
        file.flush().await.map_err(|e| StorageError::io(path, e))?;
        Ok(())
    }

    async fn save_snippet(&self, snippet: &CodeSnippet) -> Result<PathBuf, StorageError> {
        let mut snippet = snippet.clone();
        let path = self.paths.snippet_dir.join(snippet.ensure_filename(Local::now(), 0));
        debug!(path = %path.display(), "FileStorage::save_snippet: called");
        Self::ensure_parent(&path).await?;
        fs::write(&path, snippet.code.as_bytes())
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(path)
    }

    async fn save_report(&self, markdown: &str) -> Result<PathBuf, StorageError> {
        let path = self.paths.report();
        debug!(path = %path.display(), "FileStorage::save_report: called");
        Self::write_atomic(&path, markdown.as_bytes()).await?;
        Ok(path)
    }
}
