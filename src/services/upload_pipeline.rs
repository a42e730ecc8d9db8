//! Drives a single upload through spooling, validation and finalize.
//!
//! Listeners are registered explicitly and see two events in order: a
//! [`ValidationEvent`] before the file goes anywhere permanent, then a
//! [`PostUploadEvent`] carrying the file, the request's `tempId` and the
//! response object they may write into.

use crate::config::UploadConfig;
use crate::services::upload_intake::{IntakeError, UploadedFile, UploadedFileDescriptor};
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

pub struct ValidationEvent<'a> {
    pub file: Option<&'a UploadedFileDescriptor>,
}

pub struct PostUploadEvent<'a> {
    pub temp_id: &'a str,
    pub storage_directory: &'a Path,
    pub response: Map<String, Value>,
    file: Option<UploadedFile>,
}

impl PostUploadEvent<'_> {
    pub fn file(&self) -> Option<&UploadedFile> {
        self.file.as_ref()
    }

    /// Takes ownership of the file; later listeners see `None`.
    pub fn take_file(&mut self) -> Option<UploadedFile> {
        self.file.take()
    }
}

pub trait UploadListener: Send + Sync {
    fn on_validate(&self, event: &ValidationEvent<'_>) -> Result<(), IntakeError>;

    fn on_finalize(&self, event: &mut PostUploadEvent<'_>) -> Result<(), IntakeError>;
}

pub struct UploadPipeline {
    config: Arc<UploadConfig>,
    listeners: Vec<Arc<dyn UploadListener>>,
}

impl UploadPipeline {
    pub fn new(config: Arc<UploadConfig>) -> Self {
        Self {
            config,
            listeners: Vec::new(),
        }
    }

    pub fn register(&mut self, listener: Arc<dyn UploadListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Opens a spool file named `<uuid>.<extension>` for an incoming upload.
    pub async fn begin_spool(&self, extension: &str) -> io::Result<SpooledUpload> {
        let dir = self.config.spool_root();
        tokio::fs::create_dir_all(&dir).await?;

        let (file, path) = tempfile::Builder::new()
            .prefix(&Uuid::new_v4().to_string())
            .suffix(&spool_suffix(extension))
            .rand_bytes(0)
            .tempfile_in(&dir)?
            .into_parts();

        debug!("Spooling upload to {:?}", path);

        Ok(SpooledUpload {
            file: tokio::fs::File::from_std(file),
            path,
            extension: extension.to_string(),
            size_bytes: 0,
        })
    }

    /// Raises the validation event, then the post-upload event, and returns the
    /// response object the listeners built. Stops at the first listener error.
    pub fn process(
        &self,
        temp_id: &str,
        file: Option<UploadedFile>,
    ) -> Result<Map<String, Value>, IntakeError> {
        let validation = ValidationEvent {
            file: file.as_ref().map(|f| f.descriptor()),
        };
        for listener in &self.listeners {
            listener.on_validate(&validation)?;
        }

        let mut event = PostUploadEvent {
            temp_id,
            storage_directory: &self.config.storage_directory,
            response: Map::new(),
            file,
        };
        if event.file.is_some() {
            for listener in &self.listeners {
                listener.on_finalize(&mut event)?;
            }
        }

        Ok(event.response)
    }
}

/// An upload being written to the spool directory.
pub struct SpooledUpload {
    file: tokio::fs::File,
    path: TempPath,
    extension: String,
    size_bytes: u64,
}

impl SpooledUpload {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.size_bytes += chunk.len() as u64;
        Ok(())
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn path(&self) -> PathBuf {
        self.path.to_path_buf()
    }

    pub async fn finish(mut self) -> io::Result<UploadedFile> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(UploadedFile::new(self.path, self.size_bytes, self.extension))
    }
}

// Client extensions only reach the filesystem when they are plain alphanumerics
fn spool_suffix(extension: &str) -> String {
    if !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        format!(".{}", extension)
    } else {
        String::new()
    }
}
