use crate::config::UploadConfig;
use crate::services::upload_pipeline::{PostUploadEvent, UploadListener, ValidationEvent};
use crate::utils::messages::Translator;
use crate::utils::validation::{ValidationError, validate_extension, validate_file_size};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::{PathPersistError, TempPath};
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// What validation sees of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFileDescriptor {
    pub size_bytes: u64,
    /// Extension as supplied by the client, without the dot
    pub extension: String,
    pub basename: String,
}

/// An upload sitting in the spool directory.
///
/// The payload is removed when this value is dropped, so a file that never
/// reaches [`UploadIntakeHandler::finalize`] leaves nothing behind.
#[derive(Debug)]
pub struct UploadedFile {
    descriptor: UploadedFileDescriptor,
    payload: TempPath,
}

impl UploadedFile {
    pub fn new(payload: TempPath, size_bytes: u64, extension: impl Into<String>) -> Self {
        let basename = payload
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            descriptor: UploadedFileDescriptor {
                size_bytes,
                extension: extension.into(),
                basename,
            },
            payload,
        }
    }

    pub fn descriptor(&self) -> &UploadedFileDescriptor {
        &self.descriptor
    }

    pub fn path(&self) -> &Path {
        &self.payload
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FinalizeOutcome {
    pub state: u8,
    #[serde(rename = "tmpFileName")]
    pub tmp_file_name: String,
}

impl FinalizeOutcome {
    pub fn merge_into(&self, response: &mut Map<String, Value>) {
        response.insert("state".to_string(), json!(self.state));
        response.insert("tmpFileName".to_string(), json!(self.tmp_file_name));
    }
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("{message}")]
    Rejected {
        reason: ValidationError,
        message: String,
    },

    #[error("Upload I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Gates uploads against the configured limits and moves accepted files into
/// `<storage>/tmp/<tempId>`.
#[derive(Clone)]
pub struct UploadIntakeHandler {
    config: Arc<UploadConfig>,
    translator: Arc<dyn Translator>,
}

impl UploadIntakeHandler {
    pub fn new(config: Arc<UploadConfig>, translator: Arc<dyn Translator>) -> Self {
        Self { config, translator }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Runs the size check, then the extension check. An absent file passes.
    pub fn validate(&self, file: Option<&UploadedFileDescriptor>) -> Result<(), IntakeError> {
        let Some(file) = file else {
            return Ok(());
        };

        self.check(file).map_err(|reason| {
            let message = self.translator.translate(&reason.template());
            warn!(
                "🚫 Upload rejected [{}]: {} ({} bytes, .{})",
                reason.code(),
                file.basename,
                file.size_bytes,
                file.extension
            );
            IntakeError::Rejected { reason, message }
        })
    }

    /// Untranslated form of [`validate`](Self::validate).
    pub fn check(&self, file: &UploadedFileDescriptor) -> Result<(), ValidationError> {
        validate_file_size(file.size_bytes, self.config.effective_max_upload_size_mb())?;
        validate_extension(&file.extension, &self.config.allowed_extensions)
    }

    pub fn finalize(&self, file: UploadedFile, temp_id: &str) -> Result<FinalizeOutcome, IntakeError> {
        finalize_into(&self.config.storage_directory, file, temp_id)
    }
}

impl UploadListener for UploadIntakeHandler {
    fn on_validate(&self, event: &ValidationEvent<'_>) -> Result<(), IntakeError> {
        self.validate(event.file)
    }

    fn on_finalize(&self, event: &mut PostUploadEvent<'_>) -> Result<(), IntakeError> {
        let Some(file) = event.take_file() else {
            return Ok(());
        };

        let outcome = finalize_into(event.storage_directory, file, event.temp_id)?;
        outcome.merge_into(&mut event.response);
        Ok(())
    }
}

/// Moves `file` into `<storage_directory>/tmp/<temp_id>/`, keeping its basename.
///
/// Other files already in that directory are left alone.
pub fn finalize_into(
    storage_directory: &Path,
    file: UploadedFile,
    temp_id: &str,
) -> Result<FinalizeOutcome, IntakeError> {
    let target_dir = storage_directory.join("tmp").join(temp_id);
    fs::create_dir_all(&target_dir)?;

    let UploadedFile {
        descriptor,
        payload,
    } = file;
    let target = target_dir.join(&descriptor.basename);

    move_payload(payload, &target)?;

    let tmp_file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(descriptor.basename);

    info!(
        "📦 Staged upload {} ({} bytes) for tempId {}",
        tmp_file_name, descriptor.size_bytes, temp_id
    );

    Ok(FinalizeOutcome {
        state: 1,
        tmp_file_name,
    })
}

fn move_payload(payload: TempPath, target: &Path) -> io::Result<()> {
    match payload.persist(target) {
        Ok(()) => Ok(()),
        Err(PathPersistError { error, path }) if error.kind() == io::ErrorKind::CrossesDevices => {
            debug!("Rename across filesystems, copying {:?} to {:?}", path, target);
            copy_payload(path, target)
        }
        Err(e) => Err(e.error),
    }
}

/// Copies the payload to `target`, then drops it, which removes the source.
/// A failed copy removes whatever part of `target` was written.
fn copy_payload(payload: TempPath, target: &Path) -> io::Result<()> {
    if let Err(e) = fs::copy(&payload, target) {
        if let Err(cleanup) = fs::remove_file(target) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!("Could not remove partial copy {:?}: {}", target, cleanup);
            }
        }
        return Err(e);
    }
    drop(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::messages::Catalog;
    use std::io::Write;
    use std::path::PathBuf;

    fn handler(storage: &Path, max_mb: f64, allowed: &[&str]) -> UploadIntakeHandler {
        let config = UploadConfig {
            allowed_extensions: allowed.iter().map(|s| s.to_string()).collect(),
            max_upload_size_mb: max_mb,
            storage_directory: storage.to_path_buf(),
            ..UploadConfig::default()
        };
        UploadIntakeHandler::new(Arc::new(config), Arc::new(Catalog::english()))
    }

    fn descriptor(size_bytes: u64, extension: &str) -> UploadedFileDescriptor {
        UploadedFileDescriptor {
            size_bytes,
            extension: extension.to_string(),
            basename: format!("upload.{}", extension),
        }
    }

    fn spooled(dir: &Path, extension: &str, contents: &[u8]) -> UploadedFile {
        let mut tmp = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(dir)
            .unwrap();
        tmp.write_all(contents).unwrap();
        UploadedFile::new(tmp.into_temp_path(), contents.len() as u64, extension)
    }

    #[test]
    fn test_absent_file_passes() {
        let h = handler(Path::new("unused"), 0.0, &[]);
        assert!(h.validate(None).is_ok());
    }

    #[test]
    fn test_file_within_limits_passes() {
        let h = handler(Path::new("unused"), 10.0, &["pdf", "png"]);
        assert!(h.validate(Some(&descriptor(10 * 1_048_576, "pdf"))).is_ok());
        assert!(h.validate(Some(&descriptor(0, "PNG"))).is_ok());
    }

    #[test]
    fn test_oversized_file_is_rejected_with_rounded_sizes() {
        let h = handler(Path::new("unused"), 10.0, &["pdf"]);
        let err = h
            .validate(Some(&descriptor(11_534_336, "pdf")))
            .unwrap_err();

        match err {
            IntakeError::Rejected { reason, message } => {
                assert_eq!(
                    reason,
                    ValidationError::FileTooLarge {
                        file_size_mb: 11.0,
                        max_size_mb: 10.0,
                    }
                );
                assert!(message.contains("11.0 MB"));
                assert!(message.contains("10.0 MB"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_size_is_checked_before_extension() {
        let h = handler(Path::new("unused"), 1.0, &["pdf"]);
        let reason = h.check(&descriptor(2 * 1_048_576, "exe")).unwrap_err();
        assert_eq!(reason.code(), "FILE_TOO_LARGE");
    }

    #[test]
    fn test_disallowed_extension_is_rejected() {
        let h = handler(Path::new("unused"), 10.0, &["jpg", "png"]);
        let err = h.validate(Some(&descriptor(1024, "GIF"))).unwrap_err();

        match err {
            IntakeError::Rejected { reason, message } => {
                assert_eq!(
                    reason,
                    ValidationError::ExtensionNotAllowed {
                        file_extension: "GIF".to_string(),
                        extensions: "jpg, png".to_string(),
                    }
                );
                assert_eq!(
                    message,
                    "The file extension GIF is not allowed. Allowed extensions: jpg, png."
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_limit_is_capped_by_request_body_limit() {
        let config = UploadConfig {
            allowed_extensions: vec!["pdf".to_string()],
            max_upload_size_mb: 100.0,
            request_body_limit_mb: 1.0,
            ..UploadConfig::default()
        };
        let h = UploadIntakeHandler::new(Arc::new(config), Arc::new(Catalog::english()));
        let reason = h.check(&descriptor(2 * 1_048_576, "pdf")).unwrap_err();
        assert_eq!(
            reason,
            ValidationError::FileTooLarge {
                file_size_mb: 2.0,
                max_size_mb: 1.0,
            }
        );
    }

    #[test]
    fn test_finalize_moves_file_into_temp_dir() {
        let storage = tempfile::tempdir().unwrap();
        let spool = tempfile::tempdir().unwrap();
        let h = handler(storage.path(), 10.0, &["pdf"]);

        let file = spooled(spool.path(), "pdf", b"%PDF-1.5 hello");
        let source: PathBuf = file.path().to_path_buf();
        let basename = file.descriptor().basename.clone();

        let outcome = h.finalize(file, "5f1a2b3c").unwrap();

        assert_eq!(outcome.state, 1);
        assert_eq!(outcome.tmp_file_name, basename);
        assert!(!source.exists());

        let target = storage.path().join("tmp").join("5f1a2b3c").join(&basename);
        assert_eq!(fs::read(&target).unwrap(), b"%PDF-1.5 hello");
    }

    #[test]
    fn test_finalize_keeps_sibling_files() {
        let storage = tempfile::tempdir().unwrap();
        let spool = tempfile::tempdir().unwrap();
        let h = handler(storage.path(), 10.0, &["png"]);

        let first = h.finalize(spooled(spool.path(), "png", b"one"), "session").unwrap();
        let second = h.finalize(spooled(spool.path(), "png", b"two"), "session").unwrap();

        let dir = storage.path().join("tmp").join("session");
        assert!(dir.join(&first.tmp_file_name).exists());
        assert!(dir.join(&second.tmp_file_name).exists());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);
    }

    #[test]
    fn test_finalize_merges_response_fields() {
        let outcome = FinalizeOutcome {
            state: 1,
            tmp_file_name: "abc.pdf".to_string(),
        };
        let mut response = Map::new();
        response.insert("success".to_string(), json!(true));
        outcome.merge_into(&mut response);

        assert_eq!(response["state"], json!(1));
        assert_eq!(response["tmpFileName"], json!("abc.pdf"));
        assert_eq!(response["success"], json!(true));
    }

    #[test]
    fn test_copy_fallback_copies_then_removes_source() {
        let spool = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let file = spooled(spool.path(), "pdf", b"payload");
        let source = file.path().to_path_buf();
        let target = dest.path().join("copied.pdf");

        copy_payload(file.payload, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"payload");
        assert!(!source.exists());
    }

    #[test]
    fn test_failed_copy_leaves_no_partial_target() {
        let spool = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let file = spooled(spool.path(), "pdf", b"payload");
        fs::remove_file(file.path()).unwrap();

        let target = dest.path().join("partial.pdf");
        fs::write(&target, b"pay").unwrap();

        let err = copy_payload(file.payload, &target).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!target.exists());
    }

    #[test]
    fn test_finalize_propagates_io_errors() {
        let storage = tempfile::tempdir().unwrap();
        let spool = tempfile::tempdir().unwrap();

        // A plain file where the tmp directory should go
        let blocker = storage.path().join("tmp");
        fs::write(&blocker, b"not a directory").unwrap();

        let h = handler(storage.path(), 10.0, &["pdf"]);
        let file = spooled(spool.path(), "pdf", b"data");
        let source = file.path().to_path_buf();

        let err = h.finalize(file, "abc").unwrap_err();
        assert!(matches!(err, IntakeError::Io(_)));
        // The file was never moved, so dropping it cleaned the spool
        assert!(!source.exists());
    }
}
