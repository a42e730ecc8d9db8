use crate::utils::messages::{FILE_EXTENSION_KEY, FILE_SIZE_KEY, MessageTemplate};
use thiserror::Error;

pub const BYTES_PER_MEGABYTE: u64 = 1_048_576;

/// A file rejected by upload validation. Both cases are recoverable by the
/// user submitting a different file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("File size {file_size_mb} MB exceeds maximum allowed {max_size_mb} MB")]
    FileTooLarge { file_size_mb: f64, max_size_mb: f64 },

    #[error("File extension '{file_extension}' is not allowed (allowed: {extensions})")]
    ExtensionNotAllowed {
        file_extension: String,
        extensions: String,
    },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ValidationError::ExtensionNotAllowed { .. } => "EXTENSION_NOT_ALLOWED",
        }
    }

    pub fn template(&self) -> MessageTemplate {
        match self {
            ValidationError::FileTooLarge {
                file_size_mb,
                max_size_mb,
            } => MessageTemplate::new(FILE_SIZE_KEY)
                .with("fileSize", format_megabytes(*file_size_mb))
                .with("maxSize", format_megabytes(*max_size_mb)),
            ValidationError::ExtensionNotAllowed {
                file_extension,
                extensions,
            } => MessageTemplate::new(FILE_EXTENSION_KEY)
                .with("fileExtension", file_extension.clone())
                .with("extensions", extensions.clone()),
        }
    }
}

/// Validates file size against a limit given in megabytes
pub fn validate_file_size(size_bytes: u64, max_size_mb: f64) -> Result<(), ValidationError> {
    let max_size_bytes = max_size_mb * BYTES_PER_MEGABYTE as f64;

    if size_bytes as f64 > max_size_bytes {
        return Err(ValidationError::FileTooLarge {
            file_size_mb: round_to_cents(size_bytes as f64 / BYTES_PER_MEGABYTE as f64),
            max_size_mb: round_to_cents(max_size_bytes / BYTES_PER_MEGABYTE as f64),
        });
    }
    Ok(())
}

/// Validates an extension against the allow-list, ignoring case on both sides
pub fn validate_extension(extension: &str, allowed: &[String]) -> Result<(), ValidationError> {
    let ext_lower = extension.to_lowercase();

    if allowed.iter().any(|a| a.to_lowercase() == ext_lower) {
        return Ok(());
    }

    Err(ValidationError::ExtensionNotAllowed {
        file_extension: extension.to_string(),
        extensions: allowed.join(", "),
    })
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Renders a megabyte figure with at most two decimals, keeping one so that
/// whole numbers read as `11.0`.
pub fn format_megabytes(value: f64) -> String {
    let fixed = format!("{:.2}", round_to_cents(value));
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}
