use std::env;
use std::path::PathBuf;

/// Extensions accepted for asset uploads when `ALLOWED_EXTENSIONS` is unset.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "csv", "doc", "docx", "epub", "gif", "jpg", "jpeg", "mpg", "mpeg", "mp3", "odt", "odp", "ods",
    "pdf", "png", "ppt", "pptx", "tif", "tiff", "txt", "xls", "xlsx", "wav",
];

/// Upload intake configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Extensions a file may carry, compared case-insensitively
    pub allowed_extensions: Vec<String>,

    /// Maximum asset size in megabytes (default: 6)
    pub max_upload_size_mb: f64,

    /// Largest request body the HTTP layer accepts, in megabytes (default: 64)
    pub request_body_limit_mb: f64,

    /// Root of asset storage; finalized uploads land in `<dir>/tmp/<tempId>`
    pub storage_directory: PathBuf,

    /// Where in-flight uploads are written before validation
    pub spool_directory: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_upload_size_mb: 6.0,
            request_body_limit_mb: 64.0,
            storage_directory: PathBuf::from("media/files"),
            spool_directory: None,
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            allowed_extensions: var("ALLOWED_EXTENSIONS")
                .map(|v| parse_extension_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(default.allowed_extensions),

            max_upload_size_mb: var("MAX_UPLOAD_SIZE_MB")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(default.max_upload_size_mb),

            request_body_limit_mb: var("REQUEST_BODY_LIMIT_MB")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(default.request_body_limit_mb),

            storage_directory: var("UPLOAD_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.storage_directory),

            spool_directory: var("UPLOAD_SPOOL_DIR").map(PathBuf::from),
        }
    }

    /// Create config for development (relaxed limits)
    pub fn development() -> Self {
        Self {
            max_upload_size_mb: 256.0,
            request_body_limit_mb: 512.0,
            ..Self::default()
        }
    }

    /// Upload limit actually enforced: the configured size capped by the
    /// transport limit.
    pub fn effective_max_upload_size_mb(&self) -> f64 {
        self.max_upload_size_mb.min(self.request_body_limit_mb)
    }

    /// Request body ceiling in bytes, as handed to axum's `DefaultBodyLimit`.
    pub fn request_body_limit_bytes(&self) -> usize {
        (self.request_body_limit_mb * 1024.0 * 1024.0) as usize
    }

    pub fn temp_root(&self) -> PathBuf {
        self.storage_directory.join("tmp")
    }

    pub fn spool_root(&self) -> PathBuf {
        self.spool_directory
            .clone()
            .unwrap_or_else(|| self.temp_root().join(".spool"))
    }
}

fn parse_extension_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
