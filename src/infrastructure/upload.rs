//! Validation and storage of uploaded files under the public uploads directory

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use rand::RngCore;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::infrastructure::helpers::is_safe_relative;

/// URL prefix the upload directory is served under
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Transport-level failure reported for an upload before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFailure {
    IniSize,
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
    Unknown,
}

impl UploadFailure {
    pub fn message(&self) -> &'static str {
        match self {
            Self::IniSize => "File exceeds maximum size allowed by server.",
            Self::FormSize => "File exceeds maximum size specified in form.",
            Self::Partial => "File was only partially uploaded.",
            Self::NoFile => "No file was uploaded.",
            Self::NoTmpDir => "Missing temporary upload directory.",
            Self::CantWrite => "Failed to write file to disk.",
            Self::Extension => "File upload stopped by extension.",
            Self::Unknown => "Unknown upload error.",
        }
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A file received from a client
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub field_name: Option<String>,
    pub client_filename: Option<String>,
    pub media_type: Option<String>,
    pub data: Bytes,
    pub error: Option<UploadFailure>,
}

impl UploadedFile {
    pub fn new(
        client_filename: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            field_name: None,
            client_filename: Some(client_filename.into()),
            media_type: Some(media_type.into()),
            data: data.into(),
            error: None,
        }
    }

    pub fn failed(failure: UploadFailure) -> Self {
        Self {
            error: Some(failure),
            ..Default::default()
        }
    }

    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Limits applied by [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub allowed_types: Vec<String>,
    pub max_size: u64,
}

impl UploadOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            allowed_types: settings.upload.allowed_types.clone(),
            max_size: settings.upload.max_size,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("{0}")]
    Failed(UploadFailure),

    #[error("File size exceeds maximum allowed size of {max_size_mb}MB.")]
    TooLarge { max_size_mb: String },

    #[error("Invalid file type. Please upload a supported file format.")]
    InvalidType { media_type: Option<String> },

    #[error("Invalid upload directory: {0}")]
    InvalidDirectory(String),

    #[error("Failed to save file: {0}")]
    Save(String),
}

/// A file written to the uploads directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredUpload {
    /// Public path, suitable for storing in the database
    pub path: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchUploadResult {
    pub successful: Vec<StoredUpload>,
    pub failed: Vec<String>,
}

/// Check transport errors, then size, then media type
pub fn validate(file: &UploadedFile, options: &UploadOptions) -> Result<(), UploadError> {
    if let Some(failure) = file.error {
        return Err(UploadError::Failed(failure));
    }

    if file.size() > options.max_size {
        return Err(UploadError::TooLarge {
            max_size_mb: format_megabytes(options.max_size),
        });
    }

    let allowed = file
        .media_type
        .as_deref()
        .map(|media_type| options.allowed_types.iter().any(|t| t == media_type))
        .unwrap_or(false);

    if !allowed {
        return Err(UploadError::InvalidType {
            media_type: file.media_type.clone(),
        });
    }

    Ok(())
}

/// `{unix_timestamp}_{16 hex chars}` plus the lowercased extension.
///
/// The extension comes from the client filename, falling back to the media
/// type when the name has none.
pub fn generate_unique_filename(file: &UploadedFile) -> String {
    let mut random = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut random);

    let mut name = format!("{}_{}", chrono::Utc::now().timestamp(), hex::encode(random));

    if let Some(extension) = file_extension(file) {
        name.push('.');
        name.push_str(&extension);
    }

    name
}

fn file_extension(file: &UploadedFile) -> Option<String> {
    let from_name = file
        .client_filename
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_lowercase());

    from_name.or_else(|| file.media_type.as_deref().and_then(media_type_extension))
}

/// Conventional extension for a media type.
///
/// `mime_guess` lists extensions alphabetically, so common types are
/// pinned before falling back to its first entry.
fn media_type_extension(media_type: &str) -> Option<String> {
    let pinned = match media_type {
        "image/jpeg" => Some("jpg"),
        "image/tiff" => Some("tif"),
        "text/plain" => Some("txt"),
        "text/html" => Some("html"),
        "audio/mpeg" => Some("mp3"),
        "video/mpeg" => Some("mpg"),
        _ => None,
    };

    pinned
        .or_else(|| {
            mime_guess::get_mime_extensions_str(media_type).and_then(|exts| exts.first().copied())
        })
        .map(str::to_string)
}

/// Megabytes rounded to two decimals without trailing zeros
fn format_megabytes(bytes: u64) -> String {
    let megabytes = (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;
    let formatted = format!("{:.2}", megabytes);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Writes validated uploads below a fixed root directory
#[derive(Debug, Clone)]
pub struct UploadHelper {
    upload_dir: PathBuf,
    options: UploadOptions,
}

impl UploadHelper {
    pub fn new(upload_dir: impl Into<PathBuf>, options: UploadOptions) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            options,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.app.resolve(&settings.upload.dir),
            UploadOptions::from_settings(settings),
        )
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Options taken from the `upload` settings
    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Validate and store `file` under `directory` (e.g. `profiles`)
    pub async fn process_upload(
        &self,
        file: &UploadedFile,
        directory: &str,
        options: &UploadOptions,
    ) -> Result<StoredUpload, UploadError> {
        validate(file, options)?;

        if !is_safe_relative(Path::new(directory)) {
            return Err(UploadError::InvalidDirectory(directory.to_string()));
        }
        let directory = directory.trim_end_matches('/');

        let filename = generate_unique_filename(file);

        let target_dir = if directory.is_empty() {
            self.upload_dir.clone()
        } else {
            self.upload_dir.join(directory)
        };

        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| UploadError::Save(e.to_string()))?;

        let target = target_dir.join(&filename);
        tokio::fs::write(&target, &file.data).await.map_err(|e| {
            warn!(path = %target.display(), error = %e, "Failed to store upload");
            UploadError::Save(e.to_string())
        })?;

        let mut path = UPLOADS_URL_PREFIX.to_string();
        if !directory.is_empty() {
            path.push('/');
            path.push_str(directory);
        }
        path.push('/');
        path.push_str(&filename);

        debug!(path = %path, size = file.size(), "Stored upload");

        Ok(StoredUpload {
            path,
            filename,
            size: file.size(),
        })
    }

    /// Process every file; files that arrived with a transport error are skipped
    pub async fn process_multiple_uploads(
        &self,
        files: &[UploadedFile],
        directory: &str,
        options: &UploadOptions,
    ) -> BatchUploadResult {
        let mut result = BatchUploadResult::default();

        for file in files.iter().filter(|f| f.error.is_none()) {
            match self.process_upload(file, directory, options).await {
                Ok(stored) => result.successful.push(stored),
                Err(e) => result.failed.push(e.to_string()),
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(size: usize) -> UploadedFile {
        UploadedFile::new("Photo.PNG", "image/png", vec![0u8; size])
    }

    #[test]
    fn test_validate_accepts_allowed_type() {
        assert!(validate(&png(10), &UploadOptions::default()).is_ok());
    }

    #[test]
    fn test_validate_reports_transport_error_first() {
        let file = UploadedFile::failed(UploadFailure::Partial);
        let err = validate(&file, &UploadOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "File was only partially uploaded.");
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let options = UploadOptions::default().with_max_size(1024 * 1024);
        let err = validate(&png(1024 * 1024 + 1), &options).unwrap_err();
        assert_eq!(err.to_string(), "File size exceeds maximum allowed size of 1MB.");

        let options = UploadOptions::default().with_max_size(2_621_440);
        let err = validate(&png(3_000_000), &options).unwrap_err();
        assert_eq!(err.to_string(), "File size exceeds maximum allowed size of 2.5MB.");
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let file = UploadedFile::new("run.exe", "application/x-msdownload", vec![1, 2, 3]);
        let err = validate(&file, &UploadOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid file type. Please upload a supported file format."
        );

        let mut untyped = png(1);
        untyped.media_type = None;
        assert!(validate(&untyped, &UploadOptions::default()).is_err());
    }

    #[test]
    fn test_unique_filename_shape() {
        let name = generate_unique_filename(&png(1));
        let (stem, ext) = name.rsplit_once('.').unwrap();
        let (timestamp, random) = stem.split_once('_').unwrap();

        assert_eq!(ext, "png");
        assert!(timestamp.parse::<i64>().is_ok());
        assert_eq!(random.len(), 16);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(name, generate_unique_filename(&png(1)));
    }

    #[test]
    fn test_unique_filename_without_extension() {
        let mut file = UploadedFile::new("README", "application/x-unknown-thing", vec![]);
        assert!(!generate_unique_filename(&file).contains('.'));

        file.media_type = Some("application/pdf".to_string());
        assert!(generate_unique_filename(&file).ends_with(".pdf"));
    }

    #[test]
    fn test_media_type_extension_is_conventional() {
        let file = UploadedFile::new("photo", "image/jpeg", vec![]);
        assert!(generate_unique_filename(&file).ends_with(".jpg"));

        assert_eq!(media_type_extension("text/plain").as_deref(), Some("txt"));
        assert_eq!(media_type_extension("image/png").as_deref(), Some("png"));
        assert_eq!(media_type_extension("application/x-unknown-thing"), None);
    }

    #[tokio::test]
    async fn test_process_upload_stores_file() {
        let dir = tempfile::tempdir().unwrap();
        let helper = UploadHelper::new(dir.path(), UploadOptions::default());

        let stored = helper
            .process_upload(&png(4), "profiles", helper.options())
            .await
            .unwrap();

        assert!(stored.path.starts_with("/uploads/profiles/"));
        assert!(stored.path.ends_with(&stored.filename));
        assert_eq!(stored.size, 4);

        let bytes = std::fs::read(dir.path().join("profiles").join(&stored.filename)).unwrap();
        assert_eq!(bytes.len(), 4);
    }

    #[tokio::test]
    async fn test_process_upload_without_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let helper = UploadHelper::new(dir.path(), UploadOptions::default());

        let stored = helper.process_upload(&png(1), "", helper.options()).await.unwrap();
        assert_eq!(stored.path, format!("/uploads/{}", stored.filename));
    }

    #[tokio::test]
    async fn test_process_upload_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let helper = UploadHelper::new(dir.path().join("uploads"), UploadOptions::default());

        let err = helper
            .process_upload(&png(1), "../outside", helper.options())
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::InvalidDirectory(_)));
        assert!(!dir.path().join("outside").exists());
    }

    #[tokio::test]
    async fn test_process_upload_rejects_absolute_directory() {
        let dir = tempfile::tempdir().unwrap();
        let helper = UploadHelper::new(dir.path(), UploadOptions::default());

        let err = helper
            .process_upload(&png(1), "/etc", helper.options())
            .await
            .unwrap_err();

        assert_eq!(err, UploadError::InvalidDirectory("/etc".to_string()));
        assert!(!dir.path().join("etc").exists());
    }

    #[tokio::test]
    async fn test_process_upload_allows_trailing_slash() {
        let dir = tempfile::tempdir().unwrap();
        let helper = UploadHelper::new(dir.path(), UploadOptions::default());

        let stored = helper
            .process_upload(&png(1), "profiles/", helper.options())
            .await
            .unwrap();
        assert_eq!(stored.path, format!("/uploads/profiles/{}", stored.filename));
    }

    #[tokio::test]
    async fn test_process_multiple_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let helper = UploadHelper::new(dir.path(), UploadOptions::default());

        let files = vec![
            png(2),
            UploadedFile::new("notes.txt", "text/plain", vec![1]),
            UploadedFile::failed(UploadFailure::NoFile),
        ];

        let result = helper
            .process_multiple_uploads(&files, "docs", helper.options())
            .await;

        assert_eq!(result.successful.len(), 1);
        assert_eq!(
            result.failed,
            vec!["Invalid file type. Please upload a supported file format.".to_string()]
        );
    }
}
