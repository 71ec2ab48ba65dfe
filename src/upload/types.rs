use crate::error::UploadError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use url::Url;

/// Largest file accepted for upload: 100 MiB.
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Identifies one selection-through-upload lifecycle. Bumped on every
/// selection so results of an abandoned upload can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn next(self) -> Self {
        SessionId(self.0 + 1)
    }
}

/// A file the user dropped or picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub mime: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            name,
            path,
            size,
            mime,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let unreadable = |detail: String| UploadError::FileUnreadable {
            name: path.display().to_string(),
            detail,
        };

        let metadata = fs::metadata(path).map_err(|e| unreadable(e.to_string()))?;
        if !metadata.is_file() {
            return Err(unreadable("not a regular file".to_string()));
        }

        Ok(Self::new(path, metadata.len()))
    }

    /// Upper-cased extension for display, taken from the name or, failing
    /// that, from the guessed MIME type.
    pub fn extension(&self) -> Option<String> {
        let from_name = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        from_name
            .or_else(|| {
                mime_guess::get_mime_extensions_str(&self.mime)
                    .and_then(|exts| exts.first())
                    .map(|e| e.to_string())
            })
            .map(|e| e.to_uppercase())
    }
}

/// Everything the worker needs to perform one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub session: SessionId,
    pub file: SelectedFile,
    pub max_downloads: Option<NonZeroU32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRequest {
    pub session: SessionId,
    pub file_id: String,
}

/// Body returned by `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub path: String,
    #[serde(default)]
    pub id: Option<String>,
}

/// A finished upload: the shareable link and the id used for status checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub url: String,
    pub file_id: Option<String>,
}

impl From<UploadResponse> for UploadReceipt {
    fn from(response: UploadResponse) -> Self {
        let file_id = response
            .id
            .filter(|id| !id.is_empty())
            .or_else(|| trailing_segment(&response.path));

        Self {
            url: response.path,
            file_id,
        }
    }
}

/// Last non-empty path segment of a link, ignoring query and fragment.
pub fn trailing_segment(link: &str) -> Option<String> {
    if let Ok(url) = Url::parse(link) {
        return url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string);
    }

    link.split(&['?', '#'][..])
        .next()
        .and_then(|path| path.rsplit('/').find(|s| !s.is_empty()))
        .map(str::to_string)
}

/// Body returned by `GET /file/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    pub download_count: u64,
    #[serde(default)]
    pub max_downloads: Option<u64>,
    pub expired: bool,
}

impl FileStatus {
    pub fn summary(&self) -> String {
        if self.expired {
            return format!("Expired after {} downloads", self.download_count);
        }

        match self.max_downloads {
            Some(max) => format!("Downloads: {} of {}", self.download_count, max),
            None => format!("Downloads: {} (no limit)", self.download_count),
        }
    }
}

/// `round(sent / total * 100)`, clamped to 100. An empty body is complete.
pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total) as u128;
    let total = total as u128;
    ((sent * 100 + total / 2) / total) as u8
}

/// Messages from the background worker to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    pub session: SessionId,
    pub kind: UploadEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEventKind {
    Progress { sent: u64, total: u64 },
    Uploaded(UploadReceipt),
    Failed(UploadError),
    Status(FileStatus),
    StatusFailed(UploadError),
}
