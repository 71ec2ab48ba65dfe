use crate::utils::file_size::FileSizeUtils;
use thiserror::Error;

/// Everything that can go wrong between picking a file and sharing its link.
///
/// The `Display` text is what the window shows; `detail` fields are only
/// logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Please drop or select a file first.")]
    NoFileSelected,

    #[error(
        "{} is too large. Files must be {} or smaller.",
        FileSizeUtils::format_size(*size),
        FileSizeUtils::format_size(*limit)
    )]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Could not read {name}.")]
    FileUnreadable { name: String, detail: String },

    #[error("Enter a download limit of at least 1, or turn the limit off.")]
    InvalidDownloadLimit,

    #[error("An upload is already in progress.")]
    UploadInProgress,

    #[error("This upload is finished. Select a file to start again.")]
    SessionFinished,

    #[error("Upload failed. Try again.")]
    UploadTransport { detail: String },

    #[error("Upload cancelled.")]
    Cancelled,

    #[error("Upload a file before doing that.")]
    NotUploaded,

    #[error("Could not fetch the file status.")]
    StatusFetch { detail: String },

    #[error("Could not copy the link to the clipboard.")]
    ClipboardWrite { detail: String },

    #[error("Invalid endpoint URL '{url}': {detail}")]
    InvalidEndpoint { url: String, detail: String },
}

impl UploadError {
    pub fn transport(detail: impl ToString) -> Self {
        Self::UploadTransport {
            detail: detail.to_string(),
        }
    }

    pub fn status_fetch(detail: impl ToString) -> Self {
        Self::StatusFetch {
            detail: detail.to_string(),
        }
    }

    /// The logged detail behind the user-facing message, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::FileUnreadable { detail, .. }
            | Self::UploadTransport { detail }
            | Self::StatusFetch { detail }
            | Self::ClipboardWrite { detail }
            | Self::InvalidEndpoint { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failure_hides_detail_from_message() {
        let err = UploadError::transport("connection refused");
        assert_eq!(err.to_string(), "Upload failed. Try again.");
        assert_eq!(err.detail(), Some("connection refused"));
    }

    #[test]
    fn too_large_message_uses_readable_sizes() {
        let err = UploadError::FileTooLarge {
            size: 150 * 1024 * 1024,
            limit: 100 * 1024 * 1024,
        };
        assert_eq!(
            err.to_string(),
            "150.00 MB is too large. Files must be 100.00 MB or smaller."
        );
    }
}
