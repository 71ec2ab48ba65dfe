use super::clipboard::Clipboard;
use crate::error::UploadError;
use crate::upload::{
    percent_of, FileStatus, SelectedFile, SessionId, StatusRequest, UploadEvent, UploadEventKind,
    UploadRequest, MAX_FILE_SIZE,
};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long the "Copied!" indicator stays up.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    Uploading,
    Succeeded,
    Failed,
}

impl UploadPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, UploadPhase::Succeeded | UploadPhase::Failed)
    }
}

/// State of the upload window for the current selection.
///
/// All transitions happen on the UI thread. Results from the network arrive
/// as [`UploadEvent`]s and are ignored unless they belong to the current
/// session.
#[derive(Debug, Default)]
pub struct UploadState {
    session: SessionId,
    phase: UploadPhase,
    file: Option<SelectedFile>,
    progress: u8,
    result_url: Option<String>,
    file_id: Option<String>,
    error_message: Option<String>,
    limit_enabled: bool,
    download_limit: Option<NonZeroU32>,
    limit_input_invalid: bool,
    file_status: Option<FileStatus>,
    status_pending: bool,
    copied_at: Option<Instant>,
}

impl UploadState {
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn file_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn limit_enabled(&self) -> bool {
        self.limit_enabled
    }

    pub fn download_limit(&self) -> Option<NonZeroU32> {
        self.download_limit
    }

    pub fn file_status(&self) -> Option<&FileStatus> {
        self.file_status.as_ref()
    }

    pub fn status_pending(&self) -> bool {
        self.status_pending
    }

    /// Whether the Upload button should be clickable.
    pub fn can_upload(&self) -> bool {
        self.file.is_some() && self.phase == UploadPhase::Idle
    }

    pub fn is_uploading(&self) -> bool {
        self.phase == UploadPhase::Uploading
    }

    /// The bar is only drawn for a transfer that has started but not finished.
    pub fn show_progress_bar(&self) -> bool {
        self.is_uploading() && self.progress > 0 && self.progress < 100
    }

    fn begin_session(&mut self) {
        self.session = self.session.next();
        self.phase = UploadPhase::Idle;
        self.file = None;
        self.progress = 0;
        self.result_url = None;
        self.file_id = None;
        self.error_message = None;
        self.file_status = None;
        self.status_pending = false;
        self.copied_at = None;
    }

    /// Starts a new session for `file`, discarding whatever came before.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<SessionId, UploadError> {
        if file.size > MAX_FILE_SIZE {
            let err = UploadError::FileTooLarge {
                size: file.size,
                limit: MAX_FILE_SIZE,
            };
            warn!(file = %file.name, size = file.size, "Rejected oversized file");
            self.reject_selection(err.clone());
            return Err(err);
        }

        self.begin_session();
        info!(file = %file.name, size = file.size, mime = %file.mime, "Selected file");
        self.file = Some(file);
        Ok(self.session)
    }

    /// A selection that could not be accepted still replaces the previous
    /// session.
    pub fn reject_selection(&mut self, error: UploadError) {
        self.begin_session();
        self.phase = UploadPhase::Failed;
        self.error_message = Some(error.to_string());
    }

    pub fn set_limit_enabled(&mut self, enabled: bool) {
        self.limit_enabled = enabled;
    }

    /// Accepts a positive whole number. Anything else is ignored; returns
    /// whether the limit changed.
    pub fn set_download_limit(&mut self, input: &str) -> bool {
        match parse_limit(input) {
            Some(limit) if Some(limit) != self.download_limit => {
                self.download_limit = Some(limit);
                true
            }
            _ => false,
        }
    }

    /// Records what the limit field currently shows. The stored limit keeps
    /// its last valid value, but an upload is refused while the field holds
    /// something that is not a positive whole number.
    pub fn set_limit_input(&mut self, input: &str) -> bool {
        self.limit_input_invalid = parse_limit(input).is_none();
        self.set_download_limit(input)
    }

    fn refuse(&mut self, error: UploadError) -> UploadError {
        debug!(%error, "Action refused");
        self.error_message = Some(error.to_string());
        error
    }

    /// Moves to Uploading and hands back the request for the worker.
    pub fn start_upload(&mut self) -> Result<UploadRequest, UploadError> {
        let Some(file) = self.file.clone() else {
            return Err(self.refuse(UploadError::NoFileSelected));
        };
        match self.phase {
            UploadPhase::Uploading => return Err(self.refuse(UploadError::UploadInProgress)),
            phase if phase.is_finished() => {
                return Err(self.refuse(UploadError::SessionFinished))
            }
            _ => {}
        }

        let max_downloads = if self.limit_enabled {
            match self.download_limit {
                Some(limit) if !self.limit_input_invalid => Some(limit),
                _ => return Err(self.refuse(UploadError::InvalidDownloadLimit)),
            }
        } else {
            None
        };

        self.phase = UploadPhase::Uploading;
        self.progress = 0;
        self.error_message = None;

        Ok(UploadRequest {
            session: self.session,
            file,
            max_downloads,
        })
    }

    /// Asks for the download status of the uploaded file.
    pub fn check_status(&mut self) -> Result<StatusRequest, UploadError> {
        let file_id = match self.file_id.clone() {
            Some(id) if self.phase == UploadPhase::Succeeded => id,
            _ => return Err(self.refuse(UploadError::NotUploaded)),
        };

        self.status_pending = true;
        Ok(StatusRequest {
            session: self.session,
            file_id,
        })
    }

    /// Applies a worker event. Returns false if it belonged to an older
    /// session and was dropped.
    pub fn apply(&mut self, event: UploadEvent) -> bool {
        if event.session != self.session {
            debug!(
                event_session = event.session.0,
                current = self.session.0,
                "Dropping stale event"
            );
            return false;
        }

        match event.kind {
            UploadEventKind::Progress { sent, total } => {
                if self.phase == UploadPhase::Uploading {
                    self.progress = self.progress.max(percent_of(sent, total));
                }
            }
            UploadEventKind::Uploaded(receipt) => {
                self.phase = UploadPhase::Succeeded;
                self.progress = 100;
                self.result_url = Some(receipt.url);
                self.file_id = receipt.file_id;
                self.error_message = None;
            }
            UploadEventKind::Failed(err) => {
                self.phase = UploadPhase::Failed;
                self.error_message = Some(err.to_string());
            }
            UploadEventKind::Status(status) => {
                self.status_pending = false;
                self.file_status = Some(status);
                self.error_message = None;
            }
            UploadEventKind::StatusFailed(err) => {
                self.status_pending = false;
                self.error_message = Some(err.to_string());
            }
        }
        true
    }

    pub fn copy_link(
        &mut self,
        clipboard: &mut impl Clipboard,
        now: Instant,
    ) -> Result<(), UploadError> {
        let Some(url) = self.result_url.clone() else {
            return Err(self.refuse(UploadError::NotUploaded));
        };

        match clipboard.set_text(&url) {
            Ok(()) => {
                self.copied_at = Some(now);
                Ok(())
            }
            Err(detail) => {
                self.copied_at = None;
                warn!(%detail, "Clipboard write failed");
                Err(self.refuse(UploadError::ClipboardWrite { detail }))
            }
        }
    }

    pub fn link_copied(&self, now: Instant) -> bool {
        self.copy_feedback_remaining(now).is_some()
    }

    /// Time left on the copy indicator, for scheduling the next repaint.
    pub fn copy_feedback_remaining(&self, now: Instant) -> Option<Duration> {
        self.copied_at
            .and_then(|at| COPY_FEEDBACK.checked_sub(now.saturating_duration_since(at)))
            .filter(|left| !left.is_zero())
    }

    /// Expires time-based indicators.
    pub fn tick(&mut self, now: Instant) {
        if self.copied_at.is_some() && !self.link_copied(now) {
            self.copied_at = None;
        }
    }
}

fn parse_limit(input: &str) -> Option<NonZeroU32> {
    input.trim().parse::<u32>().ok().and_then(NonZeroU32::new)
}
