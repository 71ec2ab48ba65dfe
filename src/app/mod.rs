mod clipboard;
mod state;
mod ui;

use crate::error::UploadError;
use crate::upload::{SelectedFile, UploadEvent, UploadWorker};
use clipboard::EguiClipboard;
use eframe::{egui, App};
use state::{UploadPhase, UploadState};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Instant;
use tracing::{info, warn};

/// The upload window.
pub struct ShareUploader {
    state: UploadState,
    worker: UploadWorker,
    events: Receiver<UploadEvent>,
    limit_input: String,
    last_path: Option<PathBuf>,
}

impl ShareUploader {
    pub fn new(worker: UploadWorker, events: Receiver<UploadEvent>) -> Self {
        info!(endpoint = %worker.client().endpoint().base_url(), "Initializing share uploader");
        Self {
            state: UploadState::default(),
            worker,
            events,
            limit_input: String::new(),
            last_path: None,
        }
    }

    /// Drop or picker selection. Always abandons the in-flight upload.
    pub fn select_path(&mut self, path: &Path) {
        self.worker.cancel_active();
        self.last_path = Some(path.to_path_buf());

        let selected = SelectedFile::from_path(path).and_then(|file| self.state.select_file(file));
        if let Err(err) = selected {
            warn!(path = %path.display(), error = %err, detail = ?err.detail(), "File rejected");
            if !matches!(err, UploadError::FileTooLarge { .. }) {
                self.state.reject_selection(err);
            }
        }
    }

    /// Re-selects the last path, which is how a finished session is retried.
    pub fn retry(&mut self) {
        if let Some(path) = self.last_path.clone() {
            self.select_path(&path);
        }
    }

    pub fn start_upload(&mut self) {
        match self.state.start_upload() {
            Ok(request) => {
                info!(session = self.state.session().0, file = %request.file.name, "Upload started");
                self.worker.spawn_upload(request);
            }
            Err(err) => warn!(error = %err, "Upload not started"),
        }
    }

    pub fn check_status(&mut self) {
        match self.state.check_status() {
            Ok(request) => self.worker.spawn_status_check(request),
            Err(err) => warn!(error = %err, "Status check not started"),
        }
    }

    pub fn copy_link(&mut self, ctx: &egui::Context) {
        let mut clipboard = EguiClipboard::new(ctx);
        if self.state.copy_link(&mut clipboard, Instant::now()).is_ok() {
            info!("Link copied to clipboard");
        }
    }

    pub fn open_link(&mut self) {
        if let Some(url) = self.state.result_url() {
            if let Err(e) = open::that(url) {
                warn!(%url, error = %e, "Failed to open link");
            }
        }
    }

    pub fn set_limit_input(&mut self, input: String) {
        self.state.set_limit_input(&input);
        self.limit_input = input;
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .find_map(|file| file.path.clone())
        });
        if let Some(path) = dropped {
            self.select_path(&path);
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.state.apply(event);
        }
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        self.drain_events();

        let now = Instant::now();
        self.state.tick(now);
        if let Some(left) = self.state.copy_feedback_remaining(now) {
            ctx.request_repaint_after(left);
        }

        self.handle_dropped_files(ctx);
    }
}

impl App for ShareUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
