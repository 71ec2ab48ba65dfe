use crate::error::UploadError;
use crate::upload::client::ShareClient;
use crate::upload::types::{
    percent_of, SessionId, StatusRequest, UploadEvent, UploadEventKind, UploadRequest,
};
use derivative::Derivative;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Called after every event so the window wakes up to drain the channel.
pub type Repaint = Arc<dyn Fn() + Send + Sync>;

/// Runs requests off the UI thread and reports back over a channel.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct UploadWorker {
    #[derivative(Debug = "ignore")]
    runtime: Runtime,
    client: ShareClient,
    #[derivative(Debug = "ignore")]
    events: Sender<UploadEvent>,
    #[derivative(Debug = "ignore")]
    repaint: Repaint,
    active: Option<CancellationToken>,
}

impl UploadWorker {
    pub fn new(
        client: ShareClient,
        events: Sender<UploadEvent>,
        repaint: Repaint,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("share-uploader-net")
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            client,
            events,
            repaint,
            active: None,
        })
    }

    pub fn client(&self) -> &ShareClient {
        &self.client
    }

    /// Aborts the in-flight upload, if any. Its remaining events carry a
    /// stale session id and are dropped by the window.
    pub fn cancel_active(&mut self) {
        if let Some(token) = self.active.take() {
            if !token.is_cancelled() {
                debug!("Cancelling active upload");
                token.cancel();
            }
        }
    }

    pub fn spawn_upload(&mut self, request: UploadRequest) {
        self.cancel_active();
        let token = CancellationToken::new();
        self.active = Some(token.clone());

        let client = self.client.clone();
        let sender = Emitter::new(self.events.clone(), self.repaint.clone());

        self.runtime.spawn(async move {
            let session = request.session;
            let progress = sender.clone();
            let last_percent = Arc::new(AtomicU8::new(0));

            let on_progress = move |sent: u64, total: u64| {
                let percent = percent_of(sent, total);
                if last_percent.fetch_max(percent, Ordering::Relaxed) < percent {
                    progress.send(session, UploadEventKind::Progress { sent, total });
                }
            };

            match client.upload(&request, &token, on_progress).await {
                Ok(receipt) => {
                    info!(url = %receipt.url, file_id = ?receipt.file_id, "Upload complete");
                    sender.send(session, UploadEventKind::Uploaded(receipt));
                }
                Err(err) => {
                    if err == UploadError::Cancelled {
                        return;
                    }
                    error!(error = %err, detail = ?err.detail(), "Upload failed");
                    sender.send(session, UploadEventKind::Failed(err));
                }
            }
        });
    }

    pub fn spawn_status_check(&self, request: StatusRequest) {
        let client = self.client.clone();
        let sender = Emitter::new(self.events.clone(), self.repaint.clone());

        self.runtime.spawn(async move {
            let kind = match client.file_status(&request.file_id).await {
                Ok(status) => UploadEventKind::Status(status),
                Err(err) => {
                    warn!(file_id = %request.file_id, detail = ?err.detail(), "Status check failed");
                    UploadEventKind::StatusFailed(err)
                }
            };
            sender.send(request.session, kind);
        });
    }
}

impl Drop for UploadWorker {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

#[derive(Clone)]
struct Emitter {
    events: Sender<UploadEvent>,
    repaint: Repaint,
}

impl Emitter {
    fn new(events: Sender<UploadEvent>, repaint: Repaint) -> Self {
        Self { events, repaint }
    }

    fn send(&self, session: SessionId, kind: UploadEventKind) {
        // The window may already be gone.
        if self.events.send(UploadEvent { session, kind }).is_ok() {
            (self.repaint)();
        }
    }
}
