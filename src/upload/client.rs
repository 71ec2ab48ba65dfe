use crate::config::EndpointConfig;
use crate::error::UploadError;
use crate::upload::types::{
    FileStatus, UploadReceipt, UploadRequest, UploadResponse, MAX_FILE_SIZE,
};
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// HTTP side of the uploader: one multipart POST per upload and an optional
/// status GET afterwards.
#[derive(Clone, Debug)]
pub struct ShareClient {
    client: Client,
    endpoint: EndpointConfig,
}

impl ShareClient {
    pub fn new(endpoint: EndpointConfig) -> Result<Self, UploadError> {
        let client = Client::builder().build().map_err(UploadError::transport)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Streams the file to `POST /upload`.
    ///
    /// `on_progress(sent, total)` is called as file bytes are handed to the
    /// connection. Cancelling `cancel` drops the request and returns
    /// [`UploadError::Cancelled`].
    pub async fn upload<F>(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<UploadReceipt, UploadError>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let file = &request.file;
        let unreadable = |detail: String| UploadError::FileUnreadable {
            name: file.name.clone(),
            detail,
        };
        let handle = tokio::fs::File::open(&file.path)
            .await
            .map_err(|e| unreadable(e.to_string()))?;

        // The file may have changed between selection and upload.
        let total = handle
            .metadata()
            .await
            .map_err(|e| unreadable(e.to_string()))?
            .len();
        if total > MAX_FILE_SIZE {
            return Err(UploadError::FileTooLarge {
                size: total,
                limit: MAX_FILE_SIZE,
            });
        }
        if total != file.size {
            return Err(unreadable(format!(
                "size changed from {} to {} bytes since selection",
                file.size, total
            )));
        }

        let sent = Arc::new(AtomicU64::new(0));
        let body = ReaderStream::new(handle).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                let len = bytes.len() as u64;
                let now = sent.fetch_add(len, Ordering::Relaxed) + len;
                on_progress(now, total);
            }
            chunk
        });

        let part = Part::stream_with_length(Body::wrap_stream(body), total)
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(UploadError::transport)?;

        let mut form = Form::new().part("file", part);
        if let Some(limit) = request.max_downloads {
            form = form.text("maxDownloads", limit.to_string());
        }

        let url = self.endpoint.upload_url();
        info!(
            file = %file.name,
            size = total,
            max_downloads = ?request.max_downloads,
            %url,
            "Uploading file"
        );

        let exchange = async {
            let response = self
                .client
                .post(&url)
                .multipart(form)
                .send()
                .await
                .map_err(UploadError::transport)?
                .error_for_status()
                .map_err(UploadError::transport)?;

            let body: UploadResponse = response.json().await.map_err(UploadError::transport)?;
            debug!(path = %body.path, id = ?body.id, "Upload response");
            Ok::<_, UploadError>(UploadReceipt::from(body))
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(file = %file.name, "Upload cancelled");
                Err(UploadError::Cancelled)
            }
            result = exchange => result,
        }
    }

    /// `GET /file/{id}/status`.
    pub async fn file_status(&self, file_id: &str) -> Result<FileStatus, UploadError> {
        let url = self.endpoint.status_url(file_id);
        debug!(%url, "Fetching file status");

        self.client
            .get(&url)
            .send()
            .await
            .map_err(UploadError::status_fetch)?
            .error_for_status()
            .map_err(UploadError::status_fetch)?
            .json::<FileStatus>()
            .await
            .map_err(UploadError::status_fetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::types::{SelectedFile, SessionId};
    use axum::extract::{Multipart, Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::num::NonZeroU32;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockServer {
        uploads: AtomicUsize,
        fields: Mutex<Vec<(String, Vec<u8>)>>,
        reply: Mutex<Option<Value>>,
    }

    async fn upload_handler(
        State(server): State<Arc<MockServer>>,
        mut multipart: Multipart,
    ) -> Result<Json<Value>, StatusCode> {
        server.uploads.fetch_add(1, Ordering::SeqCst);

        let mut fields = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?
        {
            let name = field.name().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            fields.push((name, data.to_vec()));
        }
        *server.fields.lock().unwrap() = fields;

        match server.reply.lock().unwrap().clone() {
            Some(reply) => Ok(Json(reply)),
            None => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    async fn status_handler(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
        if id == "abc123" {
            Ok(Json(
                json!({ "downloadCount": 2, "maxDownloads": 5, "expired": false }),
            ))
        } else {
            Err(StatusCode::NOT_FOUND)
        }
    }

    async fn serve(router: Router) -> EndpointConfig {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        EndpointConfig::new(&format!("http://{}", addr)).unwrap()
    }

    async fn mock(reply: Option<Value>) -> (ShareClient, Arc<MockServer>) {
        let server = Arc::new(MockServer {
            reply: Mutex::new(reply),
            ..Default::default()
        });
        let router = Router::new()
            .route("/upload", post(upload_handler))
            .route("/file/:id/status", get(status_handler))
            .with_state(server.clone());
        let client = ShareClient::new(serve(router).await).unwrap();
        (client, server)
    }

    fn request_for(dir: &TempDir, name: &str, contents: &[u8]) -> UploadRequest {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        UploadRequest {
            session: SessionId(1),
            file: SelectedFile::from_path(&path).unwrap(),
            max_downloads: None,
        }
    }

    #[tokio::test]
    async fn upload_posts_file_once_and_reports_progress() {
        let (client, server) = mock(Some(json!({ "path": "https://host/f/abc123" }))).await;
        let dir = TempDir::new().unwrap();
        let contents = vec![7u8; 64 * 1024];
        let request = request_for(&dir, "report.pdf", &contents);

        let ticks = Arc::new(Mutex::new(Vec::new()));
        let seen = ticks.clone();
        let receipt = client
            .upload(&request, &CancellationToken::new(), move |sent, total| {
                seen.lock().unwrap().push((sent, total));
            })
            .await
            .unwrap();

        assert_eq!(receipt.url, "https://host/f/abc123");
        assert_eq!(receipt.file_id.as_deref(), Some("abc123"));
        assert_eq!(server.uploads.load(Ordering::SeqCst), 1);

        let fields = server.fields.lock().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "file");
        assert_eq!(fields[0].1, contents);

        let ticks = ticks.lock().unwrap();
        assert!(!ticks.is_empty());
        assert!(ticks.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(ticks.last(), Some(&(64 * 1024, 64 * 1024)));
    }

    #[tokio::test]
    async fn download_limit_is_sent_as_text_field() {
        let (client, server) = mock(Some(json!({ "path": "https://host/f/abc123" }))).await;
        let dir = TempDir::new().unwrap();
        let mut request = request_for(&dir, "notes.txt", b"hello");
        request.max_downloads = NonZeroU32::new(3);

        client
            .upload(&request, &CancellationToken::new(), |_, _| {})
            .await
            .unwrap();

        let fields = server.fields.lock().unwrap();
        let limit = fields.iter().find(|(name, _)| name == "maxDownloads");
        assert_eq!(limit.map(|(_, v)| v.as_slice()), Some(&b"3"[..]));
    }

    #[tokio::test]
    async fn server_error_is_a_transport_failure() {
        let (client, server) = mock(None).await;
        let dir = TempDir::new().unwrap();
        let request = request_for(&dir, "notes.txt", b"hello");

        let err = client
            .upload(&request, &CancellationToken::new(), |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::UploadTransport { .. }));
        assert_eq!(server.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_response_is_a_transport_failure() {
        let (client, _server) = mock(Some(json!({ "url": "missing path" }))).await;
        let dir = TempDir::new().unwrap();
        let request = request_for(&dir, "notes.txt", b"hello");

        let err = client
            .upload(&request, &CancellationToken::new(), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UploadTransport { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            ShareClient::new(EndpointConfig::new(&format!("http://{}", addr)).unwrap()).unwrap();
        let dir = TempDir::new().unwrap();
        let request = request_for(&dir, "notes.txt", b"hello");

        let err = client
            .upload(&request, &CancellationToken::new(), |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UploadTransport { .. }));
    }

    #[tokio::test]
    async fn file_changed_after_selection_is_not_sent() {
        let (client, server) = mock(Some(json!({ "path": "https://host/f/abc123" }))).await;
        let dir = TempDir::new().unwrap();
        let request = request_for(&dir, "notes.txt", b"hello");
        std::fs::write(&request.file.path, b"hello, world").unwrap();

        let err = client
            .upload(&request, &CancellationToken::new(), |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::FileUnreadable { .. }));
        assert_eq!(server.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn file_grown_past_the_limit_is_not_sent() {
        let (client, server) = mock(Some(json!({ "path": "https://host/f/abc123" }))).await;
        let dir = TempDir::new().unwrap();
        let request = request_for(&dir, "video.mp4", b"small");
        std::fs::File::options()
            .write(true)
            .open(&request.file.path)
            .unwrap()
            .set_len(MAX_FILE_SIZE + 1)
            .unwrap();

        let err = client
            .upload(&request, &CancellationToken::new(), |_, _| {})
            .await
            .unwrap_err();

        assert_eq!(
            err,
            UploadError::FileTooLarge {
                size: MAX_FILE_SIZE + 1,
                limit: MAX_FILE_SIZE,
            }
        );
        assert_eq!(server.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelling_aborts_a_stalled_upload() {
        let router = Router::new().route(
            "/upload",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "{}"
            }),
        );
        let client = ShareClient::new(serve(router).await).unwrap();
        let dir = TempDir::new().unwrap();
        let request = request_for(&dir, "notes.txt", b"hello");

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            client.upload(&request, &cancel, |_, _| {}),
        )
        .await
        .expect("cancellation should end the upload")
        .unwrap_err();
        assert_eq!(err, UploadError::Cancelled);
    }

    #[tokio::test]
    async fn status_is_fetched_by_file_id() {
        let (client, _server) = mock(None).await;

        let status = client.file_status("abc123").await.unwrap();
        assert_eq!(
            status,
            FileStatus {
                download_count: 2,
                max_downloads: Some(5),
                expired: false,
            }
        );

        let err = client.file_status("unknown").await.unwrap_err();
        assert!(matches!(err, UploadError::StatusFetch { .. }));
    }
}
