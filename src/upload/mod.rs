mod client;
mod types;
mod worker;

pub use client::ShareClient;
pub use types::{
    percent_of, FileStatus, SelectedFile, SessionId, StatusRequest, UploadEvent, UploadEventKind,
    UploadReceipt, UploadRequest, MAX_FILE_SIZE,
};
pub use worker::{Repaint, UploadWorker};
