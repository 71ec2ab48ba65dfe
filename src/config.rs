//! Command-line and environment configuration.
//!
//! The only behaviour that depends on configuration is which upload endpoint
//! the window talks to, so everything funnels into a single [`EndpointConfig`].

use crate::error::UploadError;
use clap::{Parser, ValueEnum};
use url::Url;

pub const PRODUCTION_ENDPOINT: &str = "https://filesharing-backend-t3ym.onrender.com";
pub const LOCAL_ENDPOINT: &str = "http://localhost:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Production,
    Local,
}

impl Target {
    pub fn base_url(self) -> &'static str {
        match self {
            Target::Production => PRODUCTION_ENDPOINT,
            Target::Local => LOCAL_ENDPOINT,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "share-uploader", version, about = "Drop a file, get a shareable link")]
pub struct Cli {
    /// Base URL of the upload service. Overrides --target.
    #[arg(long, env = "SHARE_UPLOADER_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Which known deployment to use when no endpoint is given.
    #[arg(long, value_enum, default_value_t = Target::Production)]
    pub target: Target,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SHARE_UPLOADER_LOG", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn endpoint_config(&self) -> Result<EndpointConfig, UploadError> {
        match &self.endpoint {
            Some(url) => EndpointConfig::new(url),
            None => EndpointConfig::new(self.target.base_url()),
        }
    }
}

/// Where uploads and status checks are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    base_url: String,
}

impl EndpointConfig {
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| UploadError::InvalidEndpoint {
            url: base_url.to_string(),
            detail: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UploadError::InvalidEndpoint {
                url: base_url.to_string(),
                detail: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url)
    }

    pub fn status_url(&self, file_id: &str) -> String {
        format!(
            "{}/file/{}/status",
            self.base_url,
            urlencoding::encode(file_id)
        )
    }
}
