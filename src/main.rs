mod app;
mod config;
mod error;
mod logging;
mod upload;
mod utils;

use anyhow::{anyhow, Context, Result};
use app::ShareUploader;
use clap::Parser;
use config::Cli;
use std::sync::{mpsc, Arc, OnceLock};
use upload::{ShareClient, UploadWorker};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let endpoint = cli.endpoint_config()?;
    let client = ShareClient::new(endpoint)?;

    // The worker exists before the window does, so it repaints through a
    // context handed over once eframe has created one.
    let repaint_ctx: Arc<OnceLock<eframe::egui::Context>> = Arc::new(OnceLock::new());
    let repaint = {
        let repaint_ctx = repaint_ctx.clone();
        Arc::new(move || {
            if let Some(ctx) = repaint_ctx.get() {
                ctx.request_repaint();
            }
        })
    };

    let (sender, receiver) = mpsc::channel();
    let worker =
        UploadWorker::new(client, sender, repaint).context("Failed to start network runtime")?;

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([520.0, 560.0])
            .with_min_inner_size([400.0, 460.0]),
        ..Default::default()
    };

    eframe::run_native(
        "File Sharing",
        options,
        Box::new(move |cc: &eframe::CreationContext| {
            let _ = repaint_ctx.set(cc.egui_ctx.clone());
            Box::new(ShareUploader::new(worker, receiver))
        }),
    )
    .map_err(|e| anyhow!("Window error: {}", e))
}
