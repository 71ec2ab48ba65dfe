use super::{ShareUploader, UploadPhase};
use crate::utils::file_size::FileSizeUtils;
use eframe::egui::{self, Align, Color32, RichText};
use rfd::FileDialog;
use std::time::Instant;

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const ERROR: Color32 = Color32::from_rgb(220, 50, 50);

impl ShareUploader {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let footer_height = 40.0;
            let content_height = ui.available_height() - footer_height;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("File Sharing");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new("Drop a file, get a link to share")
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });

                    ui.add_space(20.0);
                    self.render_dropzone(ctx, ui);

                    ui.add_space(10.0);
                    self.render_limit(ui);

                    ui.add_space(20.0);
                    self.render_actions(ui);

                    if self.state.show_progress_bar() {
                        ui.add_space(10.0);
                        let progress = f32::from(self.state.progress_percent()) / 100.0;
                        ui.add(
                            egui::ProgressBar::new(progress)
                                .show_percentage()
                                .fill(ACCENT),
                        );
                    }

                    if self.state.result_url().is_some() {
                        ui.add_space(20.0);
                        self.render_link(ctx, ui);
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(10.0);
                self.render_footer(ui);
            });
        });
    }

    fn render_dropzone(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        let stroke = if hovering {
            egui::Stroke::new(2.0, ACCENT)
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke
        };

        let response = egui::Frame::group(ui.style())
            .stroke(stroke)
            .show(ui, |ui| {
                ui.set_min_height(90.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(30.0);
                    ui.label(if hovering {
                        "Drop the file here..."
                    } else {
                        "Drag and drop a file here, or click to select"
                    });
                });
            })
            .response
            .interact(egui::Sense::click());

        if response.clicked() {
            if let Some(path) = FileDialog::new().pick_file() {
                self.select_path(&path);
            }
        }

        if let Some(file) = self.state.file() {
            ui.add_space(5.0);
            let kind = file.extension().unwrap_or_else(|| file.mime.clone());
            ui.label(format!(
                "📁 {} ({}, {})",
                file.name,
                kind,
                FileSizeUtils::format_size(file.size)
            ));
        }
    }

    fn render_limit(&mut self, ui: &mut egui::Ui) {
        let editable = !self.state.is_uploading();
        ui.add_enabled_ui(editable, |ui| {
            ui.horizontal(|ui| {
                let mut enabled = self.state.limit_enabled();
                if ui.checkbox(&mut enabled, "Limit downloads").changed() {
                    self.state.set_limit_enabled(enabled);
                }

                ui.add_enabled_ui(enabled, |ui| {
                    let mut input = self.limit_input.clone();
                    let edit = egui::TextEdit::singleline(&mut input)
                        .desired_width(60.0)
                        .hint_text("e.g. 5");
                    if ui.add(edit).changed() {
                        self.set_limit_input(input);
                    }
                    if let Some(limit) = self.state.download_limit() {
                        ui.label(format!("max {}", limit));
                    }
                });
            });
        });
    }

    fn render_actions(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| match self.state.phase() {
            UploadPhase::Failed if self.state.file().is_some() => {
                if ui.button("🔄 Retry").clicked() {
                    self.retry();
                }
            }
            UploadPhase::Failed => {}
            _ => {
                ui.add_enabled_ui(self.state.can_upload(), |ui| {
                    let label = if self.state.is_uploading() {
                        "📤 Uploading..."
                    } else {
                        "📤 Upload"
                    };
                    let button = egui::Button::new(label).min_size(egui::vec2(200.0, 40.0));
                    if ui.add(button).clicked() {
                        self.start_upload();
                    }
                });
            }
        });
    }

    fn render_link(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let Some(url) = self.state.result_url().map(str::to_string) else {
            return;
        };

        ui.group(|ui| {
            ui.colored_label(SUCCESS, "✅ File uploaded!");
            ui.add_space(5.0);
            ui.label(RichText::new(&url).monospace());
            ui.add_space(5.0);

            ui.horizontal(|ui| {
                let copied = self.state.link_copied(Instant::now());
                if ui.button(if copied { "✅ Copied!" } else { "📋 Copy link" }).clicked() {
                    self.copy_link(ctx);
                }
                if ui.button("🌐 Open").clicked() {
                    self.open_link();
                }

                let can_check = self.state.file_id().is_some() && !self.state.status_pending();
                ui.add_enabled_ui(can_check, |ui| {
                    if ui.button("🔍 Check status").clicked() {
                        self.check_status();
                    }
                });
                if self.state.status_pending() {
                    ui.spinner();
                }
            });

            if let Some(status) = self.state.file_status() {
                ui.add_space(5.0);
                let color = if status.expired {
                    ERROR
                } else {
                    ui.visuals().text_color()
                };
                ui.colored_label(color, status.summary());
            }
        });
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.label(
            RichText::new(format!(
                "Endpoint: {}",
                self.worker.client().endpoint().base_url()
            ))
            .small()
            .color(ui.visuals().text_color().gamma_multiply(0.6)),
        );

        if let Some(error) = self.state.error_message() {
            ui.add_space(5.0);
            ui.colored_label(ERROR, error);
        }
    }
}
