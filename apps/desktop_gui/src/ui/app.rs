use std::{fs, time::Duration};

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use serde::{Deserialize, Serialize};

use client_core::intake::{self, PreviewImage};
use client_core::orchestrator::{self, AnalysisOutcome, CompletionDisposition};
use client_core::results::{self, NamedStat};
use client_core::{OrchestratorError, Session};

use crate::backend_bridge::commands::WorkerCommand;
use crate::config;
use crate::controller::events::{selection_rejection_message, UiEvent};
use crate::controller::orchestration::dispatch_worker_command;
use crate::media;
use crate::ui::theme::{self, ForestPalette, PersistedThemePreset, ThemePreset, ThemeSettings};

pub const SETTINGS_STORAGE_KEY: &str = "greenvision.settings";

/// Icons for the stat grid, in projection order.
const STAT_ICONS: [&str; 6] = ["🌳", "🌲", "🌿", "🌴", "📊", "🍃"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusBannerSeverity {
    Error,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    severity: StatusBannerSeverity,
    message: String,
}

/// Preview pixels for the current selection plus the texture lazily uploaded
/// from them. Cleared together with the selection.
struct PreviewDisplay {
    pixels: PreviewImage,
    texture: Option<TextureHandle>,
}

/// Per-variant annotated image, indexed in step with the result store.
enum AnnotatedImageState {
    NotRequested,
    Loading,
    Ready {
        bytes: Vec<u8>,
        texture: Option<TextureHandle>,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSettings {
    theme_preset: PersistedThemePreset,
    accent_color: [u8; 4],
    panel_rounding: u8,
    text_scale: f32,
    server_url: Option<String>,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        let theme = ThemeSettings::forest_default();
        Self {
            theme_preset: theme.preset.into(),
            accent_color: [
                theme.accent_color.r(),
                theme.accent_color.g(),
                theme.accent_color.b(),
                theme.accent_color.a(),
            ],
            panel_rounding: theme.panel_rounding,
            text_scale: 1.0,
            server_url: None,
        }
    }
}

impl PersistedSettings {
    pub(crate) fn into_runtime(self) -> (ThemeSettings, f32, Option<String>) {
        (
            ThemeSettings {
                preset: self.theme_preset.into(),
                accent_color: egui::Color32::from_rgba_unmultiplied(
                    self.accent_color[0],
                    self.accent_color[1],
                    self.accent_color[2],
                    self.accent_color[3],
                ),
                panel_rounding: self.panel_rounding.min(16),
            },
            self.text_scale.clamp(0.8, 1.4),
            self.server_url,
        )
    }

    fn from_runtime(theme: ThemeSettings, text_scale: f32, server_url: &str) -> Self {
        Self {
            theme_preset: theme.preset.into(),
            accent_color: [
                theme.accent_color.r(),
                theme.accent_color.g(),
                theme.accent_color.b(),
                theme.accent_color.a(),
            ],
            panel_rounding: theme.panel_rounding,
            text_scale,
            server_url: Some(server_url.to_string()),
        }
    }
}

pub struct GreenVisionApp {
    cmd_tx: Sender<WorkerCommand>,
    ui_rx: Receiver<UiEvent>,

    session: Session,
    server_url: String,

    preview: Option<PreviewDisplay>,
    annotated: Vec<AnnotatedImageState>,

    status: String,
    status_banner: Option<StatusBanner>,

    settings_open: bool,

    theme: ThemeSettings,
    applied_theme: Option<ThemeSettings>,
    text_scale: f32,
    applied_text_scale: Option<f32>,
}

impl GreenVisionApp {
    pub fn new(
        cmd_tx: Sender<WorkerCommand>,
        ui_rx: Receiver<UiEvent>,
        settings: config::Settings,
        persisted: Option<PersistedSettings>,
        server_url_override: Option<String>,
    ) -> Self {
        let (theme, text_scale, persisted_server) = persisted.unwrap_or_default().into_runtime();
        let server_url = server_url_override
            .or(persisted_server)
            .unwrap_or(settings.server_url);
        Self {
            cmd_tx,
            ui_rx,
            session: Session::new(),
            server_url,
            preview: None,
            annotated: Vec::new(),
            status: "Ready".to_string(),
            status_banner: None,
            settings_open: false,
            theme,
            applied_theme: None,
            text_scale,
            applied_text_scale: None,
        }
    }

    fn show_error_banner(&mut self, message: String) {
        self.status = message.clone();
        self.status_banner = Some(StatusBanner {
            severity: StatusBannerSeverity::Error,
            message,
        });
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::WorkerFailed(message) => {
                    self.show_error_banner(message);
                }
                UiEvent::SelectionPrepared(ready) => {
                    // Late arrivals after navigating to results are dropped
                    // whole; the session refuses them too.
                    if self.session.results().is_some() {
                        continue;
                    }
                    let name = ready.selection.file.name.clone();
                    self.preview = Some(PreviewDisplay {
                        pixels: ready.preview,
                        texture: None,
                    });
                    intake::apply_selection(&mut self.session, ready.selection);
                    self.status_banner = None;
                    self.status = format!("Selected {name}");
                }
                UiEvent::SelectionRejected(error) => {
                    self.show_error_banner(selection_rejection_message(&error));
                }
                UiEvent::AnalysisFinished { id, outcome } => {
                    if orchestrator::complete_analysis(&mut self.session, id, outcome)
                        == CompletionDisposition::Stale
                    {
                        continue;
                    }
                    if self.session.results().is_some() {
                        self.enter_results_page();
                    } else if let Some(message) = self.session.failure_message() {
                        let message = message.to_owned();
                        self.show_error_banner(message);
                    }
                }
                UiEvent::AnnotatedReady { index, bytes } => {
                    if let Some(slot) = self.annotated.get_mut(index) {
                        *slot = AnnotatedImageState::Ready {
                            bytes,
                            texture: None,
                        };
                    }
                }
                UiEvent::AnnotatedFailed { index, message } => {
                    if let Some(slot) = self.annotated.get_mut(index) {
                        *slot = AnnotatedImageState::Failed(message);
                    }
                }
            }
        }
    }

    fn enter_results_page(&mut self) {
        let (count, selected) = match self.session.results() {
            Some(store) => (store.variant_count(), store.selected_index()),
            None => return,
        };
        self.preview = None;
        self.annotated = (0..count).map(|_| AnnotatedImageState::NotRequested).collect();
        self.status_banner = None;
        self.status = "Analysis complete".to_string();
        self.request_annotated(selected);
    }

    fn request_annotated(&mut self, index: usize) {
        let image = match self
            .session
            .results()
            .and_then(|store| store.results().get(index))
        {
            Some(result) => result.image.clone(),
            None => return,
        };
        if let Some(slot) = self.annotated.get_mut(index) {
            *slot = AnnotatedImageState::Loading;
        }
        let queued = dispatch_worker_command(
            &self.cmd_tx,
            WorkerCommand::FetchAnnotated {
                server_url: self.server_url.clone(),
                index,
                image,
            },
            &mut self.status,
        );
        if !queued {
            if let Some(slot) = self.annotated.get_mut(index) {
                *slot = AnnotatedImageState::Failed(self.status.clone());
            }
        }
    }

    fn browse_for_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Satellite images", &["jpg", "jpeg", "png"])
            .pick_file()
        else {
            return;
        };
        dispatch_worker_command(
            &self.cmd_tx,
            WorkerCommand::LoadFile { path },
            &mut self.status,
        );
    }

    fn begin_analyze(&mut self) {
        match orchestrator::begin_analysis(&mut self.session) {
            Ok(ticket) => {
                self.status_banner = None;
                self.status = "Analyzing...".to_string();
                let id = ticket.id;
                let queued = dispatch_worker_command(
                    &self.cmd_tx,
                    WorkerCommand::Analyze {
                        server_url: self.server_url.clone(),
                        ticket,
                    },
                    &mut self.status,
                );
                if !queued {
                    // The command never left, so resolve the request here
                    // instead of leaving the page pending forever.
                    let message = self.status.clone();
                    let _ = orchestrator::complete_analysis(
                        &mut self.session,
                        id,
                        AnalysisOutcome::Failure(message.clone()),
                    );
                    self.show_error_banner(message);
                }
            }
            Err(OrchestratorError::NoFileSelected) => {
                self.show_error_banner("Please select an image first".to_string());
            }
            Err(OrchestratorError::AlreadyPending) => {}
            Err(error) => {
                self.status = error.to_string();
            }
        }
    }

    fn remove_selection(&mut self) {
        if intake::clear_selection(&mut self.session) {
            self.preview = None;
            self.status = "Selection removed".to_string();
        }
    }

    fn reset_session(&mut self) {
        self.session.reset();
        self.preview = None;
        self.annotated.clear();
        self.status_banner = None;
        self.status = "Ready for a new image".to_string();
    }

    fn select_confidence(&mut self, confidence: f64) {
        let selected = match self.session.results_mut() {
            Some(store) => match store.select(confidence) {
                Ok(()) => store.selected_index(),
                Err(error) => {
                    self.status = error.to_string();
                    return;
                }
            },
            None => return,
        };
        if matches!(
            self.annotated.get(selected),
            Some(AnnotatedImageState::NotRequested)
        ) {
            self.request_annotated(selected);
        }
    }

    fn download_current(&mut self) {
        let (index, confidence) = match self.session.results() {
            Some(store) => (store.selected_index(), store.selected_confidence()),
            None => return,
        };
        let bytes = match self.annotated.get(index) {
            Some(AnnotatedImageState::Ready { bytes, .. }) => bytes.clone(),
            _ => {
                self.status = "Annotated image is still loading".to_string();
                return;
            }
        };
        let file_name =
            media::download_file_name(confidence, chrono::Utc::now().timestamp_millis());
        self.save_image_bytes_as(&bytes, &file_name);
    }

    fn save_image_bytes_as(&mut self, bytes: &[u8], suggested_name: &str) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(suggested_name)
            .save_file()
        {
            match fs::write(&path, bytes) {
                Ok(()) => {
                    self.status = format!("Saved image to {}", path.display());
                }
                Err(err) => {
                    self.status = format!("Failed to save image: {err}");
                }
            }
        }
    }

    fn copy_image_to_clipboard(&mut self, bytes: &[u8], label: &str) {
        match media::decode_image_for_clipboard(bytes)
            .and_then(|(rgba, width, height)| media::write_clipboard_image(&rgba, width, height))
        {
            Ok(()) => self.status = format!("Copied {label} to clipboard"),
            Err(err) => self.status = format!("Failed to copy {label}: {err}"),
        }
    }

    fn apply_theme_if_needed(&mut self, ctx: &egui::Context) {
        if self.applied_theme == Some(self.theme)
            && self.applied_text_scale == Some(self.text_scale)
        {
            return;
        }

        let mut style = (*ctx.style()).clone();
        style.visuals = theme::visuals_for_theme(self.theme);
        style.text_styles = theme::scaled_text_styles(self.text_scale);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.button_padding = egui::vec2(10.0, 6.0);
        style.spacing.interact_size = egui::vec2(40.0, 30.0);
        ctx.set_style(style);

        self.applied_theme = Some(self.theme);
        self.applied_text_scale = Some(self.text_scale);
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }
        ctx.input_mut(|i| i.raw.dropped_files.clear());
        if self.session.results().is_some() {
            tracing::debug!("ignoring dropped file on results page");
            return;
        }

        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if let Some(path) = file.path {
            dispatch_worker_command(
                &self.cmd_tx,
                WorkerCommand::LoadFile { path },
                &mut self.status,
            );
        } else if let Some(bytes) = file.bytes {
            let mime_type = (!file.mime.is_empty()).then(|| file.mime.clone());
            dispatch_worker_command(
                &self.cmd_tx,
                WorkerCommand::LoadBytes {
                    name: file.name,
                    mime_type,
                    bytes: bytes.to_vec(),
                },
                &mut self.status,
            );
        }
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            let (fill, stroke) = match banner.severity {
                StatusBannerSeverity::Error => (
                    egui::Color32::from_rgb(111, 53, 53),
                    egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)),
                ),
            };

            egui::Frame::NONE
                .fill(fill)
                .stroke(stroke)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
        }
    }

    fn show_settings_window(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }

        let window_frame = egui::Frame::NONE
            .fill(ctx.style().visuals.window_fill)
            .stroke(egui::Stroke::new(
                1.0,
                ctx.style().visuals.window_stroke().color,
            ))
            .corner_radius(egui::CornerRadius::same(self.theme.panel_rounding))
            .inner_margin(egui::Margin::symmetric(12, 10));

        let mut settings_open = self.settings_open;
        let mut close_requested = false;

        egui::Window::new("settings_window")
            .title_bar(false)
            .frame(window_frame)
            .open(&mut settings_open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Settings")
                            .strong()
                            .size(13.0 * self.text_scale),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").clicked() {
                            close_requested = true;
                        }
                    });
                });
                ui.separator();

                ui.label("Server URL");
                ui.add(
                    egui::TextEdit::singleline(&mut self.server_url)
                        .id_salt("settings_server_url")
                        .desired_width(f32::INFINITY),
                );
                ui.small("Applies to the next analysis request.");

                ui.separator();
                ui.label("Theme preset");
                egui::ComboBox::from_id_salt("theme_preset")
                    .selected_text(self.theme.preset.label())
                    .show_ui(ui, |ui| {
                        ui.selectable_value(
                            &mut self.theme.preset,
                            ThemePreset::ForestDark,
                            ThemePreset::ForestDark.label(),
                        );
                        ui.selectable_value(
                            &mut self.theme.preset,
                            ThemePreset::ForestLight,
                            ThemePreset::ForestLight.label(),
                        );
                    });

                ui.label("Accent color");
                ui.color_edit_button_srgba(&mut self.theme.accent_color);
                ui.add(
                    egui::Slider::new(&mut self.theme.panel_rounding, 0..=16)
                        .text("Panel rounding"),
                );
                ui.add(
                    egui::Slider::new(&mut self.text_scale, 0.8..=1.4)
                        .text("Text scale")
                        .step_by(0.05),
                );

                if ui.button("Reset appearance to defaults").clicked() {
                    self.theme = ThemeSettings::forest_default();
                    self.text_scale = 1.0;
                }
            });

        self.settings_open = settings_open && !close_requested;
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        let palette = theme::preset_palette(self.theme.preset);
        egui::TopBottomPanel::top("header")
            .frame(
                egui::Frame::NONE
                    .fill(palette.card_background)
                    .inner_margin(egui::Margin::symmetric(16, 10)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("🌳").size(26.0));
                    ui.vertical(|ui| {
                        ui.label(
                            egui::RichText::new("GreenVision")
                                .strong()
                                .size(22.0 * self.text_scale)
                                .color(palette.header_text),
                        );
                        ui.label(
                            egui::RichText::new("AI-Powered Tree Detection from Satellite Images")
                                .size(12.0 * self.text_scale)
                                .color(palette.hint_text),
                        );
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("⚙ Settings").clicked() {
                            self.settings_open = !self.settings_open;
                        }
                    });
                });
            });
    }

    fn show_footer(&self, ctx: &egui::Context) {
        let palette = theme::preset_palette(self.theme.preset);
        egui::TopBottomPanel::bottom("footer")
            .frame(
                egui::Frame::NONE
                    .fill(palette.card_background)
                    .inner_margin(egui::Margin::symmetric(16, 8)),
            )
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new("GreenVision © 2025 • Powered by PyTorch & FastAPI")
                            .size(12.0 * self.text_scale)
                            .color(palette.hint_text),
                    );
                });
            });
    }

    fn show_upload_page(&mut self, ctx: &egui::Context) {
        let hovering_files = ctx.input(|i| !i.raw.hovered_files.is_empty());
        let pending = self.session.is_pending();
        let selected = self
            .session
            .selected_file()
            .map(|file| (file.name.clone(), file.size_bytes()));
        let palette = theme::preset_palette(self.theme.preset);
        let accent = self.theme.accent_color;
        let text_scale = self.text_scale;

        let mut browse_clicked = false;
        let mut remove_clicked = false;
        let mut analyze_clicked = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            let avail = ui.available_size();
            let card_width = avail.x.clamp(520.0, 680.0);
            let top_space = (avail.y * 0.10).clamp(12.0, 80.0);

            ui.add_space(top_space);
            ui.vertical_centered(|ui| {
                ui.set_width(card_width);

                egui::Frame::NONE
                    .fill(palette.card_background)
                    .corner_radius(14.0)
                    .stroke(egui::Stroke::new(1.0, palette.card_stroke))
                    .inner_margin(egui::Margin::symmetric(20, 18))
                    .show(ui, |ui| {
                        ui.style_mut().spacing.item_spacing = egui::vec2(10.0, 10.0);

                        self.show_status_banner(ui);

                        let zone_stroke = if hovering_files {
                            egui::Stroke::new(2.0, accent)
                        } else {
                            egui::Stroke::new(2.0, palette.card_stroke)
                        };
                        let zone_fill = if hovering_files {
                            ui.visuals().faint_bg_color
                        } else {
                            palette.card_background
                        };
                        egui::Frame::NONE
                            .fill(zone_fill)
                            .stroke(zone_stroke)
                            .corner_radius(12.0)
                            .inner_margin(egui::Margin::symmetric(14, 24))
                            .show(ui, |ui| {
                                ui.vertical_centered(|ui| match &selected {
                                    None => {
                                        ui.label(egui::RichText::new("🛰").size(44.0));
                                        let prompt = if hovering_files {
                                            "Drop to upload"
                                        } else {
                                            "Drag & drop your satellite image"
                                        };
                                        ui.label(
                                            egui::RichText::new(prompt)
                                                .strong()
                                                .size(16.0 * text_scale),
                                        );
                                        ui.label(egui::RichText::new("or").color(palette.hint_text));
                                        let browse = egui::Button::new(
                                            egui::RichText::new("Browse Files")
                                                .color(egui::Color32::WHITE),
                                        )
                                        .fill(accent)
                                        .min_size(egui::vec2(140.0, 32.0));
                                        if ui.add(browse).clicked() {
                                            browse_clicked = true;
                                        }
                                        ui.label(
                                            egui::RichText::new("JPG or PNG • Max 10MB")
                                                .size(12.0 * text_scale)
                                                .color(palette.hint_text),
                                        );
                                    }
                                    Some((name, size_bytes)) => {
                                        if let Some(preview) = self.preview.as_mut() {
                                            let texture =
                                                preview.texture.get_or_insert_with(|| {
                                                    ui.ctx().load_texture(
                                                        "selection-preview",
                                                        media::color_image_from_preview(
                                                            &preview.pixels,
                                                        ),
                                                        egui::TextureOptions::LINEAR,
                                                    )
                                                });
                                            let size = texture.size_vec2();
                                            ui.add(
                                                egui::Image::new((texture.id(), size)).max_size(
                                                    egui::vec2(ui.available_width(), 280.0),
                                                ),
                                            );
                                        }
                                        ui.horizontal(|ui| {
                                            ui.label(egui::RichText::new("🖼").size(18.0));
                                            ui.label(egui::RichText::new(name.as_str()).strong());
                                            ui.label(
                                                egui::RichText::new(media::human_readable_bytes(
                                                    *size_bytes,
                                                ))
                                                .color(palette.hint_text),
                                            );
                                            ui.with_layout(
                                                egui::Layout::right_to_left(egui::Align::Center),
                                                |ui| {
                                                    if ui
                                                        .add_enabled(
                                                            !pending,
                                                            egui::Button::new("Remove"),
                                                        )
                                                        .clicked()
                                                    {
                                                        remove_clicked = true;
                                                    }
                                                },
                                            );
                                        });
                                    }
                                });
                            });

                        if selected.is_none() {
                            ui.label(
                                egui::RichText::new("📍 Optimal altitude: 220-270 meters")
                                    .size(12.0 * text_scale)
                                    .color(palette.hint_text),
                            );
                            ui.label(
                                egui::RichText::new("🛰️ Source: Google Earth Pro")
                                    .size(12.0 * text_scale)
                                    .color(palette.hint_text),
                            );
                        }

                        ui.add_space(4.0);
                        ui.horizontal(|ui| {
                            if pending {
                                ui.add(egui::Spinner::new().size(18.0));
                            }
                            let label = if pending { "Analyzing..." } else { "Analyze Image" };
                            let mut analyze = egui::Button::new(
                                egui::RichText::new(label)
                                    .strong()
                                    .size(16.0 * text_scale)
                                    .color(egui::Color32::WHITE),
                            )
                            .min_size(egui::vec2(ui.available_width(), 40.0));
                            if selected.is_some() && !pending {
                                analyze = analyze.fill(accent);
                            }
                            if ui.add_enabled(!pending, analyze).clicked() {
                                analyze_clicked = true;
                            }
                        });

                        ui.separator();
                        ui.horizontal(|ui| {
                            ui.label("Status:");
                            ui.weak(self.status.as_str());
                        });
                    });
            });
        });

        if browse_clicked {
            self.browse_for_file();
        }
        if remove_clicked {
            self.remove_selection();
        }
        if analyze_clicked {
            self.begin_analyze();
        }
    }

    fn show_results_page(&mut self, ctx: &egui::Context) {
        let (confidences, selected_index, selected_confidence, processing_time, projection, summary) =
            match self.session.results() {
                Some(store) => (
                    store
                        .results()
                        .iter()
                        .map(|result| result.confidence)
                        .collect::<Vec<_>>(),
                    store.selected_index(),
                    store.selected_confidence(),
                    store.processing_time(),
                    results::project(store),
                    results::summary_lines(&store.current().stats),
                ),
                None => return,
            };
        let palette = theme::preset_palette(self.theme.preset);
        let accent = self.theme.accent_color;
        let text_scale = self.text_scale;

        let mut reset_clicked = false;
        let mut download_clicked = false;
        let mut copy_image_clicked = false;
        let mut copy_summary_clicked = false;
        let mut clicked_confidence = None;
        let mut retry_fetch = None;
        let mut annotated_decode_failed: Option<(usize, String)> = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.set_width(ui.available_width().min(1100.0));
                        ui.add_space(10.0);

                        ui.horizontal(|ui| {
                            if ui
                                .button("←")
                                .on_hover_text("Analyze another image")
                                .clicked()
                            {
                                reset_clicked = true;
                            }
                            ui.heading("Analysis Results");
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    let download = egui::Button::new(
                                        egui::RichText::new("Download")
                                            .color(egui::Color32::WHITE),
                                    )
                                    .fill(accent);
                                    if ui.add(download).clicked() {
                                        download_clicked = true;
                                    }
                                },
                            );
                        });
                        if let Some(seconds) = processing_time {
                            ui.label(
                                egui::RichText::new(format!(
                                    "Processing completed in {seconds:.2}s"
                                ))
                                .color(palette.hint_text),
                            );
                        }

                        ui.add_space(6.0);

                        if confidences.len() > 1 {
                            ui.horizontal_wrapped(|ui| {
                                ui.label(egui::RichText::new("Confidence threshold:").strong());
                                for &confidence in &confidences {
                                    let is_selected = confidence == selected_confidence;
                                    let label = format!("{:.0}%", confidence * 100.0);
                                    if ui.selectable_label(is_selected, label).clicked()
                                        && !is_selected
                                    {
                                        clicked_confidence = Some(confidence);
                                    }
                                }
                            });
                            ui.add_space(6.0);
                        }

                        for (row_index, row) in projection.stats.chunks(3).enumerate() {
                            ui.columns(3, |columns| {
                                for (slot, stat) in row.iter().enumerate() {
                                    let icon = STAT_ICONS
                                        .get(row_index * 3 + slot)
                                        .copied()
                                        .unwrap_or("📊");
                                    stat_card(&mut columns[slot], icon, stat, &palette, text_scale);
                                }
                            });
                        }

                        ui.add_space(8.0);
                        egui::Frame::NONE
                            .fill(palette.card_background)
                            .stroke(egui::Stroke::new(1.0, palette.card_stroke))
                            .corner_radius(12.0)
                            .inner_margin(egui::Margin::symmetric(14, 12))
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    ui.label(
                                        egui::RichText::new("Annotated Satellite Image")
                                            .strong()
                                            .size(16.0 * text_scale),
                                    );
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            egui::Frame::NONE
                                                .fill(palette.success_badge_fill)
                                                .corner_radius(10.0)
                                                .inner_margin(egui::Margin::symmetric(10, 4))
                                                .show(ui, |ui| {
                                                    ui.label(
                                                        egui::RichText::new("✓ Analyzed")
                                                            .size(12.0 * text_scale)
                                                            .color(palette.success_badge_text),
                                                    );
                                                });
                                        },
                                    );
                                });
                                ui.add_space(4.0);

                                match self.annotated.get_mut(selected_index) {
                                    Some(AnnotatedImageState::Ready { bytes, texture }) => {
                                        if texture.is_none() {
                                            match media::color_image_from_bytes(bytes) {
                                                Ok(color_image) => {
                                                    *texture = Some(ui.ctx().load_texture(
                                                        format!("annotated-{selected_index}"),
                                                        color_image,
                                                        egui::TextureOptions::LINEAR,
                                                    ));
                                                }
                                                Err(message) => {
                                                    annotated_decode_failed =
                                                        Some((selected_index, message));
                                                }
                                            }
                                        }
                                        if let Some(texture) = texture.as_ref() {
                                            let size = texture.size_vec2();
                                            let response = ui.add(
                                                egui::Image::new((texture.id(), size)).max_size(
                                                    egui::vec2(ui.available_width(), 420.0),
                                                ),
                                            );
                                            response.context_menu(|ui| {
                                                if ui.button("Copy image").clicked() {
                                                    copy_image_clicked = true;
                                                    ui.close();
                                                }
                                                if ui.button("Save image as...").clicked() {
                                                    download_clicked = true;
                                                    ui.close();
                                                }
                                                if ui.button("Copy summary").clicked() {
                                                    copy_summary_clicked = true;
                                                    ui.close();
                                                }
                                            });
                                        }
                                    }
                                    Some(AnnotatedImageState::Loading) => {
                                        ui.horizontal(|ui| {
                                            ui.add(egui::Spinner::new().size(18.0));
                                            ui.label("Loading annotated image...");
                                        });
                                    }
                                    Some(AnnotatedImageState::Failed(message)) => {
                                        ui.colored_label(
                                            ui.visuals().error_fg_color,
                                            message.as_str(),
                                        );
                                        if ui.button("Retry").clicked() {
                                            retry_fetch = Some(selected_index);
                                        }
                                    }
                                    Some(AnnotatedImageState::NotRequested) | None => {
                                        ui.horizontal(|ui| {
                                            ui.add(egui::Spinner::new().size(18.0));
                                            ui.label("Loading annotated image...");
                                        });
                                        retry_fetch = Some(selected_index);
                                    }
                                }

                                ui.add_space(4.0);
                                ui.horizontal_wrapped(|ui| {
                                    ui.label(
                                        egui::RichText::new("Detection Legend:")
                                            .strong()
                                            .size(12.0 * text_scale),
                                    );
                                    // The service draws detections in these two
                                    // fixed colors; the legend is not themed.
                                    ui.label(
                                        egui::RichText::new("●")
                                            .color(egui::Color32::from_rgb(34, 197, 94)),
                                    );
                                    ui.label("Individual trees");
                                    ui.label(
                                        egui::RichText::new("●").color(palette.cluster_marker),
                                    );
                                    ui.label("Tree clusters");
                                });
                            });

                        ui.add_space(8.0);
                        egui::Frame::NONE
                            .fill(ui.visuals().faint_bg_color)
                            .stroke(egui::Stroke::new(1.0, palette.card_stroke))
                            .corner_radius(12.0)
                            .inner_margin(egui::Margin::symmetric(14, 12))
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    ui.label(
                                        egui::RichText::new("📋 Analysis Summary")
                                            .strong()
                                            .size(16.0 * text_scale),
                                    );
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            if ui.button("Copy").clicked() {
                                                copy_summary_clicked = true;
                                            }
                                        },
                                    );
                                });
                                for line in &summary {
                                    ui.label(line.as_str());
                                }
                            });

                        ui.add_space(10.0);
                        let again = egui::Button::new(
                            egui::RichText::new("Analyze Another Image")
                                .strong()
                                .color(egui::Color32::WHITE),
                        )
                        .fill(accent)
                        .min_size(egui::vec2(220.0, 40.0));
                        if ui.add(again).clicked() {
                            reset_clicked = true;
                        }
                        ui.add_space(10.0);
                    });
                });
        });

        if let Some((index, message)) = annotated_decode_failed {
            if let Some(slot) = self.annotated.get_mut(index) {
                *slot = AnnotatedImageState::Failed(format!(
                    "Annotated image failed to decode: {message}"
                ));
            }
        }
        if let Some(index) = retry_fetch {
            let should_fetch = matches!(
                self.annotated.get(index),
                Some(AnnotatedImageState::NotRequested) | Some(AnnotatedImageState::Failed(_))
            );
            if should_fetch {
                self.request_annotated(index);
            }
        }
        if copy_image_clicked {
            if let Some(AnnotatedImageState::Ready { bytes, .. }) =
                self.annotated.get(selected_index)
            {
                let bytes = bytes.clone();
                self.copy_image_to_clipboard(&bytes, "annotated image");
            }
        }
        if copy_summary_clicked {
            ctx.copy_text(summary.join("\n"));
            self.status = "Copied analysis summary to clipboard".to_string();
        }
        if download_clicked {
            self.download_current();
        }
        if let Some(confidence) = clicked_confidence {
            self.select_confidence(confidence);
        }
        if reset_clicked {
            self.reset_session();
        }
    }
}

fn stat_card(
    ui: &mut egui::Ui,
    icon: &str,
    stat: &NamedStat,
    palette: &ForestPalette,
    text_scale: f32,
) {
    egui::Frame::NONE
        .fill(palette.card_background)
        .stroke(egui::Stroke::new(1.0, palette.card_stroke))
        .corner_radius(12.0)
        .inner_margin(egui::Margin::symmetric(12, 10))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(icon).size(22.0));
                ui.vertical(|ui| {
                    ui.label(
                        egui::RichText::new(stat.label)
                            .small()
                            .color(palette.hint_text),
                    );
                    ui.label(
                        egui::RichText::new(stat.description)
                            .size(10.0 * text_scale)
                            .color(palette.hint_text),
                    );
                });
            });
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(stat.display_value())
                        .strong()
                        .size(24.0 * text_scale),
                );
                ui.label(
                    egui::RichText::new(stat.unit)
                        .small()
                        .color(palette.hint_text),
                );
            });
        });
}

impl eframe::App for GreenVisionApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.apply_theme_if_needed(ctx);
        self.handle_dropped_files(ctx);

        self.show_settings_window(ctx);
        self.show_header(ctx);
        self.show_footer(ctx);

        if self.session.results().is_some() {
            self.show_results_page(ctx);
        } else {
            self.show_upload_page(ctx);
        }

        let busy = self.session.is_pending()
            || self
                .annotated
                .iter()
                .any(|state| matches!(state, AnnotatedImageState::Loading));
        if busy {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings =
            PersistedSettings::from_runtime(self.theme, self.text_scale, &self.server_url);
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}
