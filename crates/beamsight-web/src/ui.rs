//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use beamsight_core::animation::{marker_color, marker_float_offset, ALERT_COLOR, BEAM_CLEAR_COLOR, Rgb};
use beamsight_core::signal::{DetectionMode, MAX_THRESHOLD, MIN_THRESHOLD};
use beamsight_core::status::DeltaBand;
use beamsight_core::{MarkerKind, StatusSummary};
use tracing::{debug, warn};

use crate::app::{UiLayout, View};
use crate::file_picker::{trigger_file_open, trigger_file_save, FileFilter, FilePickerContext, PendingFileResults};
use crate::markers::MarkerEntity;
use crate::scene::MainCamera;
use crate::signal::{SignalState, SNAPSHOT_FILENAME};

/// Height above a marker where its label floats
const LABEL_HEIGHT: f32 = 0.25;
const SPARKLINE_HEIGHT: f32 = 60.0;
const RESET_BUTTON_TEXT: &str = "Reset All";

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // UI layout updates run in Update
        app.add_systems(Update, update_ui_layout)
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Update UI layout based on window size
fn update_ui_layout(
    windows: Query<&Window>,
    mut ui_layout: ResMut<UiLayout>,
) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();

        // Only update if dimensions changed significantly
        if (ui_layout.screen_width - width).abs() > 1.0
            || (ui_layout.screen_height - height).abs() > 1.0
        {
            ui_layout.update_for_screen(width, height);
        }
    }
}

fn color32(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

fn upload_button_text(has_room: bool) -> &'static str {
    if has_room {
        "Change Room Scan"
    } else {
        "Upload GLB File"
    }
}

fn marker_button_text(kind: MarkerKind, placed: bool) -> String {
    if placed {
        format!("{} ✓", kind.label())
    } else {
        kind.label().to_string()
    }
}

fn detection_button_text(detected: bool) -> &'static str {
    if detected {
        "DETECTION ACTIVE"
    } else {
        "Simulate Detection"
    }
}

fn delta_color(band: DeltaBand) -> egui::Color32 {
    match band {
        DeltaBand::Elevated => color32(ALERT_COLOR),
        DeltaBand::Depressed => color32(BEAM_CLEAR_COLOR),
        DeltaBand::Steady => egui::Color32::GRAY,
    }
}

fn apply_touch_spacing(style: &mut egui::Style, is_mobile: bool) {
    let defaults = egui::style::Spacing::default();
    if is_mobile {
        style.spacing.button_padding = egui::vec2(12.0, 8.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    } else {
        style.spacing.button_padding = defaults.button_padding;
        style.spacing.item_spacing = defaults.item_spacing;
    }
}

fn ui_system(
    mut contexts: EguiContexts,
    mut view: ResMut<View>,
    mut signal: ResMut<SignalState>,
    mut ui_layout: ResMut<UiLayout>,
    pending: Res<PendingFileResults>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    markers: Query<(&MarkerEntity, &GlobalTransform)>,
    time: Res<Time>,
    mut styled_for_mobile: Local<Option<bool>>,
) {
    let is_mobile = ui_layout.is_mobile;
    let panel_width = ui_layout.panel_width();
    let ui_scale = ui_layout.ui_scale;

    // Get the egui context - early return if not available
    let Ok(ctx) = contexts.ctx_mut() else { return };

    // Larger touch targets on mobile; only touched when the layout flips
    if *styled_for_mobile != Some(is_mobile) {
        ctx.style_mut(|style| apply_touch_spacing(style, is_mobile));
        *styled_for_mobile = Some(is_mobile);
    }

    // Mobile: panel toggles at top
    if is_mobile {
        egui::TopBottomPanel::top("mobile_toolbar")
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let menu_text = if ui_layout.show_left_panel { "☰ Controls" } else { "☰" };
                    if ui.button(egui::RichText::new(menu_text).size(16.0 * ui_scale)).clicked() {
                        ui_layout.show_left_panel = !ui_layout.show_left_panel;
                        if ui_layout.show_left_panel {
                            ui_layout.show_right_panel = false;
                        }
                    }

                    ui.separator();
                    let summary = StatusSummary::from_state(view.detection());
                    let badge_color = if summary.is_detected {
                        color32(ALERT_COLOR)
                    } else {
                        egui::Color32::GREEN
                    };
                    ui.colored_label(badge_color, "●");

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let status_text = if ui_layout.show_right_panel { "Status ✕" } else { "Status" };
                        if ui.button(egui::RichText::new(status_text).size(16.0 * ui_scale)).clicked() {
                            ui_layout.show_right_panel = !ui_layout.show_right_panel;
                            if ui_layout.show_right_panel {
                                ui_layout.show_left_panel = false;
                            }
                        }
                    });
                });
            });
    }

    // Control panel (left side)
    if !is_mobile || ui_layout.show_left_panel {
        egui::SidePanel::left("control_panel")
            .default_width(panel_width)
            .resizable(!is_mobile)
            .show(ctx, |ui| {
                ui.heading("Beamsight");
                ui.separator();

                // Room scan
                ui.label(egui::RichText::new("Room").strong());
                let has_room = view.room().is_some();
                if ui.button(upload_button_text(has_room)).clicked() {
                    trigger_file_open(&pending, FilePickerContext::RoomScan, FileFilter::room_scan());
                }
                match view.room() {
                    Some(room) => {
                        ui.label(egui::RichText::new(&room.name).small().weak());
                    }
                    None => {
                        ui.label(
                            egui::RichText::new("Upload a .glb room scan or use the grid floor")
                                .small()
                                .weak(),
                        );
                    }
                }

                ui.add_space(8.0);
                ui.separator();

                // Markers
                ui.label(egui::RichText::new("Markers").strong());
                ui.horizontal(|ui| {
                    for kind in MarkerKind::ALL {
                        let placed = view.position(kind).is_some();
                        let button = egui::Button::new(marker_button_text(kind, placed))
                            .selected(view.placing() == Some(kind));
                        if ui.add(button).clicked() {
                            view.select_marker(kind);
                        }
                    }
                });
                if let Some(kind) = view.placing() {
                    ui.colored_label(
                        color32(marker_color(kind, false)),
                        format!("Click in the 3D scene to place {}", kind),
                    );
                }
                for kind in MarkerKind::ALL {
                    if let Some(position) = view.position(kind) {
                        ui.label(
                            egui::RichText::new(format!("{}: {}", kind.title(), position))
                                .small()
                                .monospace(),
                        );
                    }
                }

                ui.add_space(8.0);
                ui.separator();

                // Detection
                ui.label(egui::RichText::new("Detection").strong());
                let can_toggle = view.can_toggle_detection();
                let detected = view.is_detected();
                let mut toggle = egui::Button::new(
                    egui::RichText::new(detection_button_text(detected)).strong(),
                )
                .min_size(egui::vec2(ui.available_width(), 28.0));
                if detected {
                    toggle = toggle.fill(color32(ALERT_COLOR));
                }
                if ui.add_enabled(can_toggle, toggle).clicked() {
                    view.toggle_detection();
                }
                if !can_toggle {
                    ui.label(
                        egui::RichText::new("Place both markers to enable detection")
                            .small()
                            .weak(),
                    );
                }

                ui.add_space(8.0);
                ui.separator();

                if ui.button(RESET_BUTTON_TEXT).clicked() {
                    view.reset();
                }
            });
    }

    // Status panel (right side)
    if !is_mobile || ui_layout.show_right_panel {
        egui::SidePanel::right("status_panel")
            .default_width(panel_width)
            .resizable(!is_mobile)
            .show(ctx, |ui| {
                status_panel(ui, &mut view, &mut signal, &pending);
            });
    }

    // Bottom info bar
    egui::TopBottomPanel::bottom("info_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let hint = if is_mobile {
                "Drag: orbit · Pinch: zoom · Tap: place"
            } else {
                "Left drag: orbit · Right drag: pan · Scroll: zoom · Click: place"
            };
            ui.label(egui::RichText::new(hint).small().weak());
        });
    });

    // Floating marker labels
    if let Ok((camera, camera_transform)) = camera_query.single() {
        let lift = Vec3::Y * (LABEL_HEIGHT + marker_float_offset(time.elapsed_secs()));
        for (marker, transform) in markers.iter() {
            let kind = marker.kind;
            let anchor = transform.translation() + lift;
            let Ok(screen) = camera.world_to_viewport(camera_transform, anchor) else {
                continue;
            };
            egui::Area::new(egui::Id::new(("marker_label", kind.as_str())))
                .order(egui::Order::Background)
                .interactable(false)
                .pivot(egui::Align2::CENTER_BOTTOM)
                .fixed_pos(egui::pos2(screen.x, screen.y))
                .show(ctx, |ui| {
                    ui.label(
                        egui::RichText::new(kind.label())
                            .color(egui::Color32::WHITE)
                            .background_color(egui::Color32::from_black_alpha(160)),
                    );
                });
        }
    }
}

/// Detection metrics, history chart and signal simulator controls
fn status_panel(
    ui: &mut egui::Ui,
    view: &mut View,
    signal: &mut SignalState,
    pending: &PendingFileResults,
) {
    let summary = StatusSummary::from_state(view.detection());

    ui.heading("Status");
    ui.separator();

    let badge_color = if summary.is_detected {
        color32(ALERT_COLOR)
    } else {
        egui::Color32::from_rgb(0x16, 0xa3, 0x4a)
    };
    ui.label(
        egui::RichText::new(format!(" {} ", summary.status_label()))
            .strong()
            .size(18.0)
            .color(egui::Color32::WHITE)
            .background_color(badge_color),
    );

    ui.add_space(6.0);
    egui::Grid::new("signal_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("RSSI:");
            ui.label(egui::RichText::new(format!("{} dBm", summary.rssi)).monospace());
            ui.end_row();

            ui.label("Baseline:");
            ui.label(egui::RichText::new(format!("{} dBm", summary.baseline)).monospace());
            ui.end_row();
        });

    ui.add_space(4.0);
    ui.label("Signal strength");
    ui.add(
        egui::ProgressBar::new(summary.strength_fraction())
            .text(summary.strength_text())
            .fill(color32(BEAM_CLEAR_COLOR)),
    );
    ui.colored_label(delta_color(summary.band), summary.delta_text());

    ui.add_space(8.0);
    ui.separator();

    // History
    ui.label(egui::RichText::new("RSSI history").strong());
    let history: Vec<i32> = signal.history().map(|s| s.rssi).collect();
    sparkline(ui, &history, signal.baseline(), signal.threshold());

    ui.add_space(8.0);
    ui.separator();

    // Simulator controls
    ui.label(egui::RichText::new("Detector").strong());
    let mut mode = signal.mode();
    egui::ComboBox::from_id_salt("detection_mode")
        .selected_text(mode.label())
        .show_ui(ui, |ui| {
            for option in DetectionMode::ALL {
                ui.selectable_value(&mut mode, option, option.label());
            }
        });
    if mode != signal.mode() {
        signal.set_mode(mode);
    }

    let mut threshold = signal.threshold();
    if ui
        .add(egui::Slider::new(&mut threshold, MIN_THRESHOLD..=MAX_THRESHOLD).text("threshold (dB)"))
        .changed()
    {
        signal.set_threshold(threshold);
    }

    ui.horizontal(|ui| {
        if ui.button("Calibrate").clicked() {
            match signal.calibrate() {
                Ok(baseline) => view.set_signal(baseline, baseline),
                Err(e) => debug!(error = %e, "Calibration skipped"),
            }
        }

        if ui.button("Export Snapshot").clicked() {
            match signal.snapshot(view.detection()).to_json() {
                Ok(json) => trigger_file_save(
                    pending,
                    FilePickerContext::SnapshotExport,
                    SNAPSHOT_FILENAME,
                    json.as_bytes(),
                    "application/json",
                ),
                Err(e) => warn!(error = %e, "Failed to serialize metrics snapshot"),
            }
        }
    });

    if signal.drop_detected() {
        ui.colored_label(color32(ALERT_COLOR), "Signal drop past threshold");
    }
}

/// Vertical dBm range of the chart: every sample plus `floor..=ceil`,
/// padded by 1 dB
fn sparkline_range(samples: &[i32], floor: i32, ceil: i32) -> (i32, i32) {
    let lo = samples.iter().copied().fold(floor, i32::min) - 1;
    let hi = samples.iter().copied().fold(ceil, i32::max) + 1;
    (lo, hi)
}

fn sparkline_y(rssi: i32, rect: egui::Rect, (lo, hi): (i32, i32)) -> f32 {
    let span = (hi - lo).max(1) as f32;
    rect.bottom() - (rssi - lo) as f32 / span * rect.height()
}

/// Screen positions for a sparkline of `samples`, oldest on the left
fn sparkline_points(samples: &[i32], rect: egui::Rect, range: (i32, i32)) -> Vec<egui::Pos2> {
    let step = if samples.len() > 1 {
        rect.width() / (samples.len() - 1) as f32
    } else {
        0.0
    };

    samples
        .iter()
        .enumerate()
        .map(|(i, &rssi)| egui::pos2(rect.left() + i as f32 * step, sparkline_y(rssi, rect, range)))
        .collect()
}

fn sparkline(ui: &mut egui::Ui, samples: &[i32], baseline: i32, threshold: i32) {
    let size = egui::vec2(ui.available_width(), SPARKLINE_HEIGHT);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect;
    painter.rect_filled(rect, 2.0, egui::Color32::from_black_alpha(60));

    if samples.is_empty() {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "waiting for samples",
            egui::FontId::proportional(11.0),
            egui::Color32::GRAY,
        );
        return;
    }

    let trigger = baseline - threshold;
    let range = sparkline_range(samples, trigger, baseline);

    // Reference lines at the baseline and the trigger level
    for (level, color) in [
        (baseline, egui::Color32::DARK_GRAY),
        (trigger, color32(ALERT_COLOR).gamma_multiply(0.5)),
    ] {
        let y = sparkline_y(level, rect, range);
        painter.line_segment(
            [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
            egui::Stroke::new(1.0, color),
        );
    }

    painter.add(egui::Shape::line(
        sparkline_points(samples, rect, range),
        egui::Stroke::new(1.5, color32(BEAM_CLEAR_COLOR)),
    ));
}
