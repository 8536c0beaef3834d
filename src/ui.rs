use eframe::egui::{self, Color32, Frame, Sense, Stroke, Ui, Vec2};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::intersection::{
    IntersectionSnapshot, LaneId, LaneState, LightClick, LightColor, SignalColor,
};

const DOT_DIAMETER: f32 = 48.0;
const DOT_SPACING: f32 = 10.0;

/// Main window: one column of clickable lights per lane, a lock
/// banner while a transition is in flight.
pub struct CrosslightUI {
    click_sender: mpsc::Sender<LightClick>,
    snapshot_receiver: watch::Receiver<IntersectionSnapshot>,
}

impl CrosslightUI {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        click_sender: mpsc::Sender<LightClick>,
        snapshot_receiver: watch::Receiver<IntersectionSnapshot>,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        CrosslightUI {
            click_sender,
            snapshot_receiver,
        }
    }

    fn send_click(&self, lane: LaneId, color: LightColor) {
        debug!("UI click: {} {}", lane, color);
        // try_send: a full buffer just drops the click, same as the
        // guard would.
        if let Err(e) = self.click_sender.try_send(LightClick::now(lane, color)) {
            warn!("failed to send click: {}", e);
        }
    }

    /// One light dot; bright when lit, dimmed otherwise.
    fn light_dot(&self, ui: &mut Ui, lane: LaneId, color: LightColor, lit: bool) {
        let (active, dimmed) = dot_colors(color);
        let fill = if lit { active } else { dimmed };

        let (rect, response) =
            ui.allocate_exact_size(Vec2::splat(DOT_DIAMETER), Sense::click());
        let painter = ui.painter();
        painter.circle_filled(rect.center(), DOT_DIAMETER / 2.0 - 2.0, fill);
        painter.circle_stroke(
            rect.center(),
            DOT_DIAMETER / 2.0 - 2.0,
            Stroke::new(1.5, Color32::from_rgb(60, 60, 60)),
        );

        if response.clicked() {
            self.send_click(lane, color);
        }
    }

    fn lane_column(&self, ui: &mut Ui, lane: LaneId, state: &LaneState) {
        let border_color = Color32::from_rgb(60, 60, 60);

        Frame::new()
            .stroke(Stroke::new(1.0, border_color))
            .fill(Color32::from_rgb(20, 20, 20))
            .inner_margin(8)
            .outer_margin(6)
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(lane.to_string());
                    ui.add_space(DOT_SPACING);

                    self.light_dot(ui, lane, LightColor::Red, state.signal == SignalColor::Red);
                    ui.add_space(DOT_SPACING);
                    self.light_dot(
                        ui,
                        lane,
                        LightColor::Yellow,
                        state.signal == SignalColor::Yellow,
                    );
                    ui.add_space(DOT_SPACING);
                    self.light_dot(
                        ui,
                        lane,
                        LightColor::Green,
                        state.signal == SignalColor::Green,
                    );
                    ui.add_space(DOT_SPACING);
                    self.light_dot(ui, lane, LightColor::Blue, state.override_active);
                });
            });
    }
}

fn dot_colors(color: LightColor) -> (Color32, Color32) {
    match color {
        LightColor::Red => (Color32::from_rgb(225, 50, 40), Color32::from_rgb(70, 25, 22)),
        LightColor::Yellow => (Color32::from_rgb(240, 200, 40), Color32::from_rgb(75, 65, 22)),
        LightColor::Green => (Color32::from_rgb(60, 210, 70), Color32::from_rgb(25, 68, 28)),
        LightColor::Blue => (Color32::from_rgb(70, 140, 240), Color32::from_rgb(26, 46, 75)),
    }
}

impl eframe::App for CrosslightUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snapshot = self.snapshot_receiver.borrow().clone();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.ctx().request_repaint_after(Duration::from_millis(33));

            ui.vertical_centered(|ui| {
                ui.heading("Crosslight");
            });
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                for (idx, state) in snapshot.lanes.iter().enumerate() {
                    self.lane_column(ui, LaneId(idx), state);
                }
            });

            egui::TopBottomPanel::bottom("status_panel")
                .show_separator_line(false)
                .show_inside(ui, |ui| {
                    ui.horizontal_centered(|ui| {
                        if snapshot.transitioning {
                            ui.colored_label(
                                Color32::from_rgb(200, 50, 20),
                                "\u{2B24} switching - controls locked",
                            );
                        } else {
                            ui.colored_label(
                                Color32::from_rgb(50, 200, 20),
                                "\u{2B24} ready",
                            );
                        }
                        ui.add(egui::Separator::default().vertical());
                        ui.label(format!("{} lanes", snapshot.lanes.len()));
                    });
                });
        });
    }
}
