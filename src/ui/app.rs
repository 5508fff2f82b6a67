use std::time::Instant;

use anyhow::Result;
use eframe::egui::{self, Color32, Grid, RichText, ScrollArea, Ui};
use tracing::debug;

use crate::clock::Clock;
use crate::refresh::RefreshTimer;
use crate::rotation::engine::{RotationEngine, SlotStatus};
use crate::rotation::selection::Selection;
use crate::rotation::table::{
    ScheduleSnapshot, TimeDisplayMode, build_snapshot, empty_schedule_message,
    format_slot_time,
};

const LIVE_COLOR: Color32 = Color32::from_rgb(46, 204, 113);
const MUTED: Color32 = Color32::from_rgb(161, 180, 201);
const ACCENT: Color32 = Color32::from_rgb(96, 228, 206);

pub struct GuiOptions {
    pub selection: Selection,
    pub max_per_name: usize,
    pub time_mode: TimeDisplayMode,
    pub timer: RefreshTimer,
}

pub fn run_gui(engine: RotationEngine, clock: Box<dyn Clock>, options: GuiOptions) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Modifier Trial Scheduler")
            .with_inner_size([850.0, 500.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    let app = ModTrackerApp::new(engine, clock, options);

    eframe::run_native(
        "Modifier Trial Scheduler",
        native_options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to launch scheduler window: {err}"))?;

    Ok(())
}

struct ModTrackerApp {
    engine: RotationEngine,
    clock: Box<dyn Clock>,
    selection: Selection,
    max_per_name: usize,
    time_mode: TimeDisplayMode,
    timer: RefreshTimer,
    snapshot: ScheduleSnapshot,
}

impl ModTrackerApp {
    fn new(engine: RotationEngine, clock: Box<dyn Clock>, options: GuiOptions) -> Self {
        let snapshot = build_snapshot(
            &engine,
            clock.now(),
            &options.selection,
            options.max_per_name,
            options.time_mode,
        );
        Self {
            engine,
            clock,
            selection: options.selection,
            max_per_name: options.max_per_name,
            time_mode: options.time_mode,
            timer: options.timer,
            snapshot,
        }
    }

    fn refresh(&mut self, now: Instant) {
        self.snapshot = build_snapshot(
            &self.engine,
            self.clock.now(),
            &self.selection,
            self.max_per_name,
            self.time_mode,
        );
        self.timer.mark(now);
        debug!(
            active = %self.snapshot.current.modifier,
            rows = self.snapshot.rows.len(),
            "schedule refreshed"
        );
    }

    fn show_selection(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Target Modifiers").color(ACCENT).strong());
        ui.separator();

        let names = self.engine.config().modifiers().to_vec();
        for name in &names {
            let mut checked = self.selection.is_selected(name);
            if ui.checkbox(&mut checked, name.as_str()).changed() {
                self.selection.toggle(name);
                self.timer.force();
            }
        }
    }

    fn show_header(&mut self, ui: &mut Ui) {
        ui.horizontal_wrapped(|ui| {
            ui.label(
                RichText::new(format!(
                    "Current Time: {}",
                    self.snapshot.now.format("%b %d, %H:%M:%S")
                ))
                .italics()
                .color(MUTED),
            );
            ui.separator();
            ui.label(
                RichText::new(format!(
                    "Active: {} until {}",
                    self.snapshot.current.modifier,
                    format_slot_time(self.snapshot.current.slot_end, self.time_mode)
                ))
                .color(LIVE_COLOR)
                .strong(),
            );
        });

        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!(
                    "Upcoming Occurrences (Next {} Each)",
                    self.max_per_name
                ))
                .size(16.0)
                .strong(),
            );
            if ui.button("Manual Refresh").clicked() {
                self.timer.force();
            }
            let toggle_text = match self.time_mode {
                TimeDisplayMode::Hour24 => "Switch to 12h",
                TimeDisplayMode::Hour12 => "Switch to 24h",
            };
            if ui.button(toggle_text).clicked() {
                self.time_mode = match self.time_mode {
                    TimeDisplayMode::Hour24 => TimeDisplayMode::Hour12,
                    TimeDisplayMode::Hour12 => TimeDisplayMode::Hour24,
                };
                self.timer.force();
            }
        });
    }

    fn show_schedule(&self, ui: &mut Ui) {
        if self.snapshot.rows.is_empty() {
            ui.label(RichText::new(empty_schedule_message(&self.snapshot)).color(MUTED));
            return;
        }

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                Grid::new("schedule_table")
                    .striped(true)
                    .num_columns(4)
                    .min_col_width(100.0)
                    .show(ui, |ui| {
                        for heading in ["Modifier", "Date & Time", "Starts In", "Status"] {
                            ui.label(RichText::new(heading).strong());
                        }
                        ui.end_row();

                        for row in &self.snapshot.rows {
                            let live = row.status == SlotStatus::Live;
                            let cell = |text: &str| {
                                let text = RichText::new(text);
                                if live {
                                    text.color(LIVE_COLOR).strong()
                                } else {
                                    text
                                }
                            };
                            ui.label(cell(row.modifier.as_str()));
                            ui.label(cell(row.start_text.as_str()));
                            ui.label(cell(row.countdown.as_str()));
                            ui.label(cell(row.status.label()));
                            ui.end_row();
                        }
                    });
            });
    }
}

impl eframe::App for ModTrackerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("selection_panel")
            .resizable(false)
            .min_width(160.0)
            .show(ctx, |ui| self.show_selection(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_header(ui);
            ui.separator();
            self.show_schedule(ui);
        });

        let now = Instant::now();
        if self.timer.is_due(now) {
            self.refresh(now);
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(self.timer.until_due(now));
        }
    }
}
