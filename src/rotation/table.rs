use anyhow::Result;
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;

use crate::rotation::engine::{RotationEngine, SlotStatus, format_countdown};
use crate::rotation::selection::Selection;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TimeDisplayMode {
    Hour24,
    Hour12,
}

/// One rendered line of the schedule table.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleRow {
    pub modifier: String,
    pub start: NaiveDateTime,
    pub start_text: String,
    pub countdown: String,
    pub status: SlotStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveSlot {
    pub modifier: String,
    pub slot_start: NaiveDateTime,
    pub slot_end: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSnapshot {
    pub now: NaiveDateTime,
    pub current: ActiveSlot,
    pub selected: Vec<String>,
    pub rows: Vec<ScheduleRow>,
}

pub fn schedule_rows(
    engine: &RotationEngine,
    now: NaiveDateTime,
    selection: &Selection,
    max_per_name: usize,
    mode: TimeDisplayMode,
) -> Vec<ScheduleRow> {
    engine
        .upcoming_occurrences(now, selection, max_per_name)
        .into_iter()
        .map(|occurrence| ScheduleRow {
            start_text: format_slot_time(occurrence.start, mode),
            countdown: format_countdown(occurrence.start, now),
            status: occurrence.status(),
            start: occurrence.start,
            modifier: occurrence.modifier,
        })
        .collect()
}

pub fn build_snapshot(
    engine: &RotationEngine,
    now: NaiveDateTime,
    selection: &Selection,
    max_per_name: usize,
    mode: TimeDisplayMode,
) -> ScheduleSnapshot {
    let slot = engine.current_slot(now);
    ScheduleSnapshot {
        now,
        current: ActiveSlot {
            modifier: engine.modifier_at(slot.index).to_string(),
            slot_start: slot.start,
            slot_end: slot.end,
        },
        selected: selection.names().map(str::to_string).collect(),
        rows: schedule_rows(engine, now, selection, max_per_name, mode),
    }
}

/// `Feb 20, 19:00` or `Feb 20, 07:00 PM`.
pub fn format_slot_time(at: NaiveDateTime, mode: TimeDisplayMode) -> String {
    match mode {
        TimeDisplayMode::Hour24 => at.format("%b %d, %H:%M").to_string(),
        TimeDisplayMode::Hour12 => {
            let (is_pm, hour12) = at.hour12();
            let meridiem = if is_pm { "PM" } else { "AM" };
            format!(
                "{} {:02}:{:02} {meridiem}",
                at.format("%b %d,"),
                hour12,
                at.minute()
            )
        }
    }
}

pub fn render_text(snapshot: &ScheduleSnapshot, mode: TimeDisplayMode) -> String {
    let mut out = format!(
        "Current Time: {}\nActive: {} ({} - {})\n\n",
        snapshot.now.format("%b %d, %H:%M:%S"),
        snapshot.current.modifier,
        format_slot_time(snapshot.current.slot_start, mode),
        format_slot_time(snapshot.current.slot_end, mode),
    );

    if snapshot.rows.is_empty() {
        out.push_str(empty_schedule_message(snapshot));
        out.push('\n');
        return out;
    }

    let header = ["Modifier", "Date & Time", "Starts In", "Status"];
    let cells: Vec<[&str; 4]> = snapshot
        .rows
        .iter()
        .map(|row| {
            [
                row.modifier.as_str(),
                row.start_text.as_str(),
                row.countdown.as_str(),
                row.status.label(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.len());
        }
    }

    push_table_line(&mut out, &header, &widths);
    let rule = widths.map(|width| "-".repeat(width));
    push_table_line(&mut out, &rule.each_ref().map(String::as_str), &widths);
    for line in &cells {
        push_table_line(&mut out, line, &widths);
    }
    out
}

pub fn empty_schedule_message(snapshot: &ScheduleSnapshot) -> &'static str {
    if snapshot.selected.is_empty() {
        "No modifiers selected."
    } else {
        "No upcoming occurrences."
    }
}

pub fn render_json(snapshot: &ScheduleSnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

fn push_table_line(out: &mut String, cells: &[&str; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
