use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use crate::clock::Clock;
use crate::refresh::{RefreshTimer, sleep_until};
use crate::rotation::engine::RotationEngine;
use crate::rotation::selection::Selection;
use crate::rotation::table::{TimeDisplayMode, build_snapshot, render_json, render_text};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct TextOptions {
    pub selection: Selection,
    pub max_per_name: usize,
    pub time_mode: TimeDisplayMode,
    pub format: OutputFormat,
}

/// Terminal front end: prints the schedule once, or re-prints it every time
/// the refresh timer fires.
pub struct TextFrontEnd<'a> {
    engine: &'a RotationEngine,
    clock: &'a dyn Clock,
    options: TextOptions,
}

impl<'a> TextFrontEnd<'a> {
    pub fn new(engine: &'a RotationEngine, clock: &'a dyn Clock, options: TextOptions) -> Self {
        Self {
            engine,
            clock,
            options,
        }
    }

    pub fn render(&self) -> Result<String> {
        let now = self.clock.now();
        let snapshot = build_snapshot(
            self.engine,
            now,
            &self.options.selection,
            self.options.max_per_name,
            self.options.time_mode,
        );
        debug!(
            now = %now,
            active = %snapshot.current.modifier,
            rows = snapshot.rows.len(),
            "schedule refreshed"
        );
        match self.options.format {
            OutputFormat::Text => Ok(render_text(&snapshot, self.options.time_mode)),
            OutputFormat::Json => {
                let mut json = render_json(&snapshot)?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    pub fn print_once<W: Write>(&self, out: &mut W) -> Result<()> {
        let rendered = self.render()?;
        out.write_all(rendered.as_bytes())
            .and_then(|()| out.flush())
            .context("failed to write schedule")
    }

    pub fn run_watch<W: Write>(&self, out: &mut W, mut timer: RefreshTimer) -> Result<()> {
        loop {
            let now = Instant::now();
            if timer.is_due(now) {
                self.print_once(out)?;
                if self.options.format == OutputFormat::Text {
                    writeln!(out).context("failed to write schedule")?;
                }
                timer.mark(now);
            }
            if let Some(due) = timer.next_due() {
                sleep_until(due);
            }
        }
    }
}
