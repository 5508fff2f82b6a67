mod clock;
mod logging;
mod refresh;
mod rotation;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use crate::clock::{parse_local_datetime, select_clock};
use crate::refresh::{MAX_REFRESH_PERIOD, RefreshTimer};
use crate::rotation::engine::RotationEngine;
use crate::rotation::model::{RotationConfig, load_rotation_config};
use crate::rotation::selection::Selection;
use crate::rotation::table::TimeDisplayMode;
use crate::ui::app::GuiOptions;
use crate::ui::text::{OutputFormat, TextFrontEnd, TextOptions};

const MAX_OCCURRENCES_PER_NAME: usize = 1_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliOutputFormat {
    Text,
    Json,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(value: CliOutputFormat) -> Self {
        match value {
            CliOutputFormat::Text => OutputFormat::Text,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "modtracker",
    version,
    about = "Tracks a fixed modifier rotation and predicts when selected modifiers go live"
)]
struct Cli {
    /// Rotation definition (JSON). Defaults to the built-in rotation.
    #[arg(long)]
    rotation: Option<PathBuf>,

    /// Modifiers to track, comma separated. Defaults to the rotation's default selection.
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Upcoming occurrences listed per selected modifier.
    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Evaluate the schedule at this local time instead of now.
    #[arg(long)]
    at: Option<String>,

    /// Print the schedule once and exit.
    #[arg(long, conflicts_with = "watch")]
    once: bool,

    /// Reprint the schedule in the terminal on every refresh.
    #[arg(long)]
    watch: bool,

    #[arg(long, value_enum, default_value_t = CliOutputFormat::Text)]
    format: CliOutputFormat,

    #[arg(long, default_value_t = 30)]
    refresh_secs: u64,

    /// Show start times on a 12 hour clock.
    #[arg(long)]
    twelve_hour: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    if cli.refresh_secs == 0 {
        bail!("--refresh-secs must be greater than zero");
    }
    if cli.refresh_secs > MAX_REFRESH_PERIOD.as_secs() {
        bail!(
            "--refresh-secs must be at most {}",
            MAX_REFRESH_PERIOD.as_secs()
        );
    }
    if cli.count > MAX_OCCURRENCES_PER_NAME {
        bail!("--count must be at most {MAX_OCCURRENCES_PER_NAME}");
    }

    let config = match &cli.rotation {
        Some(path) => load_rotation_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => RotationConfig::builtin()?,
    };
    let selection = resolve_selection(&config, cli.select.as_deref())?;
    if selection.is_empty() {
        warn!("no modifiers selected; the schedule will be empty");
    }
    let at = cli
        .at
        .as_deref()
        .map(parse_local_datetime)
        .transpose()
        .context("invalid --at value")?;
    let clock = select_clock(at);

    info!(
        modifiers = config.sequence_len(),
        anchor = %config.anchor().time,
        anchor_modifier = %config.anchor().modifier,
        interval_secs = config.interval().num_seconds(),
        clock = clock.label(),
        "rotation loaded"
    );

    let engine = RotationEngine::new(Arc::new(config));
    let time_mode = if cli.twelve_hour {
        TimeDisplayMode::Hour12
    } else {
        TimeDisplayMode::Hour24
    };
    let timer = RefreshTimer::new(Duration::from_secs(cli.refresh_secs));
    info!(
        selected = selection.len(),
        count = cli.count,
        refresh_secs = timer.period().as_secs(),
        "schedule options resolved"
    );

    if cli.once || cli.watch {
        let front = TextFrontEnd::new(
            &engine,
            clock.as_ref(),
            TextOptions {
                selection,
                max_per_name: cli.count,
                time_mode,
                format: cli.format.into(),
            },
        );
        let mut stdout = io::stdout().lock();
        if cli.once {
            return front.print_once(&mut stdout);
        }
        return front.run_watch(&mut stdout, timer);
    }

    ui::app::run_gui(
        engine,
        clock,
        GuiOptions {
            selection,
            max_per_name: cli.count,
            time_mode,
            timer,
        },
    )
}

fn resolve_selection(config: &RotationConfig, requested: Option<&[String]>) -> Result<Selection> {
    let Some(requested) = requested else {
        return Ok(Selection::from_names(config.default_selection().iter().cloned()));
    };

    let mut selection = Selection::new();
    for name in requested.iter().map(|name| name.trim()) {
        if name.is_empty() {
            continue;
        }
        if !config.contains(name) {
            bail!(
                "unknown modifier '{name}'; expected one of: {}",
                config.modifiers().join(", ")
            );
        }
        selection.set(name, true);
    }
    Ok(selection)
}
