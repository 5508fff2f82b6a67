use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDateTime, TimeDelta};
use serde::Deserialize;
use thiserror::Error;

use crate::clock::parse_local_datetime;

pub const MAX_INTERVAL_HOURS: i64 = 100_000;

const BUILTIN_ROTATION: &str = include_str!("builtin_rotation.json");

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RotationError {
    #[error("modifier sequence must contain at least one name")]
    EmptySequence,
    #[error("modifier name at position {0} is blank")]
    BlankModifier(usize),
    #[error("duplicate modifier name found: {0}")]
    DuplicateModifier(String),
    #[error("anchor modifier '{0}' is not in the modifier sequence")]
    UnknownAnchor(String),
    #[error("default selection names unknown modifier '{0}'")]
    UnknownSelection(String),
    #[error("interval must be positive and at most {max} hours, got {0} seconds", max = MAX_INTERVAL_HOURS)]
    InvalidInterval(i64),
}

/// A known slot start: `modifier` became active at `time`, and every slot
/// lasts `interval`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorPoint {
    pub time: NaiveDateTime,
    pub modifier: String,
    pub interval: TimeDelta,
}

/// Validated, immutable rotation definition shared by every query.
#[derive(Debug, Clone)]
pub struct RotationConfig {
    modifiers: Vec<String>,
    anchor: AnchorPoint,
    anchor_index: usize,
    default_selection: Vec<String>,
}

impl RotationConfig {
    pub fn new(
        modifiers: Vec<String>,
        anchor: AnchorPoint,
        default_selection: Vec<String>,
    ) -> Result<Self, RotationError> {
        if modifiers.is_empty() {
            return Err(RotationError::EmptySequence);
        }

        let mut seen = HashSet::new();
        for (position, name) in modifiers.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(RotationError::BlankModifier(position));
            }
            if !seen.insert(name.as_str()) {
                return Err(RotationError::DuplicateModifier(name.clone()));
            }
        }

        if anchor.interval <= TimeDelta::zero()
            || anchor.interval > TimeDelta::hours(MAX_INTERVAL_HOURS)
        {
            return Err(RotationError::InvalidInterval(anchor.interval.num_seconds()));
        }

        let anchor_index = modifiers
            .iter()
            .position(|name| *name == anchor.modifier)
            .ok_or_else(|| RotationError::UnknownAnchor(anchor.modifier.clone()))?;

        if let Some(unknown) = default_selection
            .iter()
            .find(|name| !seen.contains(name.as_str()))
        {
            return Err(RotationError::UnknownSelection(unknown.clone()));
        }

        Ok(Self {
            modifiers,
            anchor,
            anchor_index,
            default_selection,
        })
    }

    /// The compiled-in rotation: 13 modifiers on a 3 hour cycle.
    pub fn builtin() -> Result<Self> {
        parse_rotation_config_text(BUILTIN_ROTATION).context("built-in rotation is invalid")
    }

    pub fn modifiers(&self) -> &[String] {
        &self.modifiers
    }

    pub fn sequence_len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn anchor(&self) -> &AnchorPoint {
        &self.anchor
    }

    pub fn anchor_index(&self) -> usize {
        self.anchor_index
    }

    pub fn interval(&self) -> TimeDelta {
        self.anchor.interval
    }

    pub fn default_selection(&self) -> &[String] {
        &self.default_selection
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.modifiers.iter().position(|candidate| candidate == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

pub fn load_rotation_config(path: &Path) -> Result<RotationConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read rotation file {}", path.display()))?;
    parse_rotation_config_text(&content)
}

pub fn parse_rotation_config_text(content: &str) -> Result<RotationConfig> {
    let raw = serde_json::from_str::<RotationConfigFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != 1 {
        bail!(
            "unsupported rotation config version {}; expected version 1",
            raw.version
        );
    }

    let time = parse_local_datetime(&raw.anchor.local_datetime)
        .context("invalid anchor.local_datetime")?;
    let interval = TimeDelta::try_hours(i64::from(raw.interval_hours))
        .ok_or_else(|| anyhow!("interval_hours {} is out of range", raw.interval_hours))?;

    let config = RotationConfig::new(
        raw.modifiers,
        AnchorPoint {
            time,
            modifier: raw.anchor.modifier,
            interval,
        },
        raw.default_selection,
    )?;
    Ok(config)
}

#[derive(Debug, Deserialize)]
struct RotationConfigFile {
    version: u32,
    modifiers: Vec<String>,
    anchor: AnchorFile,
    interval_hours: u32,
    #[serde(default)]
    default_selection: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AnchorFile {
    local_datetime: String,
    modifier: String,
}
