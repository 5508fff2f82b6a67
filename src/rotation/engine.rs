use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::rotation::model::RotationConfig;
use crate::rotation::selection::Selection;

const NANOS_PER_SECOND: i128 = 1_000_000_000;
const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum SlotStatus {
    #[serde(rename = "LIVE NOW")]
    Live,
    Upcoming,
}

impl SlotStatus {
    pub fn label(self) -> &'static str {
        match self {
            SlotStatus::Live => "LIVE NOW",
            SlotStatus::Upcoming => "Upcoming",
        }
    }
}

/// The slot containing a queried instant.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CurrentSlot {
    pub index: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Occurrence {
    pub modifier: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub is_live: bool,
}

impl Occurrence {
    pub fn status(&self) -> SlotStatus {
        if self.is_live {
            SlotStatus::Live
        } else {
            SlotStatus::Upcoming
        }
    }
}

/// Answers slot queries for one rotation. Holds no mutable state, so a single
/// engine can serve any number of front ends or threads.
#[derive(Debug, Clone)]
pub struct RotationEngine {
    config: Arc<RotationConfig>,
}

impl RotationEngine {
    pub fn new(config: Arc<RotationConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn modifier_at(&self, index: usize) -> &str {
        let modifiers = self.config.modifiers();
        &modifiers[index % modifiers.len()]
    }

    pub fn current_slot(&self, now: NaiveDateTime) -> CurrentSlot {
        let interval = self.config.interval();
        let interval_ns = span_nanos(interval);
        let elapsed_ns = span_nanos(now - self.config.anchor().time);

        // Floor semantics: instants before the anchor land in earlier slots.
        let slots_passed = elapsed_ns.div_euclid(interval_ns);
        let into_slot_ns = elapsed_ns.rem_euclid(interval_ns);

        let len = self.config.sequence_len() as i128;
        let index = (self.config.anchor_index() as i128 + slots_passed).rem_euclid(len) as usize;

        // into_slot_ns < interval_ns, and intervals are capped well inside i64 nanoseconds.
        let start = now
            .checked_sub_signed(TimeDelta::nanoseconds(into_slot_ns as i64))
            .unwrap_or(NaiveDateTime::MIN);
        let end = start
            .checked_add_signed(interval)
            .unwrap_or(NaiveDateTime::MAX);
        CurrentSlot { index, start, end }
    }

    /// Next `max_per_name` start times of every selected modifier, merged into
    /// one chronological list. Slot 0 is the slot containing `now` and is
    /// reported as live. Names outside the rotation are ignored.
    pub fn upcoming_occurrences(
        &self,
        now: NaiveDateTime,
        selection: &Selection,
        max_per_name: usize,
    ) -> Vec<Occurrence> {
        if max_per_name == 0 {
            return Vec::new();
        }

        let mut remaining: HashMap<&str, usize> = selection
            .names()
            .filter(|name| self.config.contains(name))
            .map(|name| (name, max_per_name))
            .collect();
        let mut unfinished = remaining.len();
        if unfinished == 0 {
            return Vec::new();
        }

        let interval = self.config.interval();
        let len = self.config.sequence_len();
        let slot = self.current_slot(now);
        let bound = len.saturating_mul(max_per_name);

        let mut occurrences = Vec::new();
        let mut start = slot.start;
        for step in 0..bound {
            let name = self.modifier_at(slot.index + step % len);
            if let Some(left) = remaining.get_mut(name)
                && *left > 0
            {
                let Some(end) = start.checked_add_signed(interval) else {
                    break;
                };
                occurrences.push(Occurrence {
                    modifier: name.to_string(),
                    start,
                    end,
                    is_live: step == 0,
                });
                *left -= 1;
                if *left == 0 {
                    unfinished -= 1;
                    if unfinished == 0 {
                        break;
                    }
                }
            }

            match start.checked_add_signed(interval) {
                Some(next) => start = next,
                None => break,
            }
        }

        occurrences.sort_by_key(|occurrence| occurrence.start);
        occurrences
    }
}

/// Time left until `target` as `"1d 0h 5m"`, `"2h 0m"` or `"45m"`. Seconds are
/// truncated. Anything at or before `now` is `"Active"`.
pub fn format_countdown(target: NaiveDateTime, now: NaiveDateTime) -> String {
    if target <= now {
        return "Active".to_string();
    }

    let total_minutes = (target - now).num_minutes();
    let days = total_minutes / MINUTES_PER_DAY;
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 || days > 0 {
        parts.push(format!("{hours}h"));
    }
    parts.push(format!("{minutes}m"));
    parts.join(" ")
}

fn span_nanos(span: TimeDelta) -> i128 {
    i128::from(span.num_seconds()) * NANOS_PER_SECOND + i128::from(span.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;
    use crate::rotation::model::AnchorPoint;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid datetime")
    }

    fn abc_engine() -> RotationEngine {
        let config = RotationConfig::new(
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            AnchorPoint {
                time: t0(),
                modifier: "B".to_string(),
                interval: TimeDelta::hours(3),
            },
            Vec::new(),
        )
        .expect("valid config");
        RotationEngine::new(Arc::new(config))
    }

    fn builtin_engine() -> RotationEngine {
        RotationEngine::new(Arc::new(RotationConfig::builtin().expect("builtin")))
    }

    #[test]
    fn anchor_instant_maps_to_anchor_slot() {
        let engine = abc_engine();
        let slot = engine.current_slot(t0());
        assert_eq!(slot.index, 1);
        assert_eq!(slot.start, t0());
        assert_eq!(slot.end, t0() + TimeDelta::hours(3));
        assert_eq!(engine.modifier_at(slot.index), "B");
    }

    #[test]
    fn slots_advance_every_interval() {
        let engine = abc_engine();

        let next = engine.current_slot(t0() + TimeDelta::hours(3));
        assert_eq!(engine.modifier_at(next.index), "C");
        assert_eq!(next.start, t0() + TimeDelta::hours(3));

        let later = engine.current_slot(t0() + TimeDelta::hours(7));
        assert_eq!(later.index, 0);
        assert_eq!(engine.modifier_at(later.index), "A");
        assert_eq!(later.start, t0() + TimeDelta::hours(6));
    }

    #[test]
    fn instants_before_anchor_use_floor_division() {
        let engine = abc_engine();

        let just_before = engine.current_slot(t0() - TimeDelta::minutes(1));
        assert_eq!(engine.modifier_at(just_before.index), "A");
        assert_eq!(just_before.start, t0() - TimeDelta::hours(3));

        let far_before = engine.current_slot(t0() - TimeDelta::hours(7));
        // 7h back is 3 slots back: (1 - 3) mod 3 = 1.
        assert_eq!(far_before.index, 1);
        assert_eq!(far_before.start, t0() - TimeDelta::hours(9));
    }

    #[test]
    fn sub_second_offsets_keep_slot_start_exact() {
        let engine = abc_engine();
        let now = t0() + TimeDelta::hours(4) + TimeDelta::nanoseconds(123_456_789);
        let slot = engine.current_slot(now);
        assert_eq!(slot.start, t0() + TimeDelta::hours(3));

        let before = t0() - TimeDelta::nanoseconds(1);
        assert_eq!(engine.current_slot(before).start, t0() - TimeDelta::hours(3));
    }

    #[test]
    fn walk_finds_future_occurrences_in_slot_order() {
        let engine = abc_engine();
        let selection = Selection::from_names(["A"]);
        let occurrences = engine.upcoming_occurrences(t0(), &selection, 2);
        assert_eq!(
            occurrences,
            vec![
                Occurrence {
                    modifier: "A".to_string(),
                    start: t0() + TimeDelta::hours(6),
                    end: t0() + TimeDelta::hours(9),
                    is_live: false,
                },
                Occurrence {
                    modifier: "A".to_string(),
                    start: t0() + TimeDelta::hours(15),
                    end: t0() + TimeDelta::hours(18),
                    is_live: false,
                },
            ]
        );
    }

    #[test]
    fn active_modifier_is_reported_live() {
        let engine = abc_engine();
        let now = t0() + TimeDelta::minutes(90);
        let occurrences = engine.upcoming_occurrences(now, &Selection::from_names(["B"]), 3);
        assert_eq!(occurrences.len(), 3);
        assert!(occurrences[0].is_live);
        assert_eq!(occurrences[0].status(), SlotStatus::Live);
        assert_eq!(occurrences[0].start, t0());
        assert!(occurrences[1..].iter().all(|occurrence| !occurrence.is_live));
        assert_eq!(occurrences[2].start, t0() + TimeDelta::hours(18));
    }

    #[test]
    fn multiple_names_are_merged_chronologically() {
        let engine = abc_engine();
        let occurrences =
            engine.upcoming_occurrences(t0(), &Selection::from_names(["A", "C"]), 2);
        let summary: Vec<(&str, i64)> = occurrences
            .iter()
            .map(|occurrence| {
                (
                    occurrence.modifier.as_str(),
                    (occurrence.start - t0()).num_hours(),
                )
            })
            .collect();
        assert_eq!(summary, [("C", 3), ("A", 6), ("C", 12), ("A", 15)]);
    }

    #[test]
    fn empty_selection_and_zero_count_yield_nothing() {
        let engine = abc_engine();
        assert!(
            engine
                .upcoming_occurrences(t0(), &Selection::new(), 5)
                .is_empty()
        );
        assert!(
            engine
                .upcoming_occurrences(t0(), &Selection::from_names(["A"]), 0)
                .is_empty()
        );
    }

    #[test]
    fn unknown_names_are_ignored() {
        let engine = abc_engine();
        let occurrences =
            engine.upcoming_occurrences(t0(), &Selection::from_names(["A", "Nope"]), 2);
        assert_eq!(occurrences.len(), 2);
        assert!(occurrences.iter().all(|occurrence| occurrence.modifier == "A"));

        assert!(
            engine
                .upcoming_occurrences(t0(), &Selection::from_names(["Nope"]), 2)
                .is_empty()
        );
    }

    #[test]
    fn single_modifier_rotation_is_always_live() {
        let config = RotationConfig::new(
            vec!["Solo".to_string()],
            AnchorPoint {
                time: t0(),
                modifier: "Solo".to_string(),
                interval: TimeDelta::hours(1),
            },
            Vec::new(),
        )
        .expect("valid config");
        let engine = RotationEngine::new(Arc::new(config));
        let now = t0() - TimeDelta::minutes(30);
        let occurrences = engine.upcoming_occurrences(now, &Selection::from_names(["Solo"]), 3);
        assert_eq!(occurrences.len(), 3);
        assert!(occurrences[0].is_live);
        assert_eq!(occurrences[0].start, t0() - TimeDelta::hours(1));
        assert_eq!(occurrences[2].start, t0() + TimeDelta::hours(1));
    }

    #[test]
    fn builtin_rotation_matches_known_schedule() {
        let engine = builtin_engine();
        let anchor = engine.config().anchor().time;

        let slot = engine.current_slot(anchor + TimeDelta::minutes(10));
        assert_eq!(engine.modifier_at(slot.index), "Exploding");
        assert_eq!(slot.start, anchor);

        let slot = engine.current_slot(anchor - TimeDelta::minutes(1));
        assert_eq!(engine.modifier_at(slot.index), "Jailed");
        assert_eq!(slot.start, anchor - TimeDelta::hours(3));

        let selection = Selection::from_names(["Commited", "Glass", "Quarantine"]);
        let occurrences = engine.upcoming_occurrences(anchor, &selection, 5);
        assert_eq!(occurrences.len(), 15);
        assert_eq!(occurrences[0].modifier, "Commited");
        assert_eq!(occurrences[0].start, anchor + TimeDelta::hours(6));
        assert_eq!(occurrences[1].modifier, "Glass");
        assert_eq!(occurrences[1].start, anchor + TimeDelta::hours(21));
        assert_eq!(occurrences[2].modifier, "Quarantine");
        assert_eq!(occurrences[2].start, anchor + TimeDelta::hours(24));
    }

    #[test]
    fn countdown_formats_components() {
        let now = t0();
        assert_eq!(
            format_countdown(now + TimeDelta::days(1) + TimeDelta::minutes(5), now),
            "1d 0h 5m"
        );
        assert_eq!(format_countdown(now + TimeDelta::hours(2), now), "2h 0m");
        assert_eq!(format_countdown(now + TimeDelta::minutes(45), now), "45m");
        assert_eq!(
            format_countdown(now + TimeDelta::days(2) + TimeDelta::hours(3), now),
            "2d 3h 0m"
        );
    }

    #[test]
    fn countdown_truncates_seconds() {
        let now = t0();
        assert_eq!(format_countdown(now + TimeDelta::seconds(30), now), "0m");
        assert_eq!(
            format_countdown(now + TimeDelta::minutes(59) + TimeDelta::seconds(59), now),
            "59m"
        );
    }

    #[test]
    fn countdown_is_active_at_or_before_now() {
        let now = t0();
        assert_eq!(format_countdown(now, now), "Active");
        assert_eq!(
            format_countdown(now - TimeDelta::nanoseconds(1), now),
            "Active"
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn prop_rotation_is_periodic(
            offset_secs in -10_000_000_000_i64..10_000_000_000_i64,
            k in -500_i64..500,
        ) {
            let engine = builtin_engine();
            let interval = engine.config().interval();
            let len = engine.config().sequence_len() as i64;
            let now = engine.config().anchor().time + TimeDelta::seconds(offset_secs);

            let base = engine.current_slot(now);
            let shifted = engine.current_slot(now + TimeDelta::seconds(k * interval.num_seconds()));

            prop_assert_eq!(shifted.index as i64, (base.index as i64 + k).rem_euclid(len));
            prop_assert_eq!(
                shifted.start,
                base.start + TimeDelta::seconds(k * interval.num_seconds())
            );
            prop_assert!(base.start <= now && now < base.end);
        }

        #[test]
        fn prop_each_selected_name_gets_exact_count(
            mask in 1_u16..(1 << 13),
            max_per_name in 1_usize..8,
            offset_secs in -1_000_000_000_i64..1_000_000_000_i64,
        ) {
            let engine = builtin_engine();
            let names: Vec<String> = engine
                .config()
                .modifiers()
                .iter()
                .enumerate()
                .filter(|(position, _)| mask & (1 << position) != 0)
                .map(|(_, name)| name.clone())
                .collect();
            let selection = Selection::from_names(names.iter().cloned());
            let now = engine.config().anchor().time + TimeDelta::seconds(offset_secs);
            let slot = engine.current_slot(now);
            let period = engine.config().interval() * engine.config().sequence_len() as i32;

            let occurrences = engine.upcoming_occurrences(now, &selection, max_per_name);
            prop_assert_eq!(occurrences.len(), names.len() * max_per_name);
            prop_assert!(occurrences.windows(2).all(|pair| pair[0].start < pair[1].start));

            for name in &names {
                let starts: Vec<NaiveDateTime> = occurrences
                    .iter()
                    .filter(|occurrence| occurrence.modifier == *name)
                    .map(|occurrence| occurrence.start)
                    .collect();
                prop_assert_eq!(starts.len(), max_per_name);
                prop_assert!(starts[0] >= slot.start);
                prop_assert!(starts.windows(2).all(|pair| pair[1] - pair[0] == period));
            }

            for occurrence in &occurrences {
                prop_assert_eq!(occurrence.is_live, occurrence.start == slot.start);
                prop_assert_eq!(occurrence.end - occurrence.start, engine.config().interval());
            }
        }

        #[test]
        fn prop_countdown_is_active_for_past_targets(back_secs in 0_i64..10_000_000) {
            let now = t0();
            prop_assert_eq!(format_countdown(now - TimeDelta::seconds(back_secs), now), "Active");
        }
    }
}
