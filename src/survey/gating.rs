//! Survey gating predicates. Each takes every input explicitly so it can be
//! evaluated without a clock or a store.

use chrono::NaiveTime;

/// True when `now` lies strictly between `start` and `end`.
pub fn is_within_time_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    now > start && now < end
}

/// True when no survey was shown yet, or more than `cooldown_ms` has passed
/// since the last one.
///
/// A non-positive timestamp counts as never shown. A timestamp in the future
/// means recency is unknown and the cooldown is treated as still running.
pub fn is_cooldown_elapsed(now_ms: i64, last_shown_ms: Option<i64>, cooldown_ms: u64) -> bool {
    match last_shown_ms {
        None => true,
        Some(shown) if shown <= 0 => true,
        Some(shown) if shown > now_ms => false,
        Some(shown) => ((now_ms - shown) as u64) > cooldown_ms,
    }
}

pub fn is_threshold_met(accumulated_ms: u64, threshold_ms: u64) -> bool {
    accumulated_ms >= threshold_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{DAY_MS, SECOND_MS},
        settings::GatingSettings,
    };

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn in_default_window(now: NaiveTime) -> bool {
        let settings = GatingSettings::default();
        is_within_time_window(now, settings.window_start, settings.window_end)
    }

    #[test]
    fn window_bounds_are_exclusive() {
        assert!(!in_default_window(at(9, 0, 0)));
        assert!(in_default_window(at(9, 0, 1)));
        assert!(in_default_window(at(21, 59, 59)));
        assert!(!in_default_window(at(22, 0, 0)));
        assert!(!in_default_window(at(2, 30, 0)));
        assert!(!in_default_window(at(23, 15, 0)));
    }

    #[test]
    fn cooldown_boundaries() {
        let cooldown = GatingSettings::default().cooldown_ms;
        let shown = 1_000 * DAY_MS;

        assert!(is_cooldown_elapsed(shown, None, cooldown));
        assert!(is_cooldown_elapsed(
            shown + 30 * DAY_MS + SECOND_MS,
            Some(shown),
            cooldown
        ));
        assert!(!is_cooldown_elapsed(
            shown + 30 * DAY_MS - SECOND_MS,
            Some(shown),
            cooldown
        ));
        assert!(!is_cooldown_elapsed(shown + 30 * DAY_MS, Some(shown), cooldown));
    }

    #[test]
    fn anomalous_timestamps_map_to_safe_defaults() {
        let cooldown = GatingSettings::default().cooldown_ms;
        let now = 1_000 * DAY_MS;

        assert!(is_cooldown_elapsed(now, Some(0), cooldown));
        assert!(is_cooldown_elapsed(now, Some(-5), cooldown));
        assert!(!is_cooldown_elapsed(now, Some(now + DAY_MS), cooldown));
    }

    #[test]
    fn threshold_is_inclusive() {
        let threshold = GatingSettings::default().threshold_ms;
        assert!(!is_threshold_met(0, threshold));
        assert!(!is_threshold_met(299_999, threshold));
        assert!(is_threshold_met(300_000, threshold));
    }
}
