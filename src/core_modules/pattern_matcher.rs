// THEORY:
// The `PatternMatcher` is the engine of the forced-movement detection layer.
// Genuine human movement is erratic; a transport loop (minecart circuit, water
// stream, automated walker) moves an entity by a near-identical displacement
// vector tick after tick. This module detects that repetition.
//
// Key architectural principles & algorithm steps:
// 1.  **Latest Vector Extraction**: The movement vector under test is the
//     per-axis difference between the last two history entries, i.e. what
//     the entity just did.
// 2.  **Bounded Look-Back Scan**: Earlier adjacent-pair vectors are rebuilt
//     from the window, walking backwards from the newest pair over at most
//     `pattern_lookback` pairs. The start index is clipped so the scan never
//     reaches below the second history slot.
// 3.  **Tolerance Matching**: Two vectors match when every axis differs by at
//     most `pattern_diff_threshold`. Exact float equality is never used; the
//     tolerance absorbs jitter injected by the transport itself. A latest
//     vector that is itself indistinguishable from zero never counts as a
//     pattern: plain stillness belongs to the stationarity signal and its
//     dwell counter.
// 4.  **Vote Counting**: The pattern verdict is positive once the number of
//     matching vectors in the window reaches `pattern_threshold`.
// 5.  **Stateless Utility**: `repeats_recent_vector` is a pure function of the
//     supplied history and configuration. It holds no memory between calls
//     and always returns the same verdict for the same window.

use crate::core_modules::position_history::PositionHistory;
use crate::pipeline::EngineConfig;

pub mod pattern_matcher {
    use super::*; // Make structs from parent module available.

    /// The main function of the forced-movement detection layer.
    /// Decides whether the latest movement vector recurs within the
    /// configured look-back window of earlier vectors.
    pub fn repeats_recent_vector(history: &PositionHistory, config: &EngineConfig) -> bool {
        // --- 1. Preconditions ---
        // Too little history means any repetition is coincidence; bail out
        // before doing any vector math. The minimum-history gate also
        // guarantees the two entries the latest vector needs.
        if history.len() < config.pattern_min_history || history.len() < 2 {
            return false;
        }

        let (Some(last), Some(second_last)) = (history.last(), history.second_last()) else {
            return false;
        };
        let latest = last.displacement_from(&second_last);

        // A latest vector indistinguishable from zero is stillness, not a
        // transport loop; the stationarity path owns that case. Without this
        // gate a parked entity would "pattern-match" its own zero vectors
        // and skip the dwell counter entirely.
        let tolerance = config.pattern_diff_threshold;
        if latest.0.abs() <= tolerance && latest.1.abs() <= tolerance && latest.2.abs() <= tolerance
        {
            return false;
        }

        // --- 2. Look-Back Scan ---
        // Walk adjacent pairs backwards from the newest, covering at most
        // `pattern_lookback` pairs. The start index never drops below 1 so
        // `i - 1` stays valid.
        let len = history.len();
        let stop = 2usize.max(len.saturating_sub(config.pattern_lookback));

        let mut matches = 0usize;
        let mut i = len - 1;
        while i >= stop {
            let (Some(newer), Some(older)) = (history.get(i), history.get(i - 1)) else {
                break;
            };
            let candidate = newer.displacement_from(&older);

            // --- 3. Tolerance Match ---
            if (candidate.0 - latest.0).abs() <= tolerance
                && (candidate.1 - latest.1).abs() <= tolerance
                && (candidate.2 - latest.2).abs() <= tolerance
            {
                matches += 1;
            }

            i -= 1;
        }

        // --- 4. Vote ---
        matches >= config.pattern_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::pattern_matcher::repeats_recent_vector;
    use crate::core_modules::arena::PositionArena;
    use crate::core_modules::position::position::Position;
    use crate::core_modules::position_history::PositionHistory;
    use crate::pipeline::EngineConfig;

    fn history_from(points: &[(f64, f64, f64)], capacity: usize) -> PositionHistory {
        let mut arena = PositionArena::default();
        let mut history = PositionHistory::new(capacity);
        for &(x, y, z) in points {
            history.append(Position::new(x, y, z), &mut arena);
        }
        history
    }

    fn constant_stride(count: usize) -> Vec<(f64, f64, f64)> {
        (0..count).map(|i| (i as f64, 0.0, 0.0)).collect()
    }

    #[test]
    fn pure_stillness_is_not_a_pattern() {
        let config = EngineConfig::default();
        let points = vec![(100.0, 64.0, -20.0); 12];
        let history = history_from(&points, config.history_size);
        assert!(!repeats_recent_vector(&history, &config));
    }

    #[test]
    fn short_history_is_never_a_pattern() {
        let config = EngineConfig::default();
        let history = history_from(&constant_stride(7), config.history_size);
        assert!(!repeats_recent_vector(&history, &config));
    }

    #[test]
    fn empty_and_single_entry_windows_are_false() {
        let mut config = EngineConfig::default();
        config.pattern_min_history = 0;
        assert!(!repeats_recent_vector(
            &history_from(&[], config.history_size),
            &config
        ));
        assert!(!repeats_recent_vector(
            &history_from(&[(1.0, 2.0, 3.0)], config.history_size),
            &config
        ));
    }

    #[test]
    fn constant_displacement_is_detected_at_minimum_history() {
        let config = EngineConfig::default();
        let history = history_from(&constant_stride(config.pattern_min_history), config.history_size);
        assert!(repeats_recent_vector(&history, &config));
    }

    #[test]
    fn direction_changing_jitter_is_not_a_pattern() {
        let config = EngineConfig::default();
        // Small steps that keep flipping direction: each adjacent-pair vector
        // differs from the latest by well over the 0.01 tolerance.
        let mut points = Vec::new();
        let mut x = 0.0;
        for i in 0..12 {
            x += if i % 2 == 0 { 0.05 } else { -0.05 };
            points.push((x, 0.0, 0.0));
        }
        let history = history_from(&points, config.history_size);
        assert!(!repeats_recent_vector(&history, &config));
    }

    #[test]
    fn near_matches_within_tolerance_count() {
        let config = EngineConfig::default();
        // Strides of 1.0 with ±0.004 wobble stay inside the 0.01 tolerance.
        let mut points = Vec::new();
        let mut x = 0.0;
        for i in 0..10 {
            x += 1.0 + if i % 2 == 0 { 0.004 } else { -0.004 };
            points.push((x, 0.0, 0.0));
        }
        let history = history_from(&points, config.history_size);
        assert!(repeats_recent_vector(&history, &config));
    }

    #[test]
    fn verdict_is_pure_across_repeated_invocations() {
        let config = EngineConfig::default();
        let history = history_from(&constant_stride(15), config.history_size);
        let first = repeats_recent_vector(&history, &config);
        for _ in 0..5 {
            assert_eq!(repeats_recent_vector(&history, &config), first);
        }
    }

    #[test]
    fn lookback_window_limits_how_far_the_scan_reaches() {
        let mut config = EngineConfig::default();
        config.pattern_min_history = 4;
        config.pattern_threshold = 5;
        config.pattern_lookback = 3;
        // Plenty of matching pairs exist, but only 3 fall inside the window,
        // so the vote can never reach 5.
        let history = history_from(&constant_stride(20), config.history_size);
        assert!(!repeats_recent_vector(&history, &config));
    }
}
