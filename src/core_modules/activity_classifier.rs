// THEORY:
// The `ActivityClassifier` is the heart of the temporal analysis layer. Each
// tracked entity owns one `EntityActivityState`: a stateful analyzer that
// observes the stream of telemetry samples for that entity over time and
// decides, tick by tick, whether the entity is genuinely active or idle.
//
// Key architectural principles:
// 1.  **Two Independent Signals**: Stillness is judged two ways at once.
//     *Stationarity* (the pose barely moved since the previous tick) covers
//     the player standing at a chest. *Pattern repetition* (the latest
//     movement vector recurs in the recent window) covers the player parked
//     on a transport loop who is technically moving every tick.
// 2.  **Either/Or Policy**: A tick counts as idle when EITHER signal fires,
//     and the final verdict is `dwell reached OR pattern detected`. The
//     pattern branch deliberately bypasses the dwell counter so automated
//     movement is flagged on the first qualifying tick.
// 3.  **Hard Counter Reset**: One genuinely active tick resets the dwell
//     counter to zero. There is no gradual decay; activity is activity.
// 4.  **Calibration Phase**: The first observation of an entity only seeds
//     the stored pose. A first sighting can never be classified idle; there
//     is nothing to compare it against yet.

use crate::core_modules::arena::PositionArena;
use crate::core_modules::pattern_matcher::pattern_matcher;
use crate::core_modules::position::position::Position;
use crate::core_modules::position_history::PositionHistory;
use crate::core_modules::telemetry::telemetry::TelemetrySample;
use crate::pipeline::EngineConfig;

/// Where a per-entity analyzer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierPhase {
    /// First observation not yet processed; no baseline pose exists.
    Calibrating,
    /// Baseline seeded; every update produces a real verdict.
    Tracking,
}

/// The outcome of one classification tick for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityVerdict {
    /// True when the entity is currently classified idle.
    pub is_afk: bool,
    /// Consecutive ticks the entity has counted as idle.
    pub unchanged_ticks: u32,
}

impl ActivityVerdict {
    fn active() -> Self {
        Self {
            is_afk: false,
            unchanged_ticks: 0,
        }
    }
}

/// A stateful idle/active analyzer for a single tracked entity.
#[derive(Debug, Clone)]
pub struct EntityActivityState {
    // --- Lifecycle ---
    /// Whether the baseline pose has been seeded yet.
    phase: ClassifierPhase,

    // --- Last Observed Pose ---
    /// Pitch from the previous tick, absent fields already defaulted.
    last_pitch: f64,
    /// Yaw from the previous tick.
    last_yaw: f64,
    /// Position from the previous tick.
    last_position: Position,

    // --- Temporal State ---
    /// Consecutive ticks classified idle; hard-reset by any active tick.
    unchanged_ticks: u32,
    /// Sliding window of recent positions feeding the pattern matcher.
    position_history: PositionHistory,

    // --- Current Status ---
    /// The verdict produced by the most recent update.
    last_verdict: ActivityVerdict,
}

impl EntityActivityState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            phase: ClassifierPhase::Calibrating,
            last_pitch: 0.0,
            last_yaw: 0.0,
            last_position: Position::default(),
            unchanged_ticks: 0,
            position_history: PositionHistory::new(config.history_size),
            last_verdict: ActivityVerdict::active(),
        }
    }

    /// Processes one telemetry sample and returns the verdict for this tick.
    pub fn observe(
        &mut self,
        sample: &TelemetrySample,
        config: &EngineConfig,
        arena: &mut PositionArena,
    ) -> ActivityVerdict {
        let verdict = match self.phase {
            ClassifierPhase::Calibrating => self.calibrate(sample, arena),
            ClassifierPhase::Tracking => self.track(sample, config, arena),
        };
        self.last_verdict = verdict;
        verdict
    }

    /// First sighting: seed the baseline pose and start the history.
    fn calibrate(&mut self, sample: &TelemetrySample, arena: &mut PositionArena) -> ActivityVerdict {
        self.last_pitch = sample.pitch();
        self.last_yaw = sample.yaw();
        self.last_position = sample.position();
        self.position_history.append(self.last_position, arena);
        self.unchanged_ticks = 0;
        self.phase = ClassifierPhase::Tracking;
        ActivityVerdict::active()
    }

    /// Steady-state tick: compare against the stored pose, consult the
    /// pattern matcher, and update the dwell counter.
    fn track(
        &mut self,
        sample: &TelemetrySample,
        config: &EngineConfig,
        arena: &mut PositionArena,
    ) -> ActivityVerdict {
        let pitch = sample.pitch();
        let yaw = sample.yaw();
        let position = sample.position();

        let pitch_delta = (pitch - self.last_pitch).abs();
        let yaw_delta = (yaw - self.last_yaw).abs();
        let (dx, dy, dz) = position.axis_deltas(&self.last_position);

        // The newest sample must be in the window before the matcher runs,
        // so the vector it just produced participates in the comparison.
        self.position_history.append(position, arena);
        let pattern_detected = pattern_matcher::repeats_recent_vector(&self.position_history, config);

        let stationary = pitch_delta <= config.pitch_yaw_threshold
            && yaw_delta <= config.pitch_yaw_threshold
            && dx <= config.position_threshold
            && dy <= config.position_threshold
            && dz <= config.position_threshold;

        let idle_this_tick = stationary || pattern_detected;
        self.unchanged_ticks = if idle_this_tick {
            self.unchanged_ticks + 1
        } else {
            0
        };

        self.last_pitch = pitch;
        self.last_yaw = yaw;
        self.last_position = position;

        ActivityVerdict {
            is_afk: self.unchanged_ticks >= config.afk_threshold || pattern_detected,
            unchanged_ticks: self.unchanged_ticks,
        }
    }

    pub fn phase(&self) -> ClassifierPhase {
        self.phase
    }

    /// The verdict from the most recent tick.
    pub fn last_verdict(&self) -> ActivityVerdict {
        self.last_verdict
    }

    /// The position observed on the most recent tick.
    pub fn last_position(&self) -> Position {
        self.last_position
    }

    /// How many recent positions the sliding window currently holds.
    pub fn history_len(&self) -> usize {
        self.position_history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still_sample() -> TelemetrySample {
        TelemetrySample::new(100.0, 64.0, -20.0, 10.0, 90.0)
    }

    #[test]
    fn first_observation_is_never_afk() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut state = EntityActivityState::new(&config);

        let verdict = state.observe(&still_sample(), &config, &mut arena);
        assert!(!verdict.is_afk);
        assert_eq!(verdict.unchanged_ticks, 0);
        assert_eq!(state.phase(), ClassifierPhase::Tracking);
    }

    #[test]
    fn stationary_entity_turns_afk_exactly_at_the_dwell_threshold() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut state = EntityActivityState::new(&config);

        // Tick 1: calibration.
        assert!(!state.observe(&still_sample(), &config, &mut arena).is_afk);

        // Ticks 2..=15: dwell counter climbs 1..=14, still active.
        for expected in 1..config.afk_threshold {
            let verdict = state.observe(&still_sample(), &config, &mut arena);
            assert!(!verdict.is_afk, "tick with dwell {expected} flagged early");
            assert_eq!(verdict.unchanged_ticks, expected);
        }

        // Tick 16: dwell reaches 15 and the verdict flips.
        let verdict = state.observe(&still_sample(), &config, &mut arena);
        assert!(verdict.is_afk);
        assert_eq!(verdict.unchanged_ticks, config.afk_threshold);
    }

    #[test]
    fn movement_hard_resets_the_dwell_counter() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut state = EntityActivityState::new(&config);

        state.observe(&still_sample(), &config, &mut arena);
        for _ in 0..5 {
            state.observe(&still_sample(), &config, &mut arena);
        }
        assert_eq!(state.last_verdict().unchanged_ticks, 5);

        let moved = TelemetrySample::new(150.0, 64.0, -20.0, 10.0, 90.0);
        let verdict = state.observe(&moved, &config, &mut arena);
        assert!(!verdict.is_afk);
        assert_eq!(verdict.unchanged_ticks, 0);
    }

    #[test]
    fn view_angle_movement_alone_counts_as_activity() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut state = EntityActivityState::new(&config);

        state.observe(&still_sample(), &config, &mut arena);
        state.observe(&still_sample(), &config, &mut arena);

        // Same position, but the camera swung well past the 0.05 threshold.
        let looked_around = TelemetrySample::new(100.0, 64.0, -20.0, 10.0, 135.0);
        let verdict = state.observe(&looked_around, &config, &mut arena);
        assert_eq!(verdict.unchanged_ticks, 0);
    }

    #[test]
    fn repeating_displacement_flags_afk_before_the_dwell_threshold() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut state = EntityActivityState::new(&config);

        // Constant {1, 0, 0} stride: far outside the stationarity threshold,
        // but a textbook transport loop for the pattern matcher.
        let mut flagged_at = None;
        for tick in 0..config.pattern_min_history + 2 {
            let sample = TelemetrySample::new(tick as f64, 64.0, 0.0, 0.0, 0.0);
            let verdict = state.observe(&sample, &config, &mut arena);
            if verdict.is_afk && flagged_at.is_none() {
                flagged_at = Some(tick + 1);
            }
        }

        // History reaches pattern_min_history on that tick's append, long
        // before unchanged_ticks could reach the dwell threshold of 15.
        assert_eq!(flagged_at, Some(config.pattern_min_history));
    }

    #[test]
    fn sub_threshold_jitter_follows_the_stationarity_path_only() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut state = EntityActivityState::new(&config);

        // 0.05 steps in alternating directions: inside the 0.1 position
        // threshold every tick, but never a repeating vector.
        let mut x = 100.0;
        let mut last = ActivityVerdict::active();
        state.observe(&TelemetrySample::new(x, 64.0, 0.0, 0.0, 0.0), &config, &mut arena);
        for tick in 0..config.afk_threshold {
            x += if tick % 2 == 0 { 0.05 } else { -0.05 };
            last = state.observe(&TelemetrySample::new(x, 64.0, 0.0, 0.0, 0.0), &config, &mut arena);
            if tick + 1 < config.afk_threshold {
                assert!(!last.is_afk);
            }
        }
        assert!(last.is_afk);
        assert_eq!(last.unchanged_ticks, config.afk_threshold);
    }

    #[test]
    fn absent_fields_are_treated_as_zero() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut state = EntityActivityState::new(&config);

        // Calibrate at the origin with no reported fields at all, then keep
        // observing empty samples: a fully-defaulted stream is stationary.
        state.observe(&TelemetrySample::default(), &config, &mut arena);
        for expected in 1..=3 {
            let verdict = state.observe(&TelemetrySample::default(), &config, &mut arena);
            assert_eq!(verdict.unchanged_ticks, expected);
        }
    }
}
