// THEORY:
// The `Position` module is the most fundamental unit of the telemetry engine.
// It is a "dumb" data container for a single point in 3D space plus the small
// set of single-pair heuristics the rest of the engine is built on. Anything
// that needs more than two positions (histories, windows, pattern search)
// belongs in higher-level modules like `PositionHistory` and `pattern_matcher`.
//
// Key architectural principles:
// 1.  **Value Semantics**: A `Position` is a plain value triple. It is cheap to
//     copy and carries no identity; two records holding the same coordinates
//     are interchangeable.
// 2.  **No Exact Equality**: Telemetry is noisy, so the engine never compares
//     coordinates with `==`. All comparisons go through difference thresholds;
//     this module provides the per-axis deltas those comparisons consume.
// 3.  **Recyclable**: `clear` resets a record to the zero point so it can be
//     handed back to the `PositionArena` without leaking stale coordinates.

pub mod position {
    /// The absolute per-axis difference between two positions.
    pub type AxisDelta = f64;

    /// A "dumb" data container for a single sampled point in 3D space.
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct Position {
        /// East/west coordinate of the sample.
        pub x: f64,
        /// Vertical coordinate of the sample.
        pub y: f64,
        /// North/south coordinate of the sample.
        pub z: f64,
    }

    impl Position {
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self { x, y, z }
        }

        /// Resets all coordinates to the zero point. Used when a record is
        /// retired into the arena so no stale telemetry survives recycling.
        pub fn clear(&mut self) {
            self.x = 0.0;
            self.y = 0.0;
            self.z = 0.0;
        }

        /// The absolute difference on each axis against another position.
        /// This is the only comparison primitive the engine uses; exact
        /// equality is meaningless for float telemetry.
        pub fn axis_deltas(&self, other: &Position) -> (AxisDelta, AxisDelta, AxisDelta) {
            (
                (self.x - other.x).abs(),
                (self.y - other.y).abs(),
                (self.z - other.z).abs(),
            )
        }

        /// The displacement vector from `earlier` to `self`, per axis.
        /// The pattern matcher compares these vectors between history slots.
        pub fn displacement_from(&self, earlier: &Position) -> (f64, f64, f64) {
            (self.x - earlier.x, self.y - earlier.y, self.z - earlier.z)
        }
    }
}
