// THEORY:
// The `telemetry` module is the ingestion boundary of the engine. A
// `TelemetrySample` is the raw observation handed in by the scan loop: a
// position triple plus view angles, every field optional because upstream
// acquisition frequently drops coordinates for entities that are partially
// loaded or mid-teleport.
//
// Key architectural principles:
// 1.  **Immutable Once Ingested**: A sample is a snapshot. The engine never
//     mutates one after it crosses this boundary; classifiers copy what they
//     need into their own state.
// 2.  **Defaulting Lives Here**: Absent fields resolve to 0.0 by policy, and
//     that policy is implemented exactly once, in this module's accessors.
//     Classifier logic downstream always sees concrete numbers and never
//     reasons about `Option` again.
// 3.  **Missing Data Is Not An Error**: A sample with no position is still a
//     valid observation. The engine classifies what it is given; validating
//     that upstream produced sensible numbers is the caller's job.

pub mod telemetry {
    use crate::core_modules::position::position::Position;

    /// One raw observation of an entity, as delivered by the scan loop.
    /// All fields are optional; absent values default to 0.0 at read time.
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct TelemetrySample {
        /// East/west coordinate, if the acquisition layer reported one.
        pub x: Option<f64>,
        /// Vertical coordinate, if reported.
        pub y: Option<f64>,
        /// North/south coordinate, if reported.
        pub z: Option<f64>,
        /// Camera pitch in degrees, if reported.
        pub pitch: Option<f64>,
        /// Camera yaw in degrees, if reported.
        pub yaw: Option<f64>,
    }

    impl TelemetrySample {
        pub fn new(x: f64, y: f64, z: f64, pitch: f64, yaw: f64) -> Self {
            Self {
                x: Some(x),
                y: Some(y),
                z: Some(z),
                pitch: Some(pitch),
                yaw: Some(yaw),
            }
        }

        /// A sample carrying only a position, with view angles unreported.
        pub fn at(x: f64, y: f64, z: f64) -> Self {
            Self {
                x: Some(x),
                y: Some(y),
                z: Some(z),
                ..Self::default()
            }
        }

        /// The sampled position with absent coordinates resolved to 0.0.
        /// This is the single place the default-to-zero policy is applied
        /// for positional fields.
        pub fn position(&self) -> Position {
            Position::new(
                self.x.unwrap_or(0.0),
                self.y.unwrap_or(0.0),
                self.z.unwrap_or(0.0),
            )
        }

        /// Pitch with the absent-field default applied.
        pub fn pitch(&self) -> f64 {
            self.pitch.unwrap_or(0.0)
        }

        /// Yaw with the absent-field default applied.
        pub fn yaw(&self) -> f64 {
            self.yaw.unwrap_or(0.0)
        }
    }
}
