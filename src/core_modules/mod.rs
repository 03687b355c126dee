// The internal layers of the engine, leaf-first: value containers, the
// recycling arena, per-entity spatial memory, the pattern matcher, the
// per-entity classifier, and the store that owns them all.

pub mod activity_classifier;
pub mod arena;
pub mod pattern_matcher;
pub mod position;
pub mod position_history;
pub mod state_store;
pub mod telemetry;
