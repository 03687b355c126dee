// THEORY:
// This file is the main entry point for the `idle_sentry` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like a scan-loop orchestrator).
//
// The primary goal is to export the `ActivityEngine` and its associated data
// structures (`EngineConfig`, `ScanReport`, `ActivityVerdict`, etc.) as the
// clean, high-level interface for the entire detection engine. All the complex
// internal modules (`core_modules`) are encapsulated and hidden from the
// end-user, providing a clean separation of concerns.

pub mod core_modules;
pub mod parallel_pipeline;
pub mod pipeline;
