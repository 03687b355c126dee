// This file is an example of how to use the `idle_sentry` library.
// The main library entry point is `src/lib.rs`.

use idle_sentry::core_modules::telemetry::telemetry::TelemetrySample;
use idle_sentry::pipeline::{ActivityEngine, EngineConfig};

fn main() {
    println!("Idle Sentry Engine - Example Runner");

    // In a real application the scan loop would acquire telemetry for every
    // observed entity each tick and feed it here.
    let mut engine = match ActivityEngine::new(EngineConfig::default()) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return;
        }
    };

    // Entity 1 stands still; entity 2 rides a transport loop.
    for tick in 0..20 {
        let scan = vec![
            (1, TelemetrySample::new(100.0, 64.0, -20.0, 10.0, 90.0)),
            (2, TelemetrySample::new(tick as f64, 64.0, 0.0, 0.0, 0.0)),
        ];
        let report = engine.process_scan(&scan);
        println!(
            "tick {tick:>2}: {} of {} entities AFK",
            report.afk_count,
            report.verdicts.len()
        );
    }

    for snapshot in engine.snapshot() {
        println!(
            "entity {}: afk={} unchanged_ticks={}",
            snapshot.id, snapshot.is_afk, snapshot.unchanged_ticks
        );
    }
}
