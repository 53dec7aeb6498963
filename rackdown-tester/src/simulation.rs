//! Headless autoplay: drives a full session against the core at a
//! fixed tick rate and a configurable tap cadence.

use rackdown_game::{CounterStore, CrashRecord, SessionController, SessionPhase, TuningConfig};
use serde::Serialize;

/// Configuration for one autoplayed session.
#[derive(Debug, Clone, Copy)]
pub struct HarnessConfig {
    pub seed: u64,
    pub taps_per_second: f32,
    pub tick_hz: f32,
    /// Wall-clock horizon; a session that has not reached Crashed by
    /// then is reported as incomplete.
    pub max_seconds: f32,
}

impl HarnessConfig {
    #[must_use]
    pub fn new(seed: u64, taps_per_second: f32) -> Self {
        Self {
            seed,
            taps_per_second,
            tick_hz: 30.0,
            max_seconds: 120.0,
        }
    }
}

/// Outcome of one autoplayed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub seed: u64,
    pub taps: u32,
    pub survived_seconds: f32,
    /// Present when the session reached Crashed within the horizon.
    pub record: Option<CrashRecord>,
}

impl SessionReport {
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.record.is_some()
    }
}

/// Play one session to completion (or the horizon) and report it.
pub fn run_session<S: CounterStore>(
    store: S,
    tuning: &TuningConfig,
    harness: &HarnessConfig,
) -> SessionReport {
    let mut game = SessionController::new(store, tuning.clone(), harness.seed);
    let dt = 1.0 / harness.tick_hz.max(1.0);
    let mut tap_budget = 0.0f32;
    let mut clock = 0.0f32;

    // First tap leaves Ready; the cadence takes over from there.
    game.on_tap();

    while clock < harness.max_seconds {
        game.on_tick(dt);
        clock += dt;
        match game.phase() {
            SessionPhase::Playing => {
                tap_budget += harness.taps_per_second * dt;
                while tap_budget >= 1.0 {
                    tap_budget -= 1.0;
                    game.on_tap();
                }
            }
            SessionPhase::Crashed => break,
            SessionPhase::Ready | SessionPhase::Crashing => {}
        }
    }

    SessionReport {
        seed: harness.seed,
        taps: game.tap_count(),
        survived_seconds: game.elapsed_seconds(),
        record: game.crash_record().cloned(),
    }
}
