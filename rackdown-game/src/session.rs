//! Session lifecycle: the phase machine and the controller that owns
//! the simulator, the hidden crash condition, the console feed, and
//! the persistent crash counter.

use std::fmt;
use std::rc::Rc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::CounterStore;
use crate::config::TuningConfig;
use crate::console::{ConsoleFeed, FeedLine, Severity, sample_line};
use crate::crash::{self, CrashRecord, CrashVariant, select_variant};
use crate::load::{LoadMetrics, LoadSimulator};
use crate::params::{CrashCondition, SessionParams};
use crate::rng::{Dice, RngBundle};

/// Lifecycle phase of a session. Transitions are strictly linear:
/// Ready → Playing → Crashing → Crashed, and Crashed → Ready only via
/// an explicit restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Ready,
    Playing,
    Crashing,
    Crashed,
}

impl SessionPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Crashing => "crashing",
            Self::Crashed => "crashed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of forwarding one tap into the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct TapOutcome {
    /// False when the tap landed in Crashing/Crashed and was ignored.
    pub registered: bool,
    /// True when this tap tripped the crash condition.
    pub crash_started: bool,
}

/// Result of advancing the session by one tick.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// True when a time/stress condition tripped during this tick.
    pub crash_started: bool,
    /// True when the presentation delay elapsed and the session
    /// reached Crashed (the crash record is published now).
    pub crash_completed: bool,
    /// Idle console line emitted this tick, if the cadence fired.
    pub line: Option<FeedLine>,
}

/// Orchestrates one player-visible game session end to end.
///
/// Single-threaded by contract: all mutation happens inside
/// [`on_tap`](Self::on_tap), [`on_tick`](Self::on_tick), and
/// [`restart`](Self::restart), which are never re-entered.
#[derive(Debug)]
pub struct SessionController<S: CounterStore> {
    cfg: TuningConfig,
    seed: u64,
    rng: Rc<RngBundle>,
    phase: SessionPhase,
    params: SessionParams,
    condition: CrashCondition,
    sim: LoadSimulator,
    feed: ConsoleFeed,
    elapsed: f32,
    crash_timer: f32,
    crash_progress: f32,
    pending: Option<CrashRecord>,
    record: Option<CrashRecord>,
    counter: u64,
    store: S,
}

impl<S: CounterStore> SessionController<S> {
    /// Build a controller with a freshly generated session. A failed
    /// counter load degrades to zero and leaves a warning in the feed.
    #[must_use]
    pub fn new(store: S, cfg: TuningConfig, seed: u64) -> Self {
        let rng = Rc::new(RngBundle::from_user_seed(seed));
        let (params, condition, sim_seed) = Self::draw_session(&cfg, &rng);
        Self::assemble(store, cfg, seed, rng, params, condition, sim_seed)
    }

    /// Strict constructor: validates the configuration and propagates
    /// a counter-load failure instead of defaulting.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration fails validation or the
    /// counter store cannot be read.
    pub fn try_new(store: S, cfg: TuningConfig, seed: u64) -> Result<Self, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        cfg.validate()?;
        store.load().map_err(Into::into)?;
        Ok(Self::new(store, cfg, seed))
    }

    /// Build a controller around an explicit parameter profile and
    /// crash condition (deterministic setups, tests, demos).
    #[must_use]
    pub fn with_session(
        store: S,
        cfg: TuningConfig,
        seed: u64,
        params: SessionParams,
        condition: CrashCondition,
    ) -> Self {
        let rng = Rc::new(RngBundle::from_user_seed(seed));
        let sim_seed = rng.params().r#gen::<u64>();
        Self::assemble(store, cfg, seed, rng, params, condition, sim_seed)
    }

    fn draw_session(cfg: &TuningConfig, rng: &Rc<RngBundle>) -> (SessionParams, CrashCondition, u64) {
        let mut prng = rng.params();
        let params = SessionParams::generate(cfg, &mut *prng);
        let condition = CrashCondition::generate(cfg, &mut *prng);
        let sim_seed = prng.r#gen::<u64>();
        (params, condition, sim_seed)
    }

    fn assemble(
        store: S,
        cfg: TuningConfig,
        seed: u64,
        rng: Rc<RngBundle>,
        params: SessionParams,
        condition: CrashCondition,
        sim_seed: u64,
    ) -> Self {
        let loaded = store.load();
        let sim = LoadSimulator::new(sim_seed, params);
        let mut feed = ConsoleFeed::new(&cfg.timing, &mut *rng.console());
        let counter = match loaded {
            Ok(count) => count,
            Err(_) => {
                feed.push(FeedLine::new(
                    Severity::Warning,
                    "[WARN] Crash counter unavailable, starting at zero",
                ));
                0
            }
        };
        Self {
            cfg,
            seed,
            rng,
            phase: SessionPhase::Ready,
            params,
            condition,
            sim,
            feed,
            elapsed: 0.0,
            crash_timer: 0.0,
            crash_progress: 0.0,
            pending: None,
            record: None,
            counter,
            store,
        }
    }

    /// Forward a tap. First tap moves Ready → Playing; taps during
    /// Crashing/Crashed are ignored.
    pub fn on_tap(&mut self) -> TapOutcome {
        match self.phase {
            SessionPhase::Crashing | SessionPhase::Crashed => return TapOutcome::default(),
            SessionPhase::Ready => self.phase = SessionPhase::Playing,
            SessionPhase::Playing => {}
        }
        self.sim.apply_tap();

        let tap_line = {
            let mut console = self.rng.console();
            console
                .chance(self.cfg.timing.tap_line_percent)
                .then(|| sample_line(self.sim.stress(), &mut *console))
        };
        if let Some(line) = tap_line {
            self.feed.push(line);
        }

        let fired = {
            let mut crash_rng = self.rng.crash();
            crash::evaluate(&self.sim, &self.condition, self.elapsed, &mut *crash_rng)
        };
        if fired {
            self.begin_crash();
        }
        TapOutcome {
            registered: true,
            crash_started: fired,
        }
    }

    /// Advance the session clock. Call once per frame with the real
    /// elapsed seconds since the previous tick.
    pub fn on_tick(&mut self, delta_seconds: f32) -> TickOutcome {
        let dt = delta_seconds.max(0.0);
        match self.phase {
            SessionPhase::Ready | SessionPhase::Crashed => TickOutcome::default(),
            SessionPhase::Playing => {
                self.elapsed += dt;
                self.sim.decay(dt);
                self.sim.resample_readouts();
                let line = {
                    let mut console = self.rng.console();
                    self.feed
                        .tick(dt, self.sim.stress(), &self.cfg.timing, &mut *console)
                };
                let fired = {
                    let mut crash_rng = self.rng.crash();
                    crash::evaluate(&self.sim, &self.condition, self.elapsed, &mut *crash_rng)
                };
                if fired {
                    self.begin_crash();
                }
                TickOutcome {
                    crash_started: fired,
                    crash_completed: false,
                    line,
                }
            }
            SessionPhase::Crashing => {
                self.crash_timer += dt;
                let delay = self.cfg.timing.presentation_seconds;
                self.crash_progress = (self.crash_timer / delay).min(1.0);
                let completed = self.crash_timer >= delay;
                if completed {
                    self.finish_crash();
                }
                TickOutcome {
                    crash_started: false,
                    crash_completed: completed,
                    line: None,
                }
            }
        }
    }

    /// Reset to Ready with a fresh parameter profile and crash
    /// condition. Legal from any phase; a pending Crashed transition is
    /// discarded and can never fire afterwards.
    pub fn restart(&mut self) {
        let (params, condition, sim_seed) = Self::draw_session(&self.cfg, &self.rng);
        self.params = params;
        self.condition = condition;
        self.sim = LoadSimulator::new(sim_seed, params);
        self.feed = ConsoleFeed::new(&self.cfg.timing, &mut *self.rng.console());
        self.elapsed = 0.0;
        self.crash_timer = 0.0;
        self.crash_progress = 0.0;
        self.pending = None;
        self.record = None;
        self.phase = SessionPhase::Ready;
    }

    /// Deterministically reseed the controller and start over.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = Rc::new(RngBundle::from_user_seed(seed));
        self.restart();
    }

    fn begin_crash(&mut self) {
        self.phase = SessionPhase::Crashing;
        self.crash_timer = 0.0;
        self.crash_progress = 0.0;
        let record = {
            let mut crash_rng = self.rng.crash();
            let variant = select_variant(&mut *crash_rng);
            CrashRecord::compute(
                &self.sim,
                self.condition.cause(),
                variant,
                self.elapsed,
                &mut *crash_rng,
            )
        };
        self.pending = Some(record);
        self.feed.push(FeedLine::new(
            Severity::Error,
            "[FATAL] Service watchdog lost contact",
        ));
    }

    fn finish_crash(&mut self) {
        self.phase = SessionPhase::Crashed;
        self.crash_progress = 1.0;
        if let Some(record) = self.pending.take() {
            self.record = Some(record);
            self.counter = self.counter.saturating_add(1);
            if self.store.save(self.counter).is_err() {
                // Persistence must never block the phase machine.
                self.feed.push(FeedLine::new(
                    Severity::Warning,
                    "[WARN] Crash counter not persisted",
                ));
            }
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The current tick's consistent metric sample.
    #[must_use]
    pub const fn metrics(&self) -> &LoadMetrics {
        self.sim.metrics()
    }

    #[must_use]
    pub const fn stress(&self) -> f32 {
        self.sim.stress()
    }

    #[must_use]
    pub const fn tap_count(&self) -> u32 {
        self.sim.tap_count()
    }

    #[must_use]
    pub const fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Seconds spent in the Playing phase so far.
    #[must_use]
    pub const fn elapsed_seconds(&self) -> f32 {
        self.elapsed
    }

    /// Presentation progress through the Crashing phase, 0 to 1.
    #[must_use]
    pub const fn crash_progress(&self) -> f32 {
        self.crash_progress
    }

    /// Chosen crash variant, available from Crashing onward.
    #[must_use]
    pub fn crash_variant(&self) -> Option<CrashVariant> {
        self.pending
            .as_ref()
            .or(self.record.as_ref())
            .map(|record| record.variant)
    }

    /// The published crash record; None until Crashed is reached.
    #[must_use]
    pub const fn crash_record(&self) -> Option<&CrashRecord> {
        self.record.as_ref()
    }

    /// Lifetime crash counter, including past sessions.
    #[must_use]
    pub const fn crash_count(&self) -> u64 {
        self.counter
    }

    /// The rolling console feed.
    #[must_use]
    pub const fn feed(&self) -> &ConsoleFeed {
        &self.feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCounter;

    fn fixed_params() -> SessionParams {
        SessionParams {
            cpu_base: 10.0,
            cpu_mult: 1.0,
            mem_base: 100.0,
            mem_mult: 1.0,
            net_base: 20.0,
            net_mult: 1.0,
            net_spike_enabled: false,
            decay_rate: 0.2,
            stress_per_tap: 5.0,
            max_stress: 100.0,
        }
    }

    fn tap_controller(taps: u32) -> SessionController<MemoryCounter> {
        SessionController::with_session(
            MemoryCounter::default(),
            TuningConfig::default_config(),
            77,
            fixed_params(),
            CrashCondition::TapCount { taps },
        )
    }

    #[test]
    fn first_tap_starts_playing() {
        let mut game = tap_controller(1000);
        assert_eq!(game.phase(), SessionPhase::Ready);
        let outcome = game.on_tap();
        assert!(outcome.registered);
        assert_eq!(game.phase(), SessionPhase::Playing);
    }

    #[test]
    fn ticks_are_noops_outside_playing_and_crashing() {
        let mut game = tap_controller(1000);
        let before = *game.metrics();
        let outcome = game.on_tick(1.0);
        assert!(outcome.line.is_none());
        assert_eq!(game.phase(), SessionPhase::Ready);
        assert_eq!(*game.metrics(), before);
        assert!((game.elapsed_seconds() - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn taps_are_ignored_while_crashing_and_crashed() {
        let mut game = tap_controller(1);
        assert!(game.on_tap().crash_started);
        assert_eq!(game.phase(), SessionPhase::Crashing);
        let taps_at_crash = game.tap_count();

        let ignored = game.on_tap();
        assert!(!ignored.registered);
        assert_eq!(game.tap_count(), taps_at_crash);

        game.on_tick(10.0);
        assert_eq!(game.phase(), SessionPhase::Crashed);
        assert!(!game.on_tap().registered);
    }

    #[test]
    fn crashing_reaches_crashed_after_presentation_delay() {
        let mut game = tap_controller(1);
        game.on_tap();
        assert_eq!(game.phase(), SessionPhase::Crashing);
        assert!(game.crash_variant().is_some());
        assert!(game.crash_record().is_none(), "record unpublished in Crashing");

        let mut completed = false;
        for _ in 0..20 {
            completed |= game.on_tick(0.1).crash_completed;
        }
        assert!(completed);
        assert_eq!(game.phase(), SessionPhase::Crashed);
        let record = game.crash_record().expect("published record");
        assert_eq!(record.cause, crate::CrashCause::TapCount);
        assert!((game.crash_progress() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn crash_progress_advances_monotonically() {
        let mut game = tap_controller(1);
        game.on_tap();
        let mut last = game.crash_progress();
        for _ in 0..10 {
            game.on_tick(0.1);
            assert!(game.crash_progress() >= last);
            last = game.crash_progress();
        }
    }

    #[test]
    fn counter_increments_once_per_completed_crash() {
        let store = MemoryCounter::default();
        let mut game = SessionController::with_session(
            store.clone(),
            TuningConfig::default_config(),
            5,
            fixed_params(),
            CrashCondition::TapCount { taps: 1 },
        );
        assert_eq!(game.crash_count(), 0);
        game.on_tap();
        game.on_tick(10.0);
        assert_eq!(game.crash_count(), 1);
        assert_eq!(store.stored(), 1);

        // Extra ticks in Crashed must not double-count.
        game.on_tick(10.0);
        assert_eq!(game.crash_count(), 1);
    }

    #[test]
    fn restart_regenerates_the_session() {
        let mut game = tap_controller(1);
        game.on_tap();
        game.on_tick(10.0);
        assert_eq!(game.phase(), SessionPhase::Crashed);

        game.restart();
        assert_eq!(game.phase(), SessionPhase::Ready);
        assert_eq!(game.tap_count(), 0);
        assert!((game.stress() - 0.0).abs() < f32::EPSILON);
        assert!(game.crash_record().is_none());
        assert!(game.crash_variant().is_none());
        assert_eq!(game.feed().len(), 2, "fresh feed holds only boot lines");
    }

    #[test]
    fn try_new_rejects_invalid_config() {
        let mut cfg = TuningConfig::default_config();
        cfg.timing.presentation_seconds = -1.0;
        let result = SessionController::try_new(MemoryCounter::default(), cfg, 1);
        assert!(result.is_err());
    }

    #[test]
    fn elapsed_time_accumulates_only_while_playing() {
        let mut game = tap_controller(1000);
        game.on_tick(5.0);
        assert!((game.elapsed_seconds() - 0.0).abs() < f32::EPSILON);
        game.on_tap();
        game.on_tick(1.5);
        game.on_tick(0.5);
        assert!((game.elapsed_seconds() - 2.0).abs() < 1e-4);
    }
}
