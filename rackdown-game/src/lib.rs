//! Rackdown Game Engine
//!
//! Platform-agnostic core game logic for Rackdown, a clicker game about
//! tapping a server until it collapses. This crate provides the whole
//! simulation - randomized session tuning, the stress model, hidden
//! crash conditions, variant selection, scoring, and the console feed -
//! without UI or platform-specific dependencies.

pub mod config;
pub mod console;
pub mod constants;
pub mod crash;
pub mod load;
pub mod numbers;
pub mod params;
pub mod rng;
pub mod session;

// Re-export commonly used types
pub use config::{Band, ConditionBands, ConfigError, ParamBands, TimingCfg, TuningConfig};
pub use console::{
    ConsoleFeed, FeedLine, Severity, bluescreen_stop_code, crash_banner, crash_excerpt,
    sample_line,
};
pub use crash::{
    CrashRecord, CrashVariant, DangerSet, DangerSign, danger_signs, evaluate, select_variant,
};
pub use load::{DiskReadout, DiskStatus, LoadMetrics, LoadSimulator};
pub use params::{CrashCause, CrashCondition, SessionParams};
pub use rng::{CountingRng, Dice, RngBundle};
pub use session::{SessionController, SessionPhase, TapOutcome, TickOutcome};

/// Trait for abstracting crash-counter persistence.
/// Platform-specific implementations should provide this (browser
/// local storage, a file, a test double).
pub trait CounterStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the lifetime crash count.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read.
    fn load(&self) -> Result<u64, Self::Error>;

    /// Persist the lifetime crash count.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be written.
    fn save(&self, count: u64) -> Result<(), Self::Error>;
}

/// In-memory counter store for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCounter {
    count: std::rc::Rc<std::cell::Cell<u64>>,
}

impl MemoryCounter {
    /// Start the store at a known count.
    #[must_use]
    pub fn with_count(count: u64) -> Self {
        let store = Self::default();
        store.count.set(count);
        store
    }

    /// Current stored value.
    #[must_use]
    pub fn stored(&self) -> u64 {
        self.count.get()
    }
}

impl CounterStore for MemoryCounter {
    type Error = std::convert::Infallible;

    fn load(&self) -> Result<u64, Self::Error> {
        Ok(self.count.get())
    }

    fn save(&self, count: u64) -> Result<(), Self::Error> {
        self.count.set(count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_counter_roundtrips() {
        let store = MemoryCounter::with_count(4);
        assert_eq!(store.load().unwrap(), 4);
        store.save(9).unwrap();
        assert_eq!(store.stored(), 9);
    }

    #[test]
    fn controller_counter_survives_across_sessions_via_store() {
        let store = MemoryCounter::with_count(2);
        let game = SessionController::new(store.clone(), TuningConfig::default_config(), 1);
        assert_eq!(game.crash_count(), 2);
        drop(game);

        // A later controller sees whatever the store holds.
        store.save(7).unwrap();
        let next = SessionController::new(store, TuningConfig::default_config(), 2);
        assert_eq!(next.crash_count(), 7);
    }

    #[test]
    fn try_new_propagates_store_state() {
        let game = SessionController::try_new(
            MemoryCounter::with_count(3),
            TuningConfig::default_config(),
            11,
        )
        .expect("valid config and store");
        assert_eq!(game.crash_count(), 3);
        assert_eq!(game.phase(), SessionPhase::Ready);
    }
}
