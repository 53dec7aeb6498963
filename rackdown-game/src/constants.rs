//! Centralized balance and tuning constants for Rackdown game logic.
//!
//! Fixed gates and caps that are part of the engine's contract live
//! here; per-session randomized coefficients are generated from the
//! bands in [`crate::config::TuningConfig`] instead.

// Load simulator ------------------------------------------------------------
pub(crate) const TAP_JITTER_SPREAD: f32 = 0.3;
pub(crate) const DECAY_RATE_SCALE: f32 = 10.0;
pub(crate) const MEMORY_STRESS_SCALE: f32 = 100.0;
pub(crate) const NETWORK_STRESS_SCALE: f32 = 10.0;
pub(crate) const DISK_BASE_PERCENT: f32 = 20.0;
pub(crate) const DISK_STRESS_SCALE: f32 = 0.5;

// Readout instability -------------------------------------------------------
pub(crate) const NET_SPIKE_MIN_STRESS: f32 = 50.0;
pub(crate) const NET_SPIKE_CHANCE_PERCENT: f32 = 5.0;
pub(crate) const NET_SPIKE_MIN: f32 = 1_000.0;
pub(crate) const NET_SPIKE_MAX: f32 = 3_000.0;
pub(crate) const DISK_UNSTABLE_MIN_STRESS: f32 = 60.0;
pub(crate) const DISK_UNSTABLE_CHANCE_PERCENT: f32 = 10.0;
pub(crate) const DISK_UNSTABLE_MIN_PERCENT: f32 = 60.0;
pub(crate) const DISK_UNSTABLE_MAX_PERCENT: f32 = 100.0;

// Crash conditions ----------------------------------------------------------
pub(crate) const RANDOM_DEATH_MIN_STRESS: f32 = 30.0;
pub(crate) const TIME_BOMB_MIN_STRESS: f32 = 20.0;

// Scoring -------------------------------------------------------------------
pub(crate) const DANGER_STRESS_ELEVATED: f32 = 50.0;
pub(crate) const DANGER_STRESS_HIGH: f32 = 70.0;
pub(crate) const DANGER_STRESS_CRITICAL: f32 = 90.0;
pub(crate) const DANGER_TAP_FLOOD: u32 = 30;
pub(crate) const ART_SCORE_MAX: i32 = 999;

// Console feed --------------------------------------------------------------
pub(crate) const FEED_CAPACITY: usize = 8;
pub(crate) const FEED_ERROR_MIN_STRESS: f32 = 70.0;
pub(crate) const FEED_WARNING_MIN_STRESS: f32 = 40.0;
pub(crate) const FEED_ERROR_BIAS_PERCENT: f32 = 60.0;
pub(crate) const FEED_WARNING_BIAS_PERCENT: f32 = 40.0;
pub(crate) const FEED_DIGIT_REWRITE_PERCENT: f32 = 20.0;
pub(crate) const CRASH_EXCERPT_MIN: i32 = 3;
pub(crate) const CRASH_EXCERPT_MAX: i32 = 6;
