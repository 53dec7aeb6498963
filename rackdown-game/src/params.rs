//! Per-session randomized tuning profile and hidden crash condition.
//!
//! Both are drawn exactly once per session (and re-drawn on restart)
//! from the bands in [`TuningConfig`]; the player never sees either.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::TuningConfig;
use crate::numbers::round_f32_to_i32;
use crate::rng::Dice;

/// Immutable-per-session bundle of load coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    pub cpu_base: f32,
    pub cpu_mult: f32,
    pub mem_base: f32,
    pub mem_mult: f32,
    pub net_base: f32,
    pub net_mult: f32,
    pub net_spike_enabled: bool,
    pub decay_rate: f32,
    pub stress_per_tap: f32,
    /// Informational reference for presentation and scoring; the
    /// simulator never clamps against it.
    pub max_stress: f32,
}

impl SessionParams {
    /// Draw a fresh tuning profile from the configured bands.
    pub fn generate<R: Rng>(cfg: &TuningConfig, rng: &mut R) -> Self {
        let bands = &cfg.params;
        Self {
            cpu_base: rng.uniform(bands.cpu_base.min, bands.cpu_base.max),
            cpu_mult: rng.uniform(bands.cpu_mult.min, bands.cpu_mult.max),
            mem_base: rng.uniform(bands.mem_base.min, bands.mem_base.max),
            mem_mult: rng.uniform(bands.mem_mult.min, bands.mem_mult.max),
            net_base: rng.uniform(bands.net_base.min, bands.net_base.max),
            net_mult: rng.uniform(bands.net_mult.min, bands.net_mult.max),
            net_spike_enabled: rng.chance(bands.net_spike_percent),
            decay_rate: rng.uniform(bands.decay_rate.min, bands.decay_rate.max),
            stress_per_tap: rng.uniform(bands.stress_per_tap.min, bands.stress_per_tap.max),
            max_stress: rng.uniform(bands.max_stress.min, bands.max_stress.max),
        }
    }
}

/// Stable tag identifying which rule ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashCause {
    Stress,
    CpuMemory,
    NetworkSpike,
    TapCount,
    RandomDeath,
    TimeBomb,
}

impl CrashCause {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stress => "stress",
            Self::CpuMemory => "cpu_memory",
            Self::NetworkSpike => "network_spike",
            Self::TapCount => "tap_count",
            Self::RandomDeath => "random_death",
            Self::TimeBomb => "time_bomb",
        }
    }
}

impl fmt::Display for CrashCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The hidden per-session rule that decides when a crash fires.
///
/// Exactly one variant is active per session; thresholds are drawn once
/// at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrashCondition {
    Stress { threshold: f32 },
    CpuMemory { cpu: f32, memory: f32 },
    NetworkSpike { latency: f32 },
    TapCount { taps: u32 },
    /// Per-check percent chance, gated by a minimum stress.
    RandomDeath { percent: f32 },
    /// Elapsed-seconds threshold, gated by a minimum stress.
    TimeBomb { seconds: f32 },
}

impl CrashCondition {
    /// Uniformly pick one of the six condition shapes and draw its
    /// threshold.
    pub fn generate<R: Rng>(cfg: &TuningConfig, rng: &mut R) -> Self {
        let bands = &cfg.conditions;
        match rng.int_in(0, 5) {
            0 => Self::Stress {
                threshold: rng.uniform(bands.stress_threshold.min, bands.stress_threshold.max),
            },
            1 => Self::CpuMemory {
                cpu: rng.uniform(bands.cpu_threshold.min, bands.cpu_threshold.max),
                memory: rng.uniform(bands.mem_threshold.min, bands.mem_threshold.max),
            },
            2 => Self::NetworkSpike {
                latency: rng.uniform(
                    bands.net_spike_threshold.min,
                    bands.net_spike_threshold.max,
                ),
            },
            3 => {
                let taps = rng.int_in(
                    round_f32_to_i32(bands.tap_count.min),
                    round_f32_to_i32(bands.tap_count.max),
                );
                Self::TapCount {
                    taps: u32::try_from(taps.max(1)).unwrap_or(1),
                }
            }
            4 => Self::RandomDeath {
                percent: rng.uniform(
                    bands.random_death_percent.min,
                    bands.random_death_percent.max,
                ),
            },
            _ => Self::TimeBomb {
                seconds: rng.uniform(bands.time_bomb_seconds.min, bands.time_bomb_seconds.max),
            },
        }
    }

    /// Tag for logging and the crash record.
    #[must_use]
    pub const fn cause(&self) -> CrashCause {
        match self {
            Self::Stress { .. } => CrashCause::Stress,
            Self::CpuMemory { .. } => CrashCause::CpuMemory,
            Self::NetworkSpike { .. } => CrashCause::NetworkSpike,
            Self::TapCount { .. } => CrashCause::TapCount,
            Self::RandomDeath { .. } => CrashCause::RandomDeath,
            Self::TimeBomb { .. } => CrashCause::TimeBomb,
        }
    }
}
