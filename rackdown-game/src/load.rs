//! Load simulator: the stress scalar and the metric readouts derived
//! from it.
//!
//! Readouts carry their own randomness (network spikes, disk
//! instability), so they are sampled once per tick and cached; every
//! consumer within a tick observes the same values.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DECAY_RATE_SCALE, DISK_BASE_PERCENT, DISK_STRESS_SCALE, DISK_UNSTABLE_CHANCE_PERCENT,
    DISK_UNSTABLE_MAX_PERCENT, DISK_UNSTABLE_MIN_PERCENT, DISK_UNSTABLE_MIN_STRESS,
    MEMORY_STRESS_SCALE, NET_SPIKE_CHANCE_PERCENT, NET_SPIKE_MAX, NET_SPIKE_MIN,
    NET_SPIKE_MIN_STRESS, NETWORK_STRESS_SCALE, TAP_JITTER_SPREAD,
};
use crate::params::SessionParams;
use crate::rng::{Dice, derive_stream_seed};

/// Categorical disk health label shown next to the percent readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskStatus {
    Ok,
    Busy,
    Slow,
    Critical,
    Unknown,
}

impl DiskStatus {
    /// Labels an unstable disk can randomly report.
    pub(crate) const DEGRADED: [Self; 3] = [Self::Slow, Self::Critical, Self::Unknown];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Busy => "BUSY",
            Self::Slow => "SLOW",
            Self::Critical => "CRITICAL",
            Self::Unknown => "???",
        }
    }

    /// Map a percent readout onto its 25-point status band.
    #[must_use]
    pub fn from_percent(percent: f32) -> Self {
        match percent {
            p if p < 25.0 => Self::Ok,
            p if p < 50.0 => Self::Busy,
            p if p < 75.0 => Self::Slow,
            p if p < 100.0 => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

/// Compound disk readout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskReadout {
    pub percent: f32,
    pub status: DiskStatus,
}

/// One tick's consistent sample of the derived metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadMetrics {
    pub cpu: f32,
    pub memory: f32,
    pub network: f32,
    pub disk: DiskReadout,
}

/// Holds the stress scalar, the tap counter, and the per-tick cached
/// readouts for one session.
#[derive(Debug, Clone)]
pub struct LoadSimulator {
    params: SessionParams,
    stress: f32,
    tap_count: u32,
    rng: ChaCha20Rng,
    metrics: LoadMetrics,
}

impl LoadSimulator {
    /// Build a fresh simulator for a session seed and parameter profile.
    #[must_use]
    pub fn new(seed: u64, params: SessionParams) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, b"load"));
        let metrics = sample_metrics(&params, 0.0, &mut rng);
        Self {
            params,
            stress: 0.0,
            tap_count: 0,
            rng,
            metrics,
        }
    }

    /// Register one tap: stress grows by `stress_per_tap` with ±30%
    /// jitter. No upper bound; `max_stress` is informational only.
    pub fn apply_tap(&mut self) {
        let jitter = self.rng.uniform(-TAP_JITTER_SPREAD, TAP_JITTER_SPREAD);
        self.stress += self.params.stress_per_tap * (1.0 + jitter);
        self.tap_count = self.tap_count.saturating_add(1);
    }

    /// Relax stress toward zero. Frame-rate independent: pass the real
    /// elapsed seconds since the previous tick. Negative deltas clamp
    /// to zero.
    pub fn decay(&mut self, delta_seconds: f32) {
        let dt = delta_seconds.max(0.0);
        self.stress = (self.stress - self.params.decay_rate * dt * DECAY_RATE_SCALE).max(0.0);
    }

    /// Refresh the cached readouts. Called once per tick by the
    /// controller; between calls every read returns the same sample.
    pub fn resample_readouts(&mut self) {
        self.metrics = sample_metrics(&self.params, self.stress, &mut self.rng);
    }

    /// The current tick's readout sample.
    #[must_use]
    pub const fn metrics(&self) -> &LoadMetrics {
        &self.metrics
    }

    #[must_use]
    pub const fn stress(&self) -> f32 {
        self.stress
    }

    #[must_use]
    pub const fn tap_count(&self) -> u32 {
        self.tap_count
    }

    #[must_use]
    pub const fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Force the stress scalar directly, bypassing tap jitter.
    pub fn set_stress_for_testing(&mut self, stress: f32) {
        self.stress = stress.max(0.0);
    }
}

fn sample_metrics(params: &SessionParams, stress: f32, rng: &mut ChaCha20Rng) -> LoadMetrics {
    let cpu = params.cpu_base + stress * params.cpu_mult;
    let memory = params.mem_base + stress * params.mem_mult * MEMORY_STRESS_SCALE;

    let mut network = params.net_base + stress * params.net_mult * NETWORK_STRESS_SCALE;
    if params.net_spike_enabled
        && stress > NET_SPIKE_MIN_STRESS
        && rng.chance(NET_SPIKE_CHANCE_PERCENT)
    {
        network += rng.uniform(NET_SPIKE_MIN, NET_SPIKE_MAX);
    }

    let disk = if stress > DISK_UNSTABLE_MIN_STRESS && rng.chance(DISK_UNSTABLE_CHANCE_PERCENT) {
        let percent = rng.uniform(DISK_UNSTABLE_MIN_PERCENT, DISK_UNSTABLE_MAX_PERCENT);
        DiskReadout {
            percent,
            status: *rng.pick(&DiskStatus::DEGRADED),
        }
    } else {
        let percent = DISK_BASE_PERCENT + stress * DISK_STRESS_SCALE;
        DiskReadout {
            percent,
            status: DiskStatus::from_percent(percent),
        }
    };

    LoadMetrics {
        cpu,
        memory,
        network,
        disk,
    }
}
