//! Tuning configuration: the bands every per-session coefficient is
//! drawn from, plus fixed timing knobs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating a tuning configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning config: {0}")]
    Validation(String),
}

/// Inclusive-exclusive float band a coefficient is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f32,
    pub max: f32,
}

impl Band {
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// True when the band covers a non-negative, non-inverted range.
    #[must_use]
    pub fn is_sane(self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// True when `value` lies inside the band (inclusive on both ends,
    /// matching integer draws).
    #[must_use]
    pub fn contains(self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Bands for the per-session load coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamBands {
    pub cpu_base: Band,
    pub cpu_mult: Band,
    pub mem_base: Band,
    pub mem_mult: Band,
    pub net_base: Band,
    pub net_mult: Band,
    pub decay_rate: Band,
    pub stress_per_tap: Band,
    pub max_stress: Band,
    /// Percent chance that a session enables random network spikes.
    pub net_spike_percent: f32,
}

/// Bands for the per-session crash-condition thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionBands {
    pub stress_threshold: Band,
    pub cpu_threshold: Band,
    pub mem_threshold: Band,
    pub net_spike_threshold: Band,
    pub tap_count: Band,
    pub random_death_percent: Band,
    pub time_bomb_seconds: Band,
}

/// Timing knobs that are fixed per deployment rather than per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingCfg {
    /// Seconds the Crashing phase lasts before Crashed is reached.
    pub presentation_seconds: f32,
    /// Band for the idle console-feed cadence while Playing.
    pub feed_interval: Band,
    /// Percent chance a tap emits a console line.
    pub tap_line_percent: f32,
}

/// Complete engine tuning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    pub params: ParamBands,
    pub conditions: ConditionBands,
    pub timing: TimingCfg,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl TuningConfig {
    /// Load a tuning configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or validation
    /// fails.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate band sanity and timing knobs.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bands = [
            ("params.cpu_base", self.params.cpu_base),
            ("params.cpu_mult", self.params.cpu_mult),
            ("params.mem_base", self.params.mem_base),
            ("params.mem_mult", self.params.mem_mult),
            ("params.net_base", self.params.net_base),
            ("params.net_mult", self.params.net_mult),
            ("params.decay_rate", self.params.decay_rate),
            ("params.stress_per_tap", self.params.stress_per_tap),
            ("params.max_stress", self.params.max_stress),
            ("conditions.stress_threshold", self.conditions.stress_threshold),
            ("conditions.cpu_threshold", self.conditions.cpu_threshold),
            ("conditions.mem_threshold", self.conditions.mem_threshold),
            (
                "conditions.net_spike_threshold",
                self.conditions.net_spike_threshold,
            ),
            ("conditions.tap_count", self.conditions.tap_count),
            (
                "conditions.random_death_percent",
                self.conditions.random_death_percent,
            ),
            ("conditions.time_bomb_seconds", self.conditions.time_bomb_seconds),
            ("timing.feed_interval", self.timing.feed_interval),
        ];
        for (name, band) in bands {
            if !band.is_sane() {
                return Err(ConfigError::Validation(format!("band {name} is inverted")));
            }
        }
        if self.params.decay_rate.min < 0.0 {
            return Err(ConfigError::Validation(
                "params.decay_rate must be non-negative".to_string(),
            ));
        }
        if self.conditions.tap_count.min < 1.0 {
            return Err(ConfigError::Validation(
                "conditions.tap_count must be at least 1".to_string(),
            ));
        }
        if self.timing.presentation_seconds <= 0.0 {
            return Err(ConfigError::Validation(
                "timing.presentation_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Embedded default configuration.
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            params: ParamBands {
                cpu_base: Band::new(5.0, 20.0),
                cpu_mult: Band::new(0.5, 2.0),
                mem_base: Band::new(50.0, 200.0),
                mem_mult: Band::new(0.3, 1.5),
                net_base: Band::new(10.0, 50.0),
                net_mult: Band::new(0.5, 3.0),
                decay_rate: Band::new(0.1, 0.5),
                stress_per_tap: Band::new(2.0, 8.0),
                max_stress: Band::new(80.0, 120.0),
                net_spike_percent: 30.0,
            },
            conditions: ConditionBands {
                stress_threshold: Band::new(75.0, 100.0),
                cpu_threshold: Band::new(150.0, 250.0),
                mem_threshold: Band::new(8_000.0, 20_000.0),
                net_spike_threshold: Band::new(2_000.0, 4_000.0),
                tap_count: Band::new(20.0, 80.0),
                random_death_percent: Band::new(0.1, 0.5),
                time_bomb_seconds: Band::new(15.0, 45.0),
            },
            timing: TimingCfg {
                presentation_seconds: 1.5,
                feed_interval: Band::new(2.0, 5.0),
                tap_line_percent: 30.0,
            },
        }
    }
}
