//! Crash evaluation, variant selection, and the final run record.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{
    ART_SCORE_MAX, DANGER_STRESS_CRITICAL, DANGER_STRESS_ELEVATED, DANGER_STRESS_HIGH,
    DANGER_TAP_FLOOD, RANDOM_DEATH_MIN_STRESS, TIME_BOMB_MIN_STRESS,
};
use crate::load::LoadSimulator;
use crate::params::{CrashCause, CrashCondition};
use crate::rng::Dice;

/// Decide whether the session's condition fires on this check.
///
/// `CpuMemory` and `NetworkSpike` read the tick's cached metrics, so a
/// check observes the same sample as every other consumer this tick.
/// `RandomDeath` rolls fresh on every call; the first true result must
/// be treated as terminal by the caller.
pub fn evaluate<R: Rng>(
    sim: &LoadSimulator,
    condition: &CrashCondition,
    elapsed_seconds: f32,
    rng: &mut R,
) -> bool {
    match *condition {
        CrashCondition::Stress { threshold } => sim.stress() >= threshold,
        CrashCondition::CpuMemory { cpu, memory } => {
            let metrics = sim.metrics();
            metrics.cpu >= cpu && metrics.memory >= memory
        }
        CrashCondition::NetworkSpike { latency } => sim.metrics().network >= latency,
        CrashCondition::TapCount { taps } => sim.tap_count() >= taps,
        CrashCondition::RandomDeath { percent } => {
            sim.stress() > RANDOM_DEATH_MIN_STRESS && rng.chance(percent)
        }
        CrashCondition::TimeBomb { seconds } => {
            elapsed_seconds >= seconds && sim.stress() > TIME_BOMB_MIN_STRESS
        }
    }
}

/// Presentation style for a crash. Picked uniformly; the legacy
/// weighted table is not carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrashVariant {
    Explosion,
    Freeze,
    Scatter,
    Bluescreen,
    Vanish,
    Meltdown,
}

impl CrashVariant {
    pub const ORDER: [Self; 6] = [
        Self::Explosion,
        Self::Freeze,
        Self::Scatter,
        Self::Bluescreen,
        Self::Vanish,
        Self::Meltdown,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explosion => "explosion",
            Self::Freeze => "freeze",
            Self::Scatter => "scatter",
            Self::Bluescreen => "bluescreen",
            Self::Vanish => "vanish",
            Self::Meltdown => "meltdown",
        }
    }
}

impl fmt::Display for CrashVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform equal-weight pick over the variant set.
pub fn select_variant<R: Rng>(rng: &mut R) -> CrashVariant {
    *rng.pick(&CrashVariant::ORDER)
}

/// One of the four threshold crossings counted into the end-of-run
/// score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerSign {
    StressElevated,
    StressHigh,
    StressCritical,
    TapFlood,
}

impl DangerSign {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StressElevated => "stress_elevated",
            Self::StressHigh => "stress_high",
            Self::StressCritical => "stress_critical",
            Self::TapFlood => "tap_flood",
        }
    }
}

/// The danger signs lit at crash time; at most four.
pub type DangerSet = SmallVec<[DangerSign; 4]>;

/// Collect the threshold crossings active at this instant.
#[must_use]
pub fn danger_signs(sim: &LoadSimulator) -> DangerSet {
    let mut signs = DangerSet::new();
    if sim.stress() > DANGER_STRESS_ELEVATED {
        signs.push(DangerSign::StressElevated);
    }
    if sim.stress() > DANGER_STRESS_HIGH {
        signs.push(DangerSign::StressHigh);
    }
    if sim.stress() > DANGER_STRESS_CRITICAL {
        signs.push(DangerSign::StressCritical);
    }
    if sim.tap_count() > DANGER_TAP_FLOOD {
        signs.push(DangerSign::TapFlood);
    }
    signs
}

/// Immutable summary of a finished run; the sole score-screen input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRecord {
    pub cause: CrashCause,
    pub variant: CrashVariant,
    pub survived_seconds: f32,
    pub danger: DangerSet,
    /// Purely decorative, 0 through 999.
    pub art_score: u16,
}

impl CrashRecord {
    /// Snapshot the run at the moment the crash fires.
    pub fn compute<R: Rng>(
        sim: &LoadSimulator,
        cause: CrashCause,
        variant: CrashVariant,
        survived_seconds: f32,
        rng: &mut R,
    ) -> Self {
        let art = rng.int_in(0, ART_SCORE_MAX);
        Self {
            cause,
            variant,
            survived_seconds,
            danger: danger_signs(sim),
            art_score: u16::try_from(art).unwrap_or(0),
        }
    }

    /// Number of danger signs lit when the crash fired.
    #[must_use]
    pub fn danger_count(&self) -> usize {
        self.danger.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SessionParams;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn quiet_params() -> SessionParams {
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

    fn sim_at(stress: f32) -> LoadSimulator {
        let mut sim = LoadSimulator::new(21, quiet_params());
        sim.set_stress_for_testing(stress);
        sim.resample_readouts();
        sim
    }

    #[test]
    fn stress_condition_fires_at_threshold() {
        let cond = CrashCondition::Stress { threshold: 80.0 };
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(!evaluate(&sim_at(79.9), &cond, 0.0, &mut rng));
        assert!(evaluate(&sim_at(80.0), &cond, 0.0, &mut rng));
    }

    #[test]
    fn cpu_memory_condition_needs_both_readouts() {
        // Quiet params: cpu = 10 + stress, memory = 100 + stress * 100.
        let cond = CrashCondition::CpuMemory {
            cpu: 100.0,
            memory: 5_000.0,
        };
        let mut rng = SmallRng::seed_from_u64(2);
        assert!(!evaluate(&sim_at(60.0), &cond, 0.0, &mut rng));
        assert!(evaluate(&sim_at(95.0), &cond, 0.0, &mut rng));
    }

    #[test]
    fn tap_count_condition_counts_taps_not_stress() {
        let cond = CrashCondition::TapCount { taps: 3 };
        let mut rng = SmallRng::seed_from_u64(3);
        let mut sim = LoadSimulator::new(4, quiet_params());
        assert!(!evaluate(&sim, &cond, 0.0, &mut rng));
        sim.apply_tap();
        sim.apply_tap();
        assert!(!evaluate(&sim, &cond, 0.0, &mut rng));
        sim.apply_tap();
        assert!(evaluate(&sim, &cond, 0.0, &mut rng));
    }

    #[test]
    fn random_death_respects_stress_gate() {
        let certain = CrashCondition::RandomDeath { percent: 100.0 };
        let never = CrashCondition::RandomDeath { percent: 0.0 };
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(!evaluate(&sim_at(30.0), &certain, 0.0, &mut rng));
        assert!(evaluate(&sim_at(30.1), &certain, 0.0, &mut rng));
        assert!(!evaluate(&sim_at(90.0), &never, 0.0, &mut rng));
    }

    #[test]
    fn time_bomb_needs_both_clock_and_stress() {
        let cond = CrashCondition::TimeBomb { seconds: 30.0 };
        let mut rng = SmallRng::seed_from_u64(6);
        assert!(!evaluate(&sim_at(50.0), &cond, 29.9, &mut rng));
        assert!(!evaluate(&sim_at(20.0), &cond, 35.0, &mut rng));
        assert!(evaluate(&sim_at(20.1), &cond, 30.0, &mut rng));
    }

    #[test]
    fn variant_pick_covers_the_full_set() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..600 {
            seen.insert(select_variant(&mut rng));
        }
        assert_eq!(seen.len(), CrashVariant::ORDER.len());
    }

    #[test]
    fn danger_signs_accumulate_with_stress_and_taps() {
        assert_eq!(danger_signs(&sim_at(40.0)).len(), 0);
        assert_eq!(danger_signs(&sim_at(60.0)).len(), 1);
        assert_eq!(danger_signs(&sim_at(75.0)).len(), 2);
        assert_eq!(danger_signs(&sim_at(95.0)).len(), 3);

        let mut sim = sim_at(95.0);
        for _ in 0..31 {
            sim.apply_tap();
        }
        assert_eq!(danger_signs(&sim).len(), 4);
    }

    #[test]
    fn record_snapshot_is_complete_and_bounded() {
        let mut rng = SmallRng::seed_from_u64(8);
        let sim = sim_at(75.0);
        let record = CrashRecord::compute(
            &sim,
            CrashCause::Stress,
            CrashVariant::Bluescreen,
            12.5,
            &mut rng,
        );
        assert_eq!(record.cause, CrashCause::Stress);
        assert_eq!(record.variant, CrashVariant::Bluescreen);
        assert!((record.survived_seconds - 12.5).abs() < f32::EPSILON);
        assert_eq!(record.danger_count(), 2);
        assert!(record.art_score <= 999);
    }
}
