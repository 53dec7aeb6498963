//! Random primitives and per-session RNG streams.
//!
//! Every randomized decision in the engine flows through either the
//! [`Dice`] extension trait or a stream owned by [`RngBundle`], so a
//! session seeded with the same value replays identically.

use std::cell::{RefCell, RefMut};

use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sha2::Sha256;

/// Sampling helpers layered over [`rand::Rng`].
///
/// `pick` and `weighted_pick` treat an empty candidate slice as a
/// programming error and assert, release builds included.
pub trait Dice: Rng + Sized {
    /// Uniform float in `[min, max)`.
    fn uniform(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.r#gen::<f32>()
    }

    /// Uniform integer in `[min, max]`, inclusive on both ends.
    fn int_in(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max, "int_in bounds inverted");
        self.gen_range(min..=max)
    }

    /// Uniform choice from a non-empty slice.
    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "pick requires a non-empty slice");
        &items[self.gen_range(0..items.len())]
    }

    /// Up to `count` distinct items in random order, clamped to the
    /// slice length.
    fn pick_multiple<'a, T>(&mut self, items: &'a [T], count: usize) -> Vec<&'a T> {
        items.choose_multiple(self, count).collect()
    }

    /// Weight-proportional choice. Weights must be positive; the first
    /// item whose cumulative sum meets or exceeds the draw wins.
    fn weighted_pick<'a, T>(&mut self, items: &'a [(T, f32)]) -> &'a T {
        assert!(!items.is_empty(), "weighted_pick requires a non-empty slice");
        let mut total = 0.0f32;
        for (_, weight) in items {
            assert!(*weight > 0.0, "weighted_pick requires positive weights");
            total += *weight;
        }
        let draw = self.r#gen::<f32>() * total;
        let mut acc = 0.0f32;
        for (item, weight) in items {
            acc += *weight;
            if draw <= acc {
                return item;
            }
        }
        // Float accumulation can land the draw a hair past the total.
        &items[items.len() - 1].0
    }

    /// True iff a fresh uniform `[0, 100)` draw is strictly below
    /// `percent`. Values ≥ 100 are always true, ≤ 0 always false.
    fn chance(&mut self, percent: f32) -> bool {
        self.gen_range(0.0f32..100.0) < percent
    }

    /// Standard normal sample via the Box-Muller transform.
    fn gaussian(&mut self) -> f32 {
        let mut u = 0.0f32;
        let mut v = 0.0f32;
        while u == 0.0 {
            u = self.r#gen::<f32>();
        }
        while v == 0.0 {
            v = self.r#gen::<f32>();
        }
        (-2.0 * u.ln()).sqrt() * (std::f32::consts::TAU * v).cos()
    }
}

impl<R: Rng> Dice for R {}

/// Deterministic bundle of RNG streams segregated by engine domain.
#[derive(Debug)]
pub struct RngBundle {
    params: RefCell<CountingRng<SmallRng>>,
    crash: RefCell<CountingRng<SmallRng>>,
    console: RefCell<CountingRng<SmallRng>>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        let params = CountingRng::new(derive_stream_seed(seed, b"params"));
        let crash = CountingRng::new(derive_stream_seed(seed, b"crash"));
        let console = CountingRng::new(derive_stream_seed(seed, b"console"));
        Self {
            params: RefCell::new(params),
            crash: RefCell::new(crash),
            console: RefCell::new(console),
        }
    }

    /// Access the session-parameter generation stream.
    #[must_use]
    pub fn params(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.params.borrow_mut()
    }

    /// Access the crash evaluation/selection stream.
    #[must_use]
    pub fn crash(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.crash.borrow_mut()
    }

    /// Access the console-feed stream.
    #[must_use]
    pub fn console(&self) -> RefMut<'_, CountingRng<SmallRng>> {
        self.console.borrow_mut()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Derive a per-domain stream seed from the session seed.
pub(crate) fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    #[test]
    fn chance_extremes_never_waver() {
        let mut r = rng(11);
        for _ in 0..1000 {
            assert!(!r.chance(0.0));
            assert!(r.chance(100.0));
            assert!(!r.chance(-5.0));
            assert!(r.chance(250.0));
        }
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let mut r = rng(12);
        for _ in 0..1000 {
            let x = r.uniform(-0.3, 0.3);
            assert!((-0.3..0.3).contains(&x));
        }
    }

    #[test]
    fn int_in_is_inclusive_both_ends() {
        let mut r = rng(13);
        let mut saw_min = false;
        let mut saw_max = false;
        for _ in 0..2000 {
            let v = r.int_in(3, 6);
            assert!((3..=6).contains(&v));
            saw_min |= v == 3;
            saw_max |= v == 6;
        }
        assert!(saw_min && saw_max, "inclusive endpoints should both appear");
    }

    #[test]
    #[should_panic(expected = "non-empty slice")]
    fn pick_rejects_empty_slice() {
        let mut r = rng(14);
        let empty: [u8; 0] = [];
        let _ = r.pick(&empty);
    }

    #[test]
    #[should_panic(expected = "positive weights")]
    fn weighted_pick_rejects_zero_weight() {
        let mut r = rng(15);
        let _ = r.weighted_pick(&[("a", 1.0), ("b", 0.0)]);
    }

    #[test]
    fn weighted_pick_heavily_favors_dominant_weight() {
        let mut r = rng(16);
        let items = [("heavy", 99.0f32), ("light", 1.0)];
        let mut heavy = 0usize;
        for _ in 0..1000 {
            if *r.weighted_pick(&items) == "heavy" {
                heavy += 1;
            }
        }
        assert!(heavy > 950, "dominant weight drew only {heavy}/1000");
    }

    #[test]
    fn pick_multiple_has_no_duplicates_and_clamps() {
        let mut r = rng(17);
        let items = [1, 2, 3, 4];
        let chosen = r.pick_multiple(&items, 10);
        assert_eq!(chosen.len(), items.len());
        let mut seen: Vec<i32> = chosen.iter().map(|v| **v).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), items.len());
    }

    #[test]
    fn gaussian_is_roughly_centered() {
        let mut r = rng(18);
        let mut sum = 0.0f64;
        for _ in 0..5000 {
            let g = r.gaussian();
            assert!(g.is_finite());
            sum += f64::from(g);
        }
        let mean = sum / 5000.0;
        assert!(mean.abs() < 0.1, "gaussian mean drifted: {mean}");
    }

    #[test]
    fn bundle_streams_are_independent_and_stable() {
        let a = RngBundle::from_user_seed(42);
        let b = RngBundle::from_user_seed(42);
        let draw_a = a.params().r#gen::<u64>();
        let draw_b = b.params().r#gen::<u64>();
        assert_eq!(draw_a, draw_b);
        assert_ne!(draw_a, a.crash().r#gen::<u64>());
        assert_eq!(a.params().draws(), 1);
    }
}
