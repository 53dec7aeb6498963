//! Fake server-log feed: the rolling diagnostic console the player
//! watches while tapping, plus crash-screen text samplers.
//!
//! Severity escalates with stress; line content comes from fixed
//! catalogs with an occasional randomized digit rewrite. All catalogs
//! are non-empty by construction and the samplers assert it.

use std::collections::VecDeque;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::TimingCfg;
use crate::constants::{
    CRASH_EXCERPT_MAX, CRASH_EXCERPT_MIN, FEED_CAPACITY, FEED_DIGIT_REWRITE_PERCENT,
    FEED_ERROR_BIAS_PERCENT, FEED_ERROR_MIN_STRESS, FEED_WARNING_BIAS_PERCENT,
    FEED_WARNING_MIN_STRESS,
};
use crate::rng::Dice;

const NORMAL_LINES: [&str; 8] = [
    "[INFO] Server is running...",
    "[DEBUG] Heartbeat OK",
    "[INFO] Connection accepted",
    "[DEBUG] Cache hit ratio: 92%",
    "[INFO] Request processed",
    "[DEBUG] Memory allocated",
    "[INFO] Worker spawned",
    "[DEBUG] GC completed",
];

const WARNING_LINES: [&str; 10] = [
    "[WARN] High CPU usage detected",
    "[WARN] Memory pressure increasing",
    "[WARN] Slow query detected",
    "[WARN] Connection pool exhausted",
    "[WARN] Disk I/O bottleneck",
    "[WARN] Too many open files",
    "[WARN] Cache eviction started",
    "[WARN] Thread pool saturated",
    "[WARN] This does not look good",
    "[WARN] Bad feeling about this...",
];

const ERROR_LINES: [&str; 14] = [
    "[ERROR] Segmentation fault (core dumped)",
    "[ERROR] Out of memory",
    "[ERROR] Connection timeout",
    "[ERROR] Disk full",
    "[ERROR] Stack overflow",
    "[ERROR] Null pointer exception",
    "[ERROR] Division by zero",
    "[ERROR] Buffer overflow detected",
    "[FATAL] Kernel panic",
    "[ERROR] It works on my machine",
    "[ERROR] Retrying... (forever)",
    "[ERROR] Exception in exception handler",
    "[FATAL] sudo: command not found",
    "[PANIC] Somebody help!!",
];

const CRASH_LINES: [&str; 12] = [
    "KERNEL PANIC - not syncing: VFS: Unable to mount root fs",
    "Fatal exception: divide error",
    "General protection fault in module NTOSKRNL.EXE",
    "BUG: unable to handle kernel NULL pointer dereference",
    "*** STOP: 0x0000007E (0xC0000005, 0x00000000)",
    "Guru Meditation #00000004.0000AAC0",
    "Software Failure. Press left mouse button to continue.",
    "lp0 on fire",
    "PC LOAD LETTER",
    "Abort, Retry, Fail?",
    "418 I'm a teapot",
    "ERROR: Reality not found",
];

const BANNER_TITLES: [&str; 8] = [
    "SYSTEM FAILURE",
    "FATAL ERROR",
    "KERNEL PANIC",
    "GAME OVER",
    "OUT OF ORDER",
    "EMERGENCY MAINTENANCE",
    "UNSCHEDULED DOWNTIME",
    "F",
];

const STOP_CODES: [&str; 10] = [
    "IRQL_NOT_LESS_OR_EQUAL",
    "PAGE_FAULT_IN_NONPAGED_AREA",
    "SYSTEM_SERVICE_EXCEPTION",
    "KERNEL_DATA_INPAGE_ERROR",
    "UNEXPECTED_KERNEL_MODE_TRAP",
    "KMODE_EXCEPTION_NOT_HANDLED",
    "DRIVER_OVERRAN_STACK_BUFFER",
    "WHEA_UNCORRECTABLE_ERROR",
    "CLOCK_WATCHDOG_TIMEOUT",
    "CRITICAL_PROCESS_DIED",
];

/// Feed line severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedLine {
    pub severity: Severity,
    pub text: String,
}

impl FeedLine {
    #[must_use]
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// Bounded rolling console shown during play.
#[derive(Debug, Clone)]
pub struct ConsoleFeed {
    lines: VecDeque<FeedLine>,
    until_next: f32,
}

impl ConsoleFeed {
    /// Fresh feed with the boot lines and a scheduled first idle line.
    pub fn new<R: Rng>(timing: &TimingCfg, rng: &mut R) -> Self {
        let mut feed = Self {
            lines: VecDeque::with_capacity(FEED_CAPACITY),
            until_next: rng.uniform(timing.feed_interval.min, timing.feed_interval.max),
        };
        feed.push(FeedLine::new(Severity::Info, "[BOOT] System starting..."));
        feed.push(FeedLine::new(Severity::Info, "[INIT] Server online"));
        feed
    }

    /// Append a line, evicting the oldest past capacity.
    pub fn push(&mut self, line: FeedLine) {
        if self.lines.len() == FEED_CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Advance the idle cadence; emits (and returns) a line when the
    /// interval elapses, then reschedules.
    pub fn tick<R: Rng>(
        &mut self,
        delta_seconds: f32,
        stress: f32,
        timing: &TimingCfg,
        rng: &mut R,
    ) -> Option<FeedLine> {
        self.until_next -= delta_seconds.max(0.0);
        if self.until_next > 0.0 {
            return None;
        }
        self.until_next = rng.uniform(timing.feed_interval.min, timing.feed_interval.max);
        let line = sample_line(stress, rng);
        self.push(line.clone());
        Some(line)
    }

    /// Oldest-to-newest view of the visible lines.
    pub fn lines(&self) -> impl Iterator<Item = &FeedLine> {
        self.lines.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Draw one line with stress-banded severity.
pub fn sample_line<R: Rng>(stress: f32, rng: &mut R) -> FeedLine {
    let severity = if stress > FEED_ERROR_MIN_STRESS {
        if rng.chance(FEED_ERROR_BIAS_PERCENT) {
            Severity::Error
        } else {
            Severity::Warning
        }
    } else if stress > FEED_WARNING_MIN_STRESS {
        if rng.chance(FEED_WARNING_BIAS_PERCENT) {
            Severity::Warning
        } else {
            Severity::Info
        }
    } else {
        Severity::Info
    };

    let catalog: &[&str] = match severity {
        Severity::Info => &NORMAL_LINES,
        Severity::Warning => &WARNING_LINES,
        Severity::Error => &ERROR_LINES,
    };
    let mut text = (*rng.pick(catalog)).to_string();
    if rng.chance(FEED_DIGIT_REWRITE_PERCENT) {
        text = randomize_digits(&text, rng);
    }
    FeedLine::new(severity, text)
}

/// Rewrite the first digit run in a line with a random number.
fn randomize_digits<R: Rng>(text: &str, rng: &mut R) -> String {
    let Some(start) = text.find(|c: char| c.is_ascii_digit()) else {
        return text.to_string();
    };
    let end = text[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |offset| start + offset);
    format!("{}{}{}", &text[..start], rng.int_in(0, 9_999), &text[end..])
}

/// Crash-screen headline.
pub fn crash_banner<R: Rng>(rng: &mut R) -> &'static str {
    *rng.pick(&BANNER_TITLES)
}

/// 3 to 6 distinct crash-log lines for the crash screen.
pub fn crash_excerpt<R: Rng>(rng: &mut R) -> SmallVec<[&'static str; 6]> {
    let count = rng.int_in(CRASH_EXCERPT_MIN, CRASH_EXCERPT_MAX);
    let count = usize::try_from(count).unwrap_or(3);
    rng.pick_multiple(&CRASH_LINES, count)
        .into_iter()
        .copied()
        .collect()
}

/// Stop code for the bluescreen variant.
pub fn bluescreen_stop_code<R: Rng>(rng: &mut R) -> &'static str {
    *rng.pick(&STOP_CODES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuningConfig;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn feed_starts_with_boot_lines() {
        let cfg = TuningConfig::default_config();
        let mut rng = SmallRng::seed_from_u64(31);
        let feed = ConsoleFeed::new(&cfg.timing, &mut rng);
        let texts: Vec<&str> = feed.lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].starts_with("[BOOT]"));
        assert!(texts[1].starts_with("[INIT]"));
    }

    #[test]
    fn feed_is_capped_at_eight_lines() {
        let cfg = TuningConfig::default_config();
        let mut rng = SmallRng::seed_from_u64(32);
        let mut feed = ConsoleFeed::new(&cfg.timing, &mut rng);
        for i in 0..30 {
            feed.push(FeedLine::new(Severity::Info, format!("line {i}")));
        }
        assert_eq!(feed.len(), FEED_CAPACITY);
        let newest = feed.lines().last().expect("non-empty feed");
        assert_eq!(newest.text, "line 29");
    }

    #[test]
    fn idle_cadence_emits_within_interval_band() {
        let cfg = TuningConfig::default_config();
        let mut rng = SmallRng::seed_from_u64(33);
        let mut feed = ConsoleFeed::new(&cfg.timing, &mut rng);
        let mut elapsed = 0.0f32;
        let mut emitted = None;
        while emitted.is_none() && elapsed < 10.0 {
            elapsed += 0.1;
            emitted = feed.tick(0.1, 10.0, &cfg.timing, &mut rng);
        }
        assert!(emitted.is_some(), "idle line should arrive within 10s");
        assert!(elapsed >= cfg.timing.feed_interval.min - 0.2);
    }

    #[test]
    fn calm_stress_only_produces_info_lines() {
        let mut rng = SmallRng::seed_from_u64(34);
        for _ in 0..500 {
            assert_eq!(sample_line(10.0, &mut rng).severity, Severity::Info);
        }
    }

    #[test]
    fn high_stress_never_produces_info_lines() {
        let mut rng = SmallRng::seed_from_u64(35);
        let mut saw_error = false;
        for _ in 0..500 {
            let line = sample_line(90.0, &mut rng);
            assert_ne!(line.severity, Severity::Info);
            saw_error |= line.severity == Severity::Error;
        }
        assert!(saw_error, "60% error bias should surface errors");
    }

    #[test]
    fn digit_rewrite_preserves_surrounding_text() {
        let mut rng = SmallRng::seed_from_u64(36);
        let rewritten = randomize_digits("[DEBUG] Cache hit ratio: 92%", &mut rng);
        assert!(rewritten.starts_with("[DEBUG] Cache hit ratio: "));
        assert!(rewritten.ends_with('%'));
    }

    #[test]
    fn crash_excerpt_is_three_to_six_distinct_lines() {
        let mut rng = SmallRng::seed_from_u64(37);
        for _ in 0..200 {
            let excerpt = crash_excerpt(&mut rng);
            assert!((3..=6).contains(&excerpt.len()));
            let mut sorted = excerpt.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), excerpt.len());
        }
    }

    #[test]
    fn crash_screen_samplers_return_catalog_entries() {
        let mut rng = SmallRng::seed_from_u64(38);
        assert!(BANNER_TITLES.contains(&crash_banner(&mut rng)));
        assert!(STOP_CODES.contains(&bluescreen_stop_code(&mut rng)));
    }
}
