mod simulation;
mod store;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use rackdown_game::numbers::u64_to_f64;
use rackdown_game::{CounterStore, MemoryCounter, TuningConfig};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use simulation::{HarnessConfig, SessionReport, run_session};
use store::FileCounter;

/// Tap cadence profiles for autoplay.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TapStyle {
    /// Hammer the server (~9 taps/s)
    Frantic,
    /// Regular play (~4 taps/s)
    Steady,
    /// Barely poke it (~1.5 taps/s)
    Cautious,
}

impl TapStyle {
    const fn taps_per_second(self) -> f32 {
        match self {
            Self::Frantic => 9.0,
            Self::Steady => 4.0,
            Self::Cautious => 1.5,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "rackdown-tester", version)]
#[command(about = "Automated QA harness for Rackdown - autoplays full sessions against the core engine")]
struct Args {
    /// Number of sessions to autoplay
    #[arg(long, default_value_t = 25)]
    sessions: usize,

    /// Base seed for the session fan-out
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Tap cadence profile
    #[arg(long, value_enum, default_value_t = TapStyle::Steady)]
    style: TapStyle,

    /// Simulation tick rate in Hz
    #[arg(long, default_value_t = 30.0)]
    tick_hz: f32,

    /// Per-session horizon in simulated seconds
    #[arg(long, default_value_t = 120.0)]
    max_seconds: f32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Persist the crash counter to this file between runs
    #[arg(long)]
    counter_file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Summary {
    sessions: usize,
    completed: usize,
    causes: BTreeMap<&'static str, usize>,
    variants: BTreeMap<&'static str, usize>,
    mean_survival_seconds: f64,
    min_survival_seconds: f64,
    max_survival_seconds: f64,
    mean_taps: f64,
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    generated_at: String,
    style: &'static str,
    summary: Summary,
    reports: &'a [SessionReport],
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let reports = match args.counter_file.clone() {
        Some(path) => run_all(&FileCounter::new(path), &args),
        None => run_all(&MemoryCounter::default(), &args),
    };
    let summary = summarize(&reports);

    let style = match args.style {
        TapStyle::Frantic => "frantic",
        TapStyle::Steady => "steady",
        TapStyle::Cautious => "cautious",
    };
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let rendered = match args.report.as_str() {
        "json" => {
            let run = RunReport {
                generated_at,
                style,
                summary,
                reports: &reports,
            };
            serde_json::to_string_pretty(&run).context("serializing JSON report")?
        }
        _ => render_console(&generated_at, style, &summary),
    };

    match args.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("creating report file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{rendered}")?;
        }
        None => writeln!(stdout(), "{rendered}")?,
    }
    Ok(())
}

fn run_all<S: CounterStore + Clone>(counter: &S, args: &Args) -> Vec<SessionReport> {
    let tuning = TuningConfig::default_config();
    let mut seed_rng = SmallRng::seed_from_u64(args.seed);
    (0..args.sessions)
        .map(|index| {
            let harness = HarnessConfig {
                seed: seed_rng.r#gen(),
                taps_per_second: args.style.taps_per_second(),
                tick_hz: args.tick_hz,
                max_seconds: args.max_seconds,
            };
            let report = run_session(counter.clone(), &tuning, &harness);
            match &report.record {
                Some(record) => log::info!(
                    "session {index}: crashed by {} as {} after {:.1}s / {} taps",
                    record.cause,
                    record.variant,
                    report.survived_seconds,
                    report.taps
                ),
                None => log::warn!(
                    "session {index}: survived the horizon ({} taps)",
                    report.taps
                ),
            }
            report
        })
        .collect()
}

fn summarize(reports: &[SessionReport]) -> Summary {
    let mut causes: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut variants: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut survival_sum = 0.0f64;
    let mut survival_min = f64::INFINITY;
    let mut survival_max = 0.0f64;
    let mut tap_sum = 0.0f64;
    let mut completed = 0usize;

    for report in reports {
        tap_sum += f64::from(report.taps);
        let Some(record) = &report.record else {
            continue;
        };
        completed += 1;
        *causes.entry(record.cause.as_str()).or_default() += 1;
        *variants.entry(record.variant.as_str()).or_default() += 1;
        let survived = f64::from(report.survived_seconds);
        survival_sum += survived;
        survival_min = survival_min.min(survived);
        survival_max = survival_max.max(survived);
    }

    let completed_n = u64_to_f64(u64::try_from(completed).unwrap_or(u64::MAX)).max(1.0);
    let sessions_n = u64_to_f64(u64::try_from(reports.len()).unwrap_or(u64::MAX)).max(1.0);
    Summary {
        sessions: reports.len(),
        completed,
        causes,
        variants,
        mean_survival_seconds: survival_sum / completed_n,
        min_survival_seconds: if survival_min.is_finite() {
            survival_min
        } else {
            0.0
        },
        max_survival_seconds: survival_max,
        mean_taps: tap_sum / sessions_n,
    }
}

fn render_console(generated_at: &str, style: &str, summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        "=== Rackdown autoplay report ===".bold()
    ));
    out.push_str(&format!("generated: {generated_at}  style: {style}\n"));
    out.push_str(&format!(
        "sessions: {}  completed: {}\n",
        summary.sessions,
        if summary.completed == summary.sessions {
            summary.completed.to_string().green()
        } else {
            summary.completed.to_string().yellow()
        }
    ));
    out.push_str(&format!(
        "survival: mean {:.1}s  min {:.1}s  max {:.1}s  taps: mean {:.1}\n",
        summary.mean_survival_seconds,
        summary.min_survival_seconds,
        summary.max_survival_seconds,
        summary.mean_taps
    ));

    out.push_str(&format!("{}\n", "crash causes:".bold()));
    out.push_str(&histogram(&summary.causes));
    out.push_str(&format!("{}\n", "crash variants:".bold()));
    out.push_str(&histogram(&summary.variants));
    out
}

fn histogram(counts: &BTreeMap<&'static str, usize>) -> String {
    let mut out = String::new();
    let peak = counts.values().copied().max().unwrap_or(0).max(1);
    for (name, count) in counts {
        let bar = "#".repeat(count * 30 / peak);
        out.push_str(&format!("  {name:<14} {count:>4}  {}\n", bar.cyan()));
    }
    if counts.is_empty() {
        out.push_str("  (none)\n");
    }
    out
}
