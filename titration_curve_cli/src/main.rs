use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use titration_curve::{
    build_curve, landmarks, Curve, Landmarks, Scenario, TitrationType, VolumeGrid,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod plot;
mod quiz;

use plot::{render_chart_guard, ChartKind, PlotOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Acid-base titration curve CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the pH curve of a titration and write CSV/plots
    Curve(CurveArgs),
    /// Print equivalence and half-equivalence points as JSON
    Landmarks(LandmarksArgs),
    /// Practice reading titration curves
    Quiz(QuizArgs),
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    /// Titration type
    #[arg(long = "type", value_enum, default_value_t = TypeOpt::StrongAcidStrongBase)]
    titration_type: TypeOpt,

    /// Analyte volume (liters)
    #[arg(long, default_value_t = 0.05)]
    initial_volume: f64,

    /// Analyte concentration (mol/L)
    #[arg(long, default_value_t = 0.1)]
    initial_concentration: f64,

    /// Titrant concentration (mol/L)
    #[arg(long, default_value_t = 0.1)]
    titrant_concentration: f64,

    /// pKa of the weak acid, or of the weak base's conjugate acid
    #[arg(long)]
    pka: Option<f64>,

    /// Scenario JSON file (overrides the flags above)
    #[arg(long, value_hint = ValueHint::FilePath)]
    scenario: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CurveArgs {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// First titrant volume (liters)
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Last titrant volume (liters)
    #[arg(long, default_value_t = 0.1)]
    end: f64,

    /// Number of evenly spaced volumes
    #[arg(long, default_value_t = 500)]
    points: usize,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "titration.csv", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Output PNG figure path (defaults next to CSV)
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Output SVG figure path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Disable plot generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct LandmarksArgs {
    #[command(flatten)]
    scenario: ScenarioArgs,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct QuizArgs {
    /// Number of questions
    #[arg(long, default_value_t = 3)]
    rounds: u32,

    /// RNG seed for a reproducible session
    #[arg(long)]
    seed: Option<u64>,

    /// Write each question's curve to this PNG/SVG path
    #[arg(long, value_hint = ValueHint::FilePath)]
    chart: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TypeOpt {
    WeakAcidStrongBase,
    WeakBaseStrongAcid,
    StrongAcidStrongBase,
    StrongBaseStrongAcid,
}

impl From<TypeOpt> for TitrationType {
    fn from(value: TypeOpt) -> Self {
        match value {
            TypeOpt::WeakAcidStrongBase => TitrationType::WeakAcidStrongBase,
            TypeOpt::WeakBaseStrongAcid => TitrationType::WeakBaseStrongAcid,
            TypeOpt::StrongAcidStrongBase => TitrationType::StrongAcidStrongBase,
            TypeOpt::StrongBaseStrongAcid => TitrationType::StrongBaseStrongAcid,
        }
    }
}

impl ScenarioArgs {
    fn resolve(&self) -> Result<Scenario> {
        if let Some(path) = self.scenario.as_ref() {
            return load_scenario(path);
        }
        Scenario::new(
            self.titration_type.into(),
            self.initial_volume,
            self.initial_concentration,
            self.titrant_concentration,
            self.pka,
        )
        .context("invalid scenario flags")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Curve(args) => args.verbose,
        Command::Landmarks(args) => args.verbose,
        Command::Quiz(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Curve(args) => handle_curve(args),
        Command::Landmarks(args) => handle_landmarks(args),
        Command::Quiz(args) => handle_quiz(args),
    }
}

fn handle_curve(args: CurveArgs) -> Result<()> {
    let scenario = args.scenario.resolve()?;
    let grid = VolumeGrid::new(args.start, args.end, args.points)
        .context("invalid volume grid")?;
    debug!(?scenario, ?grid, "Computing curve");

    let t_compute = Instant::now();
    let curve = build_curve(&scenario, &grid)?;
    let marks = landmarks(&scenario)?;
    debug!(
        "Compute stage: {:.2} ms ({} points)",
        t_compute.elapsed().as_secs_f64() * 1000.0,
        curve.len()
    );
    log_landmarks(&scenario, &marks);
    if marks.equivalence_volume > grid.end {
        warn!(
            "Equivalence point ({:.1} mL) lies beyond the plotted range ({:.1} mL)",
            marks.equivalence_volume * 1000.0,
            grid.end * 1000.0
        );
    }

    if args.output.as_os_str() == "-" {
        write_curve_stdout(&curve)?;
    } else {
        write_curve_csv(&curve, &args.output)?;
        info!("Wrote curve CSV: {}", args.output.display());
    }

    if args.no_plot {
        return Ok(());
    }
    let opts = PlotOptions {
        title: format!("Titration Curve: {}", scenario.titration_type()),
        show_landmarks: true,
        show_half_equivalence: scenario.titration_type().is_weak(),
    };
    let png_path = match (args.png.as_ref(), args.output.as_os_str() == "-") {
        (Some(path), _) => Some(path.clone()),
        (None, false) => Some(args.output.with_extension("png")),
        (None, true) => None,
    };
    if let Some(path) = png_path {
        write_plot(&curve, &marks, &path, ChartKind::Png, &opts);
    }
    if let Some(path) = args.svg.as_ref() {
        write_plot(&curve, &marks, path, ChartKind::Svg, &opts);
    }
    Ok(())
}

#[derive(Serialize)]
struct LandmarksReport<'a> {
    scenario: &'a Scenario,
    landmarks: Landmarks,
}

fn handle_landmarks(args: LandmarksArgs) -> Result<()> {
    let scenario = args.scenario.resolve()?;
    let marks = landmarks(&scenario)?;
    log_landmarks(&scenario, &marks);
    let report = LandmarksReport {
        scenario: &scenario,
        landmarks: marks,
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &report)?;
    writeln!(handle)?;
    Ok(())
}

fn handle_quiz(args: QuizArgs) -> Result<()> {
    if args.rounds == 0 {
        return Err(anyhow!("--rounds must be at least 1"));
    }
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut state: Option<quiz::QuizState> = None;

    for round in 1..=args.rounds {
        let scenario = quiz::generate_scenario(&mut rng)?;
        let question = quiz::build_question(&scenario, &mut rng)?;
        debug!(?scenario, kind = ?question.kind, "Generated question");

        if let Some(path) = args.chart.as_ref() {
            let curve = build_curve(&scenario, &quiz::question_grid(&scenario)?)?;
            let marks = landmarks(&scenario)?;
            let opts = PlotOptions {
                title: format!("Question {round}: {}", scenario.titration_type()),
                show_landmarks: false,
                show_half_equivalence: false,
            };
            write_plot(&curve, &marks, path, ChartKind::from_path(path), &opts);
        }

        println!();
        println!("Question {round}/{}", args.rounds);
        println!("{}", quiz::describe(&question.scenario));
        println!("{}", question.prompt);
        for (idx, choice) in question.choices.iter().enumerate() {
            println!("  {}) {}", idx + 1, choice);
        }

        let current = match state.take() {
            Some(previous) => previous.next(question),
            None => quiz::QuizState::new(question),
        };
        let choice = match read_choice(&mut lines, current.question.choices.len())? {
            Some(choice) => choice,
            None => {
                warn!("Input closed; ending quiz early");
                state = Some(current);
                break;
            }
        };
        let graded = quiz::submit(current, choice);
        if let Some(feedback) = graded.feedback.as_deref() {
            println!("{feedback}");
        }
        state = Some(graded);
    }

    if let Some(state) = state {
        println!();
        println!("Score: {}/{}", state.correct, state.asked);
        info!("Quiz finished: {}/{} correct", state.correct, state.asked);
    }
    Ok(())
}

/// Prompt until a valid 1-based choice is entered. `None` on end of input.
fn read_choice<I>(lines: &mut I, count: usize) -> Result<Option<usize>>
where
    I: Iterator<Item = io::Result<String>>,
{
    loop {
        print!("Your answer (1-{count}): ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let line = line.context("failed to read answer")?;
        match parse_choice(&line, count) {
            Some(choice) => return Ok(Some(choice)),
            None => println!("Please enter a number between 1 and {count}."),
        }
    }
}

fn parse_choice(input: &str, count: usize) -> Option<usize> {
    let value: usize = input.trim().parse().ok()?;
    (1..=count).contains(&value).then(|| value - 1)
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("invalid scenario in {}", path.display()))
}

fn log_landmarks(scenario: &Scenario, marks: &Landmarks) {
    info!(
        "{}: equivalence at {:.2} mL, pH {:.2}",
        scenario.titration_type(),
        marks.equivalence_volume * 1000.0,
        marks.ph_at_equivalence
    );
    if let Some(pka) = scenario.pka() {
        info!(
            "Half-equivalence at {:.2} mL, pH {:.2} (pKa {:.2})",
            marks.half_equivalence_volume * 1000.0,
            marks.ph_at_half_equivalence,
            pka
        );
    }
}

fn write_plot(curve: &Curve, marks: &Landmarks, path: &Path, kind: ChartKind, opts: &PlotOptions) {
    if let Err(err) = render_chart_guard(curve, marks, path, kind, opts) {
        warn!("Skipping plot render ({}): {}", path.display(), err);
    } else {
        info!("Wrote plot: {}", path.display());
    }
}

fn write_curve_stdout(curve: &Curve) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_curve_rows(curve, &mut writer)
}

fn write_curve_csv(curve: &Curve, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_curve_rows(curve, &mut writer)
}

fn write_curve_rows<W: Write>(curve: &Curve, writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record(["titrant_volume_ml", "ph"])?;
    for point in &curve.points {
        writer.write_record([
            format!("{:.3}", point.titrant_volume * 1000.0),
            format!("{:.4}", point.ph),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
