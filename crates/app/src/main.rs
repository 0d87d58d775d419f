use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use journey_core::model::{Curriculum, LearnerId, Skipped};
use journey_core::temporal::TopicDeadlineConflict;
use serde::Serialize;
use services::{AuthoringService, Clock, JourneyService, LeaderboardService, OverviewService};
use storage::snapshot::SnapshotFile;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod settings;

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidLearnerId { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLearnerId { raw } => write!(f, "invalid --learner value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Journey,
    Leaderboard,
    Validate,
    Overview,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "journey" => Some(Self::Journey),
            "leaderboard" => Some(Self::Leaderboard),
            "validate" => Some(Self::Validate),
            "overview" => Some(Self::Overview),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Args {
    command: Command,
    snapshot: PathBuf,
    learner: Option<LearnerId>,
    now: Option<DateTime<Utc>>,
    config: Option<String>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let command = match args.next() {
            None => return Err(ArgsError::MissingCommand),
            Some(arg) if arg == "--help" || arg == "-h" => {
                print_usage();
                std::process::exit(0);
            }
            Some(arg) => Command::from_arg(&arg).ok_or(ArgsError::UnknownCommand(arg))?,
        };

        let mut snapshot = std::env::var("JOURNEY_SNAPSHOT").ok().map(PathBuf::from);
        let mut learner = None;
        let mut now = None;
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--snapshot" => {
                    snapshot = Some(PathBuf::from(require_value(&mut args, "--snapshot")?));
                }
                "--learner" => {
                    let value = require_value(&mut args, "--learner")?;
                    let parsed = value
                        .parse::<LearnerId>()
                        .map_err(|_| ArgsError::InvalidLearnerId { raw: value.clone() })?;
                    learner = Some(parsed);
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--config" => {
                    config = Some(require_value(&mut args, "--config")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let snapshot = snapshot.ok_or(ArgsError::MissingFlag { flag: "--snapshot" })?;
        if command == Command::Journey && learner.is_none() {
            return Err(ArgsError::MissingFlag { flag: "--learner" });
        }

        Ok(Self {
            command,
            snapshot,
            learner,
            now,
            config,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app journey     --snapshot <file> --learner <id> [--now <rfc3339>]");
    eprintln!("  app leaderboard --snapshot <file> [--now <rfc3339>]");
    eprintln!("  app validate    --snapshot <file>");
    eprintln!("  app overview    --snapshot <file> [--now <rfc3339>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>           Settings file (default: journey.toml, optional)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  JOURNEY_SNAPSHOT, JOURNEY_CONFIG, JOURNEY__<SETTING>, RUST_LOG");
}

#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    skipped: &'a [Skipped],
    deadline_conflicts: Vec<TopicDeadlineConflict>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "app=info,services=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let settings = settings::load_settings(args.config.as_deref())?;
    let (storage, report) = SnapshotFile::read(&args.snapshot)?.into_storage().await?;
    tracing::info!(
        snapshot = %args.snapshot.display(),
        learners = report.learners,
        topic_answers = report.topic_answers,
        legacy_unmatched = report.legacy_unmatched,
        "loaded snapshot"
    );
    let clock = args.now.map_or_else(Clock::default_clock, Clock::fixed);

    match args.command {
        Command::Journey => {
            let learner_id = args
                .learner
                .ok_or(ArgsError::MissingFlag { flag: "--learner" })?;
            let journey = JourneyService::from_storage(clock, &storage)
                .learner_journey(learner_id)
                .await?;
            print_json(&journey)?;
        }
        Command::Leaderboard => {
            let board = LeaderboardService::from_storage(clock, settings, &storage)
                .leaderboard()
                .await?;
            print_json(&board)?;
        }
        Command::Validate => {
            let snapshot = storage.curriculum.snapshot().await?;
            let curriculum = Curriculum::assemble(&snapshot);
            let deadline_conflicts = AuthoringService::from_storage(settings, &storage)
                .deadline_conflicts()
                .await?;
            print_json(&ValidationReport {
                skipped: curriculum.skipped(),
                deadline_conflicts,
            })?;
        }
        Command::Overview => {
            let rows = OverviewService::from_storage(clock, &storage)
                .overview()
                .await?;
            print_json(&rows)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}
