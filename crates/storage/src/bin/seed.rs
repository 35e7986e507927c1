use std::fmt;

use race_core::model::GameSettings;
use storage::Storage;
use storage::leaderboard::{LeaderboardStore, demo_racers};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    racers: usize,
    reset: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidRacers { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidRacers { raw } => write!(f, "invalid --racers value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("RACE_DB_URL").unwrap_or_else(|_| "sqlite:race.sqlite3?mode=rwc".into());
        let mut racers = std::env::var("RACE_SEED_RACERS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        let mut reset = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--racers" => {
                    let value = require_value(&mut args, "--racers")?;
                    racers = value
                        .parse::<usize>()
                        .map_err(|_| ArgsError::InvalidRacers { raw: value.clone() })?;
                }
                "--reset" => reset = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            racers,
            reset,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:race.sqlite3?mode=rwc)");
    eprintln!("  --racers <n>              Number of demo racers to insert (default: all 28)");
    eprintln!("  --reset                   Clear the leaderboard before seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  RACE_DB_URL, RACE_SEED_RACERS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let board = LeaderboardStore::open(storage.durable, &GameSettings::default()).await;
    if args.reset {
        board.clear().await?;
    }

    let mut inserted = 0_usize;
    for racer in demo_racers().into_iter().take(args.racers) {
        let receipt = board.submit(racer).await;
        if let Some(err) = receipt.persist_error {
            return Err(err.into());
        }
        inserted += 1;
    }

    println!(
        "Seeded {inserted} demo racers into {} ({} on the board)",
        args.db_url,
        board.top().await.len()
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
