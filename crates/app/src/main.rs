use std::fmt;

use race_core::model::{Accessory, AvatarConfig, FurColor, GameSettings, LeaderboardEntry};
use race_core::rank::{format_accuracy, format_clock, format_questions, format_time_ms};
use services::round::TimerTicket;
use services::{
    AdvanceTrigger, AppServices, Clock, FeedbackTimers, GameEvent, GameSession, InitialScreen,
    RoundStep, RunOrchestrator, RunReport, Selection,
};
use storage::leaderboard::SimulatedLatency;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::EnvFilter;

type Input = Lines<BufReader<Stdin>>;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidColor { raw: String },
    InvalidAccessory { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidColor { raw } => write!(f, "invalid --color value: {raw}"),
            ArgsError::InvalidAccessory { raw } => {
                write!(f, "invalid --accessory value: {raw}")
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

struct Args {
    db_url: String,
    memory: bool,
    hosted_latency: bool,
    name: Option<String>,
    color: FurColor,
    accessory: Option<Accessory>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play  [--db <sqlite_url>] [--memory] [--name <name>]");
    eprintln!("                            [--color <color>] [--accessory <accessory>] [--latency]");
    eprintln!("  cargo run -p app -- board [--db <sqlite_url>] [--memory]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://race.sqlite3");
    eprintln!("  --color gold");
    eprintln!();
    eprintln!("Colors:");
    eprintln!(
        "  {}",
        FurColor::ALL.iter().map(|c| c.key()).collect::<Vec<_>>().join(", ")
    );
    eprintln!("Accessories:");
    eprintln!(
        "  {}",
        Accessory::ALL.iter().map(|a| a.key()).collect::<Vec<_>>().join(", ")
    );
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RACE_DB_URL, RACE_PLAYER_NAME, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Board,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "board" => Some(Self::Board),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("RACE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://race.sqlite3".into(), normalize_sqlite_url);
        let mut name = std::env::var("RACE_PLAYER_NAME")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut memory = false;
        let mut hosted_latency = false;
        let mut color = FurColor::default();
        let mut accessory = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--memory" => memory = true,
                "--latency" => hosted_latency = true,
                "--name" => name = Some(require_value(args, "--name")?),
                "--color" => {
                    let value = require_value(args, "--color")?;
                    color = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidColor { raw: value.clone() })?;
                }
                "--accessory" => {
                    let value = require_value(args, "--accessory")?;
                    accessory = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidAccessory { raw: value.clone() })?,
                    );
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            memory,
            hosted_latency,
            name,
            color,
            accessory,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means play.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let settings = GameSettings::default();
    let latency = if parsed.hosted_latency {
        SimulatedLatency::hosted()
    } else {
        SimulatedLatency::default()
    };
    info!(db = %parsed.db_url, memory = parsed.memory, "opening storage");
    let services = if parsed.memory {
        AppServices::in_memory(Clock::system(), settings, latency).await?
    } else {
        // Keep file creation in the binary glue so storage stays pure.
        prepare_sqlite_file(&parsed.db_url)?;
        AppServices::new_sqlite(&parsed.db_url, Clock::system(), settings, latency).await?
    };

    match cmd {
        Command::Play => play(&services, &parsed).await,
        Command::Board => {
            print_board(&services.leaderboard().top().await);
            Ok(())
        }
    }
}

//
// ─── GAME LOOP ─────────────────────────────────────────────────────────────────
//

enum RaceExit {
    Finished,
    Quit,
}

async fn play(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if services.intro().initial_screen().await == InitialScreen::Intro {
        print_intro(services.settings());
        services.intro().mark_intro_seen().await;
    }

    let mut game = services.new_game();
    let mut preset_name = args.name.clone();

    loop {
        game.set_avatar(AvatarConfig::new(args.color, args.accessory));

        let name = match preset_name.take() {
            Some(name) => name,
            None => match prompt(&mut input, "Racer name: ").await? {
                Some(name) => name,
                None => return Ok(()),
            },
        };
        if let Err(err) = game.set_player_name(&name) {
            println!("{err}");
            continue;
        }

        if let RaceExit::Quit = race(services, &mut game, &mut input).await? {
            return Ok(());
        }

        loop {
            let choice = prompt(&mut input, "[r]etry submit, [p]lay again, [q]uit: ").await?;
            match choice.as_deref().map(str::trim) {
                Some("r") => {
                    if let Some(run) = game.run_mut() {
                        let report = run.retry_submission().await?;
                        print_report(&report);
                    }
                }
                Some("p") => {
                    game.reset();
                    break;
                }
                Some("q") | None => return Ok(()),
                Some(_) => {}
            }
        }
    }
}

async fn race(
    services: &AppServices,
    game: &mut GameSession,
    input: &mut Input,
) -> Result<RaceExit, Box<dyn std::error::Error>> {
    let bank = services.bank();
    let run = game.start_game(&bank, services.leaderboard())?;
    let (mut timers, mut tickets) = FeedbackTimers::new();
    println!("Type 1-4 to answer, n to skip the wait, q to end the race.");
    render_events(run);

    loop {
        let step = tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    timers.cancel_many(run.abandon());
                    return Ok(RaceExit::Quit);
                };
                handle_line(run, &mut timers, line.trim()).await?
            }
            ticket = next_ticket(&mut tickets) => {
                timers.acknowledge(ticket);
                Some(run.timer_fired(ticket).await?)
            }
        };

        let finished = match step {
            Some(RoundStep::NextQuestion(presented)) => {
                timers.cancel_many(presented.cancelled);
                false
            }
            Some(RoundStep::Reopened { cancelled, .. }) => {
                timers.cancel_many(cancelled);
                false
            }
            Some(RoundStep::Finished { report, cancelled }) => {
                timers.cancel_many(cancelled);
                render_events(run);
                print_report(&report);
                true
            }
            Some(RoundStep::Ignored(_)) | None => false,
        };
        if finished {
            return Ok(RaceExit::Finished);
        }
        if !run.is_racing() {
            render_events(run);
            return Ok(RaceExit::Quit);
        }
        render_events(run);
    }
}

async fn next_ticket(tickets: &mut UnboundedReceiver<TimerTicket>) -> TimerTicket {
    match tickets.recv().await {
        Some(ticket) => ticket,
        // the sender lives as long as the timers; never resolve once it is gone
        None => std::future::pending().await,
    }
}

async fn handle_line(
    run: &mut RunOrchestrator,
    timers: &mut FeedbackTimers,
    line: &str,
) -> Result<Option<RoundStep>, Box<dyn std::error::Error>> {
    match line {
        "q" | "quit" => {
            timers.cancel_many(run.abandon());
            Ok(None)
        }
        "n" | "next" | "" => Ok(Some(run.advance(AdvanceTrigger::Manual).await?)),
        other => {
            let option = other
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| run.view().and_then(|v| v.options.get(i).cloned()));
            match option {
                Some(option) => {
                    if let Selection::Locked(locked) = run.select_answer(&option) {
                        timers.arm_all(locked.timers);
                    }
                }
                None => println!("Pick an answer between 1 and 4."),
            }
            Ok(None)
        }
    }
}

async fn prompt(input: &mut Input, label: &str) -> std::io::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    input.next_line().await
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn print_intro(settings: &GameSettings) {
    println!("HAMSTER SPACE RACE");
    println!("Your hamster is lost in deep space. Answer space trivia to fly home.");
    println!(
        "Every correct answer moves you one step; {} steps bring you back to Earth.",
        settings.max_steps()
    );
    println!("Wrong answers cost time, not distance. The fastest racers make the board.");
    println!();
}

fn render_events(run: &mut RunOrchestrator) {
    for event in run.take_events() {
        match event {
            GameEvent::QuestionChanged {
                question_number,
                prompt,
                options,
                ..
            } => {
                let progress = run.progress();
                println!();
                println!(
                    "[{}] {}/{} steps  {}%  {}",
                    progress.milestone.label,
                    progress.step,
                    progress.max_steps,
                    progress.percent(),
                    format_clock(progress.elapsed_ms)
                );
                println!("Question {question_number}: {prompt}");
                for (i, option) in options.iter().enumerate() {
                    println!("  {}. {option}", i + 1);
                }
            }
            GameEvent::AnswerLocked { correct: true, .. } => println!("Correct! Full thrust ahead."),
            GameEvent::AnswerLocked { correct: false, .. } => {
                let answer = run
                    .current_question()
                    .map(|q| q.correct_answer().to_owned())
                    .unwrap_or_default();
                println!("Not quite. The answer was {answer}.");
            }
            GameEvent::RoundReopened { .. } => {
                println!("Something went wrong, answer that one again.");
            }
            GameEvent::RunAbandoned { .. } => println!("Race ended."),
            GameEvent::RoundAdvanced { .. }
            | GameEvent::RunCompleted { .. }
            | GameEvent::LeaderboardUpdated { .. } => {}
        }
    }
}

fn print_report(report: &RunReport) {
    let stats = &report.stats;
    println!();
    println!("WELCOME HOME, {}!", stats.player_name);
    println!("Time:      {}", stats.formatted_time());
    println!(
        "Accuracy:  {}% ({}/{})",
        stats.accuracy, stats.correct_answers, stats.total_questions
    );
    println!("Rank:      #{} of {}", report.rank.rank, report.rank.total);
    if report.shows_percentile() {
        println!("Faster than {}% of all racers!", report.rank.percentile);
    }
    println!("{}", stats.share_message());
    if let Some(err) = &report.persist_error {
        println!("Could not save to the leaderboard ({err}). Your result is kept for this session.");
    }
    print_board(&report.leaderboard);
}

fn print_board(entries: &[LeaderboardEntry]) {
    println!();
    if entries.is_empty() {
        println!("No racers yet. Be the first!");
        return;
    }
    println!("{:>4}  {:<20} {:>6} {:>5} {:>6}", "#", "Racer", "Time", "Acc", "Qs");
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>4}  {:<20} {:>6} {:>5} {:>6}",
            i + 1,
            entry.player_name,
            format_time_ms(entry.time_ms),
            format_accuracy(entry),
            format_questions(entry.total_questions)
        );
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
