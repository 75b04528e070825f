use std::fmt;
use std::io::{self, BufRead, Write};

use kumano_core::model::{ANSWER_COUNT, LearnerId, LessonId, QuizItem};
use services::{AppServices, Clock, DEFAULT_BATCH_SIZE};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidCount { raw: String },
    InvalidDbUrl { raw: String },
    MissingLessonId,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingLessonId => write!(f, "quiz requires --lesson-id"),
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

fn parse_id(flag: &'static str, raw: String) -> Result<u64, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Lessons,
    Progress,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "lessons" => Some(Self::Lessons),
            "progress" => Some(Self::Progress),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    learner_id: LearnerId,
    lesson_id: Option<LessonId>,
    count: usize,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- quiz --lesson-id <id> [--db <sqlite_url>] [--learner-id <id>] [--count <n>]");
    eprintln!("  cargo run -p app -- lessons  [--db <sqlite_url>] [--learner-id <id>]");
    eprintln!("  cargo run -p app -- progress [--db <sqlite_url>] [--learner-id <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --learner-id 1");
    eprintln!("  --count {DEFAULT_BATCH_SIZE}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  KUMANO_DB_URL, KUMANO_LEARNER_ID");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("KUMANO_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url);
        let mut learner_id = std::env::var("KUMANO_LEARNER_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| LearnerId::new(1), LearnerId::new);
        let mut lesson_id = None;
        let mut count = DEFAULT_BATCH_SIZE;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--learner-id" => {
                    let value = require_value(args, "--learner-id")?;
                    learner_id = LearnerId::new(parse_id("--learner-id", value)?);
                }
                "--lesson-id" => {
                    let value = require_value(args, "--lesson-id")?;
                    lesson_id = Some(LessonId::new(parse_id("--lesson-id", value)?));
                }
                "--count" => {
                    let value = require_value(args, "--count")?;
                    count = value
                        .parse()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidCount { raw: value })?;
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
            learner_id,
            lesson_id,
            count,
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

fn present_question(index: usize, total: usize, item: &QuizItem) {
    println!();
    println!("[{}/{}] {}", index + 1, total, item.question());
    for (i, answer) in item.answers().iter().enumerate() {
        println!("  {}) {answer}", i + 1);
    }
}

/// Read a 1-based answer choice from stdin. Returns `None` on EOF or `q`.
fn read_choice(input: &mut impl BufRead) -> io::Result<Option<usize>> {
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=ANSWER_COUNT).contains(&n) => return Ok(Some(n - 1)),
            _ => eprintln!("enter a number between 1 and {ANSWER_COUNT}, or q to quit"),
        }
    }
}

async fn run_quiz(
    services: &AppServices,
    learner_id: LearnerId,
    lesson_id: LessonId,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let batch = services.quiz().select_batch(learner_id, lesson_id, count).await?;
    if batch.is_empty() {
        println!("No questions in lesson {lesson_id}. Run the seed binary first?");
        return Ok(());
    }

    let attempts = services.attempts();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let total = batch.len();
    let mut correct = 0_usize;
    let mut answered = 0_usize;

    for (index, item) in batch.iter().enumerate() {
        present_question(index, total, item);
        let Some(choice) = read_choice(&mut input)? else {
            println!("Stopping early.");
            break;
        };

        let was_correct = item.is_correct(choice);
        attempts
            .record_attempt(learner_id, item.id(), was_correct)
            .await?;
        answered += 1;

        if was_correct {
            correct += 1;
            println!("Correct!");
        } else {
            println!(
                "Incorrect. The answer was: {}",
                item.answers()[item.correct_index()]
            );
        }
    }

    if answered > 0 {
        println!();
        println!("Score: {correct}/{answered}");
        if answered == total && correct == total {
            services.lessons().complete_lesson(learner_id, lesson_id).await?;
            println!("Lesson {lesson_id} marked complete.");
        }
    }

    Ok(())
}

async fn run_lessons(
    services: &AppServices,
    learner_id: LearnerId,
) -> Result<(), Box<dyn std::error::Error>> {
    let statuses = services.lessons().lesson_progress(learner_id).await?;
    if statuses.is_empty() {
        println!("No lessons yet. Run the seed binary first?");
        return Ok(());
    }

    for status in statuses {
        let marker = if status.progress.completed { "x" } else { " " };
        println!("[{marker}] {} {}", status.lesson.id(), status.lesson.title());
    }
    Ok(())
}

async fn run_progress(
    services: &AppServices,
    learner_id: LearnerId,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = services.progress().summary(learner_id).await?;

    println!(
        "Lessons completed: {}/{}",
        summary.lessons_completed, summary.lessons_total
    );
    println!(
        "Answers correct:   {}/{}",
        summary.correct_answers, summary.total_answers
    );
    if let Some(accuracy) = summary.accuracy() {
        println!("Accuracy:          {:.0}%", accuracy * 100.0);
    }

    let rows = services.progress().review_progress(learner_id).await?;
    if !rows.is_empty() {
        println!();
        println!("Per-item schedule:");
        for row in rows {
            println!(
                "  item {}: {} correct, {} incorrect, next review {}",
                row.item_id, row.correct_attempts, row.incorrect_attempts, row.next_review_date
            );
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;

    match cmd {
        Command::Quiz => {
            let lesson_id = parsed.lesson_id.ok_or(ArgsError::MissingLessonId)?;
            run_quiz(&services, parsed.learner_id, lesson_id, parsed.count).await
        }
        Command::Lessons => run_lessons(&services, parsed.learner_id).await,
        Command::Progress => run_progress(&services, parsed.learner_id).await,
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so quiz prompts on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
