use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use services::{
    ConfigSource, CurriculumSource, DebugOverrides, ExamStartRejection, HttpSource,
    JsonFileSource, LearningSession, PronunciationOutcome, SessionOptions,
};
use storage::repository::Storage;
use tutor_core::exam::ExamStep;

mod console;

use console::{Console, ConsoleObserver};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSection { raw: String },
    InvalidTimeout { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSection { raw } => write!(f, "invalid --section value: {raw}"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tutor status   [options]");
    eprintln!("  tutor practice [options] [--section <n>]");
    eprintln!("  tutor exam     [options] [--section <n>]");
    eprintln!("  tutor reset    [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>        default sqlite:tutor.sqlite3");
    eprintln!("  --curriculum <path|url>  default data/phrases.json");
    eprintln!("  --config <path|url>      default data/config.json");
    eprintln!("  --learner <name>");
    eprintln!("  --timeout <seconds>      answer time per pronunciation attempt (default 60)");
    eprintln!("  --debug <query>          e.g. \"debug=1\" or \"questions=4&skipGate=1\"");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTOR_DB_URL, TUTOR_CURRICULUM, TUTOR_CONFIG, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Practice,
    Exam,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "practice" => Some(Self::Practice),
            "exam" => Some(Self::Exam),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    curriculum: String,
    config: String,
    learner: Option<String>,
    section: Option<usize>,
    timeout: Duration,
    debug: DebugOverrides,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("TUTOR_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("tutor.sqlite3".into()), normalize_sqlite_url);
        let mut curriculum =
            std::env::var("TUTOR_CURRICULUM").unwrap_or_else(|_| "data/phrases.json".into());
        let mut config = std::env::var("TUTOR_CONFIG").unwrap_or_else(|_| "data/config.json".into());
        let mut learner = None;
        let mut section = None;
        let mut timeout = Duration::from_secs(60);
        let mut debug = DebugOverrides::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--curriculum" => curriculum = require_value(args, "--curriculum")?,
                "--config" => config = require_value(args, "--config")?,
                "--learner" => learner = Some(require_value(args, "--learner")?),
                "--section" => {
                    let value = require_value(args, "--section")?;
                    let parsed = value
                        .parse::<usize>()
                        .ok()
                        .filter(|&n| n > 0)
                        .ok_or_else(|| ArgsError::InvalidSection { raw: value.clone() })?;
                    section = Some(parsed - 1);
                }
                "--timeout" => {
                    let value = require_value(args, "--timeout")?;
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTimeout { raw: value.clone() })?;
                    timeout = Duration::from_secs(secs);
                }
                "--debug" => debug = DebugOverrides::from_query(&require_value(args, "--debug")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            curriculum,
            config,
            learner,
            section,
            timeout,
            debug,
        })
    }

    fn options(&self) -> SessionOptions {
        let mut options = SessionOptions::default()
            .with_recognition_timeout(self.timeout)
            .with_debug(self.debug);
        if let Some(name) = &self.learner {
            options = options.with_learner_name(name.clone());
        }
        options
    }
}

fn source(location: &str) -> Box<dyn Source> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location))
    } else {
        Box::new(JsonFileSource::new(location))
    }
}

trait Source: CurriculumSource + ConfigSource {
    fn as_curriculum(&self) -> &dyn CurriculumSource;
    fn as_config(&self) -> &dyn ConfigSource;
}

impl<T: CurriculumSource + ConfigSource> Source for T {
    fn as_curriculum(&self) -> &dyn CurriculumSource {
        self
    }

    fn as_config(&self) -> &dyn ConfigSource {
        self
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

fn print_status(session: &LearningSession) {
    let summary = session.progress_summary();
    println!("Learner: {}", session.learner_name());
    println!(
        "Current section: {} of {}",
        summary.current_section, summary.total_sections
    );
    for overview in session.sections() {
        let marker = if overview.is_current {
            ">"
        } else if overview.is_unlocked {
            " "
        } else {
            "x"
        };
        println!("  {marker} {}. {}", overview.index + 1, overview.title);
    }

    let index = session.current_section_index();
    let requirements = session.exam_requirements(index);
    println!(
        "Pronunciation: {}/{} phrases at {}% or better{}",
        requirements.qualified,
        requirements.total,
        requirements.threshold,
        if requirements.bypassed { " (gate bypassed)" } else { "" }
    );
}

async fn practice(
    session: &mut LearningSession,
    console: &Console,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = session.current_section_index();
    let phrases = session.current_section().phrases().to_vec();
    println!("Type what you say; an empty line skips the phrase.");

    for (i, phrase) in phrases.iter().enumerate() {
        println!();
        println!(
            "{} -> {}  [{}]",
            phrase.source(),
            phrase.target(),
            phrase.pronunciation_guide()
        );
        if let Some(score) = session.scores().get(index, i) {
            println!("  last score: {score}%");
        }
        if let PronunciationOutcome::Rejected(rejection) =
            session.attempt_pronunciation(index, i, console).await
        {
            log::warn!("attempt rejected: {rejection:?}");
        }
    }

    println!();
    print_status(session);
    Ok(())
}

async fn exam(
    session: &mut LearningSession,
    console: &Console,
) -> Result<(), Box<dyn std::error::Error>> {
    match session.start_exam() {
        Ok(_) => {}
        Err(ExamStartRejection::RequirementsNotMet { .. }) => return Ok(()),
        Err(ExamStartRejection::EmptySection) => {
            println!("This section has no phrases.");
            return Ok(());
        }
    }

    loop {
        let Some(question) = session.current_question().cloned() else {
            return Ok(());
        };
        let Some(line) = console.read_line("answer> ").await? else {
            println!("Exam abandoned.");
            return Ok(());
        };
        let selected = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options.get(i).cloned())
            .unwrap_or(line);

        match session.submit_answer(&selected) {
            Ok(outcome) if outcome.is_correct => println!("Correct!"),
            Ok(outcome) => println!("Incorrect. The answer is: {}", outcome.correct_answer),
            Err(rejection) => println!("{rejection}"),
        }

        if let ExamStep::Completed(results) = session.advance_question().await? {
            if results.can_advance {
                println!("Next section unlocked. Run with --section to continue.");
            }
            return Ok(());
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Status,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Status,
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

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let curriculum = source(&parsed.curriculum);
    let config = source(&parsed.config);

    let mut session = LearningSession::bootstrap(
        &storage,
        curriculum.as_curriculum(),
        config.as_config(),
        parsed.options(),
        Arc::new(ConsoleObserver),
    )
    .await?;

    if let Some(index) = parsed.section {
        if !session.select_section(index).await {
            return Ok(());
        }
    }

    let console = Console::new();
    match cmd {
        Command::Status => print_status(&session),
        Command::Practice => practice(&mut session, &console).await?,
        Command::Exam => exam(&mut session, &console).await?,
        Command::Reset => {
            session.reset_progress().await;
            println!("Progress and pronunciation scores cleared.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
