use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use exam_core::ExamConfig;
use exam_core::model::ExamId;
use services::{
    ChannelNotifier, Clock, ExamLoopService, HistoryService, HttpQuestionSource,
    HttpSourceConfig, QuestionSource, RepositoryQuestionSource, StaticQuestionSource,
};
use storage::repository::Storage;

mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidExamId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidExamId { raw } => write!(f, "invalid --exam-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_number<T: std::str::FromStr>(value: String, flag: &'static str) -> Result<T, ArgsError> {
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- take    [--db <sqlite_url>] [--exam-id <id>] [--config <file>] [--time-limit <secs>] [--shuffle] [--sample]"
    );
    eprintln!(
        "  cargo run -p app -- history [--db <sqlite_url>] [--exam-id <id>] [--limit <n>] [--json]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://exam.sqlite3");
    eprintln!("  --exam-id 1");
    eprintln!("  --limit 20");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_ID, EXAM_TIME_LIMIT_SECS, EXAM_QUESTIONS_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

/// Targeting shared by every command.
#[derive(Debug)]
struct Target {
    db_url: String,
    exam_id: ExamId,
}

impl Target {
    fn from_env() -> Self {
        let db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://exam.sqlite3".into(), normalize_sqlite_url);
        let exam_id = std::env::var("EXAM_ID")
            .ok()
            .and_then(|value| value.parse::<ExamId>().ok())
            .unwrap_or_else(|| ExamId::new(1));
        Self { db_url, exam_id }
    }

    /// Consume `--db` / `--exam-id`; returns `false` for any other flag.
    fn parse_flag(
        &mut self,
        arg: &str,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<bool, ArgsError> {
        match arg {
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                self.db_url = normalize_sqlite_url(value);
                Ok(true)
            }
            "--exam-id" => {
                let value = require_value(args, "--exam-id")?;
                self.exam_id = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidExamId { raw: value.clone() })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug)]
struct TakeArgs {
    target: Target,
    config_file: Option<PathBuf>,
    time_limit: Option<u32>,
    shuffle: bool,
    sample: bool,
}

impl TakeArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            target: Target::from_env(),
            config_file: None,
            time_limit: None,
            shuffle: false,
            sample: false,
        };

        while let Some(arg) = args.next() {
            if parsed.target.parse_flag(&arg, args)? {
                continue;
            }
            match arg.as_str() {
                "--config" => parsed.config_file = Some(require_value(args, "--config")?.into()),
                "--time-limit" => {
                    let value = require_value(args, "--time-limit")?;
                    parsed.time_limit = Some(parse_number(value, "--time-limit")?);
                }
                "--shuffle" => parsed.shuffle = true,
                "--sample" => parsed.sample = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    /// File first, then environment, then flags.
    fn exam_config(&self) -> Result<ExamConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str::<ExamConfig>(&raw)?
            }
            None => ExamConfig::default(),
        };

        if let Ok(raw) = std::env::var("EXAM_TIME_LIMIT_SECS") {
            match raw.trim().parse::<u32>() {
                Ok(secs) => config = config.with_time_limit(secs),
                Err(_) => log::warn!("ignoring EXAM_TIME_LIMIT_SECS={raw}: not a number"),
            }
        }
        if let Some(secs) = self.time_limit {
            config = config.with_time_limit(secs);
        }
        if self.shuffle {
            config = config.with_shuffle(true);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug)]
struct HistoryArgs {
    target: Target,
    limit: u32,
    json: bool,
}

impl HistoryArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            target: Target::from_env(),
            limit: 20,
            json: false,
        };

        while let Some(arg) = args.next() {
            if parsed.target.parse_flag(&arg, args)? {
                continue;
            }
            match arg.as_str() {
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    parsed.limit = parse_number(value, "--limit")?;
                }
                "--json" => parsed.json = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
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
            .unwrap_or_else(|_| PathBuf::from("."))
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

async fn open_storage(target: &Target) -> Result<Storage, Box<dyn std::error::Error>> {
    prepare_sqlite_file(&target.db_url)?;
    Ok(Storage::sqlite(&target.db_url).await?)
}

/// `--sample` wins, then a configured remote bank, then the stored bank.
fn question_source(
    args: &TakeArgs,
    config: &ExamConfig,
    storage: &Storage,
) -> Result<Arc<dyn QuestionSource>, Box<dyn std::error::Error>> {
    let exam_id = args.target.exam_id;
    if args.sample {
        log::info!("using the built-in sample bank");
        return Ok(Arc::new(StaticQuestionSource::sample(config.question_count)?));
    }
    if let Some(remote) = HttpSourceConfig::from_env(exam_id) {
        log::info!("loading questions from {}", remote.questions_url());
        return Ok(Arc::new(HttpQuestionSource::new(Some(remote))));
    }
    Ok(Arc::new(RepositoryQuestionSource::new(
        exam_id,
        Arc::clone(&storage.questions),
    )))
}

async fn run_take(args: TakeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.exam_config()?;
    let storage = open_storage(&args.target).await?;
    let source = question_source(&args, &config, &storage)?;

    let (notifier, notices) = ChannelNotifier::new();
    let service = ExamLoopService::new(
        Clock::default_clock(),
        args.target.exam_id,
        source,
        Arc::new(notifier),
        Arc::clone(&storage.attempts),
    )
    .with_config(config);

    terminal::take_exam(&service, notices).await
}

async fn run_history(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(&args.target).await?;
    let history = HistoryService::new(Arc::clone(&storage.attempts));
    let overview = history.overview(args.target.exam_id, args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else {
        terminal::print_history(&overview);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Without a subcommand the exam starts.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
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
    let report = |e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    };

    match cmd {
        Command::Take => run_take(TakeArgs::parse(&mut iter).map_err(report)?).await,
        Command::History => run_history(HistoryArgs::parse(&mut iter).map_err(report)?).await,
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> std::vec::IntoIter<String> {
        list.iter()
            .map(|s| (*s).to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn take_flags_are_parsed() {
        let parsed = TakeArgs::parse(&mut args(&[
            "--db",
            "sqlite:///tmp/exam.db",
            "--exam-id",
            "7",
            "--time-limit",
            "120",
            "--shuffle",
            "--sample",
        ]))
        .unwrap();
        assert_eq!(parsed.target.db_url, "sqlite:///tmp/exam.db");
        assert_eq!(parsed.target.exam_id, ExamId::new(7));
        assert_eq!(parsed.time_limit, Some(120));
        assert!(parsed.shuffle);
        assert!(parsed.sample);

        let config = parsed.exam_config().unwrap();
        assert_eq!(config.time_limit_secs, 120);
        assert!(config.shuffle_questions);
    }

    #[test]
    fn bad_flags_are_rejected() {
        assert!(matches!(
            TakeArgs::parse(&mut args(&["--time-limit", "-5"])),
            Err(ArgsError::InvalidNumber { .. })
        ));
        assert!(matches!(
            HistoryArgs::parse(&mut args(&["--limit"])),
            Err(ArgsError::MissingValue { flag: "--limit" })
        ));
        assert!(matches!(
            HistoryArgs::parse(&mut args(&["--exam-id", "abc"])),
            Err(ArgsError::InvalidExamId { .. })
        ));
        assert!(matches!(
            HistoryArgs::parse(&mut args(&["--bogus"])),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn sqlite_urls_become_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:/var/exam.db".into()),
            "sqlite:///var/exam.db"
        );
        assert!(normalize_sqlite_url("exam.db".into()).starts_with("sqlite:///"));
    }
}
