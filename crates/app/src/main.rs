use std::fmt;
use std::sync::Arc;

use api::{Api, ApiConfig};
use prep_core::model::{ExamPlan, ResultId, TestId};
use services::{Clock, ExamLoopService, ExamPlanService, ResultService};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod runner;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app take     --test-id <id> [--duration <minutes>]");
    eprintln!("  app generate [--subjects <subject,subject,...>] [--count <n>] [--duration <minutes>]");
    eprintln!("  app result   --test-id <id> --result-id <id>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --duration 100");
    eprintln!("  --subjects Mathematics");
    eprintln!("  --count 100");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PREP_ENV (dev|prod), PREP_API_URL, PREP_API_TOKEN, PREP_HTTP_TIMEOUT_MS, RUST_LOG");
}

#[derive(Debug)]
enum Command {
    Take {
        test_id: TestId,
        duration_minutes: Option<u32>,
    },
    Generate {
        plan: ExamPlan,
    },
    Result {
        test_id: TestId,
        result_id: ResultId,
    },
}

impl Command {
    fn parse(name: &str, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        match name {
            "take" => Self::parse_take(args),
            "generate" => Self::parse_generate(args),
            "result" => Self::parse_result(args),
            other => Err(ArgsError::UnknownArg(other.to_owned())),
        }
    }

    fn parse_take(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut test_id = None;
        let mut duration_minutes = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--test-id" => test_id = Some(TestId::new(require_value(args, "--test-id")?)),
                "--duration" => duration_minutes = Some(parse_number(args, "--duration")?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self::Take {
            test_id: test_id.ok_or(ArgsError::MissingFlag { flag: "--test-id" })?,
            duration_minutes,
        })
    }

    fn parse_generate(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut subjects = String::new();
        let mut count = None;
        let mut duration_minutes = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--subjects" => subjects = require_value(args, "--subjects")?,
                "--count" => count = Some(parse_number(args, "--count")?),
                "--duration" => duration_minutes = Some(parse_number(args, "--duration")?),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let mut plan = ExamPlan::from_subject_list(&subjects);
        if let Some(count) = count {
            plan = plan.with_question_count(count);
        }
        if let Some(minutes) = duration_minutes {
            plan = plan.with_time_limit_minutes(minutes);
        }
        Ok(Self::Generate { plan })
    }

    fn parse_result(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut test_id = None;
        let mut result_id = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--test-id" => test_id = Some(TestId::new(require_value(args, "--test-id")?)),
                "--result-id" => {
                    result_id = Some(ResultId::new(require_value(args, "--result-id")?));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self::Result {
            test_id: test_id.ok_or(ArgsError::MissingFlag { flag: "--test-id" })?,
            result_id: result_id.ok_or(ArgsError::MissingFlag { flag: "--result-id" })?,
        })
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info,api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let command = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::parse(&first, &mut argv).map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?,
    };

    let config = ApiConfig::from_env()?;
    tracing::info!(base_url = %config.base_url, "using exam API");
    let api = Api::http(&config)?;
    let clock = Clock::default_clock();

    match command {
        Command::Take {
            test_id,
            duration_minutes,
        } => {
            let exams = ExamLoopService::new(clock, Arc::clone(&api.exams));
            let results = ResultService::new(Arc::clone(&api.results));
            runner::take_exam(&exams, &results, test_id, duration_minutes).await
        }
        Command::Generate { plan } => {
            let test_id = ExamPlanService::new(Arc::clone(&api.generation))
                .generate(&plan)
                .await?;
            println!("Generated test {test_id} ({} questions).", plan.question_count());
            println!(
                "Start it with: app take --test-id {test_id} --duration {}",
                plan.time_limit_minutes()
            );
            Ok(())
        }
        Command::Result { test_id, result_id } => {
            let result = ResultService::new(Arc::clone(&api.results))
                .fetch(&test_id, &result_id)
                .await?;
            runner::print_result(&result)?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
