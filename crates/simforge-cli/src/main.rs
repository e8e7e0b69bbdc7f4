//! Simforge CLI - drive the execution core from the command line.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use simforge_core::{LadderRegistry, LogLevel, TaskCategory, TaskRequest, TaskResult};
use simforge_engine::{
    features, AdmissionController, ApexLoop, Blackboard, Orchestrator, RunMode,
    DEFAULT_MAX_WORKERS,
};
use simforge_gateway::{EndpointConfig, GatewayConfig, HttpProviderGateway};

/// Simforge - resilient world-state generation over model providers
#[derive(Parser)]
#[command(name = "simforge")]
#[command(about = "CLI for the Simforge execution core", long_about = None)]
struct Cli {
    /// Endpoint config file (JSON) mapping provider ids to endpoints
    #[arg(short, long)]
    endpoints: Option<PathBuf>,

    /// Maximum concurrently in-flight tasks
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Parallel,
    Serial,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Parallel => RunMode::Parallel,
            ModeArg::Serial => RunMode::Serial,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose a goal and run it through the orchestrator
    Run {
        /// The goal to accomplish
        goal: String,

        /// Shared context forwarded to every sub-task
        #[arg(short, long, default_value = "")]
        context: String,

        /// Sub-task dispatch mode
        #[arg(long, value_enum, default_value = "parallel")]
        mode: ModeArg,
    },

    /// Execute a single task through the Apex Loop
    Exec {
        /// Task category (PHYSICS | REFLEX | MATH | INGEST)
        #[arg(short, long)]
        category: String,

        /// Prompt for the provider
        prompt: String,
    },

    /// Print the configured provider ladders
    Ladders,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let gateway = build_gateway(cli.endpoints.as_deref())?;
    let ladders = LadderRegistry::default_ladders();
    let apex = Arc::new(ApexLoop::new(Arc::new(gateway), ladders));

    let exit = match cli.command {
        Commands::Run {
            goal,
            context,
            mode,
        } => run_goal(apex, cli.max_workers, &goal, &context, mode.into()).await,
        Commands::Exec { category, prompt } => exec_task(&apex, &category, &prompt).await,
        Commands::Ladders => {
            print_ladders(apex.ladders());
            0
        }
    };

    std::process::exit(exit);
}

fn build_gateway(
    path: Option<&std::path::Path>,
) -> Result<HttpProviderGateway, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let config: GatewayConfig = serde_json::from_str(&raw)?;
            info!(endpoints = config.endpoints.len(), "Loaded endpoint config");
            Ok(HttpProviderGateway::from_config(config))
        }
        // Default: a local model server fronting every ladder provider.
        None => Ok(HttpProviderGateway::new()
            .with_endpoint(
                "flash-lite",
                EndpointConfig::new("http://localhost:8080", "flash-lite"),
            )
            .with_endpoint(
                "flash",
                EndpointConfig::new("http://localhost:8080", "flash"),
            )
            .with_endpoint(
                "apex-pro",
                EndpointConfig::new("http://localhost:8080", "apex-pro"),
            )),
    }
}

async fn run_goal(
    apex: Arc<ApexLoop>,
    max_workers: u32,
    goal: &str,
    context: &str,
    mode: RunMode,
) -> i32 {
    let admission = Arc::new(AdmissionController::new(max_workers));
    let blackboard = Arc::new(Blackboard::new());
    let orchestrator = Orchestrator::new(apex, admission, Arc::clone(&blackboard));

    let seen = Arc::new(AtomicUsize::new(0));
    let tail = tokio::spawn(tail_logs(Arc::clone(&blackboard), Arc::clone(&seen)));
    let aggregate = orchestrator.run(goal, context, mode).await;
    tail.abort();

    // Flush any log entries the tail task had not printed yet.
    print_context_tail(&blackboard, &seen).await;

    println!();
    println!(
        "Run {}: {}/{} sub-task(s) succeeded",
        aggregate.run_id,
        aggregate.succeeded,
        aggregate.outcomes.len()
    );
    for outcome in &aggregate.outcomes {
        let status = if outcome.result.success { "ok" } else { "failed" };
        println!(
            "  [{}] {} {} ({} attempt(s))",
            outcome.category,
            status,
            outcome.objective,
            outcome.result.attempts.len()
        );
    }

    if aggregate.success() {
        0
    } else {
        1
    }
}

async fn exec_task(apex: &ApexLoop, category: &str, prompt: &str) -> i32 {
    let Some(category) = TaskCategory::parse(category) else {
        eprintln!("Unknown category '{category}' (expected PHYSICS | REFLEX | MATH | INGEST)");
        return 2;
    };

    let request = TaskRequest::new(category, prompt, features::contract_for(category));
    let result = apex.execute(&request).await;
    print_result(&result);

    if result.success {
        0
    } else {
        1
    }
}

fn print_result(result: &TaskResult) {
    for attempt in &result.attempts {
        println!(
            "  attempt {} -> {:?} ({}ms)",
            attempt.provider_id, attempt.outcome, attempt.duration_ms
        );
    }
    match (&result.output, &result.error) {
        (Some(output), _) => {
            println!(
                "{}",
                serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string())
            );
        }
        (None, Some(error)) => eprintln!("Task failed: {error}"),
        (None, None) => {}
    }
}

fn print_ladders(ladders: &LadderRegistry) {
    for category in TaskCategory::all() {
        let ladder = ladders.resolve(category);
        if ladder.is_empty() {
            continue;
        }
        println!("{category}:");
        for provider in ladder {
            println!(
                "  {} ({:?}, {} attempt(s), {}s timeout)",
                provider.id,
                provider.cost_class,
                provider.max_attempts,
                provider.per_attempt_timeout.as_secs()
            );
        }
    }
}

/// Stream mission log entries to stdout as the blackboard advances.
async fn tail_logs(blackboard: Arc<Blackboard>, seen: Arc<AtomicUsize>) {
    let mut revisions = WatchStream::new(blackboard.subscribe());
    while revisions.next().await.is_some() {
        print_context_tail(&blackboard, &seen).await;
    }
}

async fn print_context_tail(blackboard: &Blackboard, seen: &AtomicUsize) {
    let context = blackboard.context().await;
    for entry in context.mission_logs.iter().skip(seen.load(Ordering::SeqCst)) {
        let level = match entry.level {
            LogLevel::Info => "INFO",
            LogLevel::Success => "OK",
            LogLevel::Warn => "WARN",
            LogLevel::Trap => "TRAP",
        };
        println!(
            "[{}] {:4} {}: {}",
            entry.timestamp.format("%H:%M:%S"),
            level,
            entry.source,
            entry.message
        );
    }
    seen.store(context.mission_logs.len(), Ordering::SeqCst);
}
