//! Fit a JSON chat transcript into a token budget and print the messages
//! that would be sent.
//!
//! # Examples
//!
//! ```sh
//! # Budget a transcript for a 128k context window with 4k reserved for output
//! echo '{"max_tokens": 128000, "output_reserve": 4096}' > budget.json
//! cctk --transcript session.json --config budget.json --report
//!
//! # Explicit budget, default abbreviations for long messages, pretty output
//! cctk --transcript session.json --budget 8000 --high-priority 2000 \
//!   --abbreviate --pretty
//!
//! # Show per-message decisions
//! RUST_LOG=chat_context_toolkit=trace cctk --transcript session.json --budget 500
//! ```

use chat_context_toolkit::history::abbreviation::abbreviate_history;
use chat_context_toolkit::history::{
    AbbreviationConfig, CharTokenCounter, DEFAULT_CHARS_PER_TOKEN, HistoryBudget,
    InMemoryProvider, apply_budget,
};
use chat_context_toolkit::{HistoryError, transcript};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Fit a JSON chat transcript into a token budget.
///
/// Prints the surviving messages as a JSON array on stdout.
#[derive(Parser)]
#[command(name = "cctk")]
struct Cli {
    // ── Input ──────────────────────────────────────────────────
    /// Path to a JSON transcript (array of messages)
    #[arg(long)]
    transcript: PathBuf,

    /// Path to a JSON budget configuration
    #[arg(long)]
    config: Option<PathBuf>,

    // ── Budget ─────────────────────────────────────────────────
    /// History token budget (overrides the configured effective budget)
    #[arg(long)]
    budget: Option<usize>,

    /// Tokens reserved for the most recent messages
    #[arg(long)]
    high_priority: Option<usize>,

    /// Characters per token for the token estimate
    #[arg(long, default_value_t = DEFAULT_CHARS_PER_TOKEN)]
    chars_per_token: f64,

    /// Fill in default abbreviations for messages that have none
    #[arg(long)]
    abbreviate: bool,

    // ── Output ─────────────────────────────────────────────────
    /// Print the budget report and usage to stderr
    #[arg(long)]
    report: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log budgeting decisions at debug level
    #[arg(short, long)]
    verbose: bool,
}

// ── Helpers ────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Resolve the budget configuration from the config file and CLI overrides.
fn resolve_budget(cli: &Cli) -> Result<HistoryBudget, HistoryError> {
    let mut budget = match &cli.config {
        Some(path) => HistoryBudget::from_json_file(path)?,
        None => HistoryBudget::default(),
    };
    if let Some(tokens) = cli.high_priority {
        budget = budget.with_high_priority_tokens(tokens);
    }
    Ok(budget)
}

async fn run(cli: &Cli) -> Result<String, HistoryError> {
    let budget = resolve_budget(cli)?;
    let token_budget = cli.budget.unwrap_or_else(|| budget.effective_max_tokens());
    let counter = CharTokenCounter::with_ratio(cli.chars_per_token);

    let mut messages = transcript::load_transcript(&cli.transcript)?;
    if cli.abbreviate {
        messages = abbreviate_history(messages, &AbbreviationConfig::default());
    }
    let provider = InMemoryProvider::new(messages);

    let mut turn = budget.new_turn();
    debug!(
        "cctk: budgeting {} messages into {token_budget} tokens ({} high priority)",
        provider.len(),
        turn.high_priority_token_count()
    );
    let result = apply_budget(&mut turn, token_budget, &counter, &provider).await?;

    if cli.report {
        eprintln!("{}", result.report.to_log_string());
        eprintln!("{}", budget.usage(&result.messages, &counter).to_log_string());
    }

    let json = if cli.pretty {
        serde_json::to_string_pretty(&result.messages)?
    } else {
        serde_json::to_string(&result.messages)?
    };
    Ok(json)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
