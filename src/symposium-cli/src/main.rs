//! Symposium CLI - multi-persona research-idea generation.
//!
//! Runs the full pipeline for a single research query, or a batch experiment
//! over a queries file, against OpenAI-compatible APIs.

use clap::Parser;
use colored::Colorize;
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use symposium_core::{
    ChatAgents, Config, DebateEvent, ExperimentPreset, HttpEmbedder, LlmJudge, Pipeline,
    SemanticScholarClient, default_config,
    experiment::ExperimentDriver,
    retrieval::NoRetrieval,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "symposium",
    version,
    about = "Multi-persona research-idea generation",
    long_about = "Runs a multi-round debate of LLM personas over a research query, \
                  deduplicates the resulting ideas, and evaluates them with tournament \
                  ranking and novelty metrics."
)]
struct Cli {
    /// The research query to explore
    #[arg(value_name = "QUERY", required_unless_present = "experiment")]
    query: Option<String>,

    /// Mode preset to run with
    #[arg(long, default_value = "Full_System", value_name = "PRESET")]
    preset: String,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for persisted result records
    #[arg(long, default_value = "results", value_name = "DIR")]
    results_dir: PathBuf,

    /// Run a batch experiment over a JSON queries file instead of one query
    #[arg(long, value_name = "QUERIES_FILE")]
    experiment: Option<PathBuf>,

    /// Override the chat model name
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };
    if let Some(model) = &cli.model {
        config.models.chat_model = model.clone();
        config.models.judge_model = model.clone();
    }

    let preset = ExperimentPreset::by_name(&cli.preset).ok_or_else(|| {
        format!(
            "Unknown preset: '{}'. Available presets: {}",
            cli.preset,
            ExperimentPreset::standard_set()
                .iter()
                .map(|p| p.name.clone())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    // API configuration from the environment
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });
    let embeddings_base =
        env::var("EMBEDDINGS_API_BASE").unwrap_or_else(|_| api_base.clone());
    let s2_api_key = env::var("S2_API_KEY").ok();

    let agents = ChatAgents::new(&api_base, &api_key, &config.models.chat_model);
    let embedder = HttpEmbedder::new(
        &embeddings_base,
        Some(api_key.clone()),
        &config.models.embedding_model,
    );
    let search = SemanticScholarClient::new(s2_api_key);

    let pipeline = Pipeline::new(
        &agents,
        &agents,
        &search,
        &embedder,
        &NoRetrieval,
        &config,
        &cli.results_dir,
    );

    if let Some(queries_file) = &cli.experiment {
        let content = std::fs::read_to_string(queries_file)?;
        let parsed: Value = serde_json::from_str(&content)?;
        let queries: Vec<String> = parsed["queries"]
            .as_array()
            .ok_or("queries file must contain a top-level \"queries\" array")?
            .iter()
            .filter_map(|q| q.as_str().map(str::to_string))
            .collect();
        println!("Loaded {} test queries.", queries.len());

        let judge_agents = ChatAgents::new(&api_base, &api_key, &config.models.judge_model);
        let judge = LlmJudge::new(&judge_agents);
        let summary_path = cli
            .results_dir
            .join("experiment_summaries")
            .join("live_summary.json");
        let driver = ExperimentDriver::new(
            &pipeline,
            &agents,
            &judge,
            &embedder,
            &config,
            &summary_path,
        );
        let results = driver
            .run(&queries, &ExperimentPreset::standard_set())
            .await?;

        println!();
        println!("{}", "═".repeat(70).bright_blue());
        println!("{}", "  Experiment summary".bright_blue().bold());
        println!("{}", "═".repeat(70).bright_blue());
        for (name, preset_summary) in &results.summary {
            println!(
                "\n{} ({} successful runs)",
                name.bright_cyan().bold(),
                preset_summary.num_successful_runs
            );
            println!("  Average Precision@3:  {:.4}", preset_summary.avg_precision_at_3);
            println!("  Average Precision@5:  {:.4}", preset_summary.avg_precision_at_5);
            println!("  Average Precision@10: {:.4}", preset_summary.avg_precision_at_10);
            println!("  Average Precision@20: {:.4}", preset_summary.avg_precision_at_20);
            for (key, value) in &preset_summary.avg_novelty_scores {
                println!("  {key}: {value:.4}");
            }
        }
        println!("\nSummary saved to: {}", summary_path.display());
        return Ok(());
    }

    let Some(query) = cli.query else {
        return Err("a query is required unless --experiment is given".into());
    };

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - {}", "Symposium".bold(), preset.name)
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Query:".bold(), query.bright_white());
    println!("{}", "─".repeat(70).dimmed());

    let output = pipeline
        .run_query(&query, &preset.modes, Some(create_console_callback()))
        .await;

    match output {
        Some(output) => {
            println!();
            println!("{}", "═".repeat(70).bright_green());
            println!(
                "{}",
                format!(
                    "  {} ideas survived deduplication (of {})",
                    output.state.final_deduplicated_ideas.len(),
                    output.state.final_ideas.len()
                )
                .bright_green()
                .bold()
            );
            println!("{}", "═".repeat(70).bright_green());
            for (i, idea) in output.state.final_deduplicated_ideas.iter().enumerate() {
                println!();
                println!("{} {}", format!("{}.", i + 1).bold(), idea.title.bright_cyan().bold());
                println!("   {}", idea.description);
                println!("   {}", idea.reasoning.dimmed());
            }
            println!();
            println!(
                "State saved for timestamp: {}",
                output.run_timestamp.bright_white()
            );
            Ok(())
        }
        None => {
            eprintln!(
                "{} Pipeline run failed; see the log for the failing stage.",
                "Error:".red().bold()
            );
            std::process::exit(1);
        }
    }
}

/// Create a callback that prints debate progress to the console.
fn create_console_callback() -> symposium_core::DebateCallback {
    Box::new(move |event| match event {
        DebateEvent::PoolGenerated { count } => {
            println!(
                "{} Generated a pool of {} personas.",
                "▶".bright_magenta(),
                count
            );
        }
        DebateEvent::TeamSelected { names } => {
            println!(
                "{} Selected team: {}",
                "▶".bright_magenta(),
                names.join(", ").bright_cyan()
            );
        }
        DebateEvent::RoundStarted { round } => {
            println!();
            println!(
                "{}",
                format!("  Round {round}").bright_magenta().bold()
            );
            println!("{}", "─".repeat(70).dimmed());
        }
        DebateEvent::PersonaContributed { name, idea_count } => {
            println!(
                "  {} {} proposed {} ideas",
                "▶".bright_cyan(),
                name.bright_cyan(),
                idea_count
            );
        }
        DebateEvent::CritiqueComplete => {
            println!("  {} critic's analysis complete", "⚖".yellow());
        }
        DebateEvent::RoundSummarized { round } => {
            println!("  {} round {} summarized", "✎".dimmed(), round);
        }
        DebateEvent::SynthesisComplete { idea_count } => {
            println!();
            println!(
                "{} Synthesis complete: {} final ideas.",
                "▶".bright_green(),
                idea_count
            );
        }
        DebateEvent::AbstractGenerated { index, total, title } => {
            println!(
                "  {} abstract {}/{}: {}",
                "✎".dimmed(),
                index,
                total,
                title
            );
        }
    })
}
