//! MCQ CLI - Command-line interface
//!
//! Usage:
//!   mcq generate --file notes.txt --format json
//!   mcq generate --text "Paris is the capital of France." --seed 7
//!   cat notes.txt | mcq generate
//!   mcq status
//!
//! Author: hephaex@gmail.com

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use mcq_core::{
    AppConfig, ChunkParams, ErrorPayload, GenerationConfig, LoggingConfig, McqError, Result,
};
use mcq_generator::{render_json, render_text, McqPipeline, ModelServices, RandomSource};
use mcq_parser::ParserRegistry;

#[derive(Parser)]
#[command(name = "mcq")]
#[command(about = "Multiple-choice question generator")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate questions from a text file, inline text or stdin
    Generate {
        /// Text file to read
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Inline text
        #[arg(long)]
        text: Option<String>,

        /// Words per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Words shared by consecutive chunks
        #[arg(long)]
        overlap: Option<usize>,

        /// Questions per chunk
        #[arg(long)]
        questions_per_chunk: Option<usize>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Abort the run after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the full run report (records and skips) as JSON
        #[arg(long)]
        report: bool,
    },
    /// Show provider settings and resource availability
    Status,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("{}", e);
            let payload = ErrorPayload::from(&e);
            eprintln!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Generate {
            file,
            text,
            chunk_size,
            overlap,
            questions_per_chunk,
            format,
            seed,
            timeout_secs,
            report,
        } => {
            let params = chunk_params(&config.generation, chunk_size, overlap, questions_per_chunk)?;
            let input = read_input(file.as_deref(), text)?;
            let services = ModelServices::from_config(&config)?;
            let random = seed.map_or_else(RandomSource::from_entropy, RandomSource::seeded);
            let pipeline = McqPipeline::with_random_source(services, &config, random);

            let run_report = match timeout_secs.or(config.generation.run_timeout_secs) {
                Some(secs) => {
                    pipeline
                        .generate_with_timeout(&input, params, Duration::from_secs(secs))
                        .await?
                }
                None => pipeline.generate_report(&input, params).await?,
            };

            if !run_report.skips.is_empty() {
                tracing::info!(
                    skipped = run_report.skips.len(),
                    "Some keywords produced no question"
                );
            }

            if report {
                let json = serde_json::to_string_pretty(&run_report)
                    .map_err(|e| McqError::Other(e.into()))?;
                println!("{json}");
            } else {
                match format {
                    OutputFormat::Json => println!("{}", render_json(&run_report.mcqs)?),
                    OutputFormat::Text => print!("{}", render_text(&run_report.mcqs)),
                }
            }
        }
        Commands::Status => print_status(&config)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// Flags over config values, checked before any model is built
fn chunk_params(
    generation: &GenerationConfig,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
    questions_per_chunk: Option<usize>,
) -> Result<ChunkParams> {
    let params = ChunkParams::new(
        chunk_size.unwrap_or(generation.chunk_size),
        overlap.unwrap_or(generation.chunk_overlap),
        questions_per_chunk.unwrap_or(generation.questions_per_chunk),
    );
    params.validate()?;
    Ok(params)
}

/// Logs go to stderr so stdout carries only the questions
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Inline text, else the file, else stdin
fn read_input(file: Option<&Path>, text: Option<String>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }

    if let Some(path) = file {
        let document = ParserRegistry::with_defaults().parse(path)?;
        tracing::info!(
            path = %document.file_path,
            chars = document.char_count(),
            words = document.word_count(),
            "Document loaded"
        );
        return Ok(document.content);
    }

    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn print_status(config: &AppConfig) -> Result<()> {
    println!("Provider:        {:?}", config.llm.provider);
    println!("Model:           {}", config.llm.model);
    println!("Embedding model: {}", config.llm.embedding_model);
    println!(
        "OpenAI key:      {}",
        if config.llm.openai_api_key.is_some() { "set" } else { "not set" }
    );

    let configured = config.resources.configured();
    let missing = config.resources.missing();
    if configured.is_empty() {
        println!("Resources:       none configured (built-in stopwords only)");
    } else {
        println!("Resources:");
        for path in configured {
            let state = if missing.contains(path) { "missing" } else { "ok" };
            println!("  [{state:^7}] {}", path.display());
        }
    }

    if config.resources.required && !missing.is_empty() {
        return Err(McqError::MissingResource(
            missing.iter().map(|p| p.display().to_string()).collect(),
        ));
    }
    Ok(())
}
