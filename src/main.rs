//! Main entry point for the documentation translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docs_translator::cli::commands::{self, Commands, GlobalOptions};

/// Concurrent AI translator for documentation source trees
#[derive(Parser, Debug)]
#[command(name = "docs-translator", version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    global: GlobalOptions,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("docs_translator={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Execute command
    match args.command {
        Some(Commands::Translate {
            sources,
            languages,
            force,
            languages_file,
            report,
        }) => {
            commands::handle_translate(&args.global, sources, languages, force, languages_file, report).await
        }
        Some(Commands::Basic {
            sources,
            english_only,
            report,
        }) => commands::handle_basic(&args.global, sources, english_only, report).await,
        Some(Commands::Languages { languages_file }) => {
            commands::handle_languages(&args.global, languages_file)
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
            Ok(ExitCode::SUCCESS)
        }
    }
}
