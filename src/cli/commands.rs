//! CLI command definitions and handlers

use anyhow::Context;
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::info;

use crate::core::config::{parse_languages, TranslatorConfig};
use crate::core::languages::LanguageRegistry;
use crate::processors::service::TranslationService;
use crate::utils::report;

/// Source trees translated when none are given
const DEFAULT_SOURCES: [&str; 2] = ["docs/zh", ".vitepress/src/zh"];

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// API key (defaults to DEEPSEEK_API_KEY env var)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Maximum concurrent requests (defaults to MAX_CONCURRENT or 10)
    #[arg(long, global = true)]
    pub max_concurrent: Option<usize>,

    /// JSON configuration file applied before environment variables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Commands for the documentation translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate source trees, honoring ALL_CHANGED_FILES, FORCE_TRANSLATE_ALL and TARGET_LANGUAGES
    Translate {
        /// Source directory (repeatable, default: docs/zh and .vitepress/src/zh)
        #[arg(short, long = "source", default_values = DEFAULT_SOURCES)]
        sources: Vec<PathBuf>,

        /// Comma separated target languages, overrides TARGET_LANGUAGES
        #[arg(short, long)]
        languages: Option<String>,

        /// Translate every file, ignoring the changed files list
        #[arg(long)]
        force: bool,

        /// JSON file with extra language definitions
        #[arg(long)]
        languages_file: Option<PathBuf>,

        /// Write run statistics as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Translate everything into English and Japanese
    Basic {
        /// Source directory (repeatable, default: docs/zh and .vitepress/src/zh)
        #[arg(short, long = "source", default_values = DEFAULT_SOURCES)]
        sources: Vec<PathBuf>,

        /// Only translate into English
        #[arg(long)]
        english_only: bool,

        /// Write run statistics as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List supported target languages
    Languages {
        /// JSON file with extra language definitions
        #[arg(long)]
        languages_file: Option<PathBuf>,
    },
}

/// Build configuration: file, then environment, then CLI flags
pub fn load_config(global: &GlobalOptions) -> anyhow::Result<TranslatorConfig> {
    let base = match &global.config {
        Some(path) => TranslatorConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => TranslatorConfig::default(),
    };

    let mut config = base.with_env()?;

    if let Some(api_key) = &global.api_key {
        config.api_key = api_key.clone();
    }
    if let Some(max_concurrent) = global.max_concurrent {
        config.max_concurrent = max_concurrent;
    }

    Ok(config)
}

/// Default registry plus any languages from `languages_file`
pub fn load_registry(source_lang: &str, languages_file: Option<&Path>) -> anyhow::Result<LanguageRegistry> {
    let mut registry = LanguageRegistry::with_defaults(source_lang);
    if let Some(path) = languages_file {
        registry
            .load_file(path)
            .with_context(|| format!("Failed to load languages from {}", path.display()))?;
    }
    Ok(registry)
}

/// Reject configurations that must stop the run before any work
pub fn check_languages(config: &TranslatorConfig, registry: &LanguageRegistry) -> anyhow::Result<()> {
    let unsupported: Vec<&str> = config
        .target_languages
        .iter()
        .map(String::as_str)
        .filter(|code| registry.get_config(code).is_none())
        .collect();

    if !unsupported.is_empty() {
        anyhow::bail!(
            "Unsupported language(s): {} (supported: {})",
            unsupported.join(", "),
            registry.supported_languages().join(", ")
        );
    }
    Ok(())
}

/// Handle the environment-driven translate command
pub async fn handle_translate(
    global: &GlobalOptions,
    sources: Vec<PathBuf>,
    languages: Option<String>,
    force: bool,
    languages_file: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let mut config = load_config(global)?;

    if let Some(languages) = languages {
        config.target_languages = parse_languages(&languages);
    }
    if force {
        config.force_translate_all = true;
    }

    let registry = load_registry(&config.source_lang, languages_file.as_deref())?;

    info!(
        "Mode: {}",
        if config.force_translate_all {
            "full translation"
        } else if config.all_changed_files.is_some() {
            "incremental (changed files only)"
        } else {
            "full translation (no changed files list)"
        }
    );

    run(config, registry, &sources, report_path.as_deref()).await
}

/// Handle the basic command: full translation into fixed languages
pub async fn handle_basic(
    global: &GlobalOptions,
    sources: Vec<PathBuf>,
    english_only: bool,
    report_path: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let mut config = load_config(global)?;

    config.target_languages = if english_only {
        vec!["en".to_string()]
    } else {
        vec!["en".to_string(), "ja".to_string()]
    };
    config.force_translate_all = true;
    config.all_changed_files = None;

    let registry = load_registry(&config.source_lang, None)?;
    run(config, registry, &sources, report_path.as_deref()).await
}

/// Handle the languages command
pub fn handle_languages(global: &GlobalOptions, languages_file: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let config = load_config(global)?;
    let registry = load_registry(&config.source_lang, languages_file.as_deref())?;

    for code in registry.supported_languages() {
        if let Some(lang) = registry.get_config(code) {
            println!("{:<6} {}", code, lang.name);
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run(
    config: TranslatorConfig,
    registry: LanguageRegistry,
    sources: &[PathBuf],
    report_path: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    config.validate()?;
    check_languages(&config, &registry)?;

    info!("Starting translation");
    info!("Sources: {:?}", sources);
    info!("Target languages: {}", config.target_languages.join(", "));
    info!("Max concurrent: {}", config.max_concurrent);

    let start_time = Instant::now();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} files done {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let service = TranslationService::new(config, registry)?.with_progress(pb.clone());
    let stats = service.translate_multiple_sources(sources).await;

    pb.finish_and_clear();

    let summary = report::print_summary(&stats, start_time.elapsed());

    if let Some(path) = report_path {
        report::write_report(path, &stats)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("📝 Report saved to: {}", path.display());
    }

    Ok(ExitCode::from(summary.exit_code()))
}
