//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Default chat completion endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.deepseek.com/chat/completions";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// How entries of `ALL_CHANGED_FILES` are compared with candidate paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// An entry names the file itself: its tree-relative path, or any longer
    /// `/`-bounded suffix of the walked path (e.g. repo-relative)
    #[default]
    Exact,
    /// The raw changed-files string contains the path anywhere
    Substring,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "substring" => Ok(MatchMode::Substring),
            other => Err(format!("unknown match mode '{}'", other)),
        }
    }
}

/// Incremental changeset restricting which files get translated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFiles {
    raw: String,
    entries: Vec<String>,
    mode: MatchMode,
}

impl ChangedFiles {
    /// Parse a whitespace, comma or newline separated list
    pub fn parse(raw: &str, mode: MatchMode) -> Self {
        let entries = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .map(normalize_path)
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            raw: raw.to_string(),
            entries,
            mode,
        }
    }

    /// Whether a candidate is part of the changeset.
    ///
    /// `relative` is the path inside the source tree, `full` the path as
    /// walked (source directory included).
    pub fn contains(&self, relative: &str, full: &str) -> bool {
        let relative = normalize_path(relative);
        let full = normalize_path(full);
        if relative.is_empty() {
            return false;
        }

        match self.mode {
            MatchMode::Substring => {
                self.raw.contains(&relative) || (!full.is_empty() && self.raw.contains(&full))
            }
            // Anchored at the tree root: the entry must cover the whole relative path.
            MatchMode::Exact => self.entries.iter().any(|entry| {
                is_bounded_suffix(&full, entry) && is_bounded_suffix(entry, &relative)
            }),
        }
    }

    /// Parsed entries
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// `needle` equals `haystack` or ends it right after a `/`
fn is_bounded_suffix(haystack: &str, needle: &str) -> bool {
    haystack == needle
        || (haystack.ends_with(needle) && haystack[..haystack.len() - needle.len()].ends_with('/'))
}

/// Forward slashes, no leading `./`
fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

/// Configuration for translator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Bearer token for the chat API
    pub api_key: String,
    /// Chat completions URL
    pub api_endpoint: String,
    /// Model identifier sent with each request
    pub model: String,
    /// Files translated at the same time
    pub max_concurrent: usize,
    /// Retries after the first failed call
    pub max_retries: u32,
    /// Base backoff, multiplied by the attempt number
    pub retry_delay_ms: u64,
    /// Transport timeout per request, 0 disables it
    pub timeout_ms: u64,
    /// Language code of the source trees
    pub source_lang: String,
    /// Changed files list; `None` translates everything
    pub all_changed_files: Option<String>,
    /// How `all_changed_files` entries are matched
    pub changed_files_match: MatchMode,
    /// Ignore `all_changed_files`
    pub force_translate_all: bool,
    /// Languages translated by multi-source runs
    pub target_languages: Vec<String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_concurrent: 10,
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_ms: 300_000,
            source_lang: "zh".to_string(),
            all_changed_files: None,
            changed_files_match: MatchMode::Exact,
            force_translate_all: false,
            target_languages: vec!["en".to_string(), "ja".to_string()],
        }
    }
}

impl TranslatorConfig {
    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> anyhow::Result<Self> {
        Self::default().with_env()
    }

    /// Override fields with whatever is set in the environment
    pub fn with_env(mut self) -> anyhow::Result<Self> {
        if let Some(api_key) = env_var("DEEPSEEK_API_KEY") {
            self.api_key = api_key;
        }

        if let Some(endpoint) = env_var("API_ENDPOINT") {
            self.api_endpoint = endpoint;
        }

        if let Some(model) = env_var("DEEPSEEK_MODEL") {
            self.model = model;
        }

        if let Some(value) = env_var("MAX_CONCURRENT") {
            self.max_concurrent = value
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("MAX_CONCURRENT '{}': {}", value, e))?;
        }

        if let Some(value) = env_var("MAX_RETRIES") {
            self.max_retries = value
                .parse::<u32>()
                .map_err(|e| anyhow::anyhow!("MAX_RETRIES '{}': {}", value, e))?;
        }

        if let Some(value) = env_var("RETRY_DELAY_MS") {
            self.retry_delay_ms = value
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("RETRY_DELAY_MS '{}': {}", value, e))?;
        }

        if let Some(value) = env_var("REQUEST_TIMEOUT_MS") {
            self.timeout_ms = value
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("REQUEST_TIMEOUT_MS '{}': {}", value, e))?;
        }

        if let Some(source_lang) = env_var("SOURCE_LANG") {
            self.source_lang = source_lang;
        }

        if let Some(changed) = env_var("ALL_CHANGED_FILES") {
            self.all_changed_files = Some(changed);
        }

        if let Some(value) = env_var("CHANGED_FILES_MATCH") {
            self.changed_files_match = value.parse().map_err(anyhow::Error::msg)?;
        }

        if let Some(value) = env_var("FORCE_TRANSLATE_ALL") {
            self.force_translate_all = value.trim() == "true";
        }

        if let Some(value) = env_var("TARGET_LANGUAGES") {
            self.target_languages = parse_languages(&value);
        }

        Ok(self)
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow::anyhow!("DEEPSEEK_API_KEY is required"));
        }

        if self.api_endpoint.is_empty() {
            return Err(anyhow::anyhow!("API endpoint is required"));
        }

        if self.max_concurrent == 0 {
            return Err(anyhow::anyhow!("max_concurrent must be greater than 0"));
        }

        if self.target_languages.is_empty() {
            return Err(anyhow::anyhow!("At least one target language is required"));
        }

        if self.source_lang.is_empty() {
            return Err(anyhow::anyhow!("Source language is required"));
        }

        if self.force_translate_all && self.all_changed_files.is_some() {
            warn!("FORCE_TRANSLATE_ALL is set, ignoring the changed files list");
        }

        Ok(())
    }

    /// Changeset filter, if one is configured
    pub fn changed_files(&self) -> Option<ChangedFiles> {
        self.all_changed_files
            .as_deref()
            .map(|raw| ChangedFiles::parse(raw, self.changed_files_match))
    }
}

/// Split a comma separated language list, dropping blanks and duplicates
pub fn parse_languages(value: &str) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for code in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !languages.iter().any(|l| l == code) {
            languages.push(code.to_string());
        }
    }
    languages
}

/// Non-empty environment variable
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
