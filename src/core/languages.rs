//! Registry of target languages

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::LanguageConfig;

/// Languages registered out of the box: (code, display name)
const DEFAULT_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("ru", "Russian"),
];

/// Language code to [`LanguageConfig`] lookup.
///
/// Built once at startup and shared read-only afterwards. `add_language`
/// takes `&mut self`, so registration can only happen before the registry
/// is handed to a service.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    entries: Vec<(String, Arc<LanguageConfig>)>,
}

impl LanguageRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in languages, translating from `source_code`
    pub fn with_defaults(source_code: &str) -> Self {
        let mut registry = Self::new();
        for (code, name) in DEFAULT_LANGUAGES {
            registry.add_language(*code, LanguageConfig::standard(name, code, source_code));
        }
        registry
    }

    /// Look up a language; `None` when the code is not registered
    pub fn get_config(&self, code: &str) -> Option<Arc<LanguageConfig>> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, config)| Arc::clone(config))
    }

    /// Registered codes in registration order
    pub fn supported_languages(&self) -> Vec<&str> {
        self.entries.iter().map(|(code, _)| code.as_str()).collect()
    }

    /// Register a language, replacing any existing entry in place
    pub fn add_language(&mut self, code: impl Into<String>, config: LanguageConfig) {
        let code = code.into();
        let config = Arc::new(config);

        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => {
                debug!("Overriding language config: {}", code);
                entry.1 = config;
            }
            None => self.entries.push((code, config)),
        }
    }

    /// Register every language from a JSON file of `code -> LanguageConfig`
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TranslationError::file(path, e))?;
        let extra: HashMap<String, LanguageConfig> = serde_json::from_str(&content)?;

        let mut codes: Vec<_> = extra.into_iter().collect();
        codes.sort_by(|a, b| a.0.cmp(&b.0));

        let count = codes.len();
        for (code, config) in codes {
            self.add_language(code, config);
        }

        info!("Loaded {} language(s) from {}", count, path.display());
        Ok(count)
    }

    /// Number of registered languages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
