//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// System prompts for the two kinds of content we translate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPrompt {
    /// Prompt for documentation (Markdown) files
    pub markdown: String,
    /// Prompt for source files (`.ts`, `.js`)
    pub code: String,
}

/// Literal path prefix rewrite applied to translated output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathReplace {
    /// Prefix as it appears in the source language
    pub from: String,
    /// Prefix for the target language
    pub to: String,
}

impl PathReplace {
    /// Rewrite every literal occurrence of `from` into `to`
    pub fn apply(&self, text: &str) -> String {
        if self.from.is_empty() {
            return text.to_string();
        }
        text.replace(&self.from, &self.to)
    }
}

/// Per-language translation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Display name, also used inside prompts
    pub name: String,
    /// Prompts sent along with the file content
    #[serde(rename = "systemPrompt", alias = "system_prompt")]
    pub system_prompt: SystemPrompt,
    /// Link prefix rewrite applied after translation
    #[serde(rename = "pathReplace", alias = "path_replace")]
    pub path_replace: PathReplace,
}

impl LanguageConfig {
    /// Standard config for a language translated from `source_code`
    pub fn standard(name: &str, code: &str, source_code: &str) -> Self {
        Self {
            name: name.to_string(),
            system_prompt: SystemPrompt {
                markdown: format!(
                    "You are a professional technical translator. Translate the following \
                     Markdown documentation into {name}. Keep all Markdown syntax, front matter \
                     keys, HTML tags, code blocks, inline code and link targets unchanged; \
                     translate only human-readable text. Output only the translated document \
                     without any explanation."
                ),
                code: format!(
                    "You are a professional technical translator. The following is a \
                     TypeScript/JavaScript source file. Translate only the natural-language \
                     strings and comments into {name}. Do not change identifiers, imports, \
                     keys, paths or code structure. Output only the resulting code without \
                     Markdown fences or explanation."
                ),
            },
            path_replace: PathReplace {
                from: format!("/{source_code}/"),
                to: format!("/{code}/"),
            },
        }
    }

    /// Pick the prompt matching the file extension
    pub fn prompt_for(&self, path: &Path) -> &str {
        if is_code_file(path) {
            &self.system_prompt.code
        } else {
            &self.system_prompt.markdown
        }
    }
}

/// Whether `path` is a source-code file rather than documentation
pub fn is_code_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "ts" || ext == "js"
        })
        .unwrap_or(false)
}

/// Outcome of translating one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Source file
    pub file: PathBuf,
    /// Whether the translated file was written
    pub success: bool,
    /// Present iff `success`
    pub duration: Option<Duration>,
    /// Present iff not `success`
    pub error: Option<String>,
}

impl TranslationResult {
    /// Successful result taking `duration`
    pub fn succeeded(file: impl Into<PathBuf>, duration: Duration) -> Self {
        Self {
            file: file.into(),
            success: true,
            duration: Some(duration),
            error: None,
        }
    }

    /// Failed result carrying the error message
    pub fn failed(file: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self {
            file: file.into(),
            success: false,
            duration: None,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregate outcome of one (source tree, language) pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Source tree of this pass
    pub source_dir: PathBuf,
    /// Target language code
    pub target_lang: String,
    /// No file failed and the pass was able to start
    pub success: bool,
    /// Files written
    pub translated: usize,
    /// Candidates left out by the changed-files filter
    pub skipped: usize,
    /// Files that failed
    pub errors: usize,
    /// Wall clock for the whole batch
    #[serde(with = "duration_secs")]
    pub total_duration: Option<Duration>,
    /// Mean over successful files
    #[serde(with = "duration_secs")]
    pub avg_duration: Option<Duration>,
    /// When the pass ended
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl TranslationStats {
    /// Pass that never started
    pub fn failed(source_dir: impl Into<PathBuf>, target_lang: &str) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_lang: target_lang.to_string(),
            success: false,
            translated: 0,
            skipped: 0,
            errors: 0,
            total_duration: None,
            avg_duration: None,
            finished_at: chrono::Utc::now(),
        }
    }

    /// Pass where nothing needed translating
    pub fn nothing_to_do(source_dir: impl Into<PathBuf>, target_lang: &str, skipped: usize) -> Self {
        Self {
            success: true,
            skipped,
            ..Self::failed(source_dir, target_lang)
        }
    }

    /// Fold per-file results into a pass summary
    pub fn from_results(
        source_dir: impl Into<PathBuf>,
        target_lang: &str,
        results: &[TranslationResult],
        skipped: usize,
        wall_clock: Duration,
    ) -> Self {
        let durations: Vec<Duration> = results.iter().filter_map(|r| r.duration).collect();
        let translated = results.iter().filter(|r| r.success).count();
        let errors = results.len() - translated;

        let avg_duration = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<Duration>() / durations.len() as u32)
        };

        Self {
            source_dir: source_dir.into(),
            target_lang: target_lang.to_string(),
            success: errors == 0,
            translated,
            skipped,
            errors,
            total_duration: Some(wall_clock),
            avg_duration,
            finished_at: chrono::Utc::now(),
        }
    }

    /// Candidate files accounted for by this pass
    pub fn total(&self) -> usize {
        self.translated + self.skipped + self.errors
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs.filter(|s| s.is_finite() && *s >= 0.0).map(Duration::from_secs_f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_replace_rewrites_every_occurrence() {
        let replace = PathReplace {
            from: "/zh/".to_string(),
            to: "/en/".to_string(),
        };

        for k in 0..5 {
            let text = "see [page](/zh/guide) ".repeat(k);
            let out = replace.apply(&text);
            assert_eq!(out.matches("/en/").count(), k);
            assert_eq!(out.matches("/zh/").count(), 0);
        }
    }

    #[test]
    fn test_path_replace_is_literal() {
        let replace = PathReplace {
            from: "/z.h/".to_string(),
            to: "/$1en/".to_string(),
        };

        assert_eq!(replace.apply("/zxh/ /z.h/"), "/zxh/ /$1en/");
    }

    #[test]
    fn test_path_replace_empty_from_is_noop() {
        let replace = PathReplace {
            from: String::new(),
            to: "/en/".to_string(),
        };

        assert_eq!(replace.apply("/zh/a"), "/zh/a");
    }

    #[test]
    fn test_prompt_selection_by_extension() {
        let config = LanguageConfig::standard("English", "en", "zh");

        assert_eq!(config.prompt_for(Path::new("nav.ts")), config.system_prompt.code);
        assert_eq!(config.prompt_for(Path::new("util.JS")), config.system_prompt.code);
        assert_eq!(config.prompt_for(Path::new("index.md")), config.system_prompt.markdown);
        assert_eq!(config.prompt_for(Path::new("README")), config.system_prompt.markdown);
    }

    #[test]
    fn test_stats_from_results() {
        let results = vec![
            TranslationResult::succeeded("a.md", Duration::from_secs(2)),
            TranslationResult::succeeded("b.md", Duration::from_secs(4)),
            TranslationResult::failed("c.md", "boom"),
        ];

        let stats = TranslationStats::from_results("docs/zh", "en", &results, 1, Duration::from_secs(5));

        assert!(!stats.success);
        assert_eq!(stats.translated, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.avg_duration, Some(Duration::from_secs(3)));
        assert_eq!(stats.total_duration, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_stats_serialize_durations_as_seconds() {
        let stats = TranslationStats::from_results(
            "docs/zh",
            "ja",
            &[TranslationResult::succeeded("a.md", Duration::from_millis(1500))],
            0,
            Duration::from_millis(1500),
        );

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["avg_duration"], 1.5);
        assert_eq!(json["target_lang"], "ja");
    }
}
