//! Single-file translation

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::core::client::AsyncTranslator;
use crate::core::config::{ChangedFiles, TranslatorConfig};
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{LanguageConfig, TranslationResult};

/// Extensions picked up from a source tree
const TRANSLATABLE_EXTENSIONS: &[&str] = &["md", "ts"];

/// Translates one file at a time and writes it to its mirror location
#[derive(Debug, Clone)]
pub struct FileProcessor {
    translator: AsyncTranslator,
    changed_files: Option<ChangedFiles>,
    force_translate_all: bool,
}

impl FileProcessor {
    /// Create a new file processor
    pub fn new(translator: AsyncTranslator, config: &TranslatorConfig) -> Self {
        Self {
            translator,
            changed_files: config.changed_files(),
            force_translate_all: config.force_translate_all,
        }
    }

    /// Find translatable files recursively, sorted for stable ordering
    pub fn find_candidates(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(TranslationError::FileError {
                path: dir.display().to_string(),
                message: "Not a directory".to_string(),
            });
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| TranslationError::file(dir, e))?;
            let path = entry.path();
            if entry.file_type().is_file() && is_translatable_file(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Whether a file should be sent for translation in this run.
    ///
    /// `relative_path` is the path inside the source tree, `full_path` the
    /// path as discovered; the changed-files list may name either.
    pub fn should_translate_file(&self, relative_path: &str, full_path: &str) -> bool {
        if self.force_translate_all {
            return true;
        }

        match &self.changed_files {
            Some(changed) => changed.contains(relative_path, full_path),
            None => true,
        }
    }

    /// Translate `src` into `dest`. Never fails: errors become a failed result.
    pub async fn process_file(
        &self,
        src: &Path,
        dest: &Path,
        lang: &LanguageConfig,
        file_index: usize,
        total_files: usize,
    ) -> TranslationResult {
        match self.translate_file(src, dest, lang).await {
            Ok(duration) => {
                info!(
                    "[{}/{}] {} {} ({:.1}s)",
                    file_index,
                    total_files,
                    lang.name,
                    display_name(src),
                    duration.as_secs_f64()
                );
                TranslationResult::succeeded(src, duration)
            }
            Err(e) => {
                error!(
                    "[{}/{}] {} {} failed: {}",
                    file_index,
                    total_files,
                    lang.name,
                    display_name(src),
                    e
                );
                TranslationResult::failed(src, e)
            }
        }
    }

    async fn translate_file(&self, src: &Path, dest: &Path, lang: &LanguageConfig) -> Result<Duration> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TranslationError::file(parent, e))?;
        }

        let content = tokio::fs::read_to_string(src)
            .await
            .map_err(|e| TranslationError::file(src, e))?;

        let start = Instant::now();
        let translated = if content.trim().is_empty() {
            debug!("Empty source, copying as-is: {}", src.display());
            content
        } else {
            self.translator
                .translate_with_retry(&content, lang.prompt_for(src))
                .await?
        };
        let duration = start.elapsed();

        let output = lang.path_replace.apply(&translated);

        tokio::fs::write(dest, output)
            .await
            .map_err(|e| TranslationError::file(dest, e))?;

        debug!("Translated: {} -> {}", src.display(), dest.display());
        Ok(duration)
    }
}

/// Check if the file is one we translate
pub fn is_translatable_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            TRANSLATABLE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
