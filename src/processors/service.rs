//! Source tree translation across languages

use indicatif::ProgressBar;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::core::client::AsyncTranslator;
use crate::core::config::TranslatorConfig;
use crate::core::controller::ConcurrencyController;
use crate::core::errors::Result;
use crate::core::languages::LanguageRegistry;
use crate::core::models::{TranslationResult, TranslationStats};
use crate::processors::file::FileProcessor;

/// Orchestrates translating whole source trees into target languages.
///
/// One [`ConcurrencyController`] is shared by every pass this service runs.
#[derive(Debug, Clone)]
pub struct TranslationService {
    config: Arc<TranslatorConfig>,
    registry: Arc<LanguageRegistry>,
    processor: Arc<FileProcessor>,
    controller: ConcurrencyController,
    progress: Option<ProgressBar>,
}

impl TranslationService {
    /// Create a service talking to the configured HTTP endpoint
    pub fn new(config: TranslatorConfig, registry: LanguageRegistry) -> Result<Self> {
        let translator = AsyncTranslator::new(&config)?;
        Ok(Self::with_translator(config, registry, translator))
    }

    /// Create a service over an existing translator
    pub fn with_translator(
        config: TranslatorConfig,
        registry: LanguageRegistry,
        translator: AsyncTranslator,
    ) -> Self {
        let processor = FileProcessor::new(translator, &config);
        let controller = ConcurrencyController::new(config.max_concurrent);

        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            processor: Arc::new(processor),
            controller,
            progress: None,
        }
    }

    /// Advance `progress` once per finished file
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Language registry in use
    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Configuration in use
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate every candidate file under `src_dir` into `target_lang`
    pub async fn translate_files(&self, src_dir: &Path, target_lang: &str) -> TranslationStats {
        let Some(lang) = self.registry.get_config(target_lang) else {
            warn!("Unsupported language: {}", target_lang);
            return TranslationStats::failed(src_dir, target_lang);
        };

        let Some(dest_dir) = mirror_dir(src_dir, &self.config.source_lang, target_lang) else {
            error!(
                "No '{}' segment in {}, refusing to translate in place",
                self.config.source_lang,
                src_dir.display()
            );
            return TranslationStats::failed(src_dir, target_lang);
        };

        let candidates = match self.processor.find_candidates(src_dir) {
            Ok(files) => files,
            Err(e) => {
                error!("Cannot read source tree {}: {}", src_dir.display(), e);
                return TranslationStats::failed(src_dir, target_lang);
            }
        };

        let (to_translate, skipped): (Vec<PathBuf>, Vec<PathBuf>) = candidates
            .into_iter()
            .partition(|path| {
                let relative = path.strip_prefix(src_dir).unwrap_or(path);
                self.processor
                    .should_translate_file(&path_key(relative), &path_key(path))
            });

        info!(
            "{} -> {} ({}): {} to translate, {} skipped",
            src_dir.display(),
            dest_dir.display(),
            lang.name,
            to_translate.len(),
            skipped.len()
        );

        if to_translate.is_empty() {
            return TranslationStats::nothing_to_do(src_dir, target_lang, skipped.len());
        }

        let start = Instant::now();
        let total = to_translate.len();

        let pending: Vec<_> = to_translate
            .into_iter()
            .enumerate()
            .map(|(index, src)| {
                let relative = src.strip_prefix(src_dir).unwrap_or(&src).to_path_buf();
                let dest = dest_dir.join(relative);
                let processor = Arc::clone(&self.processor);
                let lang = Arc::clone(&lang);
                let progress = self.progress.clone();
                let file = src.clone();

                let handle = self.controller.execute(move || async move {
                    let result = processor
                        .process_file(&src, &dest, &lang, index + 1, total)
                        .await;
                    if let Some(pb) = progress {
                        pb.inc(1);
                    }
                    result
                });

                (file, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(pending.len());
        for (file, handle) in pending {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => TranslationResult::failed(file, e),
            };
            results.push(result);
        }

        TranslationStats::from_results(src_dir, target_lang, &results, skipped.len(), start.elapsed())
    }

    /// Every configured target language over every source, one pass at a time
    pub async fn translate_multiple_sources(&self, sources: &[PathBuf]) -> Vec<TranslationStats> {
        let mut all_stats = Vec::with_capacity(self.config.target_languages.len() * sources.len());

        for target_lang in &self.config.target_languages {
            for source in sources {
                all_stats.push(self.translate_files(source, target_lang).await);
            }
        }

        all_stats
    }
}

/// Mirror of `src_dir` with its last `source_lang` component swapped for
/// `target_lang`; `None` if there is no such component
pub fn mirror_dir(src_dir: &Path, source_lang: &str, target_lang: &str) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = src_dir.components().collect();
    let position = components
        .iter()
        .rposition(|c| matches!(c, Component::Normal(name) if *name == OsStr::new(source_lang)))?;

    let mut mirrored = PathBuf::new();
    for (i, component) in components.iter().enumerate() {
        if i == position {
            mirrored.push(target_lang);
        } else {
            mirrored.push(component.as_os_str());
        }
    }
    Some(mirrored)
}

/// Path as matched against the changed-files list
fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
