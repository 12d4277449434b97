//! Documentation translator - concurrent AI translation of source trees
//!
//! Walks a source-language documentation tree, sends each Markdown or
//! TypeScript file to a chat completion API under a bounded concurrency
//! limit, and writes the results into per-language mirror directories with
//! in-document paths retargeted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core;
pub mod processors;
pub mod cli;
pub mod utils;

// Re-export key types for convenience
pub use crate::core::{
    client::{AsyncTranslator, ChatBackend, HttpChatBackend},
    config::{ChangedFiles, MatchMode, TranslatorConfig},
    controller::ConcurrencyController,
    errors::TranslationError,
    languages::LanguageRegistry,
    models::{LanguageConfig, PathReplace, SystemPrompt, TranslationResult, TranslationStats},
};

pub use crate::processors::{
    file::FileProcessor,
    service::TranslationService,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
