//! Run summaries and exit codes

use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::core::models::TranslationStats;

/// Totals across every pass of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// (source, language) passes run
    pub passes: usize,
    /// Passes with `success == false`
    pub failed_passes: usize,
    /// Files written across all passes
    pub translated: usize,
    /// Files left out by the changed-files filter
    pub skipped: usize,
    /// Files that failed
    pub errors: usize,
}

impl RunSummary {
    /// Fold pass statistics together
    pub fn from_stats(stats: &[TranslationStats]) -> Self {
        stats.iter().fold(Self::default(), |mut acc, s| {
            acc.passes += 1;
            if !s.success {
                acc.failed_passes += 1;
            }
            acc.translated += s.translated;
            acc.skipped += s.skipped;
            acc.errors += s.errors;
            acc
        })
    }

    /// Whether the whole run needs attention
    pub fn has_failures(&self) -> bool {
        self.errors > 0 || self.failed_passes > 0
    }

    /// Process exit code: 0 on full success, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        u8::from(self.has_failures())
    }
}

/// Translated files per minute over `elapsed`
pub fn throughput(translated: usize, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if translated == 0 || secs <= 0.0 {
        return None;
    }
    Some(translated as f64 * 60.0 / secs)
}

/// Human-readable block for one pass
pub fn format_pass(stats: &TranslationStats) -> String {
    let status = if stats.success { "✅" } else { "❌" };
    let mut out = format!(
        "{} {} -> {}: {} translated, {} skipped, {} failed",
        status,
        stats.source_dir.display(),
        stats.target_lang,
        stats.translated,
        stats.skipped,
        stats.errors
    );

    if let Some(total) = stats.total_duration {
        out.push_str(&format!("\n   Time: {:.1}s", total.as_secs_f64()));
    }
    if let Some(avg) = stats.avg_duration {
        out.push_str(&format!(", avg {:.1}s/file", avg.as_secs_f64()));
    }
    out
}

/// Print per-pass blocks followed by the overall totals
pub fn print_summary(stats: &[TranslationStats], elapsed: Duration) -> RunSummary {
    let summary = RunSummary::from_stats(stats);

    println!("\n📊 Translation summary");
    for pass in stats {
        println!("{}", format_pass(pass));
    }

    println!("\n   Translated: {}", summary.translated);
    println!("   Skipped: {}", summary.skipped);
    println!("   Failed: {}", summary.errors);
    println!("   Time: {:.1}s", elapsed.as_secs_f64());
    if let Some(rate) = throughput(summary.translated, elapsed) {
        println!("   Throughput: {:.1} files/min", rate);
    }
    println!(
        "   Finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    if summary.has_failures() {
        eprintln!("\n⚠️  Some files need attention ({} failed)", summary.errors);
    } else {
        println!("\n✅ Translation completed!");
    }

    summary
}

/// Write pass statistics as pretty JSON
pub fn write_report<P: AsRef<Path>>(path: P, stats: &[TranslationStats]) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Report<'a> {
        summary: RunSummary,
        passes: &'a [TranslationStats],
    }

    let report = Report {
        summary: RunSummary::from_stats(stats),
        passes: stats,
    };

    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::TranslationResult;

    fn pass(lang: &str, ok: usize, failed: usize, skipped: usize) -> TranslationStats {
        let mut results: Vec<_> = (0..ok)
            .map(|i| TranslationResult::succeeded(format!("{i}.md"), Duration::from_secs(1)))
            .collect();
        results.extend((0..failed).map(|i| TranslationResult::failed(format!("f{i}.md"), "boom")));
        TranslationStats::from_results("docs/zh", lang, &results, skipped, Duration::from_secs(2))
    }

    #[test]
    fn test_summary_totals() {
        let stats = vec![pass("en", 3, 0, 1), pass("ja", 2, 1, 0)];
        let summary = RunSummary::from_stats(&stats);

        assert_eq!(summary.passes, 2);
        assert_eq!(summary.failed_passes, 1);
        assert_eq!(summary.translated, 5);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_success() {
        let summary = RunSummary::from_stats(&[pass("en", 2, 0, 0)]);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_unsupported_pass_fails_run() {
        let summary = RunSummary::from_stats(&[TranslationStats::failed("docs/zh", "xx")]);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_throughput() {
        assert_eq!(throughput(10, Duration::from_secs(30)), Some(20.0));
        assert_eq!(throughput(0, Duration::from_secs(30)), None);
        assert_eq!(throughput(5, Duration::ZERO), None);
    }

    #[test]
    fn test_format_pass() {
        let text = format_pass(&pass("en", 1, 1, 2));
        assert!(text.starts_with("❌ docs/zh -> en: 1 translated, 2 skipped, 1 failed"));
        assert!(text.contains("Time: 2.0s"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.json");

        write_report(&path, &[pass("en", 1, 0, 0)]).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["summary"]["translated"], 1);
        assert_eq!(json["passes"][0]["target_lang"], "en");
    }
}
