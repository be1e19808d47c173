//! Heuristic classification of execution output lines.
//!
//! The backend streams free text, so severity, importance and step progress
//! are recovered from literal glyphs and keywords in the line. Everything
//! here is a pure function of the input text; swapping in structured
//! severity/progress fields later only means replacing [`classify`].

use cm_protocol::{LogCategory, StepProgress};
use regex::Regex;
use std::sync::OnceLock;

const ERROR_MARKERS: &[&str] = &["❌", "Error", "Failed"];
const WARNING_MARKERS: &[&str] = &["⚠", "Warning"];
const SUCCESS_MARKERS: &[&str] = &["✅", "completed", "successfully"];
const PROGRESS_MARKERS: &[&str] = &["🔄", "Processing", "Step"];

/// High-signal markers: completion banner, error banner, start banner,
/// duration marker and summary marker.
const IMPORTANT_MARKERS: &[&str] = &[
    "✅ Crew execution completed",
    "❌ Error",
    "🚀 Starting crew execution",
    "⏱",
    "📊",
];

/// Result of classifying one line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: LogCategory,
    pub important: bool,
    /// Present only when the line contains a `Step <n>/<m>: <description>` marker.
    pub progress: Option<StepProgress>,
}

/// Classify a line of output.
///
/// Category precedence is error, warning, success, progress, info: the first
/// group with a matching marker wins.
///
/// # Example
///
/// ```
/// use cm_core::logs::classify;
/// use cm_protocol::LogCategory;
///
/// let result = classify("Step 2/5: loading");
/// assert_eq!(result.category, LogCategory::Progress);
/// assert_eq!(result.progress.map(|p| p.current_step), Some(2));
/// ```
pub fn classify(text: &str) -> Classification {
    Classification {
        category: category_of(text),
        important: is_important(text),
        progress: parse_progress(text),
    }
}

/// Derive only the category of a line.
pub fn category_of(text: &str) -> LogCategory {
    if contains_any(text, ERROR_MARKERS) {
        LogCategory::Error
    } else if contains_any(text, WARNING_MARKERS) {
        LogCategory::Warning
    } else if contains_any(text, SUCCESS_MARKERS) {
        LogCategory::Success
    } else if contains_any(text, PROGRESS_MARKERS) {
        LogCategory::Progress
    } else {
        LogCategory::Info
    }
}

/// Whether a line matches the high-signal whitelist.
pub fn is_important(text: &str) -> bool {
    contains_any(text, IMPORTANT_MARKERS)
}

/// Parse the first `Step <n>/<m>: <description>` marker in `text`.
///
/// Returns `None` when there is no marker, when the description is empty, or
/// when a step number does not fit in a `u32`.
pub fn parse_progress(text: &str) -> Option<StepProgress> {
    let captures = step_pattern()?.captures(text)?;
    let current_step = captures.get(1)?.as_str().parse().ok()?;
    let total_steps = captures.get(2)?.as_str().parse().ok()?;
    let step_description = captures.get(3)?.as_str().trim().to_string();
    if step_description.is_empty() {
        return None;
    }

    Some(StepProgress {
        current_step,
        total_steps,
        step_description,
    })
}

fn step_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"Step (\d+)/(\d+):\s*(.+)").ok())
        .as_ref()
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error() {
        assert_eq!(classify("❌ Error: disk full").category, LogCategory::Error);
        assert_eq!(classify("Task Failed").category, LogCategory::Error);
    }

    #[test]
    fn test_classify_success() {
        let result = classify("✅ completed successfully");
        assert_eq!(result.category, LogCategory::Success);
        assert!(result.progress.is_none());
    }

    #[test]
    fn test_classify_progress_and_step() {
        let result = classify("Step 2/5: loading");
        assert_eq!(result.category, LogCategory::Progress);
        assert_eq!(
            result.progress,
            Some(StepProgress {
                current_step: 2,
                total_steps: 5,
                step_description: "loading".to_string(),
            })
        );
    }

    #[test]
    fn test_classify_info_default() {
        let result = classify("hello");
        assert_eq!(result.category, LogCategory::Info);
        assert!(!result.important);
        assert!(result.progress.is_none());
    }

    #[test]
    fn test_warning_glyph_with_and_without_variation_selector() {
        assert_eq!(category_of("⚠️ low memory"), LogCategory::Warning);
        assert_eq!(category_of("⚠ low memory"), LogCategory::Warning);
        assert_eq!(category_of("Warning: retrying"), LogCategory::Warning);
    }

    #[test]
    fn test_error_takes_precedence_over_success() {
        // Contains both "Failed" and "completed"
        assert_eq!(
            category_of("Step completed but upload Failed"),
            LogCategory::Error
        );
    }

    #[test]
    fn test_success_takes_precedence_over_progress() {
        // "✅ Step 1 done" matches both the success glyph and "Step"
        assert_eq!(category_of("✅ Step 1 done"), LogCategory::Success);
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(category_of("error in lowercase"), LogCategory::Info);
        assert_eq!(category_of("Completed"), LogCategory::Info);
    }

    #[test]
    fn test_important_markers() {
        assert!(is_important("✅ Crew execution completed in 12s"));
        assert!(is_important("❌ Error: boom"));
        assert!(is_important("🚀 Starting crew execution"));
        assert!(is_important("⏱️ Duration: 12.3s"));
        assert!(is_important("📊 Summary"));
        assert!(!is_important("Step 1/2: Researching"));
    }

    #[test]
    fn test_parse_progress_embedded_in_text() {
        let progress = parse_progress("🔄 Step 3/4: Processing agent and task...").unwrap();
        assert_eq!(progress.current_step, 3);
        assert_eq!(progress.total_steps, 4);
        assert_eq!(progress.step_description, "Processing agent and task...");
    }

    #[test]
    fn test_parse_progress_stops_at_line_end() {
        let progress = parse_progress("Step 1/2: first\nsecond line").unwrap();
        assert_eq!(progress.step_description, "first");
    }

    #[test]
    fn test_parse_progress_rejects_non_matching() {
        assert!(parse_progress("Step one of two").is_none());
        assert!(parse_progress("Step 1/2:").is_none());
        assert!(parse_progress("Step 1/2:   ").is_none());
        assert!(parse_progress("Step 99999999999/2: overflow").is_none());
    }
}
