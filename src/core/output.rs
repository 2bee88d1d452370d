//! Text rendering helpers for CLI surfaces.

use crate::core::model::{Fragility, Severity};
use colored::{ColoredString, Colorize};

/// Collapse whitespace and bound length; used for evidence summaries and
/// one-line previews.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

pub fn risk_badge(risk_score: u32) -> ColoredString {
    let label = format!("risk {:>3}", risk_score);
    match risk_score {
        0..=33 => label.green(),
        34..=66 => label.yellow(),
        _ => label.red().bold(),
    }
}

pub fn fragility_badge(fragility: Fragility) -> ColoredString {
    match fragility {
        Fragility::Stable => fragility.as_str().green(),
        Fragility::Fragile => fragility.as_str().yellow(),
        Fragility::KnifeEdge => fragility.as_str().red().bold(),
    }
}

pub fn severity_badge(severity: Severity) -> ColoredString {
    match severity {
        Severity::Low => "low".dimmed(),
        Severity::Medium => "medium".yellow(),
        Severity::High => "high".red().bold(),
    }
}
