// SPDX-License-Identifier: MIT

//! Markdown report generation for extended runs

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

use super::state::PipelineState;

/// Slack rejects longer messages
pub const NOTIFICATION_LIMIT: usize = 3000;

const SEARCH_SUMMARY_CHARS: usize = 500;
const FILE_STEM_CHARS: usize = 30;

/// Explicit "corrected version" blocks, tried first
static CORRECTED_BLOCK: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)corrected version\s*:\s*\n(.+?)(?:\n\n##|\n\n---|\z)",
        r"(?is)revised version\s*:\s*\n(.+?)(?:\n\n##|\n\n---|\z)",
        r"(?is)improved version\s*:\s*\n(.+?)(?:\n\n##|\n\n---|\z)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Heading or bold-label forms, tried when no block matched
static CORRECTED_SECTION: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)#{2,3} corrected version\s*\n(.+?)(?:\n#{2,3} |\z)",
        r"(?is)\*\*corrected version\*\*\s*\n(.+?)(?:\n\*\*|\z)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// File name for the report on `question`
pub fn file_name(question: &str) -> String {
    let stem: String = question
        .chars()
        .take(FILE_STEM_CHARS)
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '<' | '>' | '|' | '"'))
        .collect();
    let stem = stem.trim();

    if stem.is_empty() {
        "untitled_analysis.md".to_string()
    } else {
        format!("{stem}_analysis.md")
    }
}

/// Pull the corrected answer out of a review, if it has one
pub fn extract_corrected_version(review: &str) -> Option<String> {
    if review.trim().is_empty() {
        return None;
    }

    CORRECTED_BLOCK
        .iter()
        .chain(CORRECTED_SECTION.iter())
        .find_map(|re| re.captures(review))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

fn or_none<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        text
    }
}

/// Render the comparison report for a finished run
pub fn render(state: &PipelineState, generated_at: DateTime<Local>) -> String {
    let question = state.question();
    let reviewed = state.reviewed_output();

    let search_summary = match state.search_results() {
        Some(results) if !results.trim().is_empty() => {
            let (head, cut) = truncate_chars(results, SEARCH_SUMMARY_CHARS);
            if cut {
                format!("{head}...")
            } else {
                head.to_string()
            }
        }
        _ => "No search results".to_string(),
    };

    let corrected = extract_corrected_version(reviewed)
        .filter(|c| c != reviewed)
        .map(|c| format!("## 3. Final corrected version\n\n{c}\n\n"))
        .unwrap_or_default();

    format!(
        "# Refinement run report\n\
         \n\
         ## Run information\n\
         - **Generated**: {generated}\n\
         - **Question**: {question}\n\
         - **Iterations**: {iteration}\n\
         \n\
         ## Original question\n\
         ```\n\
         {question}\n\
         ```\n\
         \n\
         ## Search summary\n\
         ```\n\
         {search_summary}\n\
         ```\n\
         \n\
         ## 1. Initial answer\n\
         {initial}\n\
         \n\
         ## 2. Review\n\
         {review}\n\
         \n\
         {corrected}\
         ---\n\
         *Generated by refine-rs*\n",
        generated = generated_at.format("%Y-%m-%d %H:%M:%S"),
        iteration = state.iteration(),
        initial = or_none(state.initial_output(), "No initial answer"),
        review = or_none(reviewed, "No review"),
    )
}

/// Message body for the webhook notification
///
/// Sends the whole report when it fits, otherwise a short summary pointing at
/// the file on disk.
pub fn notification_text(question: &str, content: &str, path: &str) -> String {
    let header = format!("Refinement run finished\nQuestion: {question}");
    let full = format!("{header}\n\n{content}");
    if full.chars().count() <= NOTIFICATION_LIMIT {
        return full;
    }

    let location = if path.is_empty() { "(not saved)" } else { path };
    let summary = format!(
        "{header}\nReport: {location}\nThe report is {} characters long; see the file for the full text.",
        content.chars().count()
    );
    let (head, _) = truncate_chars(&summary, NOTIFICATION_LIMIT);
    head.to_string()
}
