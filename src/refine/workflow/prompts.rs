// SPDX-License-Identifier: MIT

//! Prompt templates sent to the inference and review adapters

use chrono::{DateTime, Datelike, Local};

/// Stored as `processed_output` when the model answers with nothing
pub const EMPTY_RESPONSE_PLACEHOLDER: &str = "(The model returned an empty response.)";

/// Prompt for one processing pass
pub fn processing_prompt(
    user_input: &str,
    search_results: Option<&str>,
    iteration: u32,
    now: DateTime<Local>,
) -> String {
    let year = now.year();
    let search = match search_results {
        Some(s) if !s.trim().is_empty() => s,
        _ => "No search results available.",
    };

    format!(
        "You are an assistant working on pass {pass} of an iterative refinement pipeline.\n\
         Current date: {date} ({year}). Prefer information from {prev} onwards.\n\
         \n\
         Answer the user's input thoughtfully, drawing on the search results when they are relevant.\n\
         Keep the answer concise but informative. If you rely on material from {old} or earlier, \
         mention the latest developments as well.\n\
         \n\
         User input: {user_input}\n\
         \n\
         Search results:\n\
         {search}\n",
        pass = iteration + 1,
        date = now.format("%Y-%m-%d %H:%M"),
        prev = year - 1,
        old = year - 2,
    )
}

/// Prompt handed to the review command on stdin
pub fn review_prompt(question: &str, before: &str, after: &str, now: DateTime<Local>) -> String {
    let year = now.year();
    format!(
        "You are an expert technical reviewer.\n\
         Current date: {date} ({year}). Prefer information from {prev} onwards.\n\
         \n\
         Original question:\n\
         {question}\n\
         \n\
         First answer:\n\
         {before}\n\
         \n\
         Refined answer:\n\
         {after}\n\
         \n\
         Review the refined answer for factual accuracy, logical consistency, completeness, \
         clarity and whether it reflects the state of things in {year}. For technical content also \
         check API usage, security and version-specific caveats.\n\
         \n\
         Output format:\n\
         ## Review\n\
         A detailed bullet list of findings.\n\
         \n\
         Corrected version:\n\
         The full answer with every finding applied.\n\
         \n\
         ## Changes\n\
         What was changed and why. If nothing needed changing, write \"Review complete: no issues\".\n",
        date = now.format("%Y-%m-%d"),
        prev = year - 1,
    )
}

/// `user_input` for the pass after `iteration` was incremented to `n`
pub fn continuation_input(n: u32, previous_output: &str) -> String {
    format!(
        "Please elaborate or provide additional insights based on your previous response. \
         This is continuation {n}.\n\nPrevious response:\n{previous_output}"
    )
}

/// Stand-in answer when inference fails and fallback is enabled
pub fn fallback_response(iteration: u32, user_input: &str) -> String {
    format!("Processing iteration {iteration}: {user_input} (model unavailable)")
}
