// SPDX-License-Identifier: MIT

//! Detects whether a question asks for recent information

use once_cell::sync::Lazy;

use super::state::DEFAULT_SEARCH_DAYS_LIMIT;

/// Keywords that switch search into recent-only mode
static RECENT_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "最新",
        "直近",
        "最近",
        "新しい",
        "今日",
        "今週",
        "今月",
        "今年",
        "最新版",
        "最新バージョン",
        "アップデート",
        "latest",
        "recent",
        "new",
        "current",
        "today",
        "this week",
        "this month",
        "this year",
        "current version",
        "latest version",
        "up to date",
        "update",
    ]
});

/// Keywords that narrow the recency window, checked in order
static WINDOW_KEYWORDS: &[(&str, u32)] = &[
    ("今日", 1),
    ("today", 1),
    ("今週", 7),
    ("this week", 7),
    ("今月", 30),
    ("this month", 30),
    ("直近", 60),
    ("最近", 60),
    ("recent", 60),
];

/// Recency filter for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyHint {
    pub recent: bool,
    pub days_limit: u32,
}

/// Inspect `question` for recency keywords
///
/// `year` is the current calendar year; mentioning it or the previous year
/// also counts as asking for recent information.
pub fn detect(question: &str, year: i32) -> RecencyHint {
    let lowered = question.to_lowercase();
    let year_markers = [year.to_string(), (year - 1).to_string()];

    let recent = RECENT_KEYWORDS.iter().any(|k| lowered.contains(k))
        || year_markers.iter().any(|y| lowered.contains(y.as_str()));

    let days_limit = WINDOW_KEYWORDS
        .iter()
        .find(|(k, _)| lowered.contains(k))
        .map(|(_, days)| (*days).min(DEFAULT_SEARCH_DAYS_LIMIT))
        .unwrap_or(DEFAULT_SEARCH_DAYS_LIMIT);

    if recent {
        log::info!(
            "Recent information requested - search limited to the past {} days",
            days_limit
        );
    }

    RecencyHint { recent, days_limit }
}
