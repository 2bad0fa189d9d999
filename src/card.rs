use chrono::{DateTime, Utc};

use crate::feed::HeadlineRecord;

const DEFAULT_ICON: &str = "🌐";

/// Matched in order, case-insensitively, against the record's source.
const SOURCE_ICONS: &[(&str, &str)] = &[
    ("Yahoo", "🟣"),
    ("Twitter", "🐦"),
    ("Reddit", "👽"),
    ("ESPN", "🏈"),
    ("Hacker News", "🟧"),
    ("YC Blog", "🚀"),
    ("Google News", "📰"),
];

pub fn source_icon(source: &str) -> &'static str {
    let source = source.to_lowercase();
    SOURCE_ICONS
        .iter()
        .find(|(name, _)| source.contains(&name.to_lowercase()))
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

/// Human distance between `timestamp` and `now`, e.g. "about 3 hours ago".
pub fn relative_age(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(timestamp) = timestamp else {
        return "just now".to_string();
    };

    let seconds = (now - timestamp).num_seconds();
    let distance = distance_words(seconds.unsigned_abs());
    if seconds < 0 {
        format!("in {}", distance)
    } else {
        format!("{} ago", distance)
    }
}

fn distance_words(seconds: u64) -> String {
    const MINUTES_IN_HOUR: u64 = 60;
    const MINUTES_IN_DAY: u64 = 24 * MINUTES_IN_HOUR;
    const MINUTES_IN_MONTH: u64 = 30 * MINUTES_IN_DAY;
    const MINUTES_IN_YEAR: u64 = 365 * MINUTES_IN_DAY;

    let minutes = (seconds + 30) / 60;
    match minutes {
        0 => "less than a minute".to_string(),
        1 => "1 minute".to_string(),
        m if m < 45 => format!("{} minutes", m),
        m if m < 90 => "about 1 hour".to_string(),
        m if m < MINUTES_IN_DAY => format!(
            "about {} hours",
            (m + MINUTES_IN_HOUR / 2) / MINUTES_IN_HOUR
        ),
        m if m < 42 * MINUTES_IN_HOUR => "1 day".to_string(),
        m if m < MINUTES_IN_MONTH => format!(
            "{} days",
            (m + MINUTES_IN_DAY / 2) / MINUTES_IN_DAY
        ),
        m if m < 45 * MINUTES_IN_DAY => "about 1 month".to_string(),
        m if m < 2 * MINUTES_IN_MONTH => "about 2 months".to_string(),
        m if m < MINUTES_IN_YEAR => format!(
            "{} months",
            (m + MINUTES_IN_MONTH / 2) / MINUTES_IN_MONTH
        ),
        m => years_words(m / MINUTES_IN_MONTH),
    }
}

/// Whole years, qualified by how far into the next year `months` reaches.
fn years_words(months: u64) -> String {
    let years = months / 12;
    let unit = |n: u64| if n == 1 { "year" } else { "years" };
    match months % 12 {
        0..=2 => format!("about {} {}", years, unit(years)),
        3..=8 => format!("over {} {}", years, unit(years)),
        _ => format!("almost {} years", years + 1),
    }
}

/// Everything a rendered card needs, computed once per render.
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    /// Position in the visible list; the vote buttons post it back.
    pub index: usize,
    pub title: String,
    pub link: String,
    pub source: String,
    pub category: String,
    pub icon: &'static str,
    pub age: String,
    pub upvotes: u32,
    pub downvotes: u32,
    pub featured: bool,
}

impl CardView {
    pub fn new(index: usize, record: &HeadlineRecord, now: DateTime<Utc>) -> Self {
        Self {
            index,
            title: record.title.clone(),
            link: record.link.clone(),
            source: record.source.clone(),
            category: record.category.clone(),
            icon: source_icon(&record.source),
            age: relative_age(record.timestamp, now),
            upvotes: record.upvotes,
            downvotes: record.downvotes,
            featured: index == 0,
        }
    }
}

pub fn card_views(visible: &[&HeadlineRecord], now: DateTime<Utc>) -> Vec<CardView> {
    visible
        .iter()
        .enumerate()
        .map(|(i, record)| CardView::new(i, record, now))
        .collect()
}
