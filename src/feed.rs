//! Headline feed view-model.
//!
//! Holds the headline records of one view instance together with the
//! category filter, and derives the category bar and the visible card list
//! from them on every read.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{FeedError, FetchError};

/// Pseudo-category that disables filtering.
pub const ALL_CATEGORIES: &str = "All";
pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_SOURCE: &str = "Unknown";

/// Message shown for the whole lifetime of a view whose initial fetch failed.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load trending news.";

/// Headline as delivered by the backend's `/trending` endpoint.
#[derive(Debug, Deserialize)]
struct RawHeadline {
    title: String,
    link: String,
    #[serde(default)]
    source: Option<Value>,
    #[serde(default)]
    category: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlineRecord {
    pub title: String,
    pub link: String,
    pub source: String,
    /// Effective category, already defaulted to [`DEFAULT_CATEGORY`].
    pub category: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub upvotes: u32,
    pub downvotes: u32,
}

impl From<RawHeadline> for HeadlineRecord {
    fn from(raw: RawHeadline) -> Self {
        Self {
            title: raw.title,
            link: raw.link,
            source: text_or(raw.source, DEFAULT_SOURCE),
            category: text_or(raw.category, DEFAULT_CATEGORY),
            timestamp: raw.timestamp.as_ref().and_then(parse_timestamp),
            upvotes: 0,
            downvotes: 0,
        }
    }
}

/// Optional text field of a raw headline. Empty text, zero and non-scalar
/// values count as absent; other numbers are rendered as text.
fn text_or(value: Option<Value>, fallback: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => fallback.to_string(),
    }
}

/// Parse the loosely typed `timestamp` field of a raw headline.
///
/// Accepts RFC 3339 / RFC 2822 text, ISO-8601 text without an offset (read
/// as UTC) and epoch milliseconds given either as a number or as digits.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteDirection::Up => f.write_str("up"),
            VoteDirection::Down => f.write_str("down"),
        }
    }
}

impl FromStr for VoteDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            other => Err(format!("unknown vote direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    records: Vec<HeadlineRecord>,
    selected_category: String,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            selected_category: ALL_CATEGORIES.to_string(),
        }
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[HeadlineRecord] {
        &self.records
    }

    pub fn selected_category(&self) -> &str {
        &self.selected_category
    }

    /// Replace every record with the headlines in `raw`, votes reset to zero.
    ///
    /// Duplicates are kept as distinct entries. On error the previously
    /// ingested records are left exactly as they were.
    pub fn ingest(&mut self, raw: Value) -> Result<(), FeedError> {
        if !raw.is_array() {
            return Err(FeedError::InvalidInput(format!(
                "expected an array of headlines, got {}",
                json_kind(&raw)
            )));
        }

        let parsed: Vec<RawHeadline> = serde_json::from_value(raw)
            .map_err(|e| FeedError::InvalidInput(e.to_string()))?;

        self.records = parsed.into_iter().map(HeadlineRecord::from).collect();
        Ok(())
    }

    /// Select a category filter. The value is not checked against
    /// [`FeedState::categories`]; an unknown category simply matches nothing.
    pub fn select_category(&mut self, category: impl Into<String>) {
        self.selected_category = category.into();
    }

    /// Count a vote on the card at `index` of the visible list.
    pub fn vote(
        &mut self,
        index: usize,
        direction: VoteDirection,
    ) -> Result<&HeadlineRecord, FeedError> {
        let position = self
            .visible_positions()
            .nth(index)
            .ok_or_else(|| FeedError::IndexOutOfRange {
                index,
                len: self.visible_positions().count(),
            })?;

        let record = &mut self.records[position];
        match direction {
            VoteDirection::Up => record.upvotes = record.upvotes.saturating_add(1),
            VoteDirection::Down => record.downvotes = record.downvotes.saturating_add(1),
        }
        Ok(&*record)
    }

    /// `"All"` followed by every distinct effective category, first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        seen.insert(ALL_CATEGORIES);

        let mut categories = vec![ALL_CATEGORIES];
        for record in &self.records {
            if seen.insert(record.category.as_str()) {
                categories.push(record.category.as_str());
            }
        }
        categories
    }

    pub fn visible(&self) -> Vec<&HeadlineRecord> {
        self.visible_positions().map(|i| &self.records[i]).collect()
    }

    fn visible_positions(&self) -> impl Iterator<Item = usize> + '_ {
        let all = self.selected_category == ALL_CATEGORIES;
        self.records
            .iter()
            .enumerate()
            .filter(move |(_, r)| all || r.category == self.selected_category)
            .map(|(i, _)| i)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed(String),
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Loading => "loading",
            LoadStatus::Ready => "ready",
            LoadStatus::Failed(_) => "failed",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LoadStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// One mounted feed view: the view-model plus the outcome of its single
/// initial fetch.
#[derive(Debug, Clone)]
pub struct FeedView {
    status: LoadStatus,
    feed: FeedState,
}

impl Default for FeedView {
    fn default() -> Self {
        Self {
            status: LoadStatus::Loading,
            feed: FeedState::new(),
        }
    }
}

impl FeedView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn feed(&self) -> &FeedState {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut FeedState {
        &mut self.feed
    }

    /// Apply the outcome of the initial headline fetch.
    ///
    /// Only the first completion counts; `Ready` and `Failed` are terminal.
    pub fn complete(&mut self, outcome: Result<Value, FetchError>) -> &LoadStatus {
        if self.status != LoadStatus::Loading {
            warn!(status = self.status.as_str(), "feed already loaded, ignoring completion");
            return &self.status;
        }

        self.status = match outcome {
            Ok(raw) => match self.feed.ingest(raw) {
                Ok(()) => {
                    info!("Loaded {} headlines", self.feed.records().len());
                    LoadStatus::Ready
                }
                Err(e) => {
                    error!("Error ingesting headlines: {}", e);
                    LoadStatus::Failed(LOAD_FAILED_MESSAGE.to_string())
                }
            },
            Err(e) => {
                error!("Error fetching headlines: {}", e);
                LoadStatus::Failed(LOAD_FAILED_MESSAGE.to_string())
            }
        };
        &self.status
    }
}
