//! Reader for the precomputed `stats-cache.json` summary.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::models::{DailyActivity, DailyModelTokens, LongestSession, ModelUsage};

const EXPECTED_KEYS: &[&str] = &["dailyActivity", "modelUsage", "totalSessions", "totalMessages"];

// --- Raw cache sections ---
//
// Every field is read leniently: a value of the wrong type is treated as
// absent rather than rejecting the whole file.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStatsCache {
    #[serde(deserialize_with = "rows")]
    daily_activity: Vec<RawDailyActivity>,
    #[serde(deserialize_with = "rows")]
    daily_model_tokens: Vec<RawDailyModelTokens>,
    /// Keyed by model name.
    #[serde(deserialize_with = "lenient")]
    model_usage: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient")]
    longest_session: Option<RawLongestSession>,
    #[serde(deserialize_with = "counts")]
    hour_counts: BTreeMap<String, u64>,
    #[serde(deserialize_with = "count")]
    total_sessions: Option<u64>,
    #[serde(deserialize_with = "count")]
    total_messages: Option<u64>,
    #[serde(deserialize_with = "count")]
    total_tool_calls: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    first_session_date: Option<String>,
    #[serde(deserialize_with = "lenient")]
    last_computed_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawDailyActivity {
    #[serde(deserialize_with = "lenient")]
    date: Option<String>,
    #[serde(deserialize_with = "count")]
    message_count: Option<u64>,
    #[serde(deserialize_with = "count")]
    session_count: Option<u64>,
    #[serde(deserialize_with = "count")]
    tool_call_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawDailyModelTokens {
    #[serde(deserialize_with = "lenient")]
    date: Option<String>,
    #[serde(deserialize_with = "counts")]
    tokens_by_model: BTreeMap<String, u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawModelUsage {
    #[serde(deserialize_with = "count")]
    input_tokens: Option<u64>,
    #[serde(deserialize_with = "count")]
    output_tokens: Option<u64>,
    #[serde(deserialize_with = "count")]
    cache_read_input_tokens: Option<u64>,
    #[serde(deserialize_with = "count")]
    cache_creation_input_tokens: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawLongestSession {
    #[serde(deserialize_with = "lenient")]
    session_id: Option<String>,
    #[serde(deserialize_with = "count")]
    duration: Option<u64>,
    #[serde(deserialize_with = "count")]
    message_count: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    timestamp: Option<String>,
}

impl RawLongestSession {
    fn is_empty(&self) -> bool {
        self.session_id.is_none()
            && self.duration.is_none()
            && self.message_count.is_none()
            && self.timestamp.is_none()
    }
}

/// Any value; one that does not fit `T` reads as `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Array rows that fit `T`; other rows are dropped, a non-array is empty.
fn rows<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let rows: Vec<Value> = lenient(deserializer)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| serde_json::from_value(row).ok())
        .collect())
}

/// Non-negative integer, accepting integral floats.
fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_count(&Value::deserialize(deserializer)?))
}

/// Name-to-count object; entries that are not counts are dropped.
fn counts<'de, D>(deserializer: D) -> Result<BTreeMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: BTreeMap<String, Value> = lenient(deserializer)?;
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| Some((key, as_count(&value)?)))
        .collect())
}

/// The parts of the cache summary the assembler consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsCache {
    pub daily_activity: Vec<DailyActivity>,
    pub daily_model_tokens: Vec<DailyModelTokens>,
    pub model_usage: Vec<ModelUsage>,
    pub longest_session: Option<LongestSession>,
    pub hour_counts: BTreeMap<String, u64>,
    pub total_sessions: Option<u64>,
    pub total_messages: Option<u64>,
    pub total_tool_calls: Option<u64>,
    pub first_session_date: Option<String>,
    pub last_computed_date: Option<String>,
}

/// Load the cache summary. Returns `None` when the file cannot be read or is
/// not a JSON object; an object missing the expected keys is still used.
pub fn read_stats_cache(path: &Path) -> Option<StatsCache> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read stats cache");
            return None;
        }
    };

    let json: Value = match serde_json::from_str(&raw) {
        Ok(json) => json,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse stats cache");
            return None;
        }
    };

    let Some(obj) = json.as_object() else {
        warn!(path = %path.display(), "Stats cache is not a JSON object");
        return None;
    };

    if !EXPECTED_KEYS.iter().any(|k| obj.contains_key(*k)) {
        warn!(path = %path.display(), "Stats cache has unexpected structure");
    }

    match serde_json::from_value::<RawStatsCache>(json) {
        Ok(raw) => Some(raw.into()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse stats cache");
            None
        }
    }
}

impl From<RawStatsCache> for StatsCache {
    fn from(raw: RawStatsCache) -> Self {
        let daily_activity = raw
            .daily_activity
            .into_iter()
            .filter_map(|row| {
                Some(DailyActivity {
                    date: row.date?,
                    message_count: row.message_count.unwrap_or(0),
                    session_count: row.session_count.unwrap_or(0),
                    tool_call_count: row.tool_call_count.unwrap_or(0),
                })
            })
            .collect();

        let daily_model_tokens = raw
            .daily_model_tokens
            .into_iter()
            .filter_map(|row| {
                Some(DailyModelTokens {
                    date: row.date?,
                    tokens_by_model: row.tokens_by_model,
                })
            })
            .collect();

        let model_usage = raw
            .model_usage
            .into_iter()
            .map(|(model, item)| {
                let usage: RawModelUsage = serde_json::from_value(item).unwrap_or_default();
                ModelUsage {
                    model,
                    input_tokens: usage.input_tokens.unwrap_or(0),
                    output_tokens: usage.output_tokens.unwrap_or(0),
                    cache_read_tokens: usage.cache_read_input_tokens.unwrap_or(0),
                    cache_creation_tokens: usage.cache_creation_input_tokens.unwrap_or(0),
                }
            })
            .collect();

        let longest_session = raw
            .longest_session
            .filter(|s| !s.is_empty())
            .map(|s| LongestSession {
                session_id: s.session_id.unwrap_or_default(),
                duration_ms: s.duration.unwrap_or(0),
                message_count: s.message_count.unwrap_or(0),
                timestamp: s.timestamp.unwrap_or_default(),
            });

        Self {
            daily_activity,
            daily_model_tokens,
            model_usage,
            longest_session,
            hour_counts: raw.hour_counts,
            total_sessions: raw.total_sessions,
            total_messages: raw.total_messages,
            total_tool_calls: raw.total_tool_calls,
            first_session_date: raw.first_session_date,
            last_computed_date: raw.last_computed_date,
        }
    }
}
