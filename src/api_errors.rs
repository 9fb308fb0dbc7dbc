use serde_json::Value;
use std::collections::BTreeMap;

use crate::format::round_to;
use crate::models::{ApiErrorStats, EventRecord};
use crate::parser::EventFold;

const API_ERROR: &str = "api_error";
const UNKNOWN_ERROR: &str = "unknown";

/// Resolve an error type from the `error.error.error.type` chain, falling
/// back to `error.error.type`.
pub fn error_type(error: Option<&Value>) -> String {
    let nested = error.and_then(|e| e.get("error"));
    let inner = nested.and_then(|e| e.get("error"));

    [inner, nested]
        .into_iter()
        .flatten()
        .filter_map(|level| level.get("type").and_then(|t| t.as_str()))
        .find(|t| !t.is_empty() && *t != UNKNOWN_ERROR)
        .unwrap_or(UNKNOWN_ERROR)
        .to_string()
}

/// Groups `api_error` events by day and error type.
#[derive(Debug, Default)]
pub struct ApiErrorFold {
    retries: BTreeMap<(String, String), Vec<f64>>,
}

impl EventFold for ApiErrorFold {
    type Output = Vec<ApiErrorStats>;

    fn observe(&mut self, record: &EventRecord) {
        if record.subtype.as_deref() != Some(API_ERROR) {
            return;
        }
        let Some(day) = record.day() else {
            return;
        };
        let kind = error_type(record.error.as_ref());
        self.retries
            .entry((day, kind))
            .or_default()
            .push(record.retry_in_ms.unwrap_or(0.0));
    }

    fn merge(&mut self, later: Self) {
        for (key, retries) in later.retries {
            self.retries.entry(key).or_default().extend(retries);
        }
    }

    fn finish(self) -> Vec<ApiErrorStats> {
        self.retries
            .into_iter()
            .map(|((date, error_type), retries)| {
                let count = retries.len() as u64;
                let avg = if retries.is_empty() {
                    0.0
                } else {
                    retries.iter().sum::<f64>() / retries.len() as f64
                };
                ApiErrorStats {
                    date,
                    error_type,
                    count,
                    avg_retry_ms: round_to(avg, 2),
                }
            })
            .collect()
    }
}
