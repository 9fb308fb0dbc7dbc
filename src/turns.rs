use std::collections::BTreeMap;

use crate::format::round_to;
use crate::models::{EventRecord, TurnDuration};
use crate::parser::EventFold;

const TURN_DURATION: &str = "turn_duration";

/// Nearest-rank percentile over an ascending, non-empty sample:
/// index `floor(n * p)` clamped to `n - 1`.
pub fn nearest_rank(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let idx = ((n as f64 * p) as usize).min(n - 1);
    Some(sorted[idx])
}

/// Per-day turn latencies from `turn_duration` system events.
#[derive(Debug, Default)]
pub struct TurnDurationFold {
    by_day: BTreeMap<String, Vec<f64>>,
}

impl EventFold for TurnDurationFold {
    type Output = Vec<TurnDuration>;

    fn observe(&mut self, record: &EventRecord) {
        if record.subtype.as_deref() != Some(TURN_DURATION) {
            return;
        }
        let Some(duration) = record.duration_ms.filter(|d| *d > 0.0) else {
            return;
        };
        if let Some(day) = record.day() {
            self.by_day.entry(day).or_default().push(duration);
        }
    }

    fn merge(&mut self, later: Self) {
        for (day, durations) in later.by_day {
            self.by_day.entry(day).or_default().extend(durations);
        }
    }

    fn finish(self) -> Vec<TurnDuration> {
        self.by_day
            .into_iter()
            .filter_map(|(date, mut durations)| {
                durations.sort_by(f64::total_cmp);
                let n = durations.len();
                let avg = durations.iter().sum::<f64>() / n as f64;
                Some(TurnDuration {
                    date,
                    avg_duration_ms: round_to(avg, 2),
                    p50_ms: nearest_rank(&durations, 0.5)?,
                    p95_ms: nearest_rank(&durations, 0.95)?,
                    p99_ms: nearest_rank(&durations, 0.99)?,
                    count: n as u64,
                })
            })
            .collect()
    }
}
