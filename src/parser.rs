use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{EventRecord, SessionFile};

/// Decode one JSONL line. Blank lines, invalid JSON and non-object values
/// all yield `None`; the caller skips the line.
pub fn decode_line(line: &[u8]) -> Option<Value> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(line) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Outcome of reading one line-delimited stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineStats {
    pub decoded: usize,
    pub skipped: usize,
}

/// Feed every decodable line of `path` to `on_value`, in file order.
///
/// Malformed lines are skipped individually. An I/O fault ends the stream
/// early; the lines already delivered keep their effect.
pub fn for_each_line<F>(path: &Path, mut on_value: F) -> Result<LineStats>
where
    F: FnMut(Value),
{
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut stats = LineStats::default();

    for line in reader.split(b'\n') {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Stopped reading stream early");
                break;
            }
        };
        if line.trim_ascii().is_empty() {
            continue;
        }
        match decode_line(&line) {
            Some(value) => {
                stats.decoded += 1;
                on_value(value);
            }
            None => stats.skipped += 1,
        }
    }

    if stats.skipped > 0 {
        debug!(path = %path.display(), skipped = stats.skipped, "Skipped malformed lines");
    }
    Ok(stats)
}

/// A fold over the event records of one or more streams.
///
/// A partial fold is built per stream; partials combine with `merge`, the
/// receiver always holding the earlier streams.
pub trait EventFold: Default + Send {
    type Output;

    fn observe(&mut self, record: &EventRecord);

    fn end_stream(&mut self, _stream: &SessionFile) {}

    fn merge(&mut self, later: Self);

    fn finish(self) -> Self::Output;
}

/// Merge partial folds in order.
pub fn merge_all<F, I>(parts: I) -> F
where
    F: EventFold,
    I: IntoIterator<Item = F>,
{
    parts.into_iter().fold(F::default(), |mut acc, part| {
        acc.merge(part);
        acc
    })
}

/// Run a single fold over one stream file. Read failures are logged and the
/// stream contributes nothing beyond what was read.
pub fn fold_stream<F: EventFold>(stream: &SessionFile) -> F {
    let mut fold = F::default();
    if let Err(e) = for_each_line(&stream.path, |value| {
        fold.observe(&EventRecord::from_value(&value))
    }) {
        warn!(path = %stream.path.display(), error = %e, "Failed to read event stream");
    }
    fold.end_stream(stream);
    fold
}
