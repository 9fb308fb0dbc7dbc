use std::collections::BTreeSet;

use crate::models::{ContentBlock, EventRecord, SessionFile, ThinkingUsage};
use crate::parser::EventFold;

/// Characters per token for the thinking-size estimate.
const CHARS_PER_TOKEN: usize = 4;

/// Extended-thinking usage. A stream counts as a session with thinking if any
/// of its blocks is a thinking block; streams are identified by file stem.
#[derive(Debug, Default)]
pub struct ThinkingFold {
    current_has_thinking: bool,
    streams_seen: u64,
    sessions: BTreeSet<String>,
    blocks: u64,
    tokens: u64,
}

impl EventFold for ThinkingFold {
    /// `None` when no stream was read.
    type Output = Option<ThinkingUsage>;

    fn observe(&mut self, record: &EventRecord) {
        for block in &record.content {
            if let ContentBlock::Thinking { chars } = block {
                self.current_has_thinking = true;
                self.blocks += 1;
                self.tokens += (chars / CHARS_PER_TOKEN) as u64;
            }
        }
    }

    fn end_stream(&mut self, stream: &SessionFile) {
        self.streams_seen += 1;
        if std::mem::take(&mut self.current_has_thinking) {
            self.sessions.insert(stream.id.clone());
        }
    }

    fn merge(&mut self, later: Self) {
        self.streams_seen += later.streams_seen;
        self.sessions.extend(later.sessions);
        self.blocks += later.blocks;
        self.tokens += later.tokens;
    }

    fn finish(self) -> Option<ThinkingUsage> {
        (self.streams_seen > 0).then(|| ThinkingUsage {
            sessions_with_thinking: self.sessions.len() as u64,
            total_thinking_blocks: self.blocks,
            total_thinking_tokens: self.tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::merge_all;
    use serde_json::json;

    fn stream(id: &str) -> SessionFile {
        SessionFile {
            id: id.to_string(),
            path: format!("/p/{id}.jsonl").into(),
            size: 0,
        }
    }

    fn thinking(text: &str) -> EventRecord {
        EventRecord::from_value(&json!({
            "type": "assistant",
            "message": {"content": [{"type": "thinking", "thinking": text}, {"type": "text", "text": "x"}]}
        }))
    }

    #[test]
    fn test_counts_sessions_blocks_and_tokens() {
        let mut a = ThinkingFold::default();
        a.observe(&thinking("0123456789"));
        a.observe(&thinking("abc"));
        a.end_stream(&stream("s1"));

        let mut b = ThinkingFold::default();
        b.observe(&EventRecord::from_value(&json!({"type": "user"})));
        b.end_stream(&stream("s2"));

        // Same stem in another project is the same session.
        let mut c = ThinkingFold::default();
        c.observe(&thinking("12345678"));
        c.end_stream(&stream("s1"));

        let usage = merge_all::<ThinkingFold, _>(vec![a, b, c]).finish().unwrap();
        assert_eq!(
            usage,
            ThinkingUsage {
                sessions_with_thinking: 1,
                total_thinking_blocks: 3,
                total_thinking_tokens: 2 + 0 + 2,
            }
        );
    }

    #[test]
    fn test_no_streams_is_absent() {
        assert!(ThinkingFold::default().finish().is_none());

        let mut fold = ThinkingFold::default();
        fold.end_stream(&stream("quiet"));
        assert_eq!(fold.finish().unwrap().total_thinking_blocks, 0);
    }
}
