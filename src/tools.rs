use std::collections::HashMap;

use crate::format::round_to;
use crate::models::{ContentBlock, EventRecord, ToolCategory, ToolSuccessRate, ToolUsage};
use crate::parser::EventFold;

const MCP_PREFIX: &str = "mcp__";
const SUBAGENT_PREFIX: &str = "subagent:";
const UNKNOWN_TOOL: &str = "unknown";

pub fn categorize_tool(name: &str) -> ToolCategory {
    if name.starts_with(MCP_PREFIX) {
        ToolCategory::Mcp
    } else if name.starts_with(SUBAGENT_PREFIX) {
        ToolCategory::Subagent
    } else {
        ToolCategory::Builtin
    }
}

/// Counts tool invocations by name. Sub-agent launches are counted a second
/// time under `subagent:<type>`.
#[derive(Debug, Default)]
pub struct ToolUsageCounter {
    counts: HashMap<String, u64>,
}

impl EventFold for ToolUsageCounter {
    type Output = Vec<ToolUsage>;

    fn observe(&mut self, record: &EventRecord) {
        for block in &record.content {
            if let ContentBlock::ToolUse { name, subagent, .. } = block {
                if let Some(name) = name {
                    *self.counts.entry(name.clone()).or_insert(0) += 1;
                }
                if let Some(agent) = subagent {
                    *self
                        .counts
                        .entry(format!("{SUBAGENT_PREFIX}{agent}"))
                        .or_insert(0) += 1;
                }
            }
        }
    }

    fn merge(&mut self, later: Self) {
        for (name, count) in later.counts {
            *self.counts.entry(name).or_insert(0) += count;
        }
    }

    fn finish(self) -> Vec<ToolUsage> {
        let mut usage: Vec<ToolUsage> = self
            .counts
            .into_iter()
            .map(|(name, count)| ToolUsage {
                category: categorize_tool(&name),
                name,
                count,
            })
            .collect();
        usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        usage
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ToolEvent {
    Invoked { id: String, name: String },
    Returned { id: Option<String>, is_error: bool },
}

/// Pairs tool results with their invocations by id.
///
/// Each partial keeps its stream's invocations and results in order. The id
/// space is global, so pairing is deferred to `finish`, which replays the
/// merged sequence against one id -> name map.
#[derive(Debug, Default)]
pub struct ToolOutcomeLog {
    events: Vec<ToolEvent>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Outcomes {
    success: u64,
    error: u64,
}

impl EventFold for ToolOutcomeLog {
    type Output = Vec<ToolSuccessRate>;

    fn observe(&mut self, record: &EventRecord) {
        for block in &record.content {
            match block {
                ContentBlock::ToolUse {
                    id: Some(id),
                    name: Some(name),
                    ..
                } => self.events.push(ToolEvent::Invoked {
                    id: id.clone(),
                    name: name.clone(),
                }),
                ContentBlock::ToolResult {
                    tool_use_id,
                    is_error,
                } => self.events.push(ToolEvent::Returned {
                    id: tool_use_id.clone(),
                    is_error: *is_error,
                }),
                _ => {}
            }
        }
    }

    fn merge(&mut self, later: Self) {
        self.events.extend(later.events);
    }

    fn finish(self) -> Vec<ToolSuccessRate> {
        let mut names: HashMap<String, String> = HashMap::new();
        let mut outcomes: HashMap<String, Outcomes> = HashMap::new();

        for event in self.events {
            match event {
                ToolEvent::Invoked { id, name } => {
                    names.insert(id, name);
                }
                ToolEvent::Returned { id, is_error } => {
                    let name = id
                        .and_then(|id| names.get(&id).cloned())
                        .unwrap_or_else(|| UNKNOWN_TOOL.to_string());
                    let entry = outcomes.entry(name).or_default();
                    if is_error {
                        entry.error += 1;
                    } else {
                        entry.success += 1;
                    }
                }
            }
        }

        let mut rates: Vec<ToolSuccessRate> = outcomes
            .into_iter()
            .filter(|(_, o)| o.success + o.error > 0)
            .map(|(tool_name, o)| {
                let total = o.success + o.error;
                ToolSuccessRate {
                    tool_name,
                    total_calls: total,
                    success_count: o.success,
                    error_count: o.error,
                    success_rate: round_to(o.success as f64 / total as f64, 4),
                }
            })
            .collect();
        rates.sort_by(|a, b| {
            b.total_calls
                .cmp(&a.total_calls)
                .then_with(|| a.tool_name.cmp(&b.tool_name))
        });
        rates
    }
}
