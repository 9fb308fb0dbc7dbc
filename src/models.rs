use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Version of the serialized result document.
pub const SCHEMA_VERSION: u32 = 2;

// --- Raw JSONL event types ---

/// One decoded line of an event stream. Every field is optional; consumers
/// state their own default. Empty strings are normalized to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRecord {
    pub kind: Option<String>,
    pub subtype: Option<String>,
    pub uuid: Option<String>,
    pub parent_uuid: Option<String>,
    pub timestamp: Option<String>,
    pub cwd: Option<String>,
    pub duration_ms: Option<f64>,
    pub retry_in_ms: Option<f64>,
    pub error: Option<Value>,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    ToolUse {
        id: Option<String>,
        name: Option<String>,
        subagent: Option<String>,
    },
    ToolResult {
        tool_use_id: Option<String>,
        is_error: bool,
    },
    Thinking {
        chars: usize,
    },
    Other,
}

impl EventRecord {
    pub fn from_value(value: &Value) -> Self {
        let content = value
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_array())
            .map(|blocks| blocks.iter().map(ContentBlock::from_value).collect())
            .unwrap_or_default();

        Self {
            kind: text_field(value, "type"),
            subtype: text_field(value, "subtype"),
            uuid: text_field(value, "uuid"),
            parent_uuid: text_field(value, "parentUuid"),
            timestamp: text_field(value, "timestamp"),
            cwd: text_field(value, "cwd"),
            duration_ms: value.get("durationMs").and_then(|v| v.as_f64()),
            retry_in_ms: value.get("retryInMs").and_then(|v| v.as_f64()),
            error: value.get("error").filter(|e| !e.is_null()).cloned(),
            content,
        }
    }

    /// True for user and assistant turns, the events counted as messages.
    pub fn is_message(&self) -> bool {
        matches!(self.kind.as_deref(), Some("user") | Some("assistant"))
    }

    /// Calendar day of the event, the first ten characters of its timestamp.
    pub fn day(&self) -> Option<String> {
        self.timestamp.as_deref().map(day_key)
    }
}

impl ContentBlock {
    fn from_value(block: &Value) -> Self {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("tool_use") => ContentBlock::ToolUse {
                id: text_field(block, "id"),
                name: text_field(block, "name"),
                subagent: block
                    .get("input")
                    .and_then(|input| text_field(input, "subagent_type")),
            },
            Some("tool_result") => ContentBlock::ToolResult {
                tool_use_id: text_field(block, "tool_use_id"),
                is_error: block
                    .get("is_error")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            },
            Some("thinking") => ContentBlock::Thinking {
                chars: block
                    .get("thinking")
                    .and_then(|t| t.as_str())
                    .map(|t| t.chars().count())
                    .unwrap_or(0),
            },
            _ => ContentBlock::Other,
        }
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Date bucket key: the first ten characters of an ISO-8601 timestamp.
pub fn day_key(timestamp: &str) -> String {
    timestamp.chars().take(10).collect()
}

/// Deserialize an explicit `null` as the field's default. Missing fields
/// still need `#[serde(default)]`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of a project's `sessions-index.json`. `null` reads as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionIndexEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub session_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub project_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub first_prompt: String,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub created: String,
    #[serde(deserialize_with = "null_as_default")]
    pub modified: String,
    pub git_branch: Option<String>,
}

// --- Scanned inputs ---

#[derive(Debug, Clone)]
pub struct SessionFile {
    pub id: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct ScannedProject {
    pub id: String,
    pub dir: PathBuf,
    pub sessions_index: Option<PathBuf>,
    pub session_files: Vec<SessionFile>,
}

#[derive(Debug, Clone)]
pub struct FileHistorySession {
    pub session_id: String,
    pub entries: Vec<String>,
}

/// Every input the aggregators read, enumerated once per run.
#[derive(Debug, Clone, Default)]
pub struct ClaudeFolder {
    pub root: PathBuf,
    pub stats_cache: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub installed_plugins: Option<PathBuf>,
    pub todo_files: Option<Vec<PathBuf>>,
    pub file_history: Option<Vec<FileHistorySession>>,
    pub plan_files: Option<Vec<PathBuf>>,
    pub projects: Vec<ScannedProject>,
}

impl ClaudeFolder {
    pub fn session_files(&self) -> impl Iterator<Item = &SessionFile> {
        self.projects.iter().flat_map(|p| p.session_files.iter())
    }
}

// --- Token accounting ---

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_creation_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyModelTokens {
    pub date: String,
    pub tokens_by_model: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyActivity {
    pub date: String,
    pub message_count: u64,
    pub session_count: u64,
    pub tool_call_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongestSession {
    pub session_id: String,
    pub duration_ms: u64,
    pub message_count: u64,
    pub timestamp: String,
}

// --- Aggregated result ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub path: String,
    pub name: String,
    pub session_count: u64,
    pub message_count: u64,
    pub first_session: Option<String>,
    pub last_session: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Builtin,
    Mcp,
    Subagent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsage {
    pub name: String,
    pub count: u64,
    pub category: ToolCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlashCommandUsage {
    pub command: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCost {
    pub date: String,
    pub cost: f64,
    pub cost_by_model: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub total_cost_usd: f64,
    pub cost_by_model: BTreeMap<String, f64>,
    pub cost_by_day: Vec<DailyCost>,
    pub cache_savings_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    pub total_cache_read_tokens: u64,
    pub total_cache_write_tokens: u64,
    pub cache_hit_ratio: f64,
    pub tokens_saved: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnDuration {
    pub date: String,
    pub avg_duration_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorStats {
    pub date: String,
    pub error_type: String,
    pub count: u64,
    pub avg_retry_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_created: u64,
    pub total_completed: u64,
    pub completion_rate: f64,
    pub by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEditStats {
    pub total_files_edited: u64,
    pub total_versions: u64,
    pub by_session: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingUsage {
    pub sessions_with_thinking: u64,
    pub total_thinking_blocks: u64,
    pub total_thinking_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateCount {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub total_plans: u64,
    pub by_date: Vec<DateCount>,
    pub avg_plan_lines: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDepth {
    pub max_depth: u64,
    pub avg_depth: f64,
    pub sessions_with_children: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSuccessRate {
    pub tool_name: String,
    pub total_calls: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub success_rate: f64,
}

/// The consolidated analytics document handed to exporters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaudeStats {
    pub schema_version: u32,
    pub generated_at: String,
    pub claude_folder_path: String,
    pub first_session_date: Option<String>,
    pub last_computed_date: Option<String>,

    pub total_sessions: u64,
    pub total_messages: u64,
    pub total_tool_calls: u64,
    pub total_projects: u64,

    pub daily_activity: Vec<DailyActivity>,
    pub daily_model_tokens: Vec<DailyModelTokens>,
    pub model_usage: Vec<ModelUsage>,
    pub longest_session: Option<LongestSession>,
    pub hour_counts: BTreeMap<String, u64>,

    pub project_stats: Vec<ProjectStats>,
    pub tool_usage: Vec<ToolUsage>,
    pub slash_command_usage: Vec<SlashCommandUsage>,
    pub enabled_plugins: Vec<String>,
    pub installed_plugins: Vec<String>,

    pub cost_estimate: Option<CostEstimate>,
    pub cache_metrics: Option<CacheMetrics>,
    pub turn_durations: Vec<TurnDuration>,
    pub api_errors: Vec<ApiErrorStats>,
    pub task_stats: Option<TaskStats>,
    pub file_edit_stats: Option<FileEditStats>,
    pub thinking_usage: Option<ThinkingUsage>,
    pub plan_stats: Option<PlanStats>,
    pub session_depth: Option<SessionDepth>,
    pub tool_success_rates: Vec<ToolSuccessRate>,
}
