use anyhow::Result;
use chrono::Local;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info};

use crate::api_errors::ApiErrorFold;
use crate::cost::{cache_metrics, estimate_cost};
use crate::depth::ThreadGraph;
use crate::models::{
    ClaudeFolder, ClaudeStats, EventRecord, ProjectStats, SessionFile, ToolCategory, SCHEMA_VERSION,
};
use crate::parser::{fold_stream, merge_all, EventFold};
use crate::projects::{aggregate_project, read_sessions_index, ProjectFacts};
use crate::scanner::scan_claude_folder;
use crate::side_files::{
    enabled_plugins, file_edit_stats, installed_plugins, plan_stats, slash_commands, task_stats,
};
use crate::stats_cache::{read_stats_cache, StatsCache};
use crate::thinking::ThinkingFold;
use crate::tools::{ToolOutcomeLog, ToolUsageCounter};
use crate::turns::TurnDurationFold;

/// Every event fold, run together so each stream is read once.
#[derive(Debug, Default)]
pub struct StreamScan {
    pub project: ProjectFacts,
    pub tools: ToolUsageCounter,
    pub outcomes: ToolOutcomeLog,
    pub turns: TurnDurationFold,
    pub api_errors: ApiErrorFold,
    pub thinking: ThinkingFold,
    pub threads: ThreadGraph,
}

impl EventFold for StreamScan {
    type Output = StreamScan;

    fn observe(&mut self, record: &EventRecord) {
        self.project.observe(record);
        self.tools.observe(record);
        self.outcomes.observe(record);
        self.turns.observe(record);
        self.api_errors.observe(record);
        self.thinking.observe(record);
        self.threads.observe(record);
    }

    fn end_stream(&mut self, stream: &SessionFile) {
        self.project.end_stream(stream);
        self.tools.end_stream(stream);
        self.outcomes.end_stream(stream);
        self.turns.end_stream(stream);
        self.api_errors.end_stream(stream);
        self.thinking.end_stream(stream);
        self.threads.end_stream(stream);
    }

    fn merge(&mut self, later: Self) {
        self.project.merge(later.project);
        self.tools.merge(later.tools);
        self.outcomes.merge(later.outcomes);
        self.turns.merge(later.turns);
        self.api_errors.merge(later.api_errors);
        self.thinking.merge(later.thinking);
        self.threads.merge(later.threads);
    }

    fn finish(self) -> StreamScan {
        self
    }
}

/// Scan `root` and compute the full result document.
///
/// Fails only when `root` is not a directory.
pub fn collect_stats(root: &Path) -> Result<ClaudeStats> {
    let folder = scan_claude_folder(root)?;
    info!(
        root = %root.display(),
        projects = folder.projects.len(),
        streams = folder.session_files().count(),
        bytes = folder.session_files().map(|f| f.size).sum::<u64>(),
        "Scanned Claude folder"
    );

    let cache = folder.stats_cache.as_deref().and_then(read_stats_cache);
    if cache.is_none() {
        debug!("No usable stats cache; cache-only totals default to zero");
    }

    // Per project: fold its streams, then reconcile with its session index.
    // `collect` keeps enumeration order regardless of scheduling.
    let scanned: Vec<(Option<ProjectStats>, StreamScan)> = folder
        .projects
        .par_iter()
        .map(|project| {
            let partials: Vec<StreamScan> = project
                .session_files
                .par_iter()
                .map(fold_stream::<StreamScan>)
                .collect();
            let mut scan: StreamScan = merge_all(partials);

            let facts = std::mem::take(&mut scan.project);
            let index = project
                .sessions_index
                .as_deref()
                .map(read_sessions_index)
                .unwrap_or_default();
            (aggregate_project(project, &index, &facts), scan)
        })
        .collect();

    let mut projects = Vec::new();
    let mut events = StreamScan::default();
    for (project, scan) in scanned {
        projects.extend(project);
        events.merge(scan);
    }
    projects.sort_by(|a, b| b.message_count.cmp(&a.message_count));

    let generated_at = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    let stats = assemble_stats(&folder, cache, projects, events, generated_at);
    info!(
        projects = stats.total_projects,
        tools = stats.tool_usage.len(),
        "Computed stats"
    );
    Ok(stats)
}

/// Combine the cache summary, project records, event folds and side files
/// into one document.
///
/// Session and message totals and the date range come only from the cache
/// summary. Tool calls fall back to the daily activity sum, then to the
/// builtin tool tally.
pub fn assemble_stats(
    folder: &ClaudeFolder,
    cache: Option<StatsCache>,
    project_stats: Vec<ProjectStats>,
    events: StreamScan,
    generated_at: String,
) -> ClaudeStats {
    let cache = cache.unwrap_or_default();
    let tool_usage = events.tools.finish();

    let total_tool_calls = cache.total_tool_calls.unwrap_or_else(|| {
        let daily: u64 = cache.daily_activity.iter().map(|d| d.tool_call_count).sum();
        if daily > 0 {
            daily
        } else {
            tool_usage
                .iter()
                .filter(|t| t.category == ToolCategory::Builtin)
                .map(|t| t.count)
                .sum()
        }
    });

    ClaudeStats {
        schema_version: SCHEMA_VERSION,
        generated_at,
        claude_folder_path: folder.root.display().to_string(),
        first_session_date: cache.first_session_date,
        last_computed_date: cache.last_computed_date,

        total_sessions: cache.total_sessions.unwrap_or(0),
        total_messages: cache.total_messages.unwrap_or(0),
        total_tool_calls,
        total_projects: project_stats.len() as u64,

        cost_estimate: estimate_cost(&cache.model_usage, &cache.daily_model_tokens),
        cache_metrics: cache_metrics(&cache.model_usage),

        daily_activity: cache.daily_activity,
        daily_model_tokens: cache.daily_model_tokens,
        model_usage: cache.model_usage,
        longest_session: cache.longest_session,
        hour_counts: cache.hour_counts,

        project_stats,
        tool_usage,
        slash_command_usage: slash_commands(folder.history.as_deref()),
        enabled_plugins: enabled_plugins(folder.settings.as_deref()),
        installed_plugins: installed_plugins(folder.installed_plugins.as_deref()),

        turn_durations: events.turns.finish(),
        api_errors: events.api_errors.finish(),
        task_stats: task_stats(folder.todo_files.as_deref()),
        file_edit_stats: file_edit_stats(folder.file_history.as_deref()),
        thinking_usage: events.thinking.finish(),
        plan_stats: plan_stats(folder.plan_files.as_deref()),
        session_depth: events.threads.finish(),
        tool_success_rates: events.outcomes.finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyActivity, ModelUsage};
    use serde_json::json;

    fn tool_use(name: &str) -> EventRecord {
        EventRecord::from_value(&json!({
            "type": "assistant",
            "message": {"content": [{"type": "tool_use", "id": name, "name": name}]}
        }))
    }

    fn scan_with_tools(names: &[&str]) -> StreamScan {
        let mut scan = StreamScan::default();
        for name in names {
            scan.observe(&tool_use(name));
        }
        scan
    }

    fn activity(date: &str, tool_calls: u64) -> DailyActivity {
        DailyActivity {
            date: date.into(),
            message_count: 1,
            session_count: 1,
            tool_call_count: tool_calls,
        }
    }

    fn assemble(cache: Option<StatsCache>, scan: StreamScan) -> ClaudeStats {
        let folder = ClaudeFolder {
            root: "/tmp/claude".into(),
            ..Default::default()
        };
        assemble_stats(&folder, cache, Vec::new(), scan, "now".into())
    }

    #[test]
    fn test_tool_calls_prefer_cache_value() {
        let cache = StatsCache {
            total_tool_calls: Some(0),
            daily_activity: vec![activity("2025-01-01", 9)],
            ..Default::default()
        };
        let stats = assemble(Some(cache), scan_with_tools(&["Bash"]));
        assert_eq!(stats.total_tool_calls, 0);
    }

    #[test]
    fn test_tool_calls_fall_back_to_daily_sum() {
        let cache = StatsCache {
            daily_activity: vec![activity("2025-01-01", 4), activity("2025-01-02", 5)],
            ..Default::default()
        };
        let stats = assemble(Some(cache), scan_with_tools(&["Bash"]));
        assert_eq!(stats.total_tool_calls, 9);
    }

    #[test]
    fn test_tool_calls_fall_back_to_builtin_tally() {
        let cache = StatsCache {
            daily_activity: vec![activity("2025-01-01", 0)],
            ..Default::default()
        };
        let stats = assemble(
            Some(cache),
            scan_with_tools(&["Bash", "Read", "mcp__github__search", "Bash"]),
        );
        assert_eq!(stats.total_tool_calls, 3);
    }

    #[test]
    fn test_without_cache_totals_default() {
        let stats = assemble(None, StreamScan::default());
        assert_eq!(stats.schema_version, SCHEMA_VERSION);
        assert_eq!(stats.claude_folder_path, "/tmp/claude");
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.total_messages, 0);
        assert_eq!(stats.first_session_date, None);
        assert!(stats.cost_estimate.is_none());
        assert!(stats.cache_metrics.is_none());
        assert!(stats.thinking_usage.is_none());
        assert!(stats.session_depth.is_none());
        assert!(stats.task_stats.is_none());
        assert!(stats.plan_stats.is_none());
        assert!(stats.file_edit_stats.is_none());
    }

    #[test]
    fn test_cache_totals_and_costs_flow_through() {
        let cache = StatsCache {
            total_sessions: Some(12),
            total_messages: Some(340),
            first_session_date: Some("2025-01-01T00:00:00Z".into()),
            model_usage: vec![ModelUsage {
                model: "claude-3-opus-20240229".into(),
                input_tokens: 1_000_000,
                ..Default::default()
            }],
            ..Default::default()
        };
        let stats = assemble(Some(cache), StreamScan::default());
        assert_eq!(stats.total_sessions, 12);
        assert_eq!(stats.total_messages, 340);
        assert_eq!(stats.cost_estimate.unwrap().total_cost_usd, 15.0);
        assert_eq!(stats.cache_metrics.unwrap().cache_hit_ratio, 0.0);
    }

    #[test]
    fn test_stream_scan_feeds_every_fold() {
        let mut scan = StreamScan::default();
        scan.observe(&EventRecord::from_value(&json!({
            "type": "user",
            "uuid": "a",
            "cwd": "/work/app",
            "message": {"content": [{"type": "thinking", "thinking": "abcd"}]}
        })));
        scan.end_stream(&SessionFile {
            id: "s1".into(),
            path: "/p/s1.jsonl".into(),
            size: 0,
        });

        assert_eq!(scan.project.message_count, 1);
        assert_eq!(scan.project.cwd.as_deref(), Some("/work/app"));
        let stats = assemble(None, scan);
        assert_eq!(stats.thinking_usage.unwrap().sessions_with_thinking, 1);
        assert_eq!(stats.session_depth.unwrap().max_depth, 1);
    }
}
