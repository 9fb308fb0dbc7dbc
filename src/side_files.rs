//! Readers for the well-known files that sit beside the event streams:
//! task lists, file-edit history, plans, prompt history and plugin registries.

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::format::round_to;
use crate::models::{DateCount, FileEditStats, FileHistorySession, PlanStats, SlashCommandUsage, TaskStats};
use crate::parser::for_each_line;

const COMPLETED: &str = "completed";
const UNKNOWN_STATUS: &str = "unknown";
const VERSION_MARKER: &str = "@v";

/// Read a whole-file JSON document, logging and returning `None` on failure.
fn read_json(path: &Path) -> Option<Value> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read file");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse JSON");
            None
        }
    }
}

/// Task completion over `todos/*.json`. Each file holds a list of tasks or
/// an object with the list under `todos`.
pub fn task_stats(todo_files: Option<&[PathBuf]>) -> Option<TaskStats> {
    let files = todo_files?;
    let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
    let mut total = 0u64;

    for path in files {
        let Some(json) = read_json(path) else {
            continue;
        };
        let tasks = match &json {
            Value::Array(tasks) => tasks.as_slice(),
            Value::Object(obj) => obj
                .get("todos")
                .and_then(|t| t.as_array())
                .map(|t| t.as_slice())
                .unwrap_or_default(),
            _ => {
                warn!(path = %path.display(), "Task file is neither a list nor an object");
                continue;
            }
        };

        for task in tasks.iter().filter_map(|t| t.as_object()) {
            let status = task
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or(UNKNOWN_STATUS);
            *by_status.entry(status.to_string()).or_insert(0) += 1;
            total += 1;
        }
    }

    let completed = by_status.get(COMPLETED).copied().unwrap_or(0);
    let rate = if total > 0 {
        completed as f64 / total as f64
    } else {
        0.0
    };

    Some(TaskStats {
        total_created: total,
        total_completed: completed,
        completion_rate: round_to(rate, 4),
        by_status,
    })
}

/// Version counts over `file-history/<session>/<hash>@v<n>`.
pub fn file_edit_stats(sessions: Option<&[FileHistorySession]>) -> Option<FileEditStats> {
    let sessions = sessions?;
    let mut distinct: HashSet<(&str, &str)> = HashSet::new();
    let mut by_session = BTreeMap::new();
    let mut total_versions = 0u64;

    for session in sessions {
        let mut versions = 0u64;
        for name in &session.entries {
            let Some((hash, _)) = name.split_once(VERSION_MARKER) else {
                continue;
            };
            distinct.insert((session.session_id.as_str(), hash));
            versions += 1;
        }
        if versions > 0 {
            by_session.insert(session.session_id.clone(), versions);
            total_versions += versions;
        }
    }

    Some(FileEditStats {
        total_files_edited: distinct.len() as u64,
        total_versions,
        by_session,
    })
}

/// Plan documents bucketed by local last-modified date.
pub fn plan_stats(plan_files: Option<&[PathBuf]>) -> Option<PlanStats> {
    let files = plan_files?;
    let mut by_date: BTreeMap<String, u64> = BTreeMap::new();
    let mut total_plans = 0u64;
    let mut total_lines = 0u64;

    for path in files {
        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat plan");
                continue;
            }
        };
        let date = DateTime::<Local>::from(modified).format("%Y-%m-%d").to_string();
        *by_date.entry(date).or_insert(0) += 1;
        total_plans += 1;

        match fs::read_to_string(path) {
            Ok(body) => total_lines += body.lines().count() as u64,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to read plan"),
        }
    }

    let avg = if total_plans > 0 {
        total_lines as f64 / total_plans as f64
    } else {
        0.0
    };

    Some(PlanStats {
        total_plans,
        by_date: by_date
            .into_iter()
            .map(|(date, count)| DateCount { date, count })
            .collect(),
        avg_plan_lines: round_to(avg, 1),
    })
}

/// Leading `/word` of a prompt, if it starts with one.
pub fn slash_command(display: &str) -> Option<&str> {
    let rest = display.strip_prefix('/')?;
    let end = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    (end > 0).then(|| &display[..end + 1])
}

/// Slash-command tallies from `history.jsonl`.
pub fn slash_commands(history: Option<&Path>) -> Vec<SlashCommandUsage> {
    let Some(path) = history else {
        return Vec::new();
    };

    let mut counts: HashMap<String, u64> = HashMap::new();
    let result = for_each_line(path, |value| {
        let display = value.get("display").and_then(|d| d.as_str()).unwrap_or("");
        if let Some(command) = slash_command(display) {
            *counts.entry(command.to_string()).or_insert(0) += 1;
        }
    });
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Failed to read history");
    }

    let mut usage: Vec<SlashCommandUsage> = counts
        .into_iter()
        .map(|(command, count)| SlashCommandUsage { command, count })
        .collect();
    usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.command.cmp(&b.command)));
    usage
}

fn object_keys(path: Option<&Path>, key: &str) -> Vec<String> {
    let Some(path) = path else {
        return Vec::new();
    };
    let Some(json) = read_json(path) else {
        return Vec::new();
    };
    match json.get(key) {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(_) => {
            warn!(path = %path.display(), key, "Expected an object");
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Keys of `enabledPlugins` in `settings.json`.
pub fn enabled_plugins(settings: Option<&Path>) -> Vec<String> {
    object_keys(settings, "enabledPlugins")
}

/// Keys of `plugins` in `plugins/installed_plugins.json`.
pub fn installed_plugins(registry: Option<&Path>) -> Vec<String> {
    object_keys(registry, "plugins")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_task_stats() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        let c = dir.path().join("c.json");
        fs::write(&a, r#"[{"status": "completed"}, {"status": "pending"}, 3, {}]"#).unwrap();
        fs::write(&b, r#"{"todos": [{"status": "completed"}]}"#).unwrap();
        fs::write(&c, "not json").unwrap();

        let stats = task_stats(Some(&[a, b, c][..])).unwrap();
        assert_eq!(stats.total_created, 4);
        assert_eq!(stats.total_completed, 2);
        assert_eq!(stats.completion_rate, 0.5);
        assert_eq!(stats.by_status["unknown"], 1);
        assert_eq!(stats.by_status["pending"], 1);
    }

    #[test]
    fn test_task_stats_empty_and_absent() {
        let stats = task_stats(Some(&[][..])).unwrap();
        assert_eq!(stats.total_created, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert!(task_stats(None).is_none());
    }

    #[test]
    fn test_file_edit_stats() {
        let sessions = vec![
            FileHistorySession {
                session_id: "s1".into(),
                entries: vec!["aaa@v1".into(), "aaa@v2".into(), "bbb@v1".into(), "notes".into()],
            },
            FileHistorySession {
                session_id: "s2".into(),
                entries: vec!["aaa@v1".into()],
            },
            FileHistorySession {
                session_id: "s3".into(),
                entries: vec!["README".into()],
            },
        ];

        let stats = file_edit_stats(Some(sessions.as_slice())).unwrap();
        assert_eq!(stats.total_versions, 4);
        assert_eq!(stats.total_files_edited, 3);
        assert_eq!(
            stats.by_session,
            BTreeMap::from([("s1".to_string(), 3), ("s2".to_string(), 1)])
        );
        assert!(file_edit_stats(None).is_none());
    }

    #[test]
    fn test_plan_stats() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.md");
        let two = dir.path().join("two.md");
        fs::write(&one, "# Plan\n\n- step\n").unwrap();
        fs::write(&two, "single line without newline").unwrap();

        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_736_000_000);
        for path in [&one, &two] {
            File::options().write(true).open(path).unwrap().set_modified(mtime).unwrap();
        }
        let expected_date = DateTime::<Local>::from(mtime).format("%Y-%m-%d").to_string();

        let stats = plan_stats(Some(&[one, two][..])).unwrap();
        assert_eq!(stats.total_plans, 2);
        assert_eq!(stats.avg_plan_lines, 2.0);
        assert_eq!(
            stats.by_date,
            vec![DateCount {
                date: expected_date,
                count: 2,
            }]
        );
    }

    #[test]
    fn test_slash_command_token() {
        assert_eq!(slash_command("/commit -m fix"), Some("/commit"));
        assert_eq!(slash_command("/review_pr"), Some("/review_pr"));
        assert_eq!(slash_command("/ nothing"), None);
        assert_eq!(slash_command("plain prompt"), None);
        assert_eq!(slash_command("/"), None);
    }

    #[test]
    fn test_slash_commands_from_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history.jsonl");
        fs::write(
            &history,
            concat!(
                "{\"display\": \"/init\"}\n",
                "{\"display\": \"/clear now\"}\n",
                "broken\n",
                "{\"display\": \"/init again\"}\n",
                "{\"display\": \"hello\"}\n",
                "{\"other\": 1}\n",
            ),
        )
        .unwrap();

        let usage = slash_commands(Some(history.as_path()));
        assert_eq!(
            usage,
            vec![
                SlashCommandUsage {
                    command: "/init".into(),
                    count: 2,
                },
                SlashCommandUsage {
                    command: "/clear".into(),
                    count: 1,
                },
            ]
        );
        assert!(slash_commands(None).is_empty());
    }

    #[test]
    fn test_plugin_registries() {
        let dir = tempfile::tempdir().unwrap();
        let settings = dir.path().join("settings.json");
        let registry = dir.path().join("installed_plugins.json");
        fs::write(&settings, r#"{"enabledPlugins": {"b@x": true, "a@x": false}}"#).unwrap();
        fs::write(&registry, r#"{"plugins": {"a@x": {}}}"#).unwrap();

        let mut enabled = enabled_plugins(Some(settings.as_path()));
        enabled.sort();
        assert_eq!(enabled, vec!["a@x", "b@x"]);
        assert_eq!(installed_plugins(Some(registry.as_path())), vec!["a@x"]);

        fs::write(&settings, "{").unwrap();
        assert!(enabled_plugins(Some(settings.as_path())).is_empty());
        assert!(installed_plugins(None).is_empty());
    }
}
