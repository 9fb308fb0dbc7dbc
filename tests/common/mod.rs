#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway `.claude` folder.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_json(&self, relative: &str, value: &Value) -> PathBuf {
        self.write(relative, &serde_json::to_string_pretty(value).unwrap())
    }

    /// Write an event stream, one JSON value per line.
    pub fn write_stream(&self, project: &str, session: &str, lines: &[Value]) -> PathBuf {
        let body: String = lines.iter().map(|l| format!("{l}\n")).collect();
        self.write(&format!("projects/{project}/{session}.jsonl"), &body)
    }
}

pub fn user(uuid: &str, parent: Option<&str>, ts: &str, cwd: &str) -> Value {
    json!({
        "type": "user",
        "uuid": uuid,
        "parentUuid": parent,
        "timestamp": ts,
        "cwd": cwd,
        "message": {"role": "user", "content": "hello"}
    })
}

pub fn tool_call(uuid: &str, parent: &str, ts: &str, id: &str, name: &str) -> Value {
    json!({
        "type": "assistant",
        "uuid": uuid,
        "parentUuid": parent,
        "timestamp": ts,
        "message": {"content": [
            {"type": "thinking", "thinking": "let me look at this file first"},
            {"type": "tool_use", "id": id, "name": name, "input": {}}
        ]}
    })
}

pub fn tool_result(uuid: &str, parent: &str, ts: &str, id: &str, is_error: bool) -> Value {
    json!({
        "type": "user",
        "uuid": uuid,
        "parentUuid": parent,
        "timestamp": ts,
        "message": {"content": [
            {"type": "tool_result", "tool_use_id": id, "is_error": is_error}
        ]}
    })
}

pub fn turn_duration(ts: &str, ms: u64) -> Value {
    json!({"type": "system", "subtype": "turn_duration", "durationMs": ms, "timestamp": ts})
}

pub fn api_error(ts: &str, kind: &str, retry_ms: u64) -> Value {
    json!({
        "type": "system",
        "subtype": "api_error",
        "timestamp": ts,
        "retryInMs": retry_ms,
        "error": {"error": {"type": "error", "error": {"type": kind}}}
    })
}

pub fn stats_cache() -> Value {
    json!({
        "version": 1,
        "lastComputedDate": "2025-01-03",
        "firstSessionDate": "2025-01-01T09:00:00.000Z",
        "totalSessions": 3,
        "totalMessages": 42,
        "dailyActivity": [
            {"date": "2025-01-01", "messageCount": 20, "sessionCount": 2, "toolCallCount": 5},
            {"date": "2025-01-02", "messageCount": 22, "sessionCount": 1, "toolCallCount": 7}
        ],
        "dailyModelTokens": [
            {"date": "2025-01-01", "tokensByModel": {"claude-opus-4-20250514": 1000}}
        ],
        "modelUsage": {
            "claude-3-opus-20240229": {
                "inputTokens": 1000000,
                "outputTokens": 0,
                "cacheReadInputTokens": 300,
                "cacheCreationInputTokens": 100
            }
        },
        "longestSession": {
            "sessionId": "s1",
            "duration": 3600000,
            "messageCount": 30,
            "timestamp": "2025-01-01T09:00:00.000Z"
        },
        "hourCounts": {"9": 10, "14": 32}
    })
}

/// A folder exercising every input kind.
pub fn full_fixture() -> Fixture {
    let fx = Fixture::new();
    fx.write_json("stats-cache.json", &stats_cache());

    fx.write_stream(
        "-Users-alice-workspace-acme-api",
        "s1",
        &[
            user("a", None, "2025-01-01T09:00:00.000Z", "/Users/alice/workspace/acme/api"),
            tool_call("b", "a", "2025-01-01T09:00:01.000Z", "t1", "Bash"),
            tool_result("c", "b", "2025-01-01T09:00:02.000Z", "t1", false),
            turn_duration("2025-01-01T09:00:03.000Z", 1200),
            api_error("2025-01-01T09:00:04.000Z", "overloaded_error", 500),
        ],
    );
    fx.write(
        "projects/-Users-alice-workspace-acme-api/s2.jsonl",
        "not json at all\n{\"type\": \"assistant\", \"uuid\": \"d\", \"parentUuid\": \"c\"}\n",
    );
    fx.write_stream(
        "-Users-alice-Projects-blog",
        "s3",
        &[tool_result("e", "zz", "2025-01-02T10:00:00.000Z", "t404", true)],
    );
    fx.write_json(
        "projects/-Users-alice-Projects-blog/sessions-index.json",
        &json!({"entries": [{
            "sessionId": "s3",
            "projectPath": "/Users/alice/Projects/blog",
            "messageCount": 1,
            "created": "2025-01-02T10:00:00.000Z",
            "modified": "2025-01-02T11:00:00.000Z"
        }]}),
    );
    fs::create_dir_all(fx.root().join("projects/.hidden")).unwrap();
    fs::create_dir_all(fx.root().join("projects/-empty")).unwrap();

    fx.write(
        "history.jsonl",
        "{\"display\": \"/init\"}\n{\"display\": \"/review please\"}\n{\"display\": \"/init\"}\n",
    );
    fx.write_json("settings.json", &json!({"enabledPlugins": {"docs@market": true}}));
    fx.write_json(
        "plugins/installed_plugins.json",
        &json!({"plugins": {"docs@market": {}, "lint@market": {}}}),
    );
    fx.write_json(
        "todos/s1.json",
        &json!([{"status": "completed"}, {"status": "pending"}]),
    );
    fx.write("file-history/s1/abc@v1", "v1");
    fx.write("file-history/s1/abc@v2", "v2");
    fx.write("plans/plan.md", "# Plan\n- one\n- two\n");
    fx
}
