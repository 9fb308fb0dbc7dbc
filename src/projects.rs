use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::models::{null_as_default, EventRecord, ProjectStats, ScannedProject, SessionIndexEntry};
use crate::parser::EventFold;

/// Path segments treated as containers rather than project names.
const CONTAINER_SEGMENTS: &[&str] = &[
    "Users",
    "home",
    "workspace",
    "Documents",
    "Personal",
    "Projects",
    "Downloads",
];

/// Per-project facts gathered from its event streams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFacts {
    pub cwd: Option<String>,
    pub message_count: u64,
}

impl EventFold for ProjectFacts {
    type Output = ProjectFacts;

    fn observe(&mut self, record: &EventRecord) {
        if !record.is_message() {
            return;
        }
        self.message_count += 1;
        if self.cwd.is_none() {
            self.cwd = record.cwd.clone();
        }
    }

    fn merge(&mut self, later: Self) {
        self.message_count += later.message_count;
        if self.cwd.is_none() {
            self.cwd = later.cwd;
        }
    }

    fn finish(self) -> Self {
        self
    }
}

#[derive(Deserialize)]
struct SessionsIndex {
    #[serde(default, deserialize_with = "null_as_default")]
    entries: Vec<Value>,
}

/// Read a project's session index. Entries with unexpected field types are
/// skipped individually.
pub fn read_sessions_index(path: &Path) -> Vec<SessionIndexEntry> {
    let index: SessionsIndex = match fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|raw| serde_json::from_str(&raw).map_err(anyhow::Error::from))
    {
        Ok(index) => index,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse sessions index");
            return Vec::new();
        }
    };

    index
        .entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed session index entry");
                None
            }
        })
        .collect()
}

/// Reconcile a project's session index with its raw streams. Returns `None`
/// for projects with no sessions.
pub fn aggregate_project(
    project: &ScannedProject,
    index: &[SessionIndexEntry],
    facts: &ProjectFacts,
) -> Option<ProjectStats> {
    let session_count = if index.is_empty() {
        project.session_files.len() as u64
    } else {
        index.len() as u64
    };
    if session_count == 0 {
        return None;
    }

    let path = index
        .first()
        .map(|entry| entry.project_path.clone())
        .filter(|p| !p.is_empty())
        .or_else(|| facts.cwd.clone())
        .unwrap_or_else(|| decode_folder_name(&project.id));

    let (message_count, first_session, last_session) = if index.is_empty() {
        (facts.message_count, None, None)
    } else {
        (
            index.iter().map(|e| e.message_count).sum(),
            index
                .iter()
                .map(|e| e.created.as_str())
                .filter(|c| !c.is_empty())
                .min()
                .map(str::to_string),
            index
                .iter()
                .map(|e| e.modified.as_str())
                .filter(|m| !m.is_empty())
                .max()
                .map(str::to_string),
        )
    };

    Some(ProjectStats {
        name: display_name(&path),
        path,
        session_count,
        message_count,
        first_session,
        last_session,
    })
}

/// `-Users-foo-bar` -> `/Users/foo/bar`. Names without the leading marker
/// are returned as is.
pub fn decode_folder_name(folder_name: &str) -> String {
    match folder_name.strip_prefix('-') {
        Some(rest) => format!("/{}", rest.replace('-', "/")),
        None => folder_name.to_string(),
    }
}

/// Short, readable project name: the one or two segments after the last
/// container segment of the path.
pub fn display_name(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return path.to_string();
    }

    let start = parts
        .iter()
        .rposition(|part| CONTAINER_SEGMENTS.contains(part))
        .map(|i| i + 1)
        .unwrap_or(0);

    let meaningful = &parts[start..];
    match meaningful.len() {
        0 => parts[parts.len() - 1].to_string(),
        1 | 2 => meaningful.join("/"),
        n => meaningful[n - 2..].join("/"),
    }
}
