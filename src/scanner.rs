use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{ClaudeFolder, FileHistorySession, ScannedProject, SessionFile};

pub const STATS_CACHE_FILE: &str = "stats-cache.json";
pub const SESSIONS_INDEX_FILE: &str = "sessions-index.json";

pub fn default_claude_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".claude")
}

/// Enumerate every input under `root`. Absent files and directories come back
/// as `None` or empty; only a missing `root` is an error.
pub fn scan_claude_folder(root: &Path) -> Result<ClaudeFolder> {
    if !root.is_dir() {
        bail!("Claude folder not found at {}", root.display());
    }

    Ok(ClaudeFolder {
        root: root.to_path_buf(),
        stats_cache: existing_file(root.join(STATS_CACHE_FILE)),
        history: existing_file(root.join("history.jsonl")),
        settings: existing_file(root.join("settings.json")),
        installed_plugins: existing_file(root.join("plugins").join("installed_plugins.json")),
        todo_files: existing_dir(root.join("todos"))
            .map(|dir| files_with_extension(&dir, "json")),
        file_history: existing_dir(root.join("file-history")).map(|dir| scan_file_history(&dir)),
        plan_files: existing_dir(root.join("plans")).map(|dir| files_with_extension(&dir, "md")),
        projects: scan_projects(&root.join("projects")),
    })
}

fn scan_projects(projects_dir: &Path) -> Vec<ScannedProject> {
    let mut projects = Vec::new();

    for entry in sorted_entries(projects_dir) {
        let project_id = entry.file_name().to_string_lossy().to_string();
        if project_id.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        let project_dir = entry.path();
        let session_files = files_with_extension(&project_dir, "jsonl")
            .into_iter()
            .map(|path| {
                let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                let id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                SessionFile { id, path, size }
            })
            .collect();

        projects.push(ScannedProject {
            id: project_id,
            sessions_index: existing_file(project_dir.join(SESSIONS_INDEX_FILE)),
            dir: project_dir,
            session_files,
        });
    }

    projects
}

fn scan_file_history(dir: &Path) -> Vec<FileHistorySession> {
    sorted_entries(dir)
        .into_iter()
        .filter(|entry| entry.path().is_dir())
        .map(|entry| FileHistorySession {
            session_id: entry.file_name().to_string_lossy().to_string(),
            entries: sorted_entries(&entry.path())
                .into_iter()
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
        })
        .collect()
}

fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == extension))
        .collect()
}

/// Directory entries sorted by name. Unreadable directories are logged and
/// treated as empty.
fn sorted_entries(dir: &Path) -> Vec<fs::DirEntry> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if dir.exists() {
                warn!(path = %dir.display(), error = %e, "Failed to list directory");
            }
            return Vec::new();
        }
    };

    let mut entries: Vec<fs::DirEntry> = entries.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    entries
}

fn existing_file(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn existing_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}
