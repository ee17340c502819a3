use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL record of the actions taken in one run.
/// Credentials are never written here.
pub struct ActivityLog {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl ActivityLog {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn run_start(&mut self, base_url: &str, store: &str) -> Result<()> {
        self.log(
            "run_start",
            serde_json::json!({ "base_url": base_url, "store": store }),
        )
    }

    /// Outcome of one user action; `error_kind` is None on success
    pub fn action(
        &mut self,
        action: &str,
        target: Option<&str>,
        error_kind: Option<&str>,
        message: Option<&str>,
    ) -> Result<()> {
        self.log(
            "action",
            serde_json::json!({
                "action": action,
                "target": target,
                "ok": error_kind.is_none(),
                "error_kind": error_kind,
                "message": message,
            }),
        )
    }

    pub fn session_change(&mut self, username: Option<&str>) -> Result<()> {
        self.log("session_change", serde_json::json!({ "username": username }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lines_are_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.jsonl");
        let mut log = ActivityLog::new(&path, "run-1").unwrap();
        log.run_start("http://localhost:3001/api", "memory").unwrap();
        log.action("delete", Some("42"), Some("application"), Some("not found"))
            .unwrap();
        log.session_change(Some("alice")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let events: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["type"], "run_start");
        assert_eq!(events[1]["run_id"], "run-1");
        assert_eq!(events[1]["ok"], false);
        assert_eq!(events[1]["message"], "not found");
        assert_eq!(events[2]["username"], "alice");
    }

    #[test]
    fn test_appends_to_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.jsonl");
        ActivityLog::new(&path, "a").unwrap().session_change(None).unwrap();
        ActivityLog::new(&path, "b").unwrap().session_change(None).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
