use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use ragstream::view::{Panel, ViewSink, ViewUpdate};

/// Sink that keeps every update it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub updates: Vec<ViewUpdate>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn panels(&self) -> Vec<&Panel> {
        self.updates
            .iter()
            .filter_map(|update| match update {
                ViewUpdate::Panel(panel) => Some(panel),
                ViewUpdate::ModeLabel(_) => None,
            })
            .collect()
    }

    pub fn last_panel(&self) -> Option<&Panel> {
        self.panels().last().copied()
    }

    pub fn mode_labels(&self) -> Vec<&str> {
        self.updates
            .iter()
            .filter_map(|update| match update {
                ViewUpdate::ModeLabel(label) => Some(label.as_str()),
                ViewUpdate::Panel(_) => None,
            })
            .collect()
    }
}

impl ViewSink for RecordingSink {
    fn apply(&mut self, update: &ViewUpdate) {
        self.updates.push(update.clone());
    }
}

/// Join lines into an NDJSON body
#[allow(dead_code)]
pub fn ndjson(lines: &[&str]) -> Vec<u8> {
    let mut body = lines.join("\n");
    body.push('\n');
    body.into_bytes()
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
