//! FileSink - appends accepted wire events as JSON lines

use contracts::{ContractError, DataSink, WireEvent};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// JSON lines output file
    pub path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./events.jsonl"));

        Self { path }
    }
}

/// Sink that appends one JSON document per event
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open (or create) the output file in append mode
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            writer: BufWriter::new(file),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }

    fn append(&mut self, event: &WireEvent) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, event).map_err(std::io::Error::other)?;
        self.writer.write_all(b"\n")
    }

    fn io_error(&self, e: std::io::Error) -> ContractError {
        error!(sink = %self.name, path = %self.path.display(), error = %e, "File sink I/O failed");
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, event),
        fields(sink = %self.name, id = %event.id())
    )]
    async fn write(&mut self, event: &WireEvent) -> Result<(), ContractError> {
        self.append(event).map_err(|e| self.io_error(e))
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.io_error(e))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer.flush().map_err(|e| self.io_error(e))?;
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wire_event;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_sink_appends_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("events.jsonl");
        let mut sink = FileSink::new("test_file", FileSinkConfig { path: path.clone() }).unwrap();

        let first = wire_event("first");
        let second = wire_event("second");
        sink.write(&first).await.unwrap();
        sink.write(&second).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<WireEvent> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines, vec![first, second]);
    }

    #[tokio::test]
    async fn test_file_sink_appends_to_existing() {
        let dir = tempdir().unwrap();
        let mut params = HashMap::new();
        params.insert(
            "path".to_string(),
            dir.path().join("e.jsonl").display().to_string(),
        );

        for name in ["a", "b"] {
            let mut sink = FileSink::from_params("file", &params).unwrap();
            sink.write(&wire_event(name)).await.unwrap();
            sink.close().await.unwrap();
        }

        let content = fs::read_to_string(dir.path().join("e.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
