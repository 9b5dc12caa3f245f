//! Extra sink implementations
//!
//! Contains LogSink and FileSink, plus the config-driven factory.

mod file;
mod log;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;

use contracts::{SinkConfig, SinkType};
use tracing::instrument;

use crate::error::DispatcherError;
use crate::handle::SinkHandle;

/// Create and spawn a SinkHandle from configuration
///
/// Must be called from within a tokio runtime.
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Create handles for every configured sink, failing on the first error
pub fn create_sink_handles(configs: &[SinkConfig]) -> Result<Vec<SinkHandle>, DispatcherError> {
    configs.iter().map(create_sink_handle).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_create_log_sink_handle() {
        let config = SinkConfig {
            name: "audit".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 8,
            params: HashMap::new(),
        };

        let handle = create_sink_handle(&config).unwrap();
        assert_eq!(handle.name(), "audit");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_create_file_sink_handle_fails_on_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let mut params = HashMap::new();
        params.insert(
            "path".to_string(),
            blocker.join("events.jsonl").display().to_string(),
        );
        let config = SinkConfig {
            name: "broken".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 8,
            params,
        };

        let err = create_sink_handle(&config).unwrap_err();
        assert!(matches!(err, DispatcherError::SinkCreation { .. }));
    }
}
