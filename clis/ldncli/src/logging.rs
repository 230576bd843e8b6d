use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;

/// Log to `log_file` when given, to stderr otherwise.
///
/// The returned guard flushes buffered file logs on drop and has to be kept
/// alive for the lifetime of the program.
pub fn setup_logging(log_level: LevelFilter, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let log_file = match log_file {
        Some(path) => path,
        None => {
            tracing_subscriber::fmt()
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .with_line_number(true)
                .with_level(true)
                .init();
            return Ok(None);
        }
    };

    let file_name = log_file
        .file_name()
        .ok_or_else(|| anyhow!("Log path {} has no file name", log_file.display()))?;
    let directory = log_file.parent().unwrap_or_else(|| Path::new("."));

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_line_number(true)
        .with_level(true)
        .init();

    Ok(Some(guard))
}
