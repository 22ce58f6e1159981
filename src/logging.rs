use anyhow::{Context, Result, anyhow};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use adscope_core::config::LoggingConfig;

/// Noisy HTTP stacks are held at `warn` whatever the configured level
const QUIET_TARGETS: &[&str] = &["hyper=warn", "reqwest=warn", "h2=warn"];

/// Filter directives for a level such as `info` or `debug,adscope_core=trace`
pub fn filter_directives(level: &str) -> String {
    let mut directives = vec![level.trim().to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|target| target.to_string()));
    directives.join(",")
}

/// Install the console layer and, when a log file is configured, a plain-text file layer
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(&config.level);
    let filter = EnvFilter::try_new(filter_directives(level))
        .with_context(|| format!("Invalid log level '{level}'"))?;

    let file_layer = if config.file.trim().is_empty() {
        None
    } else {
        let file = open_log_file(Path::new(&config.file))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Arc::new(file)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {e}"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiets_http_crates() {
        assert_eq!(
            filter_directives(" debug "),
            "debug,hyper=warn,reqwest=warn,h2=warn"
        );
        assert!(EnvFilter::try_new(filter_directives("info")).is_ok());
    }

    #[test]
    fn creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/app.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
