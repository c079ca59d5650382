//! Logging setup
//!
//! Logs go to stderr so that rendered answers on stdout stay clean. JSON
//! or human-readable output, with an optional log file alongside.

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How logging should be set up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json_format: bool,
    /// Also append logs to this file
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "ragstream=info".to_string(),
            json_format: false,
            file_path: None,
        }
    }
}

impl LoggingOptions {
    /// Options derived from the global CLI flags
    ///
    /// # Examples
    ///
    /// ```
    /// use ragstream::logging::LoggingOptions;
    ///
    /// let options = LoggingOptions::from_flags(true, false);
    /// assert_eq!(options.level, "ragstream=debug");
    /// ```
    pub fn from_flags(verbose: bool, json_format: bool) -> Self {
        Self {
            level: if verbose {
                "ragstream=debug".to_string()
            } else {
                "ragstream=info".to_string()
            },
            json_format,
            file_path: None,
        }
    }

    /// Also append logs to `path`, when given
    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.file_path = path;
        self
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `options.level`. Calling this more than
/// once leaves the first subscriber in place.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or the log file
/// cannot be opened.
pub fn init_logging(options: &LoggingOptions) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&options.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let file = match &options.file_path {
        Some(path) => Some(Arc::new(
            OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    let result = if options.json_format {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        let file_layer = file.map(|file| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(file)
        });
        registry.with(stderr_layer).with(file_layer).try_init()
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        let file_layer = file.map(|file| {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(file)
        });
        registry.with(stderr_layer).with(file_layer).try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_options() {
        let options = LoggingOptions::default();
        assert_eq!(options.level, "ragstream=info");
        assert!(!options.json_format);
        assert!(options.file_path.is_none());
    }

    #[test]
    fn test_from_flags() {
        let options = LoggingOptions::from_flags(false, true);
        assert_eq!(options.level, "ragstream=info");
        assert!(options.json_format);
    }

    #[test]
    fn test_with_file_keeps_flags() {
        let options =
            LoggingOptions::from_flags(true, false).with_file(Some(PathBuf::from("run.log")));
        assert_eq!(options.level, "ragstream=debug");
        assert_eq!(options.file_path, Some(PathBuf::from("run.log")));
        assert!(LoggingOptions::default().with_file(None).file_path.is_none());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let dir = tempdir().unwrap();
        let options = LoggingOptions {
            file_path: Some(dir.path().join("ragstream.log")),
            ..LoggingOptions::default()
        };
        assert!(init_logging(&options).is_ok());
        assert!(init_logging(&options).is_ok());
        assert!(dir.path().join("ragstream.log").exists());
    }

    #[test]
    fn test_unwritable_log_file_errors() {
        let dir = tempdir().unwrap();
        let options = LoggingOptions {
            file_path: Some(dir.path().join("missing").join("x.log")),
            ..LoggingOptions::default()
        };
        assert!(init_logging(&options).is_err());
    }
}
