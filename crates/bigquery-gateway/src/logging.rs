//! An explicitly constructed logging context.
//!
//! Nothing here installs a global subscriber. A [`LogContext`] owns a
//! [`Dispatch`] that the gateway scopes its own work to, so the host application
//! decides where (and whether) gateway logs go.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{Dispatch, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, UtcTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

use crate::error::ConfigurationError;

pub const DEFAULT_LOGGER_NAME: &str = "bigquery-gateway";

#[derive(Clone)]
pub struct LogContext {
    name: Arc<str>,
    dispatch: Dispatch,
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl LogContext {
    pub fn builder(name: impl Into<Arc<str>>) -> LogContextBuilder {
        LogContextBuilder {
            name: name.into(),
            level: LevelFilter::INFO,
            file_level: None,
            console: true,
            log_file: None,
        }
    }

    /// A context that drops everything.
    pub fn disabled() -> Self {
        Self {
            name: Arc::from(DEFAULT_LOGGER_NAME),
            dispatch: Dispatch::none(),
        }
    }

    /// Wraps an existing dispatch, for hosts that already have a subscriber set up.
    pub fn from_dispatch(name: impl Into<Arc<str>>, dispatch: Dispatch) -> Self {
        Self {
            name: name.into(),
            dispatch,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this context as the thread's default dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Debug, Clone)]
pub struct LogContextBuilder {
    name: Arc<str>,
    level: LevelFilter,
    file_level: Option<LevelFilter>,
    console: bool,
    log_file: Option<PathBuf>,
}

impl LogContextBuilder {
    pub fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Overrides [`LogContextBuilder::level`] for the log file only.
    pub fn file_level(mut self, level: LevelFilter) -> Self {
        self.file_level = Some(level);
        self
    }

    /// Whether to write to stderr. On by default.
    pub fn console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Appends to `path`. The file is never rotated.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn build(self) -> Result<LogContext, ConfigurationError> {
        let formatter = LineFormatter::new(Arc::clone(&self.name));

        let console = self.console.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .event_format(formatter.clone())
                .with_filter(self.level)
        });

        let file = match self.log_file {
            Some(ref path) => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(open_appender(path)?)
                    .event_format(formatter)
                    .with_filter(self.file_level.unwrap_or(self.level)),
            ),
            None => None,
        };

        let subscriber = tracing_subscriber::registry().with(console).with(file);

        Ok(LogContext {
            name: self.name,
            dispatch: Dispatch::new(subscriber),
        })
    }
}

fn open_appender(path: &Path) -> Result<RollingFileAppender, ConfigurationError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{DEFAULT_LOGGER_NAME}.log"));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(ConfigurationError::from)
}

/// Formats events as `timestamp - logger name - LEVEL - message fields`.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    name: Arc<str>,
    timer: UtcTime<time::format_description::well_known::Rfc3339>,
}

impl LineFormatter {
    pub fn new(name: Arc<str>) -> Self {
        Self {
            name,
            timer: UtcTime::rfc_3339(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
    for<'b> N: FormatFields<'b> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        write!(writer, " - {} - {} - ", self.name, event.metadata().level())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writer.write_str("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");

        let log = LogContext::builder("gateway-test")
            .console(false)
            .log_file(&path)
            .build()
            .unwrap();

        log.in_scope(|| {
            info!(message = "connected", project = "p");
            debug!("filtered out at the default level");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 1, "{contents}");
        assert!(
            lines[0].ends_with(" - gateway-test - INFO - connected project=\"p\""),
            "{}",
            lines[0]
        );
    }

    #[test]
    fn test_log_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");
        std::fs::write(&path, "existing line\n").unwrap();

        let log = LogContext::builder("gateway-test")
            .console(false)
            .level(LevelFilter::DEBUG)
            .log_file(&path)
            .build()
            .unwrap();

        log.in_scope(|| debug!("second line"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("existing line\n"));
        assert!(contents.contains(" - DEBUG - second line"));
    }

    #[test]
    fn test_file_level_overrides_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.log");

        let log = LogContext::builder("gateway-test")
            .level(LevelFilter::WARN)
            .file_level(LevelFilter::DEBUG)
            .log_file(&path)
            .build()
            .unwrap();

        log.in_scope(|| {
            debug!(message = "executing query", sql = "SELECT 1");
            trace!("below both levels");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1, "{contents}");
        assert!(contents.contains(" - DEBUG - executing query sql=\"SELECT 1\""));
    }

    #[test]
    fn test_disabled_context() {
        let log = LogContext::disabled();
        assert_eq!(log.name(), DEFAULT_LOGGER_NAME);
        assert_eq!(log.in_scope(|| 1 + 1), 2);
    }
}
