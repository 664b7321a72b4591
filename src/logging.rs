use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use time::UtcOffset;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{reload::Handle, EnvFilter};

/// Optional file whose first line is an env filter, e.g. `valve_schedule=trace,reqwest=info`
pub const FILTER_FILE: &str = "logging.env";

#[derive(Debug)]
pub enum ReloadLogLevelError {
    InvalidFilter(String),
    ReloadFailed(tracing_subscriber::reload::Error),
}

impl Display for ReloadLogLevelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadLogLevelError::InvalidFilter(e) => write!(f, "{}", e),
            ReloadLogLevelError::ReloadFailed(e) => write!(f, "Failed to reload log filter: {}", e),
        }
    }
}

/// Re-read the filter file and swap it in, returning the filter now in effect.
pub fn reload_log_level(
    logging_handle: &LoggingHandle<EnvFilter, impl Subscriber>,
    filter_file: &Path,
) -> Result<String, ReloadLogLevelError> {
    let new_filter = read_env_filter(filter_file).map_err(ReloadLogLevelError::InvalidFilter)?;

    let filter_string = format!("{}", new_filter);

    logging_handle
        .handle
        .reload(new_filter)
        .map_err(ReloadLogLevelError::ReloadFailed)?;

    Ok(filter_string)
}

pub fn init_logging(filter_file: &Path) -> Result<LoggingHandle<EnvFilter, impl Subscriber + use<>>, String> {
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or_else(|err| {
            eprintln!("Failed to get timezone: {}", err);
            UtcOffset::UTC
        }),
        time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second] +[offset_hour]"
        ),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());

    let env_filter = read_env_filter(filter_file).unwrap_or_else(|err| {
        eprintln!(
            "Failed to read env filter, using environment variable or default: {}",
            err
        );
        EnvFilter::builder()
            .with_default_directive(Level::DEBUG.into())
            .from_env_lossy()
    });

    let builder = tracing_subscriber::fmt()
        .with_timer(timer)
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_filter_reloading();
    let handle = builder.reload_handle();

    tracing::subscriber::set_global_default(builder.finish())
        .map_err(|err| format!("failed to initialize logger: {}", err))?;
    tracing_log::LogTracer::init()
        .map_err(|err| format!("failed to forward log records: {}", err))?;

    Ok(LoggingHandle {
        _non_blocking_guard: guard,
        handle,
    })
}

fn read_env_filter(filter_file: &Path) -> Result<EnvFilter, String> {
    let s = fs::read_to_string(filter_file)
        .map_err(|err| format!("Failed to read {:?}: {}", filter_file, err))?;
    let first_line = s
        .lines()
        .next()
        .ok_or_else(|| format!("{:?} is empty", filter_file))?;
    EnvFilter::builder()
        .with_default_directive(Level::DEBUG.into())
        .parse(first_line)
        .map_err(|err| format!("Failed to parse env filter: {}", err))
}

/// Must be kept alive for as long as logging is wanted, dropping it flushes and stops the writer.
pub struct LoggingHandle<L, S> {
    _non_blocking_guard: WorkerGuard,
    handle: Handle<L, S>,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn filter_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("valve-schedule-{}-{}.env", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_filter_file_is_an_error() {
        let result = read_env_filter(Path::new("test/does-not-exist.env"));
        assert!(result.is_err());
    }

    #[test]
    fn reads_first_line_as_filter() {
        let path = filter_file("first-line", "valve_schedule=trace,reqwest=info\nignored");
        let filter = read_env_filter(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert!(filter.to_string().contains("valve_schedule=trace"));
    }

    #[test]
    fn reload_swaps_in_the_filter_file() {
        let (_, guard) = tracing_appender::non_blocking(std::io::sink());
        let builder = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("info"))
            .with_filter_reloading();
        let logging_handle = LoggingHandle {
            _non_blocking_guard: guard,
            handle: builder.reload_handle(),
        };
        // The handle only reaches a subscriber that is still alive.
        let _subscriber = builder.finish();

        let valid = filter_file("reload-valid", "valve_schedule=warn");
        let reloaded = reload_log_level(&logging_handle, &valid).unwrap();
        let _ = fs::remove_file(&valid);
        assert!(reloaded.contains("valve_schedule=warn"));
        let current = logging_handle.handle.with_current(|filter| filter.to_string()).unwrap();
        assert_eq!(current, reloaded);

        let invalid = filter_file("reload-invalid", "valve_schedule=loud");
        let result = reload_log_level(&logging_handle, &invalid);
        let _ = fs::remove_file(&invalid);
        assert!(matches!(result, Err(ReloadLogLevelError::InvalidFilter(_))));
        let current = logging_handle.handle.with_current(|filter| filter.to_string()).unwrap();
        assert_eq!(current, reloaded);
    }
}
