use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "vexline-debug.log";
const LOG_PATH_ENV: &str = "VEXLINE_LOG_PATH";

/// Install the global tracing subscriber. Logs never go to stdout, which the
/// renderer owns; they go to a file, or to stderr when it is not a terminal.
///
/// The returned guard flushes the non-blocking writer when dropped, so the
/// caller keeps it alive for the lifetime of the program.
pub fn init(explicit_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = match resolve_log_path(explicit_path) {
        Some(path) => match open_log_file(&path) {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(err) => {
                eprintln!("vexline: cannot open log file {}: {err}", path.display());
                return None;
            }
        },
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .is_err()
    {
        // Already initialised (tests, embedding applications).
        return None;
    }

    Some(guard)
}

fn resolve_log_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    explicit_path
        .map(Path::to_path_buf)
        .or_else(|| crate::util::env_value(LOG_PATH_ENV).map(PathBuf::from))
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(std::env::temp_dir().join(DEFAULT_LOG_FILE))
            } else {
                None
            }
        })
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}
