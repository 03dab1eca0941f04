use anyhow::anyhow;
use std::{env, io};
use time::{macros::format_description, UtcOffset};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::time::OffsetTime, EnvFilter};

pub const LOG_DIR_ENV: &str = "MR_LOG_DIR";
const LOG_FILE_PREFIX: &str = "mr.log";

/// Installs the global subscriber.
///
/// Filter comes from `RUST_LOG` (default `info`). Output goes to stdout, or
/// to a daily rolling file under `MR_LOG_DIR` when that is set. Keep the
/// returned guard alive until exit or buffered lines are lost.
pub fn init_logger() -> anyhow::Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // must run before any thread is spawned for the local offset to resolve
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"),
    );

    let log_dir = env::var_os(LOG_DIR_ENV);
    let (writer, guard) = match &log_dir {
        Some(dir) => {
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
        }
        None => tracing_appender::non_blocking(io::stdout()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_thread_names(true)
        .with_ansi(log_dir.is_none())
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow!(e))?;
    Ok(guard)
}
