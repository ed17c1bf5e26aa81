use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use once_cell::sync::OnceCell;
use std::{env, fs, path::PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const DEFAULT_LOG_DIRECTIVES: &str = "info,flowstate=debug";
const LOG_FILE_PREFIX: &str = "flowstate.log";
const ENV_LOG_DIR: &str = "FLOWSTATE_LOG_DIR";

/// Routes tracing output to a daily rolling file. The terminal belongs to the
/// UI, so nothing is written to stdout or stderr.
pub fn init_logging() -> Result<PathBuf> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVES))
        .map_err(|err| anyhow!("invalid log directives: {err}"))?;

    LOGGER_GUARD.set(guard).map_err(|_| anyhow!("logging already initialised"))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false).with_target(true))
        .try_init()
        .map_err(|err| anyhow!("failed to initialise tracing: {err}"))?;

    Ok(log_dir)
}

fn log_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(ENV_LOG_DIR).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let dirs = ProjectDirs::from("com", "FlowState", "FlowState")
        .ok_or_else(|| anyhow!("unable to determine data directory"))?;
    Ok(dirs.data_dir().join("logs"))
}
