use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize diagnostics on stderr, plus an optional plain-text log file
pub fn init_logging(debug: bool, quiet: bool, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let env_filter = if debug {
        EnvFilter::new("cc_metrics=debug")
    } else if quiet {
        EnvFilter::new("cc_metrics=error")
    } else {
        EnvFilter::new("cc_metrics=info")
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_line_number(debug)
        .with_file(debug)
        .with_writer(std::io::stderr);

    let Some(log_path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return Ok(());
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(file)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// Timestamped log path for one invocation of `command`
pub fn default_log_path(command: &str) -> anyhow::Result<PathBuf> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("cc-metrics")
        .join("logs");

    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    Ok(log_dir.join(format!("{}-{}.log", command, timestamp)))
}
