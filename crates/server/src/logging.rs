use crate::cli::LogFormat;
use crate::error::{Result, ServerError};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Output goes to stderr; stdout carries the MCP transport.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a subscriber is already installed.
pub fn init(filter: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| ServerError::Startup(format!("invalid log filter '{filter}': {e}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let res = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    res.map_err(|e| ServerError::Startup(format!("failed to init logging: {e}")))
}
