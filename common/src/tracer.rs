use clap::Args;
use std::env::{self, VarError};
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, Layer, filter::ParseError, layer::SubscriberExt};

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("Cannot read RUST_LOG: {0}")]
    EnvVar(#[from] VarError),
    #[error("Global subscriber already set: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),
}

#[derive(Clone, Debug, Args)]
pub struct TracerOptions {
    /// Log filter directive, e.g. "info" or "biolum_proxies=debug"
    #[clap(long = "log", env = "BIOLUM_LOG", default_value = "info")]
    pub log_filter: String,
}

impl Default for TracerOptions {
    fn default() -> Self {
        Self {
            log_filter: "info".to_owned(),
        }
    }
}

/// Initialises the global tracing subscriber for a binary.
///
/// Events are written to stderr so that stdout remains free for the
/// JSON documents the tools emit.
pub struct TracerEngine {
    filter: String,
}

impl TracerEngine {
    /// Installs a formatting layer filtered by `RUST_LOG` if set,
    /// otherwise by the directive given in `options`. An invalid `RUST_LOG`
    /// is an error rather than a silent fallback.
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// #Returns
    /// An instance of TracerEngine, or an error if the filter is invalid
    /// or a subscriber has already been installed.
    pub fn new(options: &TracerOptions) -> Result<Self, TracerError> {
        let log_filter = env_filter(env::var(EnvFilter::DEFAULT_ENV), options)?;
        let filter = log_filter.to_string();

        let stderr_tracer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        let subscriber =
            tracing_subscriber::Registry::default().with(stderr_tracer.with_filter(log_filter));

        tracing::subscriber::set_global_default(subscriber)?;

        Ok(Self { filter })
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// Filter from the value of `RUST_LOG`, or from `options` when it is unset.
fn env_filter(
    env_value: Result<String, VarError>,
    options: &TracerOptions,
) -> Result<EnvFilter, TracerError> {
    match env_value {
        Ok(directive) => Ok(EnvFilter::try_new(directive)?),
        Err(VarError::NotPresent) => Ok(EnvFilter::try_new(&options.log_filter)?),
        Err(err) => Err(err.into()),
    }
}
