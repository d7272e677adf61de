//! ergast-extract command line
//!
//! Parses arguments into a [`Config`] and an [`ExtractRequest`], installs logging,
//! runs the extraction and maps the report to an exit code.

use clap::Parser;
use ergast_extract::{Config, Dataset, Encoding, ExtractRequest, cancel_on_signal, extract};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ergast-extract",
    version,
    about = "Extract Ergast motor racing data into CSV tables"
)]
struct Cli {
    /// Dataset to extract: circuits, constructors, drivers, races or seasons
    dataset: Dataset,

    /// Page encoding to request from the API
    #[arg(long, default_value = "json")]
    format: Encoding,

    /// Extract season by season over --from..=--to, tagging rows with the season
    #[arg(long)]
    per_year: bool,

    /// First season of a per-year extraction (implies --per-year)
    #[arg(long, value_name = "YEAR")]
    from: Option<i32>,

    /// Last season of a per-year extraction (implies --per-year)
    #[arg(long, value_name = "YEAR")]
    to: Option<i32>,

    /// Output CSV path; `.csv` is appended when missing
    #[arg(long, short, value_name = "PATH")]
    out: Option<PathBuf>,

    /// API root, e.g. http://localhost:8000/api/f1
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Records requested per page
    #[arg(long, value_name = "N")]
    page_size: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Retries after a failed request (0 disables retrying)
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> ergast_extract::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Duration::from_secs(timeout);
        }
        if let Some(retries) = self.retries {
            config.retry.max_attempts = retries;
        }
        config.validate()?;
        Ok(config)
    }

    fn request(&self) -> ExtractRequest {
        let mut request = ExtractRequest::new(self.dataset).with_encoding(self.format);
        if self.per_year || self.from.is_some() || self.to.is_some() {
            request = request.per_season(
                self.from.unwrap_or(extract::FIRST_SEASON),
                self.to.unwrap_or(extract::LAST_SEASON),
            );
        }
        if let Some(out) = &self.out {
            request = request.with_output(out);
        }
        request
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };
    let request = cli.request();

    let cancel = CancellationToken::new();
    let signals = cancel_on_signal(cancel.clone());

    let result = extract::run(&config, &request, cancel.clone()).await;
    cancel.cancel();
    signals.abort();

    match result {
        Ok(report) => {
            for failure in &report.failures {
                match failure.period {
                    Some(period) => warn!(
                        period,
                        rows = failure.rows,
                        kind = failure.error.kind(),
                        error = %failure.error,
                        "Season incomplete"
                    ),
                    None => warn!(
                        rows = failure.rows,
                        kind = failure.error.kind(),
                        error = %failure.error,
                        "Extraction incomplete"
                    ),
                }
            }
            info!(
                rows = report.rows,
                columns = report.columns,
                path = %report.output.display(),
                "Done"
            );

            if report.all_failed() {
                ExitCode::FAILURE
            } else if report.cancelled {
                ExitCode::from(130)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) if e.is_config() => {
            error!(error = %e, "Invalid configuration");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Extraction failed");
            ExitCode::FAILURE
        }
    }
}
