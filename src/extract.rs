//! End-to-end extraction: dataset presets, one run from endpoint to CSV file

use crate::aggregator::RangeAggregator;
use crate::collector::PaginatedCollector;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::write_csv;
use crate::fetcher::{HttpFetcher, PageSource};
use crate::types::{Encoding, Endpoint, Resource};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// First season covered by the API
pub const FIRST_SEASON: i32 = 1950;

/// Last season of the default range
pub const LAST_SEASON: i32 = 2023;

/// The API resources this tool knows how to extract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// Circuit list
    Circuits,
    /// Constructor list
    Constructors,
    /// Driver list
    Drivers,
    /// Race schedule
    Races,
    /// Season list
    Seasons,
}

impl Dataset {
    /// Every dataset, in CLI order
    pub const ALL: [Dataset; 5] = [
        Dataset::Circuits,
        Dataset::Constructors,
        Dataset::Drivers,
        Dataset::Races,
        Dataset::Seasons,
    ];

    /// Lowercase name used on the command line and in default file names
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Circuits => "circuits",
            Dataset::Constructors => "constructors",
            Dataset::Drivers => "drivers",
            Dataset::Races => "races",
            Dataset::Seasons => "seasons",
        }
    }

    /// Record container descriptor
    pub fn resource(&self) -> Resource {
        match self {
            Dataset::Circuits => Resource::circuits(),
            Dataset::Constructors => Resource::constructors(),
            Dataset::Drivers => Resource::drivers(),
            Dataset::Races => Resource::races(),
            Dataset::Seasons => Resource::seasons(),
        }
    }

    /// Path covering every season
    pub fn all_time_path(&self) -> &'static str {
        self.name()
    }

    /// Path template for one season
    pub fn per_period_path(&self) -> &'static str {
        match self {
            Dataset::Circuits => "{period}/circuits",
            Dataset::Constructors => "{period}/constructors",
            Dataset::Drivers => "{period}/drivers",
            // The season path itself is the race schedule
            Dataset::Races => "{period}",
            Dataset::Seasons => "{period}/seasons",
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Dataset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Dataset::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| {
                Error::config(
                    "dataset",
                    format!(
                        "unknown dataset '{s}' (expected one of: circuits, constructors, drivers, races, seasons)"
                    ),
                )
            })
    }
}

/// What to extract and where to put it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Dataset to extract
    pub dataset: Dataset,
    /// Page encoding to request
    pub encoding: Encoding,
    /// Inclusive season range; `None` extracts the all-time list in one collection
    pub range: Option<(i32, i32)>,
    /// Output path; defaults to a name derived from the dataset and range
    pub output: Option<PathBuf>,
}

impl ExtractRequest {
    /// All-time extraction of `dataset` as JSON
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            encoding: Encoding::default(),
            range: None,
            output: None,
        }
    }

    /// Extract season by season over `start..=end`
    pub fn per_season(mut self, start: i32, end: i32) -> Self {
        self.range = Some((start, end));
        self
    }

    /// Request pages in `encoding`
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Write to `path` instead of the default file name
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Endpoint for this request
    pub fn endpoint(&self, config: &Config) -> Endpoint {
        let path = match self.range {
            Some(_) => self.dataset.per_period_path(),
            None => self.dataset.all_time_path(),
        };
        Endpoint::new(&config.base_url, path, self.encoding, self.dataset.resource())
    }

    /// Output path used when none is given
    pub fn default_output(&self) -> PathBuf {
        match self.range {
            Some((start, end)) => PathBuf::from(format!("{}_{start}_{end}.csv", self.dataset)),
            None => PathBuf::from(format!("{}.csv", self.dataset)),
        }
    }
}

/// A collection that ended early
#[derive(Debug)]
pub struct ExtractFailure {
    /// Season of the failed collection; `None` for an all-time extraction
    pub period: Option<i32>,
    /// Rows kept from the failed collection
    pub rows: usize,
    /// What ended the collection
    pub error: Error,
}

/// Summary of one extraction run
#[derive(Debug)]
pub struct ExtractReport {
    /// Dataset extracted
    pub dataset: Dataset,
    /// CSV file written
    pub output: PathBuf,
    /// Rows written
    pub rows: usize,
    /// Columns written
    pub columns: usize,
    /// Collections attempted (one per season, or one for all-time)
    pub collections: usize,
    /// Collections that ended early
    pub failures: Vec<ExtractFailure>,
    /// True if the run stopped on cancellation
    pub cancelled: bool,
}

impl ExtractReport {
    /// Returns true if every attempted collection failed
    pub fn all_failed(&self) -> bool {
        self.collections > 0 && self.failures.len() == self.collections
    }

    /// Returns true if every collection completed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Run one extraction over HTTP and write its CSV
///
/// Configuration problems fail before any request is made. Collection failures do not:
/// the rows gathered are still written and the failures are listed in the report.
pub async fn run(
    config: &Config,
    request: &ExtractRequest,
    cancel: CancellationToken,
) -> Result<ExtractReport> {
    config.validate()?;
    let fetcher = HttpFetcher::new(config)?.with_cancellation(cancel.clone());
    run_with_source(&fetcher, config, request, cancel).await
}

/// [`run`] against any page source
pub async fn run_with_source<S: PageSource + ?Sized>(
    source: &S,
    config: &Config,
    request: &ExtractRequest,
    cancel: CancellationToken,
) -> Result<ExtractReport> {
    if let Some((start, end)) = request.range
        && start > end
    {
        return Err(Error::config(
            "range",
            format!("start season {start} is after end season {end}"),
        ));
    }

    let endpoint = request.endpoint(config);
    let output = request
        .output
        .clone()
        .unwrap_or_else(|| request.default_output());
    let collector = PaginatedCollector::new(source, config.page_size).with_cancellation(cancel);

    info!(
        dataset = %request.dataset,
        endpoint = %endpoint,
        encoding = %request.encoding,
        range = ?request.range,
        "Starting extraction"
    );

    let (table, collections, failures, cancelled) = match request.range {
        Some((start, end)) => {
            let result = RangeAggregator::new(&collector, config.period_field.as_str())
                .collect_range(&endpoint, start, end)
                .await?;
            let failures = result
                .failures
                .into_iter()
                .map(|f| ExtractFailure {
                    period: Some(f.period),
                    rows: f.rows,
                    error: f.error,
                })
                .collect();
            (result.table, result.periods, failures, result.cancelled)
        }
        None => {
            let collection = collector.collect(&endpoint).await;
            let rows = collection.table.len();
            let (failures, cancelled) = match collection.error {
                None => (Vec::new(), false),
                Some(Error::Cancelled) => (Vec::new(), true),
                Some(error) => (
                    vec![ExtractFailure {
                        period: None,
                        rows,
                        error,
                    }],
                    false,
                ),
            };
            (collection.table, 1, failures, cancelled)
        }
    };

    let written = write_csv(&table, &output)?;

    let report = ExtractReport {
        dataset: request.dataset,
        output: written,
        rows: table.len(),
        columns: table.columns().len(),
        collections,
        failures,
        cancelled,
    };

    if report.is_complete() {
        info!(
            dataset = %report.dataset,
            rows = report.rows,
            path = %report.output.display(),
            "Extraction complete"
        );
    } else {
        warn!(
            dataset = %report.dataset,
            rows = report.rows,
            failed = report.failures.len(),
            collections = report.collections,
            cancelled = report.cancelled,
            path = %report.output.display(),
            "Extraction finished with missing data"
        );
    }

    Ok(report)
}
