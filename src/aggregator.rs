//! Per-period collection over a closed range
//!
//! Runs the collector once per period, tags each row with its period and concatenates
//! the results. A period that fails keeps whatever rows it gathered and is reported in
//! [`RangeCollection::failures`]; the range carries on with the next period.

use crate::collector::PaginatedCollector;
use crate::error::{Error, Result};
use crate::fetcher::PageSource;
use crate::table::Table;
use crate::types::Endpoint;
use tracing::{info, warn};

/// A period whose collection ended early
#[derive(Debug)]
pub struct PeriodFailure {
    /// The period value substituted into the endpoint
    pub period: i32,
    /// Rows kept from this period before the failure
    pub rows: usize,
    /// What ended the period's collection
    pub error: Error,
}

/// Concatenated rows of a range collection
#[derive(Debug, Default)]
pub struct RangeCollection {
    /// Rows of every period, in period order, each stamped with its period
    pub table: Table,
    /// Periods that did not complete
    pub failures: Vec<PeriodFailure>,
    /// Periods that were attempted
    pub periods: usize,
    /// True if the range stopped early on cancellation
    pub cancelled: bool,
}

/// Repeats a collection once per period
pub struct RangeAggregator<'c, 'a, S: PageSource + ?Sized> {
    collector: &'c PaginatedCollector<'a, S>,
    period_field: String,
}

impl<'c, 'a, S: PageSource + ?Sized> RangeAggregator<'c, 'a, S> {
    /// Create an aggregator that stamps rows with `period_field`
    pub fn new(collector: &'c PaginatedCollector<'a, S>, period_field: impl Into<String>) -> Self {
        Self {
            collector,
            period_field: period_field.into(),
        }
    }

    /// Collect `endpoint` for every period in `start..=end`
    ///
    /// `endpoint` must contain the period placeholder. Fails only on an empty or
    /// inverted range or a non-periodic endpoint; collection failures are reported per
    /// period.
    pub async fn collect_range(
        &self,
        endpoint: &Endpoint,
        start: i32,
        end: i32,
    ) -> Result<RangeCollection> {
        if start > end {
            return Err(Error::config(
                "range",
                format!("start period {start} is after end period {end}"),
            ));
        }
        if !endpoint.is_periodic() {
            return Err(Error::config(
                "path",
                format!("endpoint path '{}' has no period placeholder", endpoint.path()),
            ));
        }

        let mut result = RangeCollection::default();

        for period in start..=end {
            let collection = self.collector.collect(&endpoint.for_period(period)).await;
            result.periods += 1;

            let mut table = collection.table;
            let rows = table.len();
            table.stamp(&self.period_field, i64::from(period));
            result.table.append(table);

            match collection.error {
                None => info!(period, rows, "Period collected"),
                Some(Error::Cancelled) => {
                    info!(period, rows, "Range cancelled");
                    result.cancelled = true;
                    break;
                }
                Some(error) => {
                    warn!(period, rows, error = %error, "Period failed, continuing with next");
                    result.failures.push(PeriodFailure {
                        period,
                        rows,
                        error,
                    });
                }
            }
        }

        info!(
            start,
            end,
            periods = result.periods,
            rows = result.table.len(),
            failed = result.failures.len(),
            "Range collection finished"
        );

        Ok(result)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cursor, Encoding, Page, Resource};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Serves one constructor per year and fails for the listed years
    struct YearSource {
        failing: Vec<i32>,
        paths: Mutex<Vec<String>>,
    }

    impl YearSource {
        fn new(failing: Vec<i32>) -> Self {
            Self {
                failing,
                paths: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl PageSource for YearSource {
        async fn fetch(&self, endpoint: &Endpoint, _cursor: &Cursor) -> Result<Page> {
            self.paths.lock().unwrap().push(endpoint.path().to_string());
            let year: i32 = endpoint.path().split('/').next().unwrap().parse().unwrap();
            if self.failing.contains(&year) {
                return Err(Error::Transport {
                    status: 503,
                    url: format!("http://localhost/{}.json", endpoint.path()),
                    body: String::new(),
                });
            }
            let body = format!(
                r#"{{"MRData": {{"limit": "30", "offset": "0", "total": "1",
                    "ConstructorTable": {{"Constructors": [
                        {{"constructorId": "team_{year}", "name": "Team {year}"}}]}}}}}}"#
            );
            Ok(Page {
                body: body.into_bytes(),
                encoding: Encoding::Json,
                status: 200,
                url: endpoint.to_string(),
            })
        }
    }

    fn constructors_by_year() -> Endpoint {
        Endpoint::new(
            "http://localhost/api/f1",
            "{period}/constructors",
            Encoding::Json,
            Resource::constructors(),
        )
    }

    #[tokio::test]
    async fn test_failed_period_is_recorded_and_skipped() {
        let source = YearSource::new(vec![2021]);
        let collector = PaginatedCollector::new(&source, 30);
        let aggregator = RangeAggregator::new(&collector, "year");

        let result = aggregator
            .collect_range(&constructors_by_year(), 2020, 2022)
            .await
            .unwrap();

        assert_eq!(result.periods, 3);
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.columns(), &["constructorId", "name", "year"]);
        let years: Vec<String> = result
            .table
            .rows()
            .iter()
            .map(|r| r.get("year").unwrap().render())
            .collect();
        assert_eq!(years, vec!["2020", "2022"]);

        assert_eq!(result.failures.len(), 1);
        let failure = &result.failures[0];
        assert_eq!(failure.period, 2021);
        assert_eq!(failure.rows, 0);
        assert_eq!(failure.error.status(), Some(503));
    }

    #[tokio::test]
    async fn test_periods_visited_in_ascending_order() {
        let source = YearSource::new(Vec::new());
        let collector = PaginatedCollector::new(&source, 30);
        let aggregator = RangeAggregator::new(&collector, "season_year");

        let result = aggregator
            .collect_range(&constructors_by_year(), 1950, 1953)
            .await
            .unwrap();

        assert_eq!(
            *source.paths.lock().unwrap(),
            vec![
                "1950/constructors",
                "1951/constructors",
                "1952/constructors",
                "1953/constructors"
            ]
        );
        assert!(result.failures.is_empty());
        assert_eq!(
            result.table.cell(3, "season_year").unwrap().render(),
            "1953"
        );
    }

    #[tokio::test]
    async fn test_single_period_range() {
        let source = YearSource::new(Vec::new());
        let collector = PaginatedCollector::new(&source, 30);
        let result = RangeAggregator::new(&collector, "year")
            .collect_range(&constructors_by_year(), 1999, 1999)
            .await
            .unwrap();
        assert_eq!(result.periods, 1);
        assert_eq!(result.table.len(), 1);
    }

    #[tokio::test]
    async fn test_inverted_range_is_config_error() {
        let source = YearSource::new(Vec::new());
        let collector = PaginatedCollector::new(&source, 30);
        let aggregator = RangeAggregator::new(&collector, "year");

        let err = aggregator
            .collect_range(&constructors_by_year(), 2023, 1950)
            .await
            .unwrap_err();
        assert!(err.is_config());
        assert!(source.paths.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_endpoint_without_placeholder_is_config_error() {
        let source = YearSource::new(Vec::new());
        let collector = PaginatedCollector::new(&source, 30);
        let endpoint = Endpoint::new(
            "http://localhost/api/f1",
            "constructors",
            Encoding::Json,
            Resource::constructors(),
        );

        let err = RangeAggregator::new(&collector, "year")
            .collect_range(&endpoint, 2020, 2021)
            .await
            .unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_cancellation_stops_remaining_periods() {
        let source = YearSource::new(Vec::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let collector = PaginatedCollector::new(&source, 30).with_cancellation(cancel);

        let result = RangeAggregator::new(&collector, "year")
            .collect_range(&constructors_by_year(), 2000, 2010)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.periods, 1);
        assert!(result.failures.is_empty());
        assert!(source.paths.lock().unwrap().is_empty());
    }
}
