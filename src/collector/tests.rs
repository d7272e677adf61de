use super::*;
use crate::error::Result;
use crate::types::{Encoding, Page, Resource};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Page source that replays scripted responses and records each request's cursor
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<Cursor>>,
    /// Response for every request once the script runs out
    fallback: Option<String>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            requests: Mutex::new(Vec::new()),
            fallback: None,
        }
    }

    fn repeating(body: String) -> Self {
        Self {
            fallback: Some(body),
            ..Self::new(Vec::new())
        }
    }

    fn offsets(&self) -> Vec<u64> {
        self.requests.lock().unwrap().iter().map(|c| c.offset).collect()
    }

    fn fetch_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(&self, endpoint: &Endpoint, cursor: &Cursor) -> Result<Page> {
        self.requests.lock().unwrap().push(*cursor);
        let next = self.responses.lock().unwrap().pop_front();
        let body = match (next, &self.fallback) {
            (Some(response), _) => response?,
            (None, Some(body)) => body.clone(),
            (None, None) => panic!("no more scripted pages (offset {})", cursor.offset),
        };
        Ok(Page {
            body: body.into_bytes(),
            encoding: endpoint.encoding(),
            status: 200,
            url: format!("http://localhost/{}?offset={}", endpoint.path(), cursor.offset),
        })
    }
}

fn drivers_endpoint() -> Endpoint {
    Endpoint::new(
        "http://localhost/api/f1",
        "drivers",
        Encoding::Json,
        Resource::drivers(),
    )
}

/// JSON drivers page with `count` records numbered from `offset`
fn drivers_page(limit: u64, offset: u64, total: u64, count: u64) -> String {
    let drivers: Vec<String> = (offset..offset + count)
        .map(|i| format!(r#"{{"driverId": "driver_{i}", "familyName": "Driver {i}"}}"#))
        .collect();
    format!(
        r#"{{"MRData": {{"limit": "{limit}", "offset": "{offset}", "total": "{total}",
            "DriverTable": {{"Drivers": [{}]}}}}}}"#,
        drivers.join(",")
    )
}

fn transport_error(status: u16) -> Error {
    Error::Transport {
        status,
        url: "http://localhost/api/f1/drivers.json".into(),
        body: String::new(),
    }
}

#[tokio::test]
async fn test_collects_pages_at_consecutive_offsets() {
    let source = ScriptedSource::new(vec![
        Ok(drivers_page(30, 0, 90, 30)),
        Ok(drivers_page(30, 30, 90, 30)),
        Ok(drivers_page(30, 60, 90, 30)),
    ]);

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert!(collection.is_complete(), "{:?}", collection.error);
    assert_eq!(collection.pages, 3);
    assert_eq!(source.offsets(), vec![0, 30, 60]);
    assert_eq!(collection.table.len(), 90);
    assert_eq!(
        collection.table.cell(89, "driverId").unwrap().render(),
        "driver_89"
    );
}

#[tokio::test]
async fn test_requests_configured_page_size() {
    let source = ScriptedSource::new(vec![Ok(drivers_page(100, 0, 40, 40))]);

    let collection = PaginatedCollector::new(&source, 100)
        .collect(&drivers_endpoint())
        .await;

    assert!(collection.is_complete());
    assert_eq!(source.requests.lock().unwrap()[0].limit, 100);
    assert_eq!(collection.table.len(), 40);
}

#[tokio::test]
async fn test_short_last_page_finishes() {
    let source = ScriptedSource::new(vec![
        Ok(drivers_page(30, 0, 77, 30)),
        Ok(drivers_page(30, 30, 77, 30)),
        Ok(drivers_page(30, 60, 77, 17)),
    ]);

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert!(collection.is_complete());
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(collection.table.len(), 77);
}

#[tokio::test]
async fn test_zero_total_stops_after_one_fetch() {
    let source = ScriptedSource::repeating(drivers_page(30, 0, 0, 0));

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert!(collection.is_complete());
    assert_eq!(source.fetch_count(), 1);
    assert!(collection.table.is_empty());
    assert!(collection.table.columns().is_empty());
}

#[tokio::test]
async fn test_zero_limit_fails_fast() {
    // Every page claims limit 0 with records outstanding
    let source = ScriptedSource::repeating(drivers_page(0, 0, 50, 0));

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert!(source.fetch_count() <= 2, "fetched {} pages", source.fetch_count());
    assert!(matches!(collection.error, Some(Error::Protocol { .. })));
}

#[tokio::test]
async fn test_stalled_offset_is_protocol_error() {
    // Server keeps answering with the first page
    let source = ScriptedSource::repeating(drivers_page(30, 0, 90, 30));

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert_eq!(source.fetch_count(), 2);
    assert_eq!(collection.table.len(), 30, "first page kept");
    match collection.error {
        Some(Error::Protocol { reason, .. }) => assert!(reason.contains("would not advance")),
        other => panic!("expected Protocol, got {other:?}"),
    }
}

#[tokio::test]
async fn test_changed_total_keeps_earlier_rows() {
    let source = ScriptedSource::new(vec![
        Ok(drivers_page(30, 0, 90, 30)),
        Ok(drivers_page(30, 30, 60, 30)),
    ]);

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert_eq!(collection.pages, 2);
    assert_eq!(collection.table.len(), 30);
    match collection.error {
        Some(Error::Protocol { url, reason }) => {
            assert!(reason.contains("total changed"), "{reason}");
            assert!(url.ends_with("offset=30"), "{url}");
        }
        other => panic!("expected Protocol, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_failure_keeps_partial_table() {
    let source = ScriptedSource::new(vec![
        Ok(drivers_page(30, 0, 90, 30)),
        Ok(drivers_page(30, 30, 90, 30)),
        Err(transport_error(500)),
    ]);

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert!(!collection.is_complete());
    assert_eq!(collection.pages, 2);
    assert_eq!(collection.table.len(), 60);
    assert_eq!(collection.error.unwrap().status(), Some(500));
}

#[tokio::test]
async fn test_decode_failure_ends_run() {
    let source = ScriptedSource::new(vec![
        Ok(drivers_page(30, 0, 90, 30)),
        Ok("<html>Service Unavailable</html>".to_string()),
    ]);

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert_eq!(collection.pages, 2);
    assert_eq!(collection.table.len(), 30);
    assert!(matches!(collection.error, Some(Error::Decode { .. })));
}

#[tokio::test]
async fn test_page_without_mrdata_fails_the_run() {
    let source = ScriptedSource::new(vec![
        Ok(drivers_page(30, 0, 90, 30)),
        Ok(r#"{"error": "rate limited"}"#.to_string()),
    ]);

    let collection = PaginatedCollector::new(&source, 30)
        .collect(&drivers_endpoint())
        .await;

    assert!(!collection.is_complete());
    assert_eq!(collection.table.len(), 30);
    assert!(matches!(collection.error, Some(Error::Protocol { .. })));
}

#[tokio::test]
async fn test_html_error_page_is_not_an_empty_xml_page() {
    let source = ScriptedSource::new(vec![Ok(
        "<html><body>Service Unavailable</body></html>".to_string()
    )]);
    let endpoint = Endpoint::new(
        "http://localhost/api/f1",
        "2021/drivers",
        Encoding::Xml,
        Resource::drivers(),
    );

    let collection = PaginatedCollector::new(&source, 30).collect(&endpoint).await;

    assert_eq!(collection.pages, 1);
    assert!(collection.table.is_empty());
    match collection.error {
        Some(Error::Protocol { reason, .. }) => assert!(reason.contains("<html>"), "{reason}"),
        other => panic!("expected Protocol, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_before_first_fetch() {
    let source = ScriptedSource::repeating(drivers_page(30, 0, 90, 30));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let collection = PaginatedCollector::new(&source, 30)
        .with_cancellation(cancel)
        .collect(&drivers_endpoint())
        .await;

    assert_eq!(source.fetch_count(), 0);
    assert!(matches!(collection.error, Some(Error::Cancelled)));
    assert!(collection.table.is_empty());
}

/// Cancels its token while serving the first page
struct CancellingSource {
    inner: ScriptedSource,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl PageSource for CancellingSource {
    async fn fetch(&self, endpoint: &Endpoint, cursor: &Cursor) -> Result<Page> {
        self.cancel.cancel();
        self.inner.fetch(endpoint, cursor).await
    }
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_fetched_rows() {
    let cancel = CancellationToken::new();
    let source = CancellingSource {
        inner: ScriptedSource::repeating(drivers_page(30, 0, 90, 30)),
        cancel: cancel.clone(),
    };

    let collection = PaginatedCollector::new(&source, 30)
        .with_cancellation(cancel)
        .collect(&drivers_endpoint())
        .await;

    assert_eq!(source.inner.fetch_count(), 1);
    assert_eq!(collection.table.len(), 30);
    assert!(matches!(collection.error, Some(Error::Cancelled)));
}

#[tokio::test]
async fn test_xml_pages_are_collected() {
    let page = |offset: u64| {
        format!(
            r#"<MRData xmlns="http://ergast.com/mrd/1.5" limit="1" offset="{offset}" total="2">
                <SeasonTable><Season url="u{offset}">{}</Season></SeasonTable></MRData>"#,
            1950 + offset
        )
    };
    let source = ScriptedSource::new(vec![Ok(page(0)), Ok(page(1))]);
    let endpoint = Endpoint::new(
        "http://localhost/api/f1",
        "seasons",
        Encoding::Xml,
        Resource::seasons(),
    );

    let collection = PaginatedCollector::new(&source, 1).collect(&endpoint).await;

    assert!(collection.is_complete());
    assert_eq!(source.offsets(), vec![0, 1]);
    let seasons: Vec<String> = collection
        .table
        .rows()
        .iter()
        .map(|r| r.get("season").unwrap().render())
        .collect();
    assert_eq!(seasons, vec!["1950", "1951"]);
}
