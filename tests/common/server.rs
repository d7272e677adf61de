//! Mock Ergast API built on wiremock

use super::fixtures::constructors_page;
use ergast_extract::{Config, Encoding, RetryConfig};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing at `server`, with retries disabled and a short timeout
pub fn mock_config(server: &MockServer, page_size: u64) -> Config {
    Config {
        base_url: format!("{}/api/f1", server.uri()),
        page_size,
        timeout: Duration::from_secs(5),
        retry: RetryConfig::disabled(),
        ..Config::default()
    }
}

/// Serve `body` for `GET /api/f1/<resource_path>` at the given offset
pub async fn mount_page(server: &MockServer, resource_path: &str, offset: u64, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/api/f1/{resource_path}")))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serve every page of a generated constructors listing
///
/// `season` selects `/<season>/constructors` over the all-time `/constructors` path.
pub async fn mount_constructors(
    server: &MockServer,
    encoding: Encoding,
    season: Option<i32>,
    page_size: u64,
    total: u64,
) {
    let resource_path = match season {
        Some(season) => format!("{season}/constructors.{}", encoding.extension()),
        None => format!("constructors.{}", encoding.extension()),
    };
    let mut offset = 0;
    loop {
        let body = constructors_page(encoding, season, offset, page_size, total);
        mount_page(server, &resource_path, offset, body).await;
        offset += page_size;
        if offset >= total {
            break;
        }
    }
}

/// Answer every request for `/api/f1/<resource_path>` with `status`
pub async fn mount_failure(server: &MockServer, resource_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/api/f1/{resource_path}")))
        .respond_with(ResponseTemplate::new(status).set_body_string("Bad Request"))
        .mount(server)
        .await;
}
