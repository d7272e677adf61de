//! Page fetching
//!
//! [`PageSource`] is the seam between the collection loop and the network. The
//! production implementation, [`HttpFetcher`], issues one GET per page with the
//! configured timeout and retries transport failures per the [`RetryConfig`].
//! Its cancellation token cuts a retry backoff short.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::fetch_with_retry;
use crate::types::{Cursor, Endpoint, Page};
use reqwest::header::ACCEPT;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Longest error body kept on a [`Error::Transport`]
const MAX_ERROR_BODY: usize = 512;

/// Abstraction over page retrieval, enabling testability.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page of `endpoint` addressed by `cursor`
    ///
    /// Only a successful response is returned as a [`Page`]; any other status is a
    /// transport error.
    async fn fetch(&self, endpoint: &Endpoint, cursor: &Cursor) -> Result<Page>;
}

/// Production [`PageSource`] backed by a shared `reqwest` client
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryConfig,
    cancel: CancellationToken,
}

impl HttpFetcher {
    /// Build a fetcher from the timeout, user agent and retry policy in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
            cancel: CancellationToken::new(),
        })
    }

    /// Stop retrying once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetch the page once, without retries
    async fn fetch_once(&self, endpoint: &Endpoint, url: &url::Url) -> Result<Page> {
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, endpoint.encoding().accept())
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport {
                status,
                url: url.to_string(),
                body: truncate(body, MAX_ERROR_BODY),
            });
        }

        let body = response.bytes().await?;
        Ok(Page {
            body: body.to_vec(),
            encoding: endpoint.encoding(),
            status,
            url: url.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, endpoint: &Endpoint, cursor: &Cursor) -> Result<Page> {
        let url = endpoint.page_url(cursor)?;
        fetch_with_retry(&self.retry, &self.cancel, || self.fetch_once(endpoint, &url)).await
    }
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut end = max;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
