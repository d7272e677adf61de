//! Page normalizers
//!
//! A normalizer turns one page body into a flat [`Table`] plus the page's pagination
//! metadata. There is one normalizer per [`Encoding`]; both follow the same contract:
//! - a missing or empty record container yields an empty table, never an error
//! - metadata fields missing from a present `MRData` fall back to encoding-specific defaults
//! - a document without `MRData` (an error page, a proxy or rate-limit payload) is a
//!   protocol error, never an empty page
//! - a body that does not parse is a decoding error
//! - a metadata value that is present but not a non-negative integer is a protocol error

mod json;
mod xml;

pub use json::JsonNormalizer;
pub use xml::XmlNormalizer;

use crate::error::Result;
use crate::table::Table;
use crate::types::{Encoding, Page, PageMeta, Resource};

/// Records and pagination metadata extracted from one page
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedPage {
    /// Flattened records in page order
    pub table: Table,
    /// Pagination metadata reported by the page
    pub meta: PageMeta,
}

/// Flattens one encoded page body
pub trait Normalizer: Send + Sync {
    /// Normalize `body`; `url` is only used to give errors context
    fn normalize(&self, body: &[u8], resource: &Resource, url: &str) -> Result<NormalizedPage>;
}

/// Normalizer for an encoding
pub fn normalizer_for(encoding: Encoding) -> &'static dyn Normalizer {
    match encoding {
        Encoding::Json => &JsonNormalizer,
        Encoding::Xml => &XmlNormalizer,
    }
}

/// Normalize a fetched page with the normalizer matching its encoding
pub fn normalize_page(page: &Page, resource: &Resource) -> Result<NormalizedPage> {
    normalizer_for(page.encoding).normalize(&page.body, resource, &page.url)
}

/// Parse a metadata count, reporting bad values as protocol errors
fn parse_count(raw: &str, name: &str, url: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| crate::error::Error::Protocol {
        url: url.to_string(),
        reason: format!("{name} is not a non-negative integer: {raw:?}"),
    })
}
