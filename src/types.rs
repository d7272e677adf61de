//! Core types: page encodings, resource descriptors, endpoints, cursors and pages

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Placeholder substituted with the period value in endpoint path templates
pub const PERIOD_PLACEHOLDER: &str = "{period}";

/// XML namespace of the Ergast MRD 1.5 document format
pub const MRD_NAMESPACE: &str = "http://ergast.com/mrd/1.5";

/// Wire encoding of a page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// `application/json` pages with an `MRData` object
    #[default]
    Json,
    /// `application/xml` pages with an `MRData` root element
    Xml,
}

impl Encoding {
    /// File extension appended to endpoint paths
    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::Xml => "xml",
        }
    }

    /// Value for the `Accept` request header
    pub fn accept(&self) -> &'static str {
        match self {
            Encoding::Json => "application/json",
            Encoding::Xml => "application/xml",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Encoding::Json),
            "xml" => Ok(Encoding::Xml),
            other => Err(Error::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Where the records of one API resource live inside a page
///
/// JSON pages nest records as `MRData.<table>.<list>[]`; XML pages carry them as
/// `<record_tag>` elements in the MRD namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Container object name (e.g. "CircuitTable")
    pub table: String,
    /// Record list key inside the container (e.g. "Circuits")
    pub list: String,
    /// XML element name of one record (e.g. "Circuit")
    pub record_tag: String,
}

impl Resource {
    /// Build a descriptor from its three names
    pub fn new(table: &str, list: &str, record_tag: &str) -> Self {
        Self {
            table: table.to_string(),
            list: list.to_string(),
            record_tag: record_tag.to_string(),
        }
    }

    /// Circuits (`CircuitTable.Circuits` / `<Circuit>`)
    pub fn circuits() -> Self {
        Self::new("CircuitTable", "Circuits", "Circuit")
    }

    /// Constructors (`ConstructorTable.Constructors` / `<Constructor>`)
    pub fn constructors() -> Self {
        Self::new("ConstructorTable", "Constructors", "Constructor")
    }

    /// Drivers (`DriverTable.Drivers` / `<Driver>`)
    pub fn drivers() -> Self {
        Self::new("DriverTable", "Drivers", "Driver")
    }

    /// Race schedule (`RaceTable.Races` / `<Race>`)
    pub fn races() -> Self {
        Self::new("RaceTable", "Races", "Race")
    }

    /// Seasons (`SeasonTable.Seasons` / `<Season>`)
    pub fn seasons() -> Self {
        Self::new("SeasonTable", "Seasons", "Season")
    }
}

/// Immutable description of one paginated endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    path: String,
    encoding: Encoding,
    resource: Resource,
}

impl Endpoint {
    /// Create an endpoint; `path` is relative to `base_url`, without extension, and may
    /// contain [`PERIOD_PLACEHOLDER`]
    pub fn new(base_url: &str, path: &str, encoding: Encoding, resource: Resource) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            path: path.trim_matches('/').to_string(),
            encoding,
            resource,
        }
    }

    /// Path template as given
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Page encoding requested from the server
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Record container descriptor
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Returns true if the path still contains the period placeholder
    pub fn is_periodic(&self) -> bool {
        self.path.contains(PERIOD_PLACEHOLDER)
    }

    /// Copy of this endpoint with the period substituted into its path
    pub fn for_period(&self, period: i32) -> Self {
        Self {
            path: self.path.replace(PERIOD_PLACEHOLDER, &period.to_string()),
            ..self.clone()
        }
    }

    /// URL of the page addressed by `cursor`
    ///
    /// Fails with a configuration error if the base URL does not parse or the period
    /// placeholder was never substituted.
    pub fn page_url(&self, cursor: &Cursor) -> Result<Url> {
        if self.is_periodic() {
            return Err(Error::config(
                "path",
                format!("endpoint path '{}' has no period substituted", self.path),
            ));
        }
        let raw = format!(
            "{}/{}.{}",
            self.base_url,
            self.path,
            self.encoding.extension()
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| Error::config("base_url", format!("invalid endpoint URL {raw}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("limit", &cursor.limit.to_string())
            .append_pair("offset", &cursor.offset.to_string());
        Ok(url)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}.{}",
            self.base_url,
            self.path,
            self.encoding.extension()
        )
    }
}

/// Pagination metadata reported by one page
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// Page size the server applied
    pub limit: u64,
    /// Offset of the first record on this page
    pub offset: u64,
    /// Number of records across all pages
    pub total: u64,
}

/// Pagination progress of one collection run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    /// Offset of the next page to request
    pub offset: u64,
    /// Page size requested with the next page
    pub limit: u64,
    /// Total record count; `None` until the first page arrives
    pub total: Option<u64>,
}

/// Outcome of folding a page's metadata into the cursor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// More pages remain
    Continue,
    /// `offset >= total`; no further fetch
    Done,
}

impl Cursor {
    /// Initial cursor: offset 0, unknown total
    pub fn start(page_size: u64) -> Self {
        Self {
            offset: 0,
            limit: page_size,
            total: None,
        }
    }

    /// Returns true once the total is known and the offset has reached it
    pub fn is_exhausted(&self) -> bool {
        matches!(self.total, Some(total) if self.offset >= total)
    }

    /// Fold the metadata of the page just fetched into the cursor
    ///
    /// The next offset is the server-reported offset plus the server-reported limit and
    /// must move strictly forward. The total is fixed by the first page. Violations come
    /// back as the reason string of a protocol error; the cursor is left untouched then.
    pub fn advance(&mut self, meta: &PageMeta) -> std::result::Result<Advance, String> {
        let total = match self.total {
            None => meta.total,
            Some(known) if known == meta.total => known,
            Some(known) => {
                return Err(format!(
                    "total changed from {known} to {} between pages",
                    meta.total
                ));
            }
        };

        if total == 0 {
            self.total = Some(0);
            return Ok(Advance::Done);
        }

        if meta.limit == 0 {
            return Err(format!(
                "page reported limit 0 with {total} records outstanding"
            ));
        }

        let next = meta.offset.saturating_add(meta.limit);
        if next <= self.offset {
            return Err(format!(
                "offset would not advance (requested {}, server reported {} + {})",
                self.offset, meta.offset, meta.limit
            ));
        }

        self.total = Some(total);
        self.offset = next;
        self.limit = meta.limit;

        if self.is_exhausted() {
            Ok(Advance::Done)
        } else {
            Ok(Advance::Continue)
        }
    }
}

/// One HTTP response body
#[derive(Clone, Debug)]
pub struct Page {
    /// Raw response body
    pub body: Vec<u8>,
    /// Encoding the page was requested in
    pub encoding: Encoding,
    /// HTTP status code
    pub status: u16,
    /// Request URL, kept for diagnostics
    pub url: String,
}
