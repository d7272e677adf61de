//! JSON page normalizer
//!
//! Pages look like `{"MRData": {"limit": "30", "offset": "0", "total": "77",
//! "CircuitTable": {"Circuits": [...]}}}`. Counts are string-encoded integers; plain
//! numbers are accepted too. Missing counts default to 0.

use super::{NormalizedPage, Normalizer, parse_count};
use crate::error::{Error, Result};
use crate::table::{Record, Table};
use crate::types::{PageMeta, Resource};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Normalizer for `application/json` pages
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonNormalizer;

impl Normalizer for JsonNormalizer {
    fn normalize(&self, body: &[u8], resource: &Resource, url: &str) -> Result<NormalizedPage> {
        if body.iter().all(u8::is_ascii_whitespace) {
            debug!(url, "Empty JSON body, treating as empty page");
            return Ok(NormalizedPage::default());
        }

        let document: Value = serde_json::from_slice(body).map_err(|e| Error::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let Some(mr_data) = document.get("MRData").and_then(Value::as_object) else {
            return Err(Error::Protocol {
                url: url.to_string(),
                reason: "page has no MRData object".to_string(),
            });
        };

        let meta = PageMeta {
            limit: count(mr_data, "limit", url)?,
            offset: count(mr_data, "offset", url)?,
            total: count(mr_data, "total", url)?,
        };

        let records = mr_data
            .get(&resource.table)
            .and_then(|container| container.get(&resource.list))
            .and_then(Value::as_array);

        let mut table = Table::new();
        for item in records.into_iter().flatten() {
            match item.as_object() {
                Some(object) => table.push(Record::from_json_object(object)),
                None => warn!(url, record = %item, "Skipping non-object record"),
            }
        }

        Ok(NormalizedPage { table, meta })
    }
}

fn count(mr_data: &Map<String, Value>, name: &str, url: &str) -> Result<u64> {
    match mr_data.get(name) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::String(raw)) => parse_count(raw, name, url),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| Error::Protocol {
            url: url.to_string(),
            reason: format!("{name} is not a non-negative integer: {n}"),
        }),
        Some(other) => Err(Error::Protocol {
            url: url.to_string(),
            reason: format!("{name} has unexpected type: {other}"),
        }),
    }
}
