//! XML page normalizer
//!
//! Pagination metadata sits on the root element (`<MRData limit=".." offset=".."
//! total="..">`); absent attributes default to 30/0/0, but a document whose root is not
//! `MRData` in the MRD namespace is a protocol error. Records are the elements in the MRD namespace whose local name is the
//! resource's record tag, wherever they appear outside another record.
//!
//! Field naming mirrors the JSON encoding of the same API:
//! - attributes keep their name (`circuitId`)
//! - leaf child elements use their tag with a lowercase first letter (`CircuitName` →
//!   `circuitName`)
//! - composite child elements (with attributes or children) prefix their own fields with
//!   their tag (`Location.lat`, `Location.locality`)
//! - text of the record element itself comes first, under its lowercased tag
//!   (`<Season url="..">1950</Season>` → `season`, `url`)

use super::{NormalizedPage, Normalizer, parse_count};
use crate::error::{Error, Result};
use crate::table::{Record, Table, Value};
use crate::types::{MRD_NAMESPACE, PageMeta, Resource};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::debug;

const DEFAULT_LIMIT: u64 = 30;

/// Normalizer for `application/xml` pages
#[derive(Clone, Copy, Debug, Default)]
pub struct XmlNormalizer;

impl Normalizer for XmlNormalizer {
    fn normalize(&self, body: &[u8], resource: &Resource, url: &str) -> Result<NormalizedPage> {
        let text = std::str::from_utf8(body).map_err(|e| decode_error(url, e))?;
        if text.trim().is_empty() {
            debug!(url, "Empty XML body, treating as empty page");
            return Ok(NormalizedPage {
                table: Table::new(),
                meta: default_meta(),
            });
        }

        let mut reader = NsReader::from_str(text);
        reader.config_mut().trim_text(true);

        // Metadata of the root element; `Err` carries the name of a foreign root
        let mut root: Option<std::result::Result<PageMeta, String>> = None;
        let mut table = Table::new();
        // Elements of the record currently being read, outermost first
        let mut open: Vec<Element> = Vec::new();
        let mut depth = 0usize;

        loop {
            match reader.read_resolved_event() {
                Ok((ns, Event::Start(e))) => {
                    depth += 1;
                    if root.is_none() {
                        root = Some(read_root(&ns, &e, url)?);
                    }
                    if !open.is_empty() || is_record(&ns, &e, resource) {
                        open.push(Element::open(&e, url)?);
                    }
                }
                Ok((ns, Event::Empty(e))) => {
                    if root.is_none() {
                        root = Some(read_root(&ns, &e, url)?);
                    }
                    if !open.is_empty() || is_record(&ns, &e, resource) {
                        open.push(Element::open(&e, url)?);
                        close(&mut open, &mut table);
                    }
                }
                Ok((_, Event::End(_))) => {
                    depth = depth.saturating_sub(1);
                    close(&mut open, &mut table);
                }
                Ok((_, Event::Text(t))) => {
                    if let Some(current) = open.last_mut() {
                        let unescaped = t.unescape().map_err(|e| decode_error(url, e))?;
                        current.text.push_str(&unescaped);
                    }
                }
                Ok((_, Event::CData(c))) => {
                    if let Some(current) = open.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok((_, Event::Eof)) => break,
                Ok(_) => {}
                Err(e) => return Err(decode_error(url, e)),
            }
        }

        let meta = match root {
            None => return Err(decode_error(url, "document has no root element")),
            Some(_) if depth != 0 => return Err(decode_error(url, "unexpected end of document")),
            Some(Ok(meta)) => meta,
            Some(Err(name)) => {
                return Err(Error::Protocol {
                    url: url.to_string(),
                    reason: format!("root element <{name}> is not MRData in {MRD_NAMESPACE}"),
                });
            }
        };

        Ok(NormalizedPage { table, meta })
    }
}

/// One element of a record subtree
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart<'_>, url: &str) -> Result<Self> {
        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes: attributes(start, url)?,
            ..Self::default()
        })
    }

    fn is_leaf(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    fn into_record(mut self) -> Record {
        let mut record = Record::new();
        if !self.text.is_empty() {
            record.insert(lower_first(&self.name), std::mem::take(&mut self.text));
        }
        self.flatten_into(&mut record, "");
        record
    }

    fn flatten_into(self, record: &mut Record, prefix: &str) {
        let own_name = lower_first(&self.name);
        for (key, value) in self.attributes {
            record.insert(format!("{prefix}{key}"), value);
        }
        // Composite children carry their text after their attributes (`Time.millis`, `Time.time`)
        if !self.text.is_empty() {
            record.insert(format!("{prefix}{own_name}"), self.text);
        }
        for child in self.children {
            if child.is_leaf() {
                let name = format!("{prefix}{}", lower_first(&child.name));
                if child.text.is_empty() {
                    record.insert(name, Value::Null);
                } else {
                    record.insert(name, child.text);
                }
            } else {
                let nested = format!("{prefix}{}.", child.name);
                child.flatten_into(record, &nested);
            }
        }
    }
}

/// Pop the innermost open element and attach it to its parent, or emit it as a record
fn close(open: &mut Vec<Element>, table: &mut Table) {
    let Some(done) = open.pop() else {
        return;
    };
    match open.last_mut() {
        Some(parent) => parent.children.push(done),
        None => table.push(done.into_record()),
    }
}

fn is_record(ns: &ResolveResult<'_>, start: &BytesStart<'_>, resource: &Resource) -> bool {
    is_mrd_element(ns, start, &resource.record_tag)
}

fn is_mrd_element(ns: &ResolveResult<'_>, start: &BytesStart<'_>, local_name: &str) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == MRD_NAMESPACE.as_bytes())
        && start.local_name().as_ref() == local_name.as_bytes()
}

/// Pagination metadata of an `MRData` root, or the name of any other root element
fn read_root(
    ns: &ResolveResult<'_>,
    root: &BytesStart<'_>,
    url: &str,
) -> Result<std::result::Result<PageMeta, String>> {
    if is_mrd_element(ns, root, "MRData") {
        root_meta(root, url).map(Ok)
    } else {
        Ok(Err(String::from_utf8_lossy(root.name().as_ref()).into_owned()))
    }
}

fn attributes(start: &BytesStart<'_>, url: &str) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| decode_error(url, e))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| decode_error(url, e))?
            .into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn root_meta(root: &BytesStart<'_>, url: &str) -> Result<PageMeta> {
    let mut meta = default_meta();
    for (key, value) in attributes(root, url)? {
        match key.as_str() {
            "limit" => meta.limit = parse_count(&value, "limit", url)?,
            "offset" => meta.offset = parse_count(&value, "offset", url)?,
            "total" => meta.total = parse_count(&value, "total", url)?,
            _ => {}
        }
    }
    Ok(meta)
}

fn default_meta() -> PageMeta {
    PageMeta {
        limit: DEFAULT_LIMIT,
        offset: 0,
        total: 0,
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decode_error(url: &str, reason: impl std::fmt::Display) -> Error {
    Error::Decode {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}
