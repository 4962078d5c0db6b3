//! Query descriptors and the cache keys derived from them.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Bytes left as-is in key components; everything else, `&` and `=`
/// included, is percent-encoded.
const KEY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const KEY_PREFIX: &str = "jobs";

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, KEY_COMPONENT).to_string()
}

fn decode(raw: &str) -> Result<String, QueryKeyError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| QueryKeyError::Malformed(raw.to_string()))
}

/// Opaque identifier of the query a snapshot answers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A job list query: filters, search, sort and page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobQuery {
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl JobQuery {
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Canonical cache key for this query.
    ///
    /// Filters are emitted in key order (they are held in a `BTreeMap`), empty
    /// filter values are dropped and the search term is trimmed, so queries that
    /// would return the same rows address the same cache entry. Every field
    /// name and value is percent-encoded, so distinct queries never collide.
    pub fn key(&self) -> QueryKey {
        let mut parts: Vec<String> = Vec::new();
        parts.push(KEY_PREFIX.to_string());
        for (field, value) in &self.filters {
            if value.is_empty() {
                continue;
            }
            parts.push(format!("f.{}={}", encode(field), encode(value)));
        }
        if let Some(search) = self.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                parts.push(format!("q={}", encode(search)));
            }
        }
        if let Some(sort) = &self.sort {
            parts.push(format!("sort={}", encode(sort)));
        }
        parts.push(format!("page={}", self.page));
        if let Some(size) = self.page_size {
            parts.push(format!("size={}", size));
        }
        QueryKey(parts.join("&"))
    }

    /// Recover the query a key was built from.
    pub fn from_key(key: &QueryKey) -> Result<Self, QueryKeyError> {
        let mut segments = key.as_str().split('&');
        if segments.next() != Some(KEY_PREFIX) {
            return Err(QueryKeyError::NotAJobQuery(key.clone()));
        }

        let mut query = JobQuery::default();
        for segment in segments {
            let Some((name, value)) = segment.split_once('=') else {
                return Err(QueryKeyError::Malformed(segment.to_string()));
            };
            let malformed = || QueryKeyError::Malformed(segment.to_string());
            match name {
                "q" => query.search = Some(decode(value)?),
                "sort" => query.sort = Some(decode(value)?),
                "page" => query.page = value.parse().map_err(|_| malformed())?,
                "size" => query.page_size = Some(value.parse().map_err(|_| malformed())?),
                _ => match name.strip_prefix("f.") {
                    Some(field) => {
                        query.filters.insert(decode(field)?, decode(value)?);
                    }
                    None => return Err(malformed()),
                },
            }
        }
        Ok(query)
    }
}

/// A key that [`JobQuery::from_key`] cannot read back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryKeyError {
    #[error("not a job list key: {0}")]
    NotAJobQuery(QueryKey),

    #[error("malformed key segment: {0}")]
    Malformed(String),
}
