//! Parameters from the URL query string.

use std::collections::HashMap;

use crate::error::{EssenError, EssenResult};

/// Immutable snapshot of a request's query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySource {
    values: HashMap<String, String>,
}

impl QuerySource {
    /// Parse a raw query string (without the leading `?`).
    ///
    /// Malformed pairs are decoded leniently. When a key repeats, the first
    /// value wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut values = HashMap::new();
        if let Some(q) = query {
            for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
                values.entry(k.into_owned()).or_insert_with(|| v.into_owned());
            }
        }
        Self { values }
    }

    /// Look up `name`. Missing and empty values are both `InvalidParam`.
    pub fn param(&self, name: &str) -> EssenResult<String> {
        match self.values.get(name) {
            Some(v) if !v.is_empty() => Ok(v.clone()),
            _ => Err(EssenError::invalid_param(name)),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
