//! Backend-neutral record query: equality filters, ordering and paging.

use serde_json::Value as JsonValue;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    filters: Vec<(String, JsonValue)>,
    /// (field, descending)
    order_by: Vec<(String, bool)>,
    offset: usize,
    limit: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order_by: Vec::new(),
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Keep records whose `field` equals `value`.
    pub fn filter(
        mut self,
        field: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order(
        mut self,
        field: impl Into<String>,
        rev: bool,
    ) -> Self {
        self.order_by.push((field.into(), rev));
        self
    }

    pub fn set_offset(
        mut self,
        offset: usize,
    ) -> Self {
        self.offset = offset;
        self
    }

    /// Page size; zero is treated as one.
    pub fn set_limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn filters(&self) -> &[(String, JsonValue)] {
        &self.filters
    }

    pub fn order_by(&self) -> &[(String, bool)] {
        &self.order_by
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
