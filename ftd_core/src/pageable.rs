//! Offset/limit pagination over FDM list endpoints.
use crate::compare::ConfigObject;
use crate::error::{Error, ErrorKind, Result};

use std::collections::VecDeque;

use serde_json::Value;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryParams {
    pub offset: u64,
    pub limit: Option<u64>,
    pub filter: Option<String>,
    pub sort: Option<String>,
}

impl QueryParams {
    pub fn limit(&self) -> u64 {
        match self.limit {
            Some(0) | None => DEFAULT_PAGE_SIZE,
            Some(limit) => limit,
        }
    }

    /// Builds the `filter=name:<value>` server side filter.
    pub fn with_name_filter(mut self, name: &str) -> Self {
        self.filter = Some(format!("name:{name}"));
        self
    }

    /// `(key, value)` pairs in the order the device documents them.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit().to_string()),
        ];
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter", filter.clone()));
        }
        pairs
    }
}

/// Lazy, flat sequence over every item of a paginated collection.
///
/// The first page is fetched at `offset=0` when the iterator is first polled. A page shorter
/// than `limit` is the last one. A fetch error is yielded once and ends the iteration.
pub struct PageableIter<F> {
    list_page: F,
    params: QueryParams,
    buffer: VecDeque<Value>,
    last_page: Option<Vec<Value>>,
    done: bool,
}

impl<F> PageableIter<F>
where
    F: FnMut(&QueryParams) -> Result<Value>,
{
    fn fetch_next_page(&mut self) -> Result<()> {
        let limit = self.params.limit();
        trace!("fetching page offset={} limit={limit}", self.params.offset);
        let page = (self.list_page)(&self.params)?;
        let items = page_items(page)?;

        if items.len() as u64 >= limit && self.last_page.as_ref() == Some(&items) {
            warn!(
                "page at offset {} repeats the previous one, stopping pagination",
                self.params.offset
            );
            self.done = true;
            return Ok(());
        }

        if (items.len() as u64) < limit || items.is_empty() {
            self.done = true;
        } else {
            // a device ignoring `limit` may send more items than asked for
            self.params.offset += items.len() as u64;
            self.last_page = Some(items.clone());
        }
        self.buffer.extend(items);
        Ok(())
    }
}

impl<F> Iterator for PageableIter<F>
where
    F: FnMut(&QueryParams) -> Result<Value>,
{
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_next_page() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

fn page_items(page: Value) -> Result<Vec<Value>> {
    match page {
        Value::Object(mut page) => match page.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(Error::new(
                ErrorKind::InvalidData,
                format!("page `items` is not a list: {other}"),
            )),
        },
        other => Err(Error::new(
            ErrorKind::InvalidData,
            format!("page is not a mapping: {other}"),
        )),
    }
}

/// Flattens a paginated collection into a lazy iterator of items, starting at `offset=0`.
pub fn iterate_over_pageable_resource<F>(list_page: F, params: QueryParams) -> PageableIter<F>
where
    F: FnMut(&QueryParams) -> Result<Value>,
{
    PageableIter {
        list_page,
        params: QueryParams { offset: 0, ..params },
        buffer: VecDeque::new(),
        last_page: None,
        done: false,
    }
}

fn has_name(item: &ConfigObject, name: &str) -> bool {
    item.get("name").and_then(Value::as_str) == Some(name)
}

/// First item whose `name` is exactly `name`, or `None`.
///
/// The server side `name:` filter may match loosely, so every candidate is checked here.
pub fn find_by_name<F>(list_page: F, name: &str, params: QueryParams) -> Result<Option<ConfigObject>>
where
    F: FnMut(&QueryParams) -> Result<Value>,
{
    for item in iterate_over_pageable_resource(list_page, params.with_name_filter(name)) {
        if let Value::Object(obj) = item?
            && has_name(&obj, name)
        {
            return Ok(Some(obj));
        }
    }
    Ok(None)
}

/// Like [`find_by_name`], failing with [`ErrorKind::NotFound`] when nothing matches.
pub fn resolve_by_name<F>(list_page: F, name: &str, params: QueryParams) -> Result<ConfigObject>
where
    F: FnMut(&QueryParams) -> Result<Value>,
{
    find_by_name(list_page, name, params)?.ok_or_else(|| {
        Error::new(
            ErrorKind::NotFound,
            format!("object with name '{name}' not found"),
        )
    })
}
