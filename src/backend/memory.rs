//! In-memory transport
//!
//! Serves a fixed result list page by page, the way the search endpoint does,
//! and records every request. Used by the tests and for offline runs.

use super::Transport;
use crate::error::{ArchiveError, Result};
use crate::query::Person;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A request received by [`MemoryTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    Query { endpoint: String, body: String },
    Get { url: String },
}

#[derive(Debug)]
pub struct MemoryTransport {
    ids: Vec<String>,
    page_size: usize,
    total: Option<usize>,
    people: Vec<Person>,
    resources: HashMap<String, String>,
    failing_pages: HashSet<usize>,
    delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MemoryTransport {
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            page_size: 25,
            total: None,
            people: Vec::new(),
            resources: HashMap::new(),
            failing_pages: HashSet::new(),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Count reported by the count endpoint instead of the number of ids
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// People returned for every person lookup
    pub fn with_people(mut self, people: Vec<Person>) -> Self {
        self.people = people;
        self
    }

    /// Resource document served for `id`
    pub fn with_resource(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.resources.insert(id.into(), content.into());
        self
    }

    /// Make every request for `page` fail
    pub fn fail_page(mut self, page: usize) -> Self {
        self.failing_pages.insert(page);
        self
    }

    /// Delay every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Offsets of all page requests, in arrival order
    pub fn page_requests(&self) -> Vec<usize> {
        self.requests()
            .iter()
            .filter_map(|request| match request {
                RecordedRequest::Query { body, .. } => page_offset(body),
                RecordedRequest::Get { .. } => None,
            })
            .collect()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    fn page(&self, endpoint: &str, page: usize) -> Result<Value> {
        if self.failing_pages.contains(&page) {
            return Err(ArchiveError::network(endpoint, format!("page {page} unavailable")));
        }

        let start = (page * self.page_size).min(self.ids.len());
        let end = (start + self.page_size).min(self.ids.len());
        let resources: Vec<Value> = self.ids[start..end]
            .iter()
            .map(|id| json!({ "@id": id, "@type": "dokubib:Bild" }))
            .collect();

        Ok(graph(resources))
    }

    fn people(&self) -> Value {
        let resources = self
            .people
            .iter()
            .map(|person| {
                json!({
                    "@id": person.id,
                    "@type": "dokubib:Person",
                    "dokubib:hasFirstname": { "knora-api:valueAsString": person.first_name },
                    "dokubib:hasLastname": { "knora-api:valueAsString": person.last_name },
                    "dokubib:hasCity": { "knora-api:valueAsString": person.city },
                })
            })
            .collect();

        graph(resources)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn post_query(&self, endpoint: &str, query: &str) -> Result<String> {
        self.record(RecordedRequest::Query {
            endpoint: endpoint.to_string(),
            body: query.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = if endpoint.trim_end_matches('/').ends_with("/count") {
            json!({
                "schema:numberOfItems": self.total.unwrap_or(self.ids.len()),
                "@context": { "schema": "http://schema.org/" }
            })
        } else if is_person_lookup(query) {
            self.people()
        } else {
            self.page(endpoint, page_offset(query).unwrap_or(0))?
        };

        Ok(response.to_string())
    }

    async fn get(&self, url: &str) -> Result<String> {
        self.record(RecordedRequest::Get {
            url: url.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let encoded = url.rsplit('/').next().unwrap_or(url);
        let id = urlencoding::decode(encoded)
            .map_err(|e| ArchiveError::network(url, format!("invalid resource id: {e}")))?;

        self.resources
            .get(id.as_ref())
            .cloned()
            .ok_or_else(|| ArchiveError::network(url, "404 Not Found"))
    }
}

/// Shape of a response: single resource at the top level, else `@graph`
fn graph(mut resources: Vec<Value>) -> Value {
    match resources.len() {
        0 => json!({ "@context": {} }),
        1 => resources.remove(0),
        _ => json!({ "@graph": resources }),
    }
}

fn page_offset(query: &str) -> Option<usize> {
    let (_, offset) = query.trim_end().rsplit_once("OFFSET ")?;
    offset.trim().parse().ok()
}

fn is_person_lookup(query: &str) -> bool {
    query.contains("?mainRes a dokubib:Person .") && !query.contains("knora-api:Resource")
}
