//! Backend access
//!
//! [`SearchService`] resolves authors, compiles queries and fetches result
//! windows page by page through an injected [`Transport`]. It also loads
//! image details and the list vocabularies they refer to.

mod extract;
mod memory;
mod paging;

pub use extract::{
    extract_count, extract_ids, extract_image, extract_node_label, extract_people,
    extract_subject_tree, ImageRecord, SubjectNode,
};
pub use memory::{MemoryTransport, RecordedRequest};
pub use paging::PagePlan;

use crate::compiler::{compile, compile_person_lookup, with_offset};
use crate::config::BackendConfig;
use crate::error::{ArchiveError, Result};
use crate::query::{Person, Query, ResolvedQuery};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OnceCell, RwLock};
use tokio::task::JoinSet;

/// Raw request channel to the archive API
///
/// Implementations own the HTTP details; every call returns the response
/// body or fails with [`ArchiveError::Network`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a query document to `endpoint`
    async fn post_query(&self, endpoint: &str, query: &str) -> Result<String>;

    /// GET a resource
    async fn get(&self, url: &str) -> Result<String>;
}

/// Counting and windowed id fetching for a query
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Total number of matches, `None` when the backend did not say
    async fn count(&self, query: &Query) -> Result<Option<usize>>;

    /// Ids of the window `[start, start + count)`
    async fn load_ids(&self, query: &Query, start: usize, count: usize)
        -> Result<ImageIdCollection>;
}

/// Result of a windowed id fetch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageIdCollection {
    /// Unique, non-blank ids in result order
    pub ids: Vec<String>,
    /// Number of backend pages requested
    pub pages_queried: usize,
}

/// Search client for the archive API
pub struct SearchService {
    transport: Arc<dyn Transport>,
    config: BackendConfig,
    author_cache: RwLock<HashMap<String, Vec<Person>>>,
    node_label_cache: RwLock<HashMap<String, String>>,
    subjects: OnceCell<Vec<SubjectNode>>,
}

impl SearchService {
    pub fn new(transport: Arc<dyn Transport>, config: BackendConfig) -> Self {
        Self {
            transport,
            config,
            author_cache: RwLock::new(HashMap::new()),
            node_label_cache: RwLock::new(HashMap::new()),
            subjects: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Look up the people the query's author name refers to
    ///
    /// Lookups are cached per name for the lifetime of the service.
    pub async fn resolve(&self, query: &Query) -> Result<ResolvedQuery> {
        let Some(author) = query.author() else {
            return Ok(ResolvedQuery::unresolved(query.clone()));
        };

        if let Some(people) = self.author_cache.read().await.get(author) {
            return Ok(ResolvedQuery::new(query.clone(), people.clone()));
        }

        let content = self
            .run_query(&compile_person_lookup(author), &self.config.search_endpoint)
            .await?;
        let people = extract_people(&content)?;

        if people.is_empty() {
            tracing::warn!("No person found for author '{}'", author);
        } else {
            tracing::debug!("Author '{}' resolved to {} person(s)", author, people.len());
        }

        self.author_cache
            .write()
            .await
            .insert(author.to_string(), people.clone());

        Ok(ResolvedQuery::new(query.clone(), people))
    }

    /// Fetch the window `[start, start + count)` of a compiled query
    ///
    /// All covering pages are requested concurrently and reassembled in page
    /// order. A failing page fails the whole fetch.
    pub async fn load_ids_for(
        &self,
        compiled: &str,
        start: usize,
        count: usize,
    ) -> Result<ImageIdCollection> {
        let plan = PagePlan::new(start, count, self.config.page_size)?;
        tracing::trace!(
            "Loading ids {} to {} from pages {:?}",
            start,
            start + count,
            plan.pages()
        );

        let mut join_set: JoinSet<(usize, Result<Vec<String>>)> = JoinSet::new();
        for page in plan.pages() {
            let transport = self.transport.clone();
            let endpoint = self.config.search_endpoint.clone();
            let page_query = with_offset(compiled, page);

            join_set.spawn(async move {
                let started = Instant::now();
                let result = match transport.post_query(&endpoint, &page_query).await {
                    Ok(content) => extract_ids(&content),
                    Err(e) => Err(e),
                };
                tracing::info!(
                    "Response from {} (page {}) arrived in {} ms",
                    endpoint,
                    page,
                    started.elapsed().as_millis()
                );
                (page, result)
            });
        }

        let mut pages: Vec<Vec<String>> = vec![Vec::new(); plan.page_count];
        while let Some(joined) = join_set.join_next().await {
            let (page, result) =
                joined.map_err(|e| anyhow::anyhow!("Page request task failed: {}", e))?;
            // Remaining page requests are aborted when the set is dropped
            pages[page - plan.start_page] = result?;
        }

        let received: usize = pages.iter().map(Vec::len).sum();
        let window = plan.window(pages.into_iter().flatten().collect());

        let mut seen = HashSet::with_capacity(window.len());
        let mut ids = Vec::with_capacity(window.len());
        for id in window {
            if seen.insert(id.clone()) {
                ids.push(id);
            } else {
                tracing::warn!("Duplicate id '{}' in fetched window, dropping it", id);
            }
        }

        tracing::trace!(
            "Using {} ids of {} received from {} page(s)",
            ids.len(),
            received,
            plan.page_count
        );

        Ok(ImageIdCollection {
            ids,
            pages_queried: plan.page_count,
        })
    }

    /// Details of one image
    pub async fn load_image(&self, id: &str) -> Result<ImageRecord> {
        if id.trim().is_empty() {
            return Err(ArchiveError::InvalidArgument("Image id must not be blank".to_string()));
        }

        let url = format!(
            "{}/{}",
            self.config.resources_endpoint.trim_end_matches('/'),
            urlencoding::encode(id)
        );
        let content = self.transport.get(&url).await?;
        let mut image = extract_image(&content)?;

        if let Some(node) = image.season_node.as_deref() {
            match self.resolve_node_label(node).await {
                Ok(label) => image.season = label,
                Err(e) => tracing::warn!("Season of image '{}' cannot be resolved: {}", id, e),
            }
        }

        Ok(image)
    }

    /// Label of a list node, cached per node id
    pub async fn resolve_node_label(&self, node_id: &str) -> Result<String> {
        if node_id.trim().is_empty() {
            return Err(ArchiveError::InvalidArgument("Node id must not be blank".to_string()));
        }

        if let Some(label) = self.node_label_cache.read().await.get(node_id) {
            return Ok(label.clone());
        }

        let url = format!(
            "{}/{}",
            self.config.node_endpoint.trim_end_matches('/'),
            urlencoding::encode(node_id)
        );
        let label = extract_node_label(&self.transport.get(&url).await?)?;
        tracing::debug!("List node '{}' is labelled '{}'", node_id, label);

        self.node_label_cache
            .write()
            .await
            .insert(node_id.to_string(), label.clone());
        Ok(label)
    }

    /// Subject vocabulary, loaded once per service
    pub async fn load_subjects(&self) -> Result<&[SubjectNode]> {
        let subjects = self
            .subjects
            .get_or_try_init(|| async {
                let url = format!(
                    "{}/{}",
                    self.config.lists_endpoint.trim_end_matches('/'),
                    urlencoding::encode(&self.config.subject_list_id)
                );
                let started = Instant::now();
                let subjects = extract_subject_tree(&self.transport.get(&url).await?)?;
                tracing::info!(
                    "Loaded {} top level subjects in {} ms",
                    subjects.len(),
                    started.elapsed().as_millis()
                );
                Ok::<_, ArchiveError>(subjects)
            })
            .await?;
        Ok(subjects.as_slice())
    }

    /// Details of several images, loaded concurrently
    ///
    /// Images that fail to load are skipped with a warning; the result keeps
    /// the order of `ids`.
    pub async fn load_images(self: &Arc<Self>, ids: &[String]) -> Vec<ImageRecord> {
        let mut join_set: JoinSet<(usize, Result<ImageRecord>)> = JoinSet::new();
        for (i, id) in ids.iter().enumerate() {
            let service = Arc::clone(self);
            let id = id.clone();
            join_set.spawn(async move { (i, service.load_image(&id).await) });
        }

        let mut images: Vec<Option<ImageRecord>> = vec![None; ids.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((i, Ok(image))) => images[i] = Some(image),
                Ok((i, Err(e))) => {
                    tracing::warn!("Image with id '{}' cannot be loaded: {}", ids[i], e)
                }
                Err(e) => tracing::warn!("Image load task failed: {}", e),
            }
        }

        images.into_iter().flatten().collect()
    }

    async fn run_query(&self, query: &str, endpoint: &str) -> Result<String> {
        let started = Instant::now();
        let content = self.transport.post_query(endpoint, query).await?;
        tracing::info!(
            "Response from {} arrived in {} ms",
            endpoint,
            started.elapsed().as_millis()
        );
        Ok(content)
    }
}

#[async_trait]
impl SearchBackend for SearchService {
    async fn count(&self, query: &Query) -> Result<Option<usize>> {
        let resolved = self.resolve(query).await?;
        let content = self
            .run_query(&compile(&resolved), &self.config.count_endpoint)
            .await?;

        let count = extract_count(&content)?;
        match count {
            Some(count) => tracing::trace!("Received the count {} for query '{}'", count, query),
            None => tracing::warn!("Failed to get the count for query '{}'", query),
        }

        Ok(count)
    }

    async fn load_ids(
        &self,
        query: &Query,
        start: usize,
        count: usize,
    ) -> Result<ImageIdCollection> {
        let resolved = self.resolve(query).await?;
        self.load_ids_for(&compile(&resolved), start, count).await
    }
}
