//! Per-graph schema metadata cache
//!
//! The server refers to labels, relationship types and property keys by
//! numeric id. The cache maps those ids back to names. It starts empty, is
//! filled on the first miss and is only ever replaced by a fresher fetch:
//! names are assumed to be added, never renamed.
//!
//! At most one refresh is in flight at a time. Every caller that misses
//! while a refresh is running waits on that same refresh.

use crate::error::{GraphError, GraphResult};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

/// Which id space an identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataCategory {
    Labels,
    RelationshipTypes,
    PropertyKeys,
}

impl MetadataCategory {
    pub const ALL: [MetadataCategory; 3] = [
        MetadataCategory::Labels,
        MetadataCategory::RelationshipTypes,
        MetadataCategory::PropertyKeys,
    ];

    /// Read-only procedure listing the names of this category in id order
    pub fn procedure(&self) -> &'static str {
        match self {
            MetadataCategory::Labels => "CALL db.labels()",
            MetadataCategory::RelationshipTypes => "CALL db.relationshipTypes()",
            MetadataCategory::PropertyKeys => "CALL db.propertyKeys()",
        }
    }
}

impl fmt::Display for MetadataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetadataCategory::Labels => "labels",
            MetadataCategory::RelationshipTypes => "relationshipTypes",
            MetadataCategory::PropertyKeys => "propertyKeys",
        };
        write!(f, "{}", name)
    }
}

/// An identifier the decoder could not resolve from its snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingLookup {
    pub category: MetadataCategory,
    pub id: i64,
}

/// Names indexed by id, one list per category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphMetadata {
    pub labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub property_keys: Vec<String>,
}

impl GraphMetadata {
    pub fn names(&self, category: MetadataCategory) -> &[String] {
        match category {
            MetadataCategory::Labels => &self.labels,
            MetadataCategory::RelationshipTypes => &self.relationship_types,
            MetadataCategory::PropertyKeys => &self.property_keys,
        }
    }

    /// Name for an id
    pub fn get(&self, category: MetadataCategory, id: i64) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.names(category).get(i))
            .map(String::as_str)
    }

    pub fn contains(&self, category: MetadataCategory, id: i64) -> bool {
        self.get(category, id).is_some()
    }

    /// Id for a name
    pub fn id_of(&self, category: MetadataCategory, name: &str) -> Option<i64> {
        self.names(category)
            .iter()
            .position(|n| n == name)
            .map(|i| i as i64)
    }
}

/// Where the cache fetches names from
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// All names of one category, in id order
    async fn fetch(&self, category: MetadataCategory) -> GraphResult<Vec<String>>;
}

type RefreshFuture = Shared<BoxFuture<'static, GraphResult<Arc<GraphMetadata>>>>;

struct CacheState {
    snapshot: Arc<GraphMetadata>,
    in_flight: Option<(u64, RefreshFuture)>,
    next_generation: u64,
}

struct Inner {
    source: Arc<dyn MetadataSource>,
    state: Mutex<CacheState>,
    refreshes: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheaply cloneable handle to one graph's metadata
#[derive(Clone)]
pub struct MetadataCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("snapshot", &self.snapshot())
            .field("refreshes", &self.refresh_count())
            .finish()
    }
}

impl MetadataCache {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(CacheState {
                    snapshot: Arc::new(GraphMetadata::default()),
                    in_flight: None,
                    next_generation: 0,
                }),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    /// Current names
    pub fn snapshot(&self) -> Arc<GraphMetadata> {
        self.inner.lock().snapshot.clone()
    }

    /// Resolve from the current snapshot without waiting
    pub fn lookup(&self, category: MetadataCategory, id: i64) -> Option<String> {
        self.snapshot().get(category, id).map(str::to_string)
    }

    /// Resolve an id, refreshing once if it is unknown
    pub async fn resolve(&self, category: MetadataCategory, id: i64) -> GraphResult<String> {
        if let Some(name) = self.lookup(category, id) {
            return Ok(name);
        }
        let metadata = self.refresh().await?;
        metadata
            .get(category, id)
            .map(str::to_string)
            .ok_or(GraphError::MetadataResolution { category, id })
    }

    /// Refetch every category, joining a refresh that is already running
    pub async fn refresh(&self) -> GraphResult<Arc<GraphMetadata>> {
        let refresh = {
            let mut state = self.inner.lock();
            match &state.in_flight {
                Some((_, refresh)) => refresh.clone(),
                None => {
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    let refresh = Self::fetch_all(
                        Arc::downgrade(&self.inner),
                        self.inner.source.clone(),
                        generation,
                    )
                    .boxed()
                    .shared();
                    state.in_flight = Some((generation, refresh.clone()));
                    refresh
                }
            }
        };
        refresh.await
    }

    /// Make sure every pending id is known, refreshing at most once.
    ///
    /// Returns the snapshot the ids were verified against.
    pub async fn resolve_pending(&self, pending: &[PendingLookup]) -> GraphResult<Arc<GraphMetadata>> {
        let mut metadata = self.snapshot();
        if pending.iter().any(|p| !metadata.contains(p.category, p.id)) {
            metadata = self.refresh().await?;
        }
        match pending.iter().find(|p| !metadata.contains(p.category, p.id)) {
            Some(missing) => Err(GraphError::MetadataResolution {
                category: missing.category,
                id: missing.id,
            }),
            None => Ok(metadata),
        }
    }

    /// Schema fetches performed so far
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::SeqCst)
    }

    async fn fetch_all(
        owner: Weak<Inner>,
        source: Arc<dyn MetadataSource>,
        generation: u64,
    ) -> GraphResult<Arc<GraphMetadata>> {
        if let Some(inner) = owner.upgrade() {
            inner.refreshes.fetch_add(1, Ordering::SeqCst);
        }
        debug!("Refreshing graph metadata (generation {})", generation);

        let result = futures::try_join!(
            source.fetch(MetadataCategory::Labels),
            source.fetch(MetadataCategory::RelationshipTypes),
            source.fetch(MetadataCategory::PropertyKeys),
        )
        .map(|(labels, relationship_types, property_keys)| {
            Arc::new(GraphMetadata {
                labels,
                relationship_types,
                property_keys,
            })
        });

        if let Some(inner) = owner.upgrade() {
            let mut state = inner.lock();
            if let Ok(metadata) = &result {
                state.snapshot = metadata.clone();
            }
            if matches!(state.in_flight, Some((g, _)) if g == generation) {
                state.in_flight = None;
            }
        }
        result
    }
}
