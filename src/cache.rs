// Read-through memoizing cache over the base indices.
//
// One reader/writer lock guards the three cache maps AND the lazily built
// base indices as a unit. The lock is deliberately coarse (per cache, not per
// key): a miss for key A blocks other lookups only for the duration of a
// single insertion, except during first-time initialization, which runs under
// the exclusive lock and blocks every cache consumer until the base indices
// are fully built. Downstream correctness depends on that
// "initialization is atomic and visible-once" guarantee; do not replace this
// with finer-grained locking.

use anyhow::Result;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::config::TerminologyConfig;
use crate::graph::RelationNeighborhood;
use crate::ingest::{build_base_indices, BaseIndices};
use crate::observability::{log_operation, Operation};
use crate::snapshot::SnapshotPayload;
use crate::types::{ConceptId, NormalizedName, Relation};

/// Counters for observing cache work. `base_builds` is the number of times
/// the base indices were constructed; idempotent queries must leave it at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub base_builds: u64,
}

/// Everything guarded by the single lock. Keeping the base alongside the
/// cache maps is what makes initialization atomic with respect to all
/// consumers.
#[derive(Default)]
struct CacheState {
    /// Base indices; `None` until the first miss triggers a build
    base: Option<BaseIndices>,
    /// Memoized name lookups; unknown names memoize an empty set
    name_to_ids: HashMap<NormalizedName, HashSet<ConceptId>>,
    /// Memoized id-to-name lookups; misses memoize as `None`
    id_to_name: HashMap<ConceptId, Option<String>>,
    /// Memoized adjacency lookups; ids with no relations memoize an empty vec
    id_to_relations: HashMap<ConceptId, Vec<Relation>>,
}

/// Concurrency-safe read-through cache presenting the three index shapes.
///
/// Entries are memoized forever; there is no eviction and memory grows with
/// the distinct key set ever queried. A cached key never re-touches the base
/// indices or the write lock again. Initialization is a one-time transition;
/// a failed build propagates to the caller and the next lookup re-attempts
/// identically (no poisoned state).
pub struct ReadThroughCache {
    state: RwLock<CacheState>,
    config: TerminologyConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    base_builds: AtomicU64,
}

impl ReadThroughCache {
    /// Create an empty cold cache.
    pub fn new(config: TerminologyConfig) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            base_builds: AtomicU64::new(0),
        }
    }

    /// Create a cache whose three maps are seeded from a snapshot. The base
    /// indices stay unbuilt; keys outside the snapshot fall back to the lazy
    /// read-through path.
    pub fn from_snapshot(config: TerminologyConfig, payload: SnapshotPayload) -> Self {
        let cache = Self::new(config);
        {
            let mut state = cache.state.write();
            state.name_to_ids = payload.name_to_ids;
            state.id_to_name = payload.id_to_name;
            state.id_to_relations = payload.id_to_relations;
        }
        cache
    }

    /// Resolve a normalized name to its concept ids, memoizing the answer.
    /// Unknown names resolve (and memoize) to the empty set.
    pub fn ids_for_name(&self, name: &NormalizedName) -> Result<HashSet<ConceptId>> {
        // Fast path: shared lock, return on hit
        {
            let state = self.state.read();
            if let Some(ids) = state.name_to_ids.get(name) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(ids.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.write();
        // Re-check: a racing lookup may have inserted the same key; both
        // would compute identical values, so last writer wins
        if let Some(ids) = state.name_to_ids.get(name) {
            return Ok(ids.clone());
        }
        self.ensure_base(&mut state)?;
        let ids = state
            .base
            .as_ref()
            .and_then(|base| base.name_to_ids.get(name))
            .cloned()
            .unwrap_or_default();
        state.name_to_ids.insert(name.clone(), ids.clone());
        Ok(ids)
    }

    /// Resolve a concept id to its canonical name. A miss is memoized as
    /// `None` so it never re-touches the base either.
    pub fn name_of_id(&self, id: ConceptId) -> Result<Option<String>> {
        {
            let state = self.state.read();
            if let Some(name) = state.id_to_name.get(&id) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(name.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.write();
        if let Some(name) = state.id_to_name.get(&id) {
            return Ok(name.clone());
        }
        self.ensure_base(&mut state)?;
        let name = state
            .base
            .as_ref()
            .and_then(|base| base.id_to_name.get(&id))
            .cloned();
        state.id_to_name.insert(id, name.clone());
        Ok(name)
    }

    /// Resolve a concept id to every relation touching it. Ids with no
    /// relations resolve (and memoize) to an empty list.
    pub fn relations_for_id(&self, id: ConceptId) -> Result<Vec<Relation>> {
        {
            let state = self.state.read();
            if let Some(relations) = state.id_to_relations.get(&id) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(relations.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.write();
        if let Some(relations) = state.id_to_relations.get(&id) {
            return Ok(relations.clone());
        }
        self.ensure_base(&mut state)?;
        let relations = state
            .base
            .as_ref()
            .and_then(|base| base.id_to_relations.get(&id))
            .cloned()
            .unwrap_or_default();
        state.id_to_relations.insert(id, relations.clone());
        Ok(relations)
    }

    /// Run `f` against the fully built base indices, building them first if
    /// this is the first touch. Used by whole-index consumers like the
    /// triple exporter.
    pub fn with_base<T>(&self, f: impl FnOnce(&BaseIndices) -> T) -> Result<T> {
        {
            let state = self.state.read();
            if let Some(base) = state.base.as_ref() {
                return Ok(f(base));
            }
        }

        let mut state = self.state.write();
        self.ensure_base(&mut state)?;
        let base = state
            .base
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Base indices missing after build"))?;
        Ok(f(base))
    }

    /// Clone the three cache maps into a snapshot payload.
    pub fn export_snapshot(&self) -> SnapshotPayload {
        let state = self.state.read();
        SnapshotPayload::new(
            state.name_to_ids.clone(),
            state.id_to_name.clone(),
            state.id_to_relations.clone(),
        )
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            base_builds: self.base_builds.load(Ordering::Relaxed),
        }
    }

    /// Build the base indices if they have not been built yet. Must be
    /// called with the write lock held; every cache consumer blocks until
    /// the build completes. Errors propagate without latching any state, so
    /// the next lookup re-attempts the build.
    fn ensure_base(&self, state: &mut CacheState) -> Result<()> {
        if state.base.is_some() {
            return Ok(());
        }
        info!("Cache miss on cold store, building base indices");
        let base = build_base_indices(&self.config)?;
        self.base_builds.fetch_add(1, Ordering::Relaxed);
        log_operation(
            &Operation::BaseBuild {
                concepts: base.concept_count(),
                relations: base.relation_count(),
            },
            &Ok(()),
        );
        state.base = Some(base);
        Ok(())
    }
}

/// The traversal consults the cache at every node.
impl RelationNeighborhood for ReadThroughCache {
    fn relations_of(&self, id: ConceptId) -> Result<Vec<Relation>> {
        self.relations_for_id(id)
    }

    fn name_of(&self, id: ConceptId) -> Result<Option<String>> {
        self.name_of_id(id)
    }
}
