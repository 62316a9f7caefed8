// Public query surface: ties the read-through cache, the traversal, and the
// result normalization together behind the store facade.

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

use crate::cache::{CacheStats, ReadThroughCache};
use crate::config::TerminologyConfig;
use crate::graph::{collect_related, ConceptHit};
use crate::normalize::{filter_subsumed, EntryReducer, IdentityReducer};
use crate::observability::{log_operation, Operation};
use crate::snapshot;
use crate::types::{ConceptId, NormalizedName, RelationDirection, RelationType};

/// Concept-relationship graph store over flat terminology sources.
///
/// Queries resolve names through the read-through cache (the first-ever miss
/// builds the base indices), traverse typed relations with bounded depth, and
/// normalize the resulting name set. When a snapshot path is configured, the
/// cache is restored opportunistically at open and persisted at close.
pub struct TerminologyStore {
    cache: ReadThroughCache,
    reducer: Box<dyn EntryReducer + Send + Sync>,
    snapshot_path: Option<PathBuf>,
}

impl TerminologyStore {
    /// Open a store with the default (identity) entry reducer.
    pub fn open(config: TerminologyConfig) -> Result<Self> {
        Self::open_with_reducer(config, Box::new(IdentityReducer))
    }

    /// Open a store with an externally supplied entry reducer.
    ///
    /// Restores the snapshot when one is configured and loadable; a missing
    /// or rejected snapshot falls back to a cold cache. Never triggers base
    /// parsing by itself.
    pub fn open_with_reducer(
        config: TerminologyConfig,
        reducer: Box<dyn EntryReducer + Send + Sync>,
    ) -> Result<Self> {
        let snapshot_path = config.snapshot_path.clone();
        let payload = snapshot_path.as_deref().and_then(snapshot::load);
        let cache = match (payload, snapshot_path.as_ref()) {
            (Some(payload), Some(path)) => {
                log_operation(
                    &Operation::SnapshotRestore {
                        path: path.clone(),
                        entries: payload.entry_count(),
                    },
                    &Ok(()),
                );
                ReadThroughCache::from_snapshot(config, payload)
            }
            _ => ReadThroughCache::new(config),
        };
        Ok(Self {
            cache,
            reducer,
            snapshot_path,
        })
    }

    /// Names of every concept related to `name` by `relation_type`, within
    /// `levels` hops in `direction`. Negative `levels` means "no traversal
    /// requested" and returns the empty set.
    pub fn get_related_concepts(
        &self,
        name: &str,
        relation_type: RelationType,
        levels: i32,
        direction: RelationDirection,
    ) -> Result<HashSet<String>> {
        if levels < 0 {
            return Ok(HashSet::new());
        }

        let results = self.traverse_from_name(name, relation_type, levels, direction)?;
        let names: HashSet<String> = results.into_iter().map(|hit| hit.name).collect();
        debug!(
            term = name,
            relation = %relation_type,
            levels,
            results = names.len(),
            "Related-concepts query completed"
        );
        Ok(names)
    }

    /// Ids of the query concept(s) plus every concept reached by traversal.
    pub fn get_concept_ids(
        &self,
        name: &str,
        relation_type: RelationType,
        levels: i32,
        direction: RelationDirection,
    ) -> Result<HashSet<ConceptId>> {
        let parsed = NormalizedName::new(name);
        let seeds = self.cache.ids_for_name(&parsed)?;
        let mut ids = seeds.clone();
        for seed in seeds {
            let mut hits = HashSet::new();
            collect_related(&self.cache, seed, relation_type, levels, direction, &mut hits)?;
            ids.extend(hits.into_iter().map(|hit| hit.id));
        }
        Ok(ids)
    }

    /// Related concepts plus the query term itself, reduced and
    /// subsumption-filtered, with the query term removed from its own
    /// result set.
    pub fn get_filtered_concepts(
        &self,
        text: &str,
        relation_type: RelationType,
        levels: i32,
        direction: RelationDirection,
    ) -> Result<HashSet<String>> {
        let mut concepts = self.get_related_concepts(text, relation_type, levels, direction)?;
        let parsed = NormalizedName::new(text).into_string();
        concepts.insert(parsed.clone());
        // Reducer first, then subsumption: filtering before the reducer would
        // compare against variants the reducer is about to merge away
        self.reducer.reduce_entries(&mut concepts);
        filter_subsumed(&mut concepts);
        concepts.remove(&parsed);
        Ok(concepts)
    }

    /// A named expansion handle that runs the filtered query for any term.
    pub fn expander(
        &self,
        relation_type: RelationType,
        levels: i32,
        direction: RelationDirection,
    ) -> ConceptExpander<'_> {
        ConceptExpander {
            store: self,
            label: format!("termgraph:{relation_type}"),
            relation_type,
            levels,
            direction,
        }
    }

    /// Cache work counters (hits, misses, base builds).
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The underlying cache, for whole-index consumers like the exporter.
    pub fn cache(&self) -> &ReadThroughCache {
        &self.cache
    }

    /// Persist the cache to the configured snapshot path and shut down.
    /// Save failures propagate; losing a snapshot has no silent fallback.
    pub fn close(self) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            let payload = self.cache.export_snapshot();
            let result = snapshot::save(path, &payload);
            log_operation(
                &Operation::SnapshotSave {
                    path: path.clone(),
                    entries: payload.entry_count(),
                },
                &result,
            );
            result?;
        }
        log_operation(&Operation::Shutdown, &Ok(()));
        Ok(())
    }

    fn traverse_from_name(
        &self,
        name: &str,
        relation_type: RelationType,
        levels: i32,
        direction: RelationDirection,
    ) -> Result<HashSet<ConceptHit>> {
        let parsed = NormalizedName::new(name);
        let ids = self.cache.ids_for_name(&parsed)?;
        let mut results = HashSet::new();
        for id in ids {
            collect_related(&self.cache, id, relation_type, levels, direction, &mut results)?;
        }
        Ok(results)
    }
}

/// Expansion handle bound to one relation type, depth, and direction.
pub struct ConceptExpander<'a> {
    store: &'a TerminologyStore,
    label: String,
    relation_type: RelationType,
    levels: i32,
    direction: RelationDirection,
}

impl ConceptExpander<'_> {
    pub fn name(&self) -> &str {
        &self.label
    }

    pub fn expand(&self, term: &str) -> Result<HashSet<String>> {
        self.store
            .get_filtered_concepts(term, self.relation_type, self.levels, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn fixture_config(dir: &TempDir) -> TerminologyConfig {
        let concepts = dir.path().join("concepts.txt");
        let relations = dir.path().join("relations.txt");
        std::fs::File::create(&concepts)
            .and_then(|mut f| {
                f.write_all(
                    b"header\n\
                      1\t0\tHeart (organ)\tx\ty\tz\n\
                      2\t0\tHeart disease (disorder)\tx\ty\tz\n\
                      3\t0\tCardiomyopathy (disorder)\tx\ty\tz\n",
                )
            })
            .expect("write concepts");
        std::fs::File::create(&relations)
            .and_then(|mut f| {
                let code = RelationType::IsA.code().get();
                f.write_all(
                    format!(
                        "header\n\
                         10\t2\t{code}\t1\tc\tr\tg\n\
                         11\t3\t{code}\t2\tc\tr\tg\n"
                    )
                    .as_bytes(),
                )
            })
            .expect("write relations");

        TerminologyConfig::builder()
            .concept_file(concepts)
            .expect("concepts")
            .relation_file(relations)
            .expect("relations")
            .build()
    }

    #[test]
    fn test_negative_levels_returns_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TerminologyStore::open(fixture_config(&dir))?;
        let results = store.get_related_concepts(
            "Heart (organ)",
            RelationType::IsA,
            -1,
            RelationDirection::Both,
        )?;
        assert!(results.is_empty());
        // Negative depth never touches the cache or the base
        assert_eq!(store.stats().base_builds, 0);
        Ok(())
    }

    #[test]
    fn test_concept_ids_include_seeds_and_descendants() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TerminologyStore::open(fixture_config(&dir))?;
        let ids = store.get_concept_ids(
            "heart",
            RelationType::IsA,
            3,
            RelationDirection::Children,
        )?;
        assert_eq!(
            ids,
            HashSet::from([ConceptId::new(1), ConceptId::new(2), ConceptId::new(3)])
        );
        Ok(())
    }

    #[test]
    fn test_filtered_concepts_drop_query_term_and_prefixes() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TerminologyStore::open(fixture_config(&dir))?;
        let results = store.get_filtered_concepts(
            "Heart (organ)",
            RelationType::IsA,
            2,
            RelationDirection::Children,
        )?;
        // "heart" (the query term) is removed; "heart disease" stays even
        // though the query term was its prefix
        assert_eq!(
            results,
            HashSet::from(["heart disease".to_string(), "cardiomyopathy".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_expander_is_labeled_and_delegates() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TerminologyStore::open(fixture_config(&dir))?;
        let expander = store.expander(RelationType::IsA, 2, RelationDirection::Children);
        assert_eq!(expander.name(), "termgraph:IS_A");

        let expanded = expander.expand("heart")?;
        assert!(expanded.contains("cardiomyopathy"));
        Ok(())
    }

    #[test]
    fn test_unknown_name_yields_empty_results() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TerminologyStore::open(fixture_config(&dir))?;
        let results = store.get_related_concepts(
            "no such concept",
            RelationType::IsA,
            3,
            RelationDirection::Both,
        )?;
        assert!(results.is_empty());
        Ok(())
    }
}
