// termgraph - concept-relationship graph store with a lazy read-through
// cache and snapshot persistence.
// Root library module

pub mod cache;
pub mod code_map;
pub mod config;
pub mod expand;
pub mod export;
pub mod graph;
pub mod ingest;
pub mod normalize;
pub mod observability;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-export key types
pub use observability::{init_logging, init_logging_with_level, log_operation, Operation};

pub use types::{
    ConceptId, NormalizedName, Relation, RelationCode, RelationDirection, RelationType,
};

pub use config::{TerminologyConfig, TerminologyConfigBuilder};

pub use ingest::{build_base_indices, BaseIndices};

pub use cache::{CacheStats, ReadThroughCache};

pub use graph::{collect_related, ConceptHit, RelationNeighborhood};

pub use normalize::{filter_subsumed, EntryReducer, IdentityReducer};

pub use snapshot::{SnapshotError, SnapshotPayload};

pub use store::{ConceptExpander, TerminologyStore};

pub use expand::{HierarchyExpander, RelatedKeySource};

pub use code_map::CodeMapper;

pub use export::write_triples;
