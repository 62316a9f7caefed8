// Bounded, directed, depth-limited traversal over typed relations.
//
// Termination relies solely on strictly decreasing depth; there is no
// visited set. Cycles cause bounded re-visits, and the set-typed accumulator
// keeps result cardinality stable, so this matches the source behavior
// exactly rather than changing it with a revisit guard.

use anyhow::Result;
use std::collections::HashSet;

use crate::types::{ConceptId, Relation, RelationDirection, RelationType};

/// Supplier of names and adjacency for the traversal: the read-through cache
/// in production, a plain map fixture in tests.
pub trait RelationNeighborhood {
    fn relations_of(&self, id: ConceptId) -> Result<Vec<Relation>>;
    fn name_of(&self, id: ConceptId) -> Result<Option<String>>;
}

/// A concept reached by traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConceptHit {
    pub id: ConceptId,
    pub name: String,
}

/// Walk relations of `relation_type` from `root`, accumulating every reached
/// concept into `results`.
///
/// `levels <= 0` contributes nothing. For `Children`/`Parents`, every edge on
/// the current id is examined; an edge is followed when its code matches and
/// its orientation matches the direction. A node whose name cannot be
/// resolved is silently excluded and not recursed into. `Both` runs both
/// directions independently at the original full depth and never recurses as
/// `Both`.
pub fn collect_related(
    view: &(impl RelationNeighborhood + ?Sized),
    root: ConceptId,
    relation_type: RelationType,
    levels: i32,
    direction: RelationDirection,
    results: &mut HashSet<ConceptHit>,
) -> Result<()> {
    if levels <= 0 {
        return Ok(());
    }

    if direction == RelationDirection::Both {
        collect_related(view, root, relation_type, levels, RelationDirection::Children, results)?;
        collect_related(view, root, relation_type, levels, RelationDirection::Parents, results)?;
        return Ok(());
    }

    let code = relation_type.code();
    for relation in view.relations_of(root)? {
        if relation.code != code {
            continue;
        }
        // Orientation: Children means the query id is the stored target and
        // the related concept is the stored source; Parents is the mirror
        let related = match direction {
            RelationDirection::Children if relation.target == root => relation.source,
            RelationDirection::Parents if relation.source == root => relation.target,
            _ => continue,
        };

        match view.name_of(related)? {
            Some(name) => {
                results.insert(ConceptHit { id: related, name });
                if levels > 1 {
                    collect_related(view, related, relation_type, levels - 1, direction, results)?;
                }
            }
            // No name for that id: exclude the node, not an error
            None => continue,
        }
    }

    Ok(())
}
