// One-shot export of the relation graph as labeled name triples.

use anyhow::Result;
use std::io::Write;
use tracing::{debug, info};

use crate::cache::ReadThroughCache;
use crate::types::RelationType;

/// Write every stored relation as a `name1 \t LABEL \t name2` line.
///
/// Forces base initialization, then iterates the adjacency index once,
/// taking only the copy stored under the relation's source id so each
/// relation is emitted once. Endpoint names go through the caller-supplied
/// `normalizer`; a pair is skipped when either side normalizes to `None` or
/// both normalize equal. Relations with codes outside the enumerated set are
/// skipped. Returns the number of lines written.
pub fn write_triples<W, F>(cache: &ReadThroughCache, writer: &mut W, normalizer: F) -> Result<usize>
where
    W: Write,
    F: Fn(&str) -> Option<String>,
{
    let lines = cache.with_base(|base| {
        let mut lines = Vec::new();
        for (id, relations) in &base.id_to_relations {
            for relation in relations {
                // Each relation sits under both endpoints; emit only the
                // source-side copy
                if relation.source != *id {
                    continue;
                }
                let Some(label) = RelationType::from_code(relation.code) else {
                    debug!("Skipping relation with unknown code {:?}", relation.code);
                    continue;
                };
                let (Some(raw1), Some(raw2)) = (
                    base.id_to_name.get(&relation.source),
                    base.id_to_name.get(&relation.target),
                ) else {
                    continue;
                };
                if let (Some(name1), Some(name2)) = (normalizer(raw1), normalizer(raw2)) {
                    if name1 != name2 {
                        lines.push(format!("{name1}\t{label}\t{name2}"));
                    }
                }
            }
        }
        lines
    })?;

    for line in &lines {
        writeln!(writer, "{line}")?;
    }
    info!("Exported {} triples", lines.len());
    Ok(lines.len())
}
