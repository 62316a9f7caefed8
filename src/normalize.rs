// Post-traversal result cleanup: variant reduction via an external
// collaborator, then prefix-subsumption filtering.

use std::collections::HashSet;

/// External collaborator that merges result strings judged equivalent.
/// Treated as a black box; the default implementation keeps the set as-is.
pub trait EntryReducer {
    fn reduce_entries(&self, entries: &mut HashSet<String>);
}

/// Reducer that performs no merging.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityReducer;

impl EntryReducer for IdentityReducer {
    fn reduce_entries(&self, _entries: &mut HashSet<String>) {}
}

/// Drop every string that is a proper prefix of another string in the set,
/// keeping only maximal strings. {"heart", "heart disease", "lung"} keeps
/// {"heart disease", "lung"}.
///
/// On the filtered-query path this runs AFTER the reducer; the reverse order
/// would filter against variants the reducer was about to merge away.
pub fn filter_subsumed(entries: &mut HashSet<String>) {
    let snapshot: Vec<String> = entries.iter().cloned().collect();
    entries.retain(|entry| {
        !snapshot
            .iter()
            .any(|other| other != entry && other.starts_with(entry.as_str()))
    });
}
