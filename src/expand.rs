// Depth-limited expansion over a remote key hierarchy.
//
// The upstream collaborator hands back related keys and surface forms for a
// key; it must be idempotent and side-effect-free from this crate's
// perspective. A collaborator failure aborts that single branch, never the
// whole expansion.

use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::normalize::EntryReducer;

/// Upstream source of hierarchy keys and their surface forms, e.g. a remote
/// terminology service.
pub trait RelatedKeySource {
    /// Keys one step below `key` in the hierarchy.
    fn related_keys(&self, key: &str) -> Result<Vec<String>>;
    /// Textual variants associated with `key`.
    fn surface_forms(&self, key: &str) -> Result<Vec<String>>;
}

impl<T: RelatedKeySource + ?Sized> RelatedKeySource for &T {
    fn related_keys(&self, key: &str) -> Result<Vec<String>> {
        (**self).related_keys(key)
    }

    fn surface_forms(&self, key: &str) -> Result<Vec<String>> {
        (**self).surface_forms(key)
    }
}

/// Walks the key hierarchy depth-first from a set of seed keys, gathering
/// every visited key's surface forms into one expansion set.
pub struct HierarchyExpander<S> {
    source: S,
    seeds: Vec<String>,
    depth_limit: usize,
}

impl<S: RelatedKeySource> HierarchyExpander<S> {
    /// `depth_limit` counts key levels including the seeds themselves:
    /// a limit of 1 gathers only the seeds' surface forms.
    pub fn new(source: S, seeds: Vec<String>, depth_limit: usize) -> Self {
        Self {
            source,
            seeds,
            depth_limit,
        }
    }

    /// Run the expansion. Branch failures and cycles are logged and skipped;
    /// the surviving forms pass through the reducer before being returned.
    pub fn expand(&self, reducer: &dyn EntryReducer) -> HashSet<String> {
        let mut forms = HashSet::new();
        let mut seen: HashSet<String> = HashSet::new();

        for seed in &self.seeds {
            if self.depth_limit == 0 {
                break;
            }
            self.visit(seed, self.depth_limit - 1, &mut seen, &mut forms);
        }

        reducer.reduce_entries(&mut forms);
        forms
    }

    fn visit(
        &self,
        key: &str,
        remaining: usize,
        seen: &mut HashSet<String>,
        forms: &mut HashSet<String>,
    ) {
        seen.insert(key.to_string());
        debug!("Gathering surface forms for {}", key);
        match self.source.surface_forms(key) {
            Ok(key_forms) => forms.extend(key_forms),
            Err(err) => {
                // Fatal for this branch only
                warn!("Abandoning expansion branch at {}: {}", key, err);
                return;
            }
        }

        if remaining == 0 {
            return;
        }
        let children = match self.source.related_keys(key) {
            Ok(children) => children,
            Err(err) => {
                warn!("Failed to fetch related keys for {}: {}", key, err);
                return;
            }
        };
        debug!("Acquired {} related keys for {}", children.len(), key);
        for child in children {
            if seen.contains(&child) {
                warn!("Encountered cycle for {}", child);
                continue;
            }
            self.visit(&child, remaining - 1, seen, forms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::IdentityReducer;
    use anyhow::anyhow;
    use std::collections::HashMap;

    /// In-memory hierarchy fixture; keys listed in `failing` error out.
    #[derive(Default)]
    struct MapSource {
        children: HashMap<String, Vec<String>>,
        forms: HashMap<String, Vec<String>>,
        failing: HashSet<String>,
    }

    impl MapSource {
        fn key(mut self, key: &str, children: &[&str], forms: &[&str]) -> Self {
            self.children
                .insert(key.to_string(), children.iter().map(|s| s.to_string()).collect());
            self.forms
                .insert(key.to_string(), forms.iter().map(|s| s.to_string()).collect());
            self
        }

        fn failing(mut self, key: &str) -> Self {
            self.failing.insert(key.to_string());
            self
        }
    }

    impl RelatedKeySource for MapSource {
        fn related_keys(&self, key: &str) -> Result<Vec<String>> {
            if self.failing.contains(key) {
                return Err(anyhow!("service unavailable for {key}"));
            }
            Ok(self.children.get(key).cloned().unwrap_or_default())
        }

        fn surface_forms(&self, key: &str) -> Result<Vec<String>> {
            if self.failing.contains(key) {
                return Err(anyhow!("service unavailable for {key}"));
            }
            Ok(self.forms.get(key).cloned().unwrap_or_default())
        }
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_gathers_forms_to_depth_limit() {
        let source = MapSource::default()
            .key("root", &["a"], &["root form"])
            .key("a", &["b"], &["a form"])
            .key("b", &[], &["b form"]);

        let one = HierarchyExpander::new(&source, vec!["root".to_string()], 1);
        assert_eq!(one.expand(&IdentityReducer), set(&["root form"]));

        let two = HierarchyExpander::new(&source, vec!["root".to_string()], 2);
        assert_eq!(two.expand(&IdentityReducer), set(&["root form", "a form"]));

        let deep = HierarchyExpander::new(&source, vec!["root".to_string()], 10);
        assert_eq!(
            deep.expand(&IdentityReducer),
            set(&["root form", "a form", "b form"])
        );
    }

    #[test]
    fn test_cycles_are_skipped() {
        let source = MapSource::default()
            .key("a", &["b"], &["a form"])
            .key("b", &["a"], &["b form"]);

        let expander = HierarchyExpander::new(&source, vec!["a".to_string()], 10);
        assert_eq!(expander.expand(&IdentityReducer), set(&["a form", "b form"]));
    }

    #[test]
    fn test_failing_branch_does_not_abort_expansion() {
        let source = MapSource::default()
            .key("root", &["bad", "good"], &["root form"])
            .key("good", &[], &["good form"])
            .failing("bad");

        let expander = HierarchyExpander::new(&source, vec!["root".to_string()], 3);
        assert_eq!(
            expander.expand(&IdentityReducer),
            set(&["root form", "good form"])
        );
    }

    #[test]
    fn test_zero_depth_gathers_nothing() {
        let source = MapSource::default().key("root", &[], &["root form"]);
        let expander = HierarchyExpander::new(&source, vec!["root".to_string()], 0);
        assert!(expander.expand(&IdentityReducer).is_empty());
    }
}
