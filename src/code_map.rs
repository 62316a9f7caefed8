// Mapping from graph concepts to external terminology codes via two
// delimited mapping files.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

use crate::normalize::EntryReducer;
use crate::store::TerminologyStore;
use crate::types::{ConceptId, RelationDirection, RelationType};

/// How many IS_A levels of descendants of the query term to map.
const DESCENDANT_LEVELS: i32 = 3;

/// Maps concepts (and their IS_A descendants) to codes in an external
/// terminology, via a concept-to-target mapping file and a target-to-codes
/// file.
pub struct CodeMapper<'a> {
    store: &'a TerminologyStore,
    /// Concept id to external target id
    targets: HashMap<ConceptId, ConceptId>,
    /// External target id to its codes
    codes: HashMap<ConceptId, HashSet<String>>,
}

impl<'a> CodeMapper<'a> {
    /// Eagerly parse both mapping files. Header rows are skipped; malformed
    /// rows are logged and skipped; unreadable files are fatal.
    ///
    /// The mapping file maps column 1 (concept id) to column 4 (target id).
    /// The targets file maps column 0 (target id) to the pipe-separated
    /// codes in column 2.
    pub fn open(
        store: &'a TerminologyStore,
        targets_path: &Path,
        mapping_path: &Path,
        delimiter: char,
    ) -> Result<Self> {
        let mut mapper = Self {
            store,
            targets: HashMap::new(),
            codes: HashMap::new(),
        };
        mapper.parse_mapping(mapping_path, delimiter)?;
        mapper.parse_targets(targets_path, delimiter)?;
        Ok(mapper)
    }

    /// External codes for `term`: resolve the term and its IS_A descendants,
    /// map each through target to codes, union, and reduce.
    pub fn codes_for(&self, term: &str, reducer: &dyn EntryReducer) -> Result<HashSet<String>> {
        let concepts = self.store.get_concept_ids(
            term,
            RelationType::IsA,
            DESCENDANT_LEVELS,
            RelationDirection::Children,
        )?;

        let mut results = HashSet::new();
        for id in concepts {
            if let Some(target) = self.targets.get(&id) {
                if let Some(codes) = self.codes.get(target) {
                    results.extend(codes.iter().cloned());
                }
            }
        }
        reducer.reduce_entries(&mut results);
        Ok(results)
    }

    fn parse_mapping(&mut self, path: &Path, delimiter: char) -> Result<()> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open mapping file {}", path.display()))?;
        let reader = BufReader::new(file);

        for (line_no, line) in reader.lines().enumerate().skip(1) {
            let line =
                line.with_context(|| format!("Failed to read mapping file {}", path.display()))?;
            let columns: Vec<&str> = line.split(delimiter).collect();
            if columns.len() < 5 {
                warn!(
                    "Found {} columns, expected at least 5 on line {} of {}",
                    columns.len(),
                    line_no,
                    path.display()
                );
                continue;
            }
            match (columns[1].parse::<i64>(), columns[4].parse::<i64>()) {
                (Ok(concept), Ok(target)) => {
                    self.targets
                        .insert(ConceptId::new(concept), ConceptId::new(target));
                }
                _ => warn!(
                    "Found illegal numeric value on line {} of {}",
                    line_no,
                    path.display()
                ),
            }
        }

        info!("Generated {} target mappings", self.targets.len());
        Ok(())
    }

    fn parse_targets(&mut self, path: &Path, delimiter: char) -> Result<()> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open targets file {}", path.display()))?;
        let reader = BufReader::new(file);

        for (line_no, line) in reader.lines().enumerate().skip(1) {
            let line =
                line.with_context(|| format!("Failed to read targets file {}", path.display()))?;
            let columns: Vec<&str> = line.split(delimiter).collect();
            if columns.len() < 3 {
                warn!(
                    "Found {} columns, expected at least 3 on line {} of {}",
                    columns.len(),
                    line_no,
                    path.display()
                );
                continue;
            }
            let Ok(target) = columns[0].parse::<i64>() else {
                warn!(
                    "Found illegal target id on line {} of {}",
                    line_no,
                    path.display()
                );
                continue;
            };
            let codes = self.codes.entry(ConceptId::new(target)).or_default();
            codes.extend(columns[2].split('|').map(|code| code.to_string()));
        }

        info!("Generated {} code mappings", self.codes.len());
        Ok(())
    }
}
