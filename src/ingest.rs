// Bulk ingestion of delimited terminology sources into the base indices.
//
// The base indices are built exactly once, under the cache's exclusive lock,
// and are never mutated afterwards. Malformed rows are logged and skipped;
// only an I/O failure on a configured file is fatal.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::TerminologyConfig;
use crate::types::{ConceptId, NormalizedName, Relation, RelationCode};

/// Expected column count for concept rows: id, status, name, ctv3Id,
/// sourceId, isPrimitive.
const CONCEPT_COLUMNS: usize = 6;

/// Expected column count for relation rows: relId, id1, relType, id2,
/// characteristicType, refinability, group.
const RELATION_COLUMNS: usize = 7;

/// The three base indices, read-only once built.
#[derive(Debug, Default)]
pub struct BaseIndices {
    /// Normalized name to concept ids; one name may map to several ids
    pub name_to_ids: HashMap<NormalizedName, HashSet<ConceptId>>,
    /// Concept id to its canonical normalized name
    pub id_to_name: HashMap<ConceptId, String>,
    /// Concept id to every relation touching it; each relation appears
    /// under both endpoints
    pub id_to_relations: HashMap<ConceptId, Vec<Relation>>,
}

impl BaseIndices {
    pub fn concept_count(&self) -> usize {
        self.id_to_name.len()
    }

    /// Number of distinct relations (each is stored under both endpoints).
    pub fn relation_count(&self) -> usize {
        self.id_to_relations
            .iter()
            .map(|(id, rels)| rels.iter().filter(|r| r.source == *id).count())
            .sum()
    }
}

/// Parse every configured concept file then every relation file, in order.
///
/// Fatal only when a configured file cannot be opened or read; there is no
/// partial-index fallback.
pub fn build_base_indices(config: &TerminologyConfig) -> Result<BaseIndices> {
    let mut indices = BaseIndices::default();

    for path in &config.concept_files {
        info!("Parsing concept file {}", path.display());
        parse_concept_file(path, config.delimiter, &mut indices)?;
    }
    for path in &config.relation_files {
        info!("Parsing relation file {}", path.display());
        parse_relation_file(path, config.delimiter, &mut indices)?;
    }

    Ok(indices)
}

fn parse_concept_file(path: &Path, delimiter: char, indices: &mut BaseIndices) -> Result<()> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open concept file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut parsed = 0usize;
    // Skip the header row
    for (line_no, line) in reader.lines().enumerate().skip(1) {
        let line = line
            .with_context(|| format!("Failed to read concept file {}", path.display()))?;
        let columns: Vec<&str> = line.split(delimiter).collect();

        if columns.len() != CONCEPT_COLUMNS {
            warn!(
                "Found {} columns, expected {} on line {} of {}",
                columns.len(),
                CONCEPT_COLUMNS,
                line_no,
                path.display()
            );
            continue;
        }

        let id = match columns[0].parse::<i64>() {
            Ok(id) => ConceptId::new(id),
            Err(_) => {
                warn!(
                    "Found illegal id value {:?} on line {} of {}",
                    columns[0],
                    line_no,
                    path.display()
                );
                continue;
            }
        };

        // Only id (column 0) and fully specified name (column 2) are used
        let name = NormalizedName::new(columns[2]);
        indices
            .name_to_ids
            .entry(name.clone())
            .or_default()
            .insert(id);
        // A later row for the same id overwrites the canonical name; the old
        // name keeps mapping to the id
        indices.id_to_name.insert(id, name.into_string());
        parsed += 1;
    }

    debug!("Parsed {} concepts from {}", parsed, path.display());
    Ok(())
}

fn parse_relation_file(path: &Path, delimiter: char, indices: &mut BaseIndices) -> Result<()> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open relation file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut parsed = 0usize;
    // Skip the header row
    for (line_no, line) in reader.lines().enumerate().skip(1) {
        let line = line
            .with_context(|| format!("Failed to read relation file {}", path.display()))?;
        let columns: Vec<&str> = line.split(delimiter).collect();

        if columns.len() != RELATION_COLUMNS {
            warn!(
                "Found {} columns, expected {} on line {} of {}: |{}|",
                columns.len(),
                RELATION_COLUMNS,
                line_no,
                path.display(),
                line
            );
            continue;
        }

        // Columns 1-3: source id, relation-type code, target id
        let fields: Option<(i64, i64, i64)> = match (
            columns[1].parse::<i64>(),
            columns[2].parse::<i64>(),
            columns[3].parse::<i64>(),
        ) {
            (Ok(a), Ok(t), Ok(b)) => Some((a, t, b)),
            _ => None,
        };
        let Some((source, code, target)) = fields else {
            warn!(
                "Found illegal numeric value on line {} of {}: |{}|",
                line_no,
                path.display(),
                line
            );
            continue;
        };

        let relation = Relation::new(
            ConceptId::new(source),
            RelationCode::new(code),
            ConceptId::new(target),
        );

        // Store the relation under both endpoints so either side can
        // discover it at traversal time
        indices
            .id_to_relations
            .entry(relation.source)
            .or_default()
            .push(relation);
        indices
            .id_to_relations
            .entry(relation.target)
            .or_default()
            .push(relation);
        parsed += 1;
    }

    debug!("Parsed {} relations from {}", parsed, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RelationType;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).expect("create test file");
        file.write_all(contents.as_bytes()).expect("write test file");
        path
    }

    fn config_for(
        concepts: &std::path::Path,
        relations: &std::path::Path,
    ) -> TerminologyConfig {
        TerminologyConfig::builder()
            .concept_file(concepts)
            .expect("concept file")
            .relation_file(relations)
            .expect("relation file")
            .build()
    }

    #[test]
    fn test_builds_all_three_indices() -> Result<()> {
        let dir = TempDir::new()?;
        let concepts = write_file(
            &dir,
            "concepts.txt",
            "id\tstatus\tname\tctv3\tsrc\tprim\n\
             1\t0\tHeart (organ)\tx\ty\tz\n\
             2\t0\tHeart disease (disorder)\tx\ty\tz\n",
        );
        let relations = write_file(
            &dir,
            "relations.txt",
            &format!(
                "relId\tid1\ttype\tid2\tchar\tref\tgroup\n\
                 10\t2\t{}\t1\tc\tr\tg\n",
                RelationType::IsA.code().get()
            ),
        );

        let indices = build_base_indices(&config_for(&concepts, &relations))?;

        assert_eq!(indices.concept_count(), 2);
        assert_eq!(indices.relation_count(), 1);
        assert_eq!(
            indices.id_to_name.get(&ConceptId::new(1)),
            Some(&"heart".to_string())
        );
        let ids = indices
            .name_to_ids
            .get(&NormalizedName::new("heart disease"))
            .expect("name indexed");
        assert!(ids.contains(&ConceptId::new(2)));

        // Relation visible from both endpoints
        assert_eq!(indices.id_to_relations[&ConceptId::new(1)].len(), 1);
        assert_eq!(indices.id_to_relations[&ConceptId::new(2)].len(), 1);
        Ok(())
    }

    #[test]
    fn test_header_row_is_always_skipped() -> Result<()> {
        let dir = TempDir::new()?;
        // Header happens to be a well formed concept row; it must still be skipped
        let concepts = write_file(
            &dir,
            "concepts.txt",
            "9\t0\tHeader concept\tx\ty\tz\n\
             1\t0\tReal concept\tx\ty\tz\n",
        );
        let relations = write_file(&dir, "relations.txt", "header\n");

        let indices = build_base_indices(&config_for(&concepts, &relations))?;
        assert_eq!(indices.concept_count(), 1);
        assert!(!indices.id_to_name.contains_key(&ConceptId::new(9)));
        Ok(())
    }

    #[test]
    fn test_malformed_rows_are_skipped_not_fatal() -> Result<()> {
        let dir = TempDir::new()?;
        let concepts = write_file(
            &dir,
            "concepts.txt",
            "header\n\
             1\t0\tGood concept\tx\ty\tz\n\
             2\t0\tmissing columns\n\
             not-a-number\t0\tBad id\tx\ty\tz\n\
             3\t0\tAnother good one\tx\ty\tz\n",
        );
        let relations = write_file(
            &dir,
            "relations.txt",
            &format!(
                "header\n\
                 10\t1\t{code}\t3\tc\tr\tg\n\
                 11\t1\t{code}\t3\n\
                 12\tNaN\t{code}\t3\tc\tr\tg\n",
                code = RelationType::IsA.code().get()
            ),
        );

        let indices = build_base_indices(&config_for(&concepts, &relations))?;
        assert_eq!(indices.concept_count(), 2);
        assert_eq!(indices.relation_count(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let config = TerminologyConfig::builder()
            .concept_file("/nonexistent/concepts.txt")
            .expect("path")
            .build();
        let err = build_base_indices(&config).expect_err("missing file must fail");
        assert!(err.to_string().contains("concepts.txt"));
    }

    #[test]
    fn test_duplicate_names_accumulate_ids() -> Result<()> {
        let dir = TempDir::new()?;
        let concepts = write_file(
            &dir,
            "concepts.txt",
            "header\n\
             1\t0\tCold (disorder)\tx\ty\tz\n\
             2\t0\tCold (finding)\tx\ty\tz\n",
        );
        let relations = write_file(&dir, "relations.txt", "header\n");

        let indices = build_base_indices(&config_for(&concepts, &relations))?;
        let ids = &indices.name_to_ids[&NormalizedName::new("cold")];
        assert_eq!(ids.len(), 2);
        Ok(())
    }

    #[test]
    fn test_pipe_delimiter() -> Result<()> {
        let dir = TempDir::new()?;
        let concepts = write_file(
            &dir,
            "concepts.txt",
            "header\n1|0|Aspirin (product)|x|y|z\n",
        );
        let relations = write_file(&dir, "relations.txt", "header\n");

        let config = TerminologyConfig::builder()
            .concept_file(&concepts)?
            .relation_file(&relations)?
            .delimiter('|')?
            .build();
        let indices = build_base_indices(&config)?;
        assert_eq!(
            indices.id_to_name.get(&ConceptId::new(1)),
            Some(&"aspirin".to_string())
        );
        Ok(())
    }
}
