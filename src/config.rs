// Store configuration and its fluent builder.

use anyhow::{ensure, Result};
use std::path::PathBuf;

/// Configuration for a [`crate::TerminologyStore`]: the delimited source
/// files to parse on first miss, the field delimiter, and an optional
/// snapshot path for warm restarts.
#[derive(Debug, Clone)]
pub struct TerminologyConfig {
    /// Concept files, parsed in order (6 columns: id, status, name, ...)
    pub concept_files: Vec<PathBuf>,
    /// Relation files, parsed in order (7 columns: relId, id1, relType, id2, ...)
    pub relation_files: Vec<PathBuf>,
    /// Field delimiter; tab for the core sources, pipe-separated sources exist
    pub delimiter: char,
    /// Snapshot file restored at open and written at close, when set
    pub snapshot_path: Option<PathBuf>,
}

impl TerminologyConfig {
    pub fn builder() -> TerminologyConfigBuilder {
        TerminologyConfigBuilder::new()
    }
}

/// Fluent builder for [`TerminologyConfig`] with validation at each step.
pub struct TerminologyConfigBuilder {
    concept_files: Vec<PathBuf>,
    relation_files: Vec<PathBuf>,
    delimiter: char,
    snapshot_path: Option<PathBuf>,
}

impl Default for TerminologyConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminologyConfigBuilder {
    pub fn new() -> Self {
        Self {
            concept_files: Vec::new(),
            relation_files: Vec::new(),
            delimiter: '\t',
            snapshot_path: None,
        }
    }

    /// Add a concept file to parse during base initialization.
    pub fn concept_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure!(
            !path.as_os_str().is_empty(),
            "Concept file path cannot be empty"
        );
        self.concept_files.push(path);
        Ok(self)
    }

    /// Add a relation file to parse during base initialization.
    pub fn relation_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure!(
            !path.as_os_str().is_empty(),
            "Relation file path cannot be empty"
        );
        self.relation_files.push(path);
        Ok(self)
    }

    /// Set the field delimiter (default: tab).
    pub fn delimiter(mut self, delimiter: char) -> Result<Self> {
        ensure!(
            delimiter != '\n' && delimiter != '\r',
            "Delimiter cannot be a line terminator"
        );
        self.delimiter = delimiter;
        Ok(self)
    }

    /// Set the snapshot path used for warm restarts.
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure!(
            !path.as_os_str().is_empty(),
            "Snapshot path cannot be empty"
        );
        self.snapshot_path = Some(path);
        Ok(self)
    }

    /// Build the configuration.
    ///
    /// A configuration with no source files is valid: such a store serves
    /// only snapshot-seeded keys, and a cold miss builds an empty base.
    pub fn build(self) -> TerminologyConfig {
        TerminologyConfig {
            concept_files: self.concept_files,
            relation_files: self.relation_files,
            delimiter: self.delimiter,
            snapshot_path: self.snapshot_path,
        }
    }
}
