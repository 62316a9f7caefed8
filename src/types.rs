// Core data model for the concept-relationship graph.
// These types cannot be constructed with unnormalized or out-of-range data,
// so the join key between free text and concept ids is identical everywhere.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier for a concept. Ids come from the source files
/// and are never generated by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(i64);

impl ConceptId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A canonical concept name: lowercased, with any trailing parenthetical
/// qualifier stripped ("Foo (disorder)" becomes "foo").
///
/// The normalizing constructor is the only way to build one, so names are
/// normalized identically wherever they are stored or looked up.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedName(String);

impl NormalizedName {
    /// Normalize a raw name. Strips the trailing " (qualifier)" if present
    /// (only when the parenthesis is not the first character) and lowercases.
    pub fn new(raw: &str) -> Self {
        let mut name = raw;
        if let Some(delim) = raw.rfind('(') {
            if delim > 0 {
                name = raw[..delim].trim_end();
            }
        }
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw numeric relation-type code as it appears in relation rows.
///
/// Codes outside the enumerated [`RelationType`] set are stored verbatim in
/// the adjacency lists; queries simply never match them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationCode(i64);

impl RelationCode {
    pub fn new(code: i64) -> Self {
        Self(code)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

/// The fixed set of relation labels queries can traverse, each with the
/// stable numeric code used in the source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// Concept is a subtype of another
    IsA,
    /// Concept is a component of another
    PartOf,
    /// Clinical finding is located at a body site
    FindingSite,
    /// Condition is caused by an agent
    CausativeAgent,
    /// Finding is associated with a morphologic abnormality
    AssociatedMorphology,
    /// Condition is due to another condition
    DueTo,
    /// Severity qualifier
    Severity,
    /// Laterality qualifier
    Laterality,
}

impl RelationType {
    /// All enumerated relation types, in declaration order.
    pub const ALL: [RelationType; 8] = [
        RelationType::IsA,
        RelationType::PartOf,
        RelationType::FindingSite,
        RelationType::CausativeAgent,
        RelationType::AssociatedMorphology,
        RelationType::DueTo,
        RelationType::Severity,
        RelationType::Laterality,
    ];

    /// The numeric code stored in relation rows for this type.
    pub fn code(&self) -> RelationCode {
        let code = match self {
            RelationType::IsA => 116680003,
            RelationType::PartOf => 123005000,
            RelationType::FindingSite => 363698007,
            RelationType::CausativeAgent => 246075003,
            RelationType::AssociatedMorphology => 116676008,
            RelationType::DueTo => 42752001,
            RelationType::Severity => 246112005,
            RelationType::Laterality => 272741003,
        };
        RelationCode::new(code)
    }

    /// Reverse lookup from a stored code. `None` for codes outside the set.
    pub fn from_code(code: RelationCode) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Stable uppercase label used in exports and expander names.
    pub fn label(&self) -> &'static str {
        match self {
            RelationType::IsA => "IS_A",
            RelationType::PartOf => "PART_OF",
            RelationType::FindingSite => "FINDING_SITE",
            RelationType::CausativeAgent => "CAUSATIVE_AGENT",
            RelationType::AssociatedMorphology => "ASSOCIATED_MORPHOLOGY",
            RelationType::DueTo => "DUE_TO",
            RelationType::Severity => "SEVERITY",
            RelationType::Laterality => "LATERALITY",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Traversal direction relative to the query concept.
///
/// Storage order is fixed (`source`, `target`); direction is interpreted at
/// query time. `Children` follows edges where the query concept is the stored
/// target and yields the stored source; `Parents` is the mirror image.
/// `Both` is the union of the two and is never itself recursed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationDirection {
    Children,
    Parents,
    Both,
}

/// A typed edge between two concepts, stored in the adjacency lists of both
/// endpoints. Orientation (parent vs. child) is decided at traversal time by
/// which endpoint matched the query id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub source: ConceptId,
    pub code: RelationCode,
    pub target: ConceptId,
}

impl Relation {
    pub fn new(source: ConceptId, code: RelationCode, target: ConceptId) -> Self {
        Self {
            source,
            code,
            target,
        }
    }

    /// The endpoint that is not `id`. For self-loops, returns `id`.
    pub fn other_endpoint(&self, id: ConceptId) -> ConceptId {
        if self.source == id {
            self.target
        } else {
            self.source
        }
    }
}
