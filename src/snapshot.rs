// Single-file persistence of the cache maps for warm restarts.
//
// On-disk layout: 8-byte magic, u32 LE format version, u32 LE crc32c of the
// payload, bincode payload. Any load failure downgrades to a cold start;
// save failures surface to the caller since a lost snapshot has no
// silent-success fallback.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::types::{ConceptId, NormalizedName, Relation};

/// Magic number identifying termgraph snapshot files.
const SNAPSHOT_MAGIC: &[u8; 8] = b"TERMSNAP";

/// Version of the snapshot format. Mismatches reject the file and force a
/// cold start rather than guessing at an old layout.
const SNAPSHOT_VERSION: u32 = 1;

/// Header size: magic + version + checksum.
const HEADER_SIZE: usize = 8 + 4 + 4;

/// The serialized unit: the three cache maps plus a creation timestamp.
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub name_to_ids: HashMap<NormalizedName, HashSet<ConceptId>>,
    pub id_to_name: HashMap<ConceptId, Option<String>>,
    pub id_to_relations: HashMap<ConceptId, Vec<Relation>>,
    pub created_at: DateTime<Utc>,
}

impl SnapshotPayload {
    pub fn new(
        name_to_ids: HashMap<NormalizedName, HashSet<ConceptId>>,
        id_to_name: HashMap<ConceptId, Option<String>>,
        id_to_relations: HashMap<ConceptId, Vec<Relation>>,
    ) -> Self {
        Self {
            name_to_ids,
            id_to_name,
            id_to_relations,
            created_at: Utc::now(),
        }
    }

    /// Total number of cached entries across the three maps.
    pub fn entry_count(&self) -> usize {
        self.name_to_ids.len() + self.id_to_name.len() + self.id_to_relations.len()
    }
}

/// Why a snapshot file was rejected at load time.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot file: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot file too short: {0} bytes")]
    ShortHeader(usize),
    #[error("not a termgraph snapshot (bad magic)")]
    BadMagic,
    #[error("snapshot format version {found} != supported {expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("snapshot checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("failed to decode snapshot payload: {0}")]
    Decode(#[from] bincode::Error),
}

/// Serialize the payload to `path`, creating parent directories as needed.
/// The write goes through a temp file in the target directory and is
/// atomically persisted over `path`.
pub fn save(path: &Path, payload: &SnapshotPayload) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create snapshot directory {}", parent.display()))?;

    let encoded = bincode::serialize(payload).context("Failed to serialize snapshot payload")?;
    let checksum = crc32c::crc32c(&encoded);

    let mut file = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    file.write_all(SNAPSHOT_MAGIC)?;
    file.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
    file.write_all(&checksum.to_le_bytes())?;
    file.write_all(&encoded)?;
    file.persist(path)
        .with_context(|| format!("Failed to persist snapshot to {}", path.display()))?;
    Ok(())
}

/// Attempt to load a snapshot. Any failure is logged and mapped to `None`;
/// a missing or corrupt snapshot simply forces cold-start behavior.
pub fn load(path: &Path) -> Option<SnapshotPayload> {
    match try_load(path) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!("Ignoring snapshot {}: {}", path.display(), err);
            None
        }
    }
}

fn try_load(path: &Path) -> Result<SnapshotPayload, SnapshotError> {
    let bytes = fs::read(path)?;
    if bytes.len() < HEADER_SIZE {
        return Err(SnapshotError::ShortHeader(bytes.len()));
    }
    if &bytes[..8] != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }

    let version = u32::from_le_bytes(bytes[8..12].try_into().expect("fixed slice"));
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let stored = u32::from_le_bytes(bytes[12..16].try_into().expect("fixed slice"));
    let payload_bytes = &bytes[HEADER_SIZE..];
    let computed = crc32c::crc32c(payload_bytes);
    if stored != computed {
        return Err(SnapshotError::ChecksumMismatch { stored, computed });
    }

    Ok(bincode::deserialize(payload_bytes)?)
}
