//! Object identifiers and graph-wide unique allocation.
//!
//! Every record in a project document is addressed by a 24-character
//! uppercase hex identifier. Uniqueness is global: no two records anywhere in
//! the graph may share an identifier, regardless of section. Allocation draws
//! 128 bits of randomness per candidate and checks the candidate against the
//! live identifiers of the whole graph before handing it out.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::graph::ObjectGraph;

// ============================================================================
// Constants
// ============================================================================

/// Length of a canonical object identifier in hex characters.
pub const OBJECT_ID_LEN: usize = 24;

/// Allocation attempts before giving up. Collisions are astronomically rare,
/// so the cap only matters when the randomness source is broken; it keeps a
/// bad source from looping forever.
const MAX_ATTEMPTS: usize = 1024;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during identifier allocation.
#[derive(Debug, Error)]
pub enum IdentError {
    /// Every candidate collided with a live identifier. Fatal: the randomness
    /// source is not producing fresh values.
    #[error("identifier space exhausted after {attempts} attempts")]
    SpaceExhausted { attempts: usize },
}

// ============================================================================
// ObjectId
// ============================================================================

/// A 24-character uppercase hex identifier addressing one record.
///
/// Identifiers parsed from the wire are carried as-is even when they are not
/// canonical; only canonical (exactly 24 hex chars) identifiers participate
/// in the uniqueness universe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap an existing identifier without validation.
    pub fn new(id: impl Into<String>) -> Self {
        ObjectId(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for exactly 24 uppercase hex characters.
    pub fn is_canonical(&self) -> bool {
        self.0.len() == OBJECT_ID_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
    }

    /// Allocate a fresh identifier not present anywhere in `graph`.
    ///
    /// The identifier is not reserved: the caller must insert it before the
    /// next allocation against the same graph, or batch with
    /// [`ObjectId::allocate_many`].
    pub fn allocate(graph: &ObjectGraph) -> Result<ObjectId, IdentError> {
        ObjectId::allocate_with(graph, candidate)
    }

    /// Allocate `count` identifiers that are fresh against `graph` and
    /// mutually distinct.
    ///
    /// Used by multi-record transactions that need all identifiers up front,
    /// before the first insert.
    pub fn allocate_many(graph: &ObjectGraph, count: usize) -> Result<Vec<ObjectId>, IdentError> {
        let live = graph.all_ids();
        let mut batch: Vec<ObjectId> = Vec::with_capacity(count);
        for _ in 0..count {
            let mut attempts = 0;
            loop {
                if attempts == MAX_ATTEMPTS {
                    return Err(IdentError::SpaceExhausted { attempts });
                }
                attempts += 1;
                let id = ObjectId(candidate());
                if !live.contains(id.as_str()) && !batch.contains(&id) {
                    batch.push(id);
                    break;
                }
            }
        }
        Ok(batch)
    }

    /// Like [`ObjectId::allocate`], with an explicit candidate source.
    ///
    /// Candidates are used verbatim, so a source that yields non-canonical
    /// strings produces non-canonical identifiers. Exposed for tests that
    /// need to force collisions.
    pub fn allocate_with(
        graph: &ObjectGraph,
        mut candidates: impl FnMut() -> String,
    ) -> Result<ObjectId, IdentError> {
        let live = graph.all_ids();
        let mut attempts = 0;
        loop {
            if attempts == MAX_ATTEMPTS {
                return Err(IdentError::SpaceExhausted { attempts });
            }
            attempts += 1;
            let id = ObjectId(candidates());
            if !live.contains(id.as_str()) {
                return Ok(id);
            }
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        ObjectId(id.to_string())
    }
}

/// One candidate: a v4 UUID's 32 hex digits, truncated to 24 and uppercased.
fn candidate() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..OBJECT_ID_LEN].to_ascii_uppercase()
}

// ============================================================================
// Tests
// ============================================================================
