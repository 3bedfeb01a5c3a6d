//! # Uniqueness Accumulator
//!
//! Append-only list of commitment leaves, one per physical document, with a
//! Merkle-style root over the whole sequence. A leaf can be appended exactly
//! once; a second append is a [`ProtocolError::Duplicate`] and leaves both
//! the list and the root untouched.
//!
//! ## Root computation
//!
//! ```text
//! []            -> H(0)                  (sentinel)
//! [a]           -> a
//! [a, b]        -> H(a, b)
//! [a, b, c]     -> H(H(a, b), H(c, c))
//! ```
//!
//! Each level hashes adjacent pairs and duplicates a dangling last element.
//! The root depends on insertion order: `[a, b]` and `[b, a]` differ. Two
//! parties only agree on a root if they appended in the same order.
//!
//! The root is recomputed from scratch on every append. That is O(n) hash
//! calls, which is fine for the volumes a single registry sees.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::EMPTY_ROOT_SENTINEL;
use crate::crypto::backend::{BackendKind, SharedBackend};
use crate::crypto::field::FieldElement;
use crate::crypto::HashBackend;
use crate::error::{ProtocolError, ProtocolResult};
use crate::storage::{Store, StoreError, COLLECTION_ACCUMULATOR, COLLECTION_LEAVES};

const META_ROOT: &str = "root";
const META_BACKEND: &str = "backend";

/// Root of an ordered leaf sequence.
pub fn compute_root(backend: &dyn HashBackend, leaves: &[FieldElement]) -> FieldElement {
    match leaves.len() {
        0 => return backend.field_hash(&[FieldElement::from_u64(EMPTY_ROOT_SENTINEL)]),
        1 => return leaves[0],
        _ => {}
    }

    let mut level: Vec<FieldElement> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                backend.field_hash(&[left, right])
            })
            .collect();
    }
    level[0]
}

/// Leaf for a document-unique identifier (document number, MRZ digest).
pub fn leaf_for_document(backend: &dyn HashBackend, document_id: &str) -> ProtocolResult<FieldElement> {
    let document_id = document_id.trim();
    if document_id.is_empty() {
        return Err(ProtocolError::validation("document identifier is empty"));
    }
    Ok(backend.hash_text(document_id))
}

/// Root and leaf count after an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub root: FieldElement,
    pub leaf_count: usize,
}

/// The accumulator. `append` takes `&mut self`; share it behind a lock.
pub struct UniquenessAccumulator {
    backend: SharedBackend,
    store: Arc<dyn Store>,
    leaves: Vec<FieldElement>,
    index: HashSet<FieldElement>,
    root: FieldElement,
}

impl UniquenessAccumulator {
    /// Restore the accumulator from `store`, or start empty.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Validation`] if the stored leaves were produced by a
    /// different backend kind. [`ProtocolError::Storage`] for corrupt data,
    /// including leaves the active backend would not accept. A leaf that
    /// appears twice in the log is kept once, at its first position.
    pub fn load(backend: SharedBackend, store: Arc<dyn Store>) -> ProtocolResult<Self> {
        if let Some(raw) = store.get(COLLECTION_ACCUMULATOR, META_BACKEND)? {
            let recorded = String::from_utf8_lossy(&raw);
            let recorded: BackendKind = recorded
                .parse()
                .map_err(|reason: String| corrupt(reason))?;
            if recorded != backend.kind() {
                return Err(ProtocolError::validation(format!(
                    "accumulator was built with the {recorded} backend, active backend is {}",
                    backend.kind()
                )));
            }
        }

        let mut leaves = Vec::new();
        let mut index = HashSet::new();
        for raw in store.list(COLLECTION_LEAVES)? {
            let bytes: [u8; 32] = raw
                .as_slice()
                .try_into()
                .map_err(|_| corrupt(format!("leaf has {} bytes", raw.len())))?;
            let leaf = FieldElement::from_bytes(bytes);
            backend
                .check_input(&leaf)
                .map_err(|e| corrupt(format!("stored leaf rejected: {e}")))?;
            if !index.insert(leaf) {
                tracing::warn!(
                    leaf = %leaf,
                    "repeated accumulator leaf in log, keeping first occurrence"
                );
                continue;
            }
            leaves.push(leaf);
        }

        let root = compute_root(backend.as_ref(), &leaves);
        if let Some(cached) = store.get(COLLECTION_ACCUMULATOR, META_ROOT)? {
            if cached.as_slice() != root.as_bytes() {
                tracing::warn!(
                    recomputed = %root,
                    "cached accumulator root disagrees with leaves, using recomputed root"
                );
            }
        }

        tracing::info!(leaves = leaves.len(), root = %root, "accumulator loaded");

        Ok(Self {
            backend,
            store,
            leaves,
            index,
            root,
        })
    }

    /// Append a leaf and return the new root.
    ///
    /// On a duplicate nothing is written to the store. Once the leaf itself
    /// is persisted the append counts, even if caching the new root fails.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Validation`] for a leaf the backend would alias,
    /// [`ProtocolError::Duplicate`] for a leaf already present, and
    /// [`ProtocolError::Storage`] if the leaf could not be written.
    pub fn append(&mut self, leaf: FieldElement) -> ProtocolResult<AppendOutcome> {
        self.backend.check_input(&leaf)?;
        if self.index.contains(&leaf) {
            tracing::debug!(leaf = %leaf, "duplicate accumulator leaf rejected");
            return Err(ProtocolError::Duplicate {
                kind: "accumulator leaf",
                value: leaf.to_hex(),
            });
        }

        let mut next = self.leaves.clone();
        next.push(leaf);
        let root = compute_root(self.backend.as_ref(), &next);

        if self.leaves.is_empty() {
            self.store.set(
                COLLECTION_ACCUMULATOR,
                META_BACKEND,
                self.backend.kind().to_string().as_bytes(),
            )?;
        }
        self.store.append(COLLECTION_LEAVES, leaf.as_bytes())?;

        // The leaf log is authoritative from here on.
        self.leaves = next;
        self.index.insert(leaf);
        self.root = root;

        if let Err(e) = self.store.set(COLLECTION_ACCUMULATOR, META_ROOT, root.as_bytes()) {
            tracing::warn!(error = %e, root = %root, "failed to cache accumulator root");
        }

        tracing::info!(leaf_count = self.leaves.len(), root = %root, "accumulator leaf appended");
        Ok(AppendOutcome {
            root,
            leaf_count: self.leaves.len(),
        })
    }

    /// Read-only membership check.
    pub fn is_duplicate(&self, leaf: &FieldElement) -> bool {
        self.index.contains(leaf)
    }

    pub fn root(&self) -> FieldElement {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn leaves(&self) -> &[FieldElement] {
        &self.leaves
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }
}

fn corrupt(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Storage(StoreError::Corrupt {
        collection: COLLECTION_LEAVES.to_string(),
        reason: reason.into(),
    })
}
