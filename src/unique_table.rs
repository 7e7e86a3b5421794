use hashbrown::{HashMap, hash_map::RawEntryMut};
use rapidhash::quality::RandomState;
use slotmap::SlotMap;
use std::hash::BuildHasher;

use crate::node::{MatrixEdge, MatrixNode, MatrixNodeRef, VectorEdge, VectorNode, VectorNodeRef};

/// One hash-consing table per variable level, per node kind.
///
/// A `hashbrown` `raw_entry` index keyed by a hash of node content, resolved
/// against a backing arena rather than storing content inline. The arena is
/// a `slotmap::SlotMap` rather than an append-only `Vec`, so node refs stay
/// stable across insertion/removal — a live edge elsewhere in the DAG can
/// keep pointing at a node while an unrelated one is garbage-collected.
pub struct VectorUniqueTable {
    nodes: SlotMap<VectorNodeRef, VectorNode>,
    index: HashMap<VectorNodeRef, (), RandomState>,
}

impl VectorUniqueTable {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            index: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Obtains a fresh, not-yet-canonical node slot with zero refcount.
    pub fn get_node(&mut self, var: i32, children: Vec<VectorEdge>) -> VectorNodeRef {
        self.nodes.insert(VectorNode {
            var,
            children,
            refcount: 0,
        })
    }

    pub fn node(&self, r: VectorNodeRef) -> &VectorNode {
        &self.nodes[r]
    }

    pub fn node_mut(&mut self, r: VectorNodeRef) -> &mut VectorNode {
        &mut self.nodes[r]
    }

    /// Returns a freshly allocated but never-inserted node to the free list.
    pub fn return_node(&mut self, r: VectorNodeRef) {
        self.nodes.remove(r);
    }

    /// Canonicalizes a normalized, freshly built node. If a structurally
    /// equivalent node is already live, the fresh one is recycled and the
    /// existing node's ref is returned; otherwise the fresh node is inserted.
    pub fn lookup(&mut self, candidate: VectorNodeRef) -> VectorNodeRef {
        let hasher_builder = *self.index.hasher();
        let hash = hasher_builder.hash_one(&self.nodes[candidate]);

        let nodes = &self.nodes;
        let entry = self
            .index
            .raw_entry_mut()
            .from_hash(hash, |&key| nodes[key] == nodes[candidate]);
        match entry {
            RawEntryMut::Occupied(entry) => {
                let canonical = *entry.key();
                self.nodes.remove(candidate);
                canonical
            }
            RawEntryMut::Vacant(entry) => {
                entry.insert_with_hasher(hash, candidate, (), |&key| {
                    hasher_builder.hash_one(&self.nodes[key])
                });
                candidate
            }
        }
    }

    pub fn inc_ref(&mut self, r: VectorNodeRef) -> bool {
        let n = &mut self.nodes[r];
        if n.refcount == u32::MAX {
            return false;
        }
        n.refcount += 1;
        n.refcount == 1
    }

    pub fn dec_ref(&mut self, r: VectorNodeRef) -> bool {
        let n = &mut self.nodes[r];
        if n.refcount == u32::MAX || n.refcount == 0 {
            return false;
        }
        n.refcount -= 1;
        n.refcount == 0
    }

    /// Removes every node with refcount `0`. Returns the number removed.
    pub fn garbage_collect(&mut self) -> usize {
        let dead: Vec<VectorNodeRef> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.refcount == 0)
            .map(|(k, _)| k)
            .collect();
        for &k in &dead {
            self.index.remove(&k);
            self.nodes.remove(k);
        }
        dead.len()
    }

    pub fn live_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for VectorUniqueTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Matrix-node counterpart of [`VectorUniqueTable`].
pub struct MatrixUniqueTable {
    nodes: SlotMap<MatrixNodeRef, MatrixNode>,
    index: HashMap<MatrixNodeRef, (), RandomState>,
}

impl MatrixUniqueTable {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            index: HashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn get_node(&mut self, var: i32, children: Vec<MatrixEdge>) -> MatrixNodeRef {
        self.nodes.insert(MatrixNode {
            var,
            children,
            refcount: 0,
            symmetric: false,
            identity: false,
        })
    }

    pub fn node(&self, r: MatrixNodeRef) -> &MatrixNode {
        &self.nodes[r]
    }

    pub fn node_mut(&mut self, r: MatrixNodeRef) -> &mut MatrixNode {
        &mut self.nodes[r]
    }

    pub fn return_node(&mut self, r: MatrixNodeRef) {
        self.nodes.remove(r);
    }

    pub fn lookup(&mut self, candidate: MatrixNodeRef) -> MatrixNodeRef {
        let hasher_builder = *self.index.hasher();
        let hash = hasher_builder.hash_one(&self.nodes[candidate]);

        let nodes = &self.nodes;
        let entry = self
            .index
            .raw_entry_mut()
            .from_hash(hash, |&key| nodes[key] == nodes[candidate]);
        match entry {
            RawEntryMut::Occupied(entry) => {
                let canonical = *entry.key();
                self.nodes.remove(candidate);
                canonical
            }
            RawEntryMut::Vacant(entry) => {
                entry.insert_with_hasher(hash, candidate, (), |&key| {
                    hasher_builder.hash_one(&self.nodes[key])
                });
                candidate
            }
        }
    }

    pub fn inc_ref(&mut self, r: MatrixNodeRef) -> bool {
        let n = &mut self.nodes[r];
        if n.refcount == u32::MAX {
            return false;
        }
        n.refcount += 1;
        n.refcount == 1
    }

    pub fn dec_ref(&mut self, r: MatrixNodeRef) -> bool {
        let n = &mut self.nodes[r];
        if n.refcount == u32::MAX || n.refcount == 0 {
            return false;
        }
        n.refcount -= 1;
        n.refcount == 0
    }

    pub fn garbage_collect(&mut self) -> usize {
        let dead: Vec<MatrixNodeRef> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.refcount == 0)
            .map(|(k, _)| k)
            .collect();
        for &k in &dead {
            self.index.remove(&k);
            self.nodes.remove(k);
        }
        dead.len()
    }

    pub fn live_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for MatrixUniqueTable {
    fn default() -> Self {
        Self::new()
    }
}
