use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fsindex_core::IndexError;

/// Arena handle for a [`PathNode`]. The Path Tree is the sole owner of node
/// storage (Design Notes §9); everything else, the Name Trie included,
/// holds one of these instead of an owning pointer.
pub type NodeId = u64;

const ROOT_ID: NodeId = 0;

struct PathNodeStorage {
    basename: String,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
}

/// Hierarchical representation of every indexed filesystem entry.
///
/// Storing only the basename in each node (not the full path) collapses
/// common prefixes implicitly: for a tree of N nodes, memory is
/// O(N · average_basename_length + N · child_map_overhead), which dominates
/// over storing full paths per entry.
pub struct PathTree {
    nodes: HashMap<NodeId, PathNodeStorage>,
    next_id: NodeId,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_ID,
            PathNodeStorage {
                basename: "/".to_string(),
                parent: None,
                children: HashMap::new(),
            },
        );
        PathTree { nodes, next_id: ROOT_ID + 1 }
    }

    pub fn root(&self) -> NodeId {
        ROOT_ID
    }

    /// Splits an absolute path into its non-root components. Empty components
    /// other than the leading "/" are rejected, as is a non-absolute path.
    fn split_absolute(path: &Path) -> Result<Vec<String>, IndexError> {
        let s = path
            .to_str()
            .ok_or_else(|| IndexError::InvalidPath(path.to_path_buf()))?;

        if !s.starts_with('/') {
            return Err(IndexError::InvalidPath(path.to_path_buf()));
        }

        let trimmed = s.trim_end_matches('/');
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let mut parts = Vec::new();
        for part in trimmed[1..].split('/') {
            if part.is_empty() {
                return Err(IndexError::InvalidPath(path.to_path_buf()));
            }
            parts.push(part.to_string());
        }
        Ok(parts)
    }

    /// Ensures a node exists for each prefix directory and a leaf for the
    /// final component; returns the leaf. Idempotent.
    pub fn add(&mut self, path: &Path) -> Result<NodeId, IndexError> {
        let parts = Self::split_absolute(path)?;

        let mut current = ROOT_ID;
        for part in parts {
            let existing = self.nodes[&current].children.get(&part).copied();
            current = match existing {
                Some(id) => id,
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.nodes.insert(
                        id,
                        PathNodeStorage {
                            basename: part.clone(),
                            parent: Some(current),
                            children: HashMap::new(),
                        },
                    );
                    self.nodes.get_mut(&current).unwrap().children.insert(part, id);
                    id
                }
            };
        }
        Ok(current)
    }

    /// Resolves a path to its node id, if indexed.
    pub fn lookup(&self, path: &Path) -> Option<NodeId> {
        let parts = Self::split_absolute(path).ok()?;
        let mut current = ROOT_ID;
        for part in parts {
            current = *self.nodes.get(&current)?.children.get(&part)?;
        }
        Some(current)
    }

    /// Removes the node at `path` and every descendant, unlinking from the
    /// parent's child map. No-op if the path is absent.
    pub fn delete_at(&mut self, path: &Path) -> Result<(), IndexError> {
        let Some(node) = self.lookup(path) else {
            return Ok(());
        };
        self.delete_node(node);
        Ok(())
    }

    /// Removes a node (and its subtree) by id, unlinking it from its parent.
    pub fn delete_node(&mut self, node: NodeId) {
        if node == ROOT_ID {
            // Root deletion clears everything but the root node itself.
            let child_ids: Vec<NodeId> = self.nodes[&ROOT_ID].children.values().copied().collect();
            for child in child_ids {
                self.remove_subtree_nodes(child);
            }
            self.nodes.get_mut(&ROOT_ID).unwrap().children.clear();
            return;
        }

        let parent = self.nodes[&node].parent;
        let basename = self.nodes[&node].basename.clone();
        self.remove_subtree_nodes(node);
        if let Some(parent) = parent {
            if let Some(parent_storage) = self.nodes.get_mut(&parent) {
                parent_storage.children.remove(&basename);
            }
        }
    }

    /// Frees `node` and all descendants from the arena without touching the
    /// parent's child map (caller does that once, for the subtree root).
    fn remove_subtree_nodes(&mut self, node: NodeId) {
        let child_ids: Vec<NodeId> = match self.nodes.get(&node) {
            Some(n) => n.children.values().copied().collect(),
            None => return,
        };
        for child in child_ids {
            self.remove_subtree_nodes(child);
        }
        self.nodes.remove(&node);
    }

    /// Direct children's basenames. Fails with `NotFound` if absent.
    pub fn children_of(&self, path: &Path) -> Result<Vec<String>, IndexError> {
        let node = self
            .lookup(path)
            .ok_or_else(|| IndexError::NotFound(path.to_path_buf()))?;
        Ok(self.nodes[&node].children.keys().cloned().collect())
    }

    pub fn basename_of(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.basename.as_str())
    }

    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Walks parent links and joins basenames with '/' to reconstruct the
    /// absolute path. O(depth).
    pub fn path_of(&self, node: NodeId) -> Option<PathBuf> {
        let mut parts = Vec::new();
        let mut current = node;
        loop {
            let storage = self.nodes.get(&current)?;
            match storage.parent {
                None => break,
                Some(parent) => {
                    parts.push(storage.basename.clone());
                    current = parent;
                }
            }
        }
        parts.reverse();
        if parts.is_empty() {
            Some(PathBuf::from("/"))
        } else {
            Some(PathBuf::from(format!("/{}", parts.join("/"))))
        }
    }

    /// Post-order listing of `node` and every descendant, leaves first, the
    /// node itself last. Used by the Refresh Engine to remove trie entries
    /// before unlinking the tree (Design Notes §9: trie removal precedes
    /// tree removal).
    pub fn subtree_postorder(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_postorder(node, &mut out);
        out
    }

    fn collect_postorder(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let Some(storage) = self.nodes.get(&node) else {
            return;
        };
        let mut child_ids: Vec<NodeId> = storage.children.values().copied().collect();
        child_ids.sort_unstable();
        for child in child_ids {
            self.collect_postorder(child, out);
        }
        out.push(node);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
