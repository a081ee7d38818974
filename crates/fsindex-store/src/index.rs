use std::path::{Path, PathBuf};

use fsindex_core::IndexError;

use crate::tree::{NodeId, PathTree};
use crate::trie::{FileEntry, NameTrie};

/// The two shared structures the Event Loop serializes all access through
/// (spec §3's Ownership rule): the Path Tree is the sole owner of node
/// storage, the Name Trie holds non-owning `NodeId` handles keyed by
/// basename. Every mutation that touches both goes through here so the
/// deletion order from Design Notes §9 (trie first, then tree) is never
/// accidentally inverted at a call site.
#[derive(Default)]
pub struct Index {
    pub tree: PathTree,
    pub trie: NameTrie,
}

impl Index {
    pub fn new() -> Self {
        Index { tree: PathTree::new(), trie: NameTrie::new() }
    }

    /// Adds `path` (and any missing prefix directories, tree-only for now)
    /// and inserts a trie entry for it keyed by its basename. Applies
    /// equally to files and directories; spec §3 requires a FileEntry for
    /// every non-root PathNode, not just leaves. Idempotent: a prefix
    /// directory created implicitly here gets its own trie entry once the
    /// walker visits it directly and calls this again for its own path.
    pub fn add_entry(&mut self, path: &Path) -> Result<NodeId, IndexError> {
        let node = self.tree.add(path)?;
        let basename = self.tree.basename_of(node).unwrap_or_default().as_bytes().to_vec();
        self.trie.insert(&basename, FileEntry(node));
        Ok(node)
    }

    /// Removes `path` and its entire subtree: every node's trie entry is
    /// removed first (post-order, leaves before the node itself), then the
    /// tree structure is unlinked in one call. No-op if `path` is absent.
    pub fn delete_subtree(&mut self, path: &Path) -> Result<(), IndexError> {
        let Some(node) = self.tree.lookup(path) else {
            return Ok(());
        };
        for descendant in self.tree.subtree_postorder(node) {
            if let Some(basename) = self.tree.basename_of(descendant) {
                let key = basename.as_bytes().to_vec();
                self.trie.remove(&key, FileEntry(descendant));
            }
        }
        self.tree.delete_node(node);
        Ok(())
    }

    pub fn path_of(&self, node: NodeId) -> Option<PathBuf> {
        self.tree.path_of(node)
    }

    pub fn lookup(&self, path: &Path) -> Option<NodeId> {
        self.tree.lookup(path)
    }

    pub fn children_of(&self, path: &Path) -> Result<Vec<String>, IndexError> {
        self.tree.children_of(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_entry_then_trie_lookup() {
        let mut idx = Index::new();
        idx.add_entry(Path::new("/a/foo.txt")).unwrap();

        let mut hits = Vec::new();
        idx.trie.visit_subtree(b"foo.txt", |k, v| hits.push((k.to_vec(), v.len())));
        assert_eq!(hits, vec![(b"foo.txt".to_vec(), 1)]);
    }

    #[test]
    fn delete_subtree_clears_trie_and_tree() {
        let mut idx = Index::new();
        idx.add_entry(Path::new("/a/x")).unwrap();
        idx.add_entry(Path::new("/a/y")).unwrap();

        idx.delete_subtree(Path::new("/a")).unwrap();

        assert!(idx.lookup(Path::new("/a")).is_none());
        let mut saw = false;
        idx.trie.visit_subtree(b"x", |_, _| saw = true);
        assert!(!saw);
    }

    #[test]
    fn duplicate_basename_survives_single_delete() {
        let mut idx = Index::new();
        idx.add_entry(Path::new("/a/README")).unwrap();
        idx.add_entry(Path::new("/b/README")).unwrap();

        idx.delete_subtree(Path::new("/a")).unwrap();

        let mut remaining = 0;
        idx.trie.visit_subtree(b"README", |_, v| remaining = v.len());
        assert_eq!(remaining, 1);
    }
}
