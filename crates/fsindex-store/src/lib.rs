pub mod index;
pub mod tree;
pub mod trie;

pub use index::Index;
pub use tree::{NodeId, PathTree};
pub use trie::{FileEntry, NameTrie};
