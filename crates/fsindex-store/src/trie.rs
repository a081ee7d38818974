use std::collections::HashMap;

use crate::tree::NodeId;

/// A trie-side record pointing (weakly, via handle) at a [`crate::tree::PathTree`]
/// node. Equality is defined by identity of the referenced node (spec §3);
/// the tree is the sole owner, so the same `NodeId` is reused for the
/// lifetime of that node and is cheaper to compare than reconstructing and
/// comparing full paths.
#[derive(Clone, Copy, Debug)]
pub struct FileEntry(pub NodeId);

impl PartialEq for FileEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for FileEntry {}

struct TrieNode {
    /// Edge label leading to this node from its parent.
    label: Vec<u8>,
    /// Children keyed by the first byte of their label, for O(1) dispatch.
    children: HashMap<u8, usize>,
    /// Non-empty exactly when this node's accumulated key is a stored
    /// basename. An entries-empty node is purely structural.
    entries: Vec<FileEntry>,
}

/// Radix (patricia) trie keyed by basename bytes. Values are a multiset,
/// since multiple files can share a basename (many `README`s).
///
/// The implementation is a slab of nodes, compressing chains of single-child
/// edges into one labeled edge per node, the same shape as a classic
/// prefix-compressed patricia tree.
pub struct NameTrie {
    nodes: Vec<TrieNode>,
}

impl Default for NameTrie {
    fn default() -> Self {
        Self::new()
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    let n = a.len().min(b.len());
    let mut i = 0;
    while i < n && a[i] == b[i] {
        i += 1;
    }
    i
}

impl NameTrie {
    pub fn new() -> Self {
        NameTrie {
            nodes: vec![TrieNode {
                label: Vec::new(),
                children: HashMap::new(),
                entries: Vec::new(),
            }],
        }
    }

    fn alloc(&mut self, label: Vec<u8>) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(TrieNode {
            label,
            children: HashMap::new(),
            entries: Vec::new(),
        });
        idx
    }

    /// If `k` is absent, creates an entry with value list `[v]`; otherwise
    /// appends `v` to the existing list.
    pub fn insert(&mut self, key: &[u8], value: FileEntry) {
        let mut node_idx = 0usize;
        let mut remaining = key;

        loop {
            if remaining.is_empty() {
                self.nodes[node_idx].entries.push(value);
                return;
            }

            let first_byte = remaining[0];
            let child_idx = self.nodes[node_idx].children.get(&first_byte).copied();

            match child_idx {
                None => {
                    let new_idx = self.alloc(remaining.to_vec());
                    self.nodes[new_idx].entries.push(value);
                    self.nodes[node_idx].children.insert(first_byte, new_idx);
                    return;
                }
                Some(child) => {
                    let label_len = self.nodes[child].label.len();
                    let prefix_len = common_prefix_len(&self.nodes[child].label, remaining);

                    if prefix_len == label_len {
                        remaining = &remaining[prefix_len..];
                        node_idx = child;
                        continue;
                    }

                    let shared = self.nodes[child].label[..prefix_len].to_vec();
                    let child_suffix = self.nodes[child].label[prefix_len..].to_vec();
                    let remaining_suffix = &remaining[prefix_len..];

                    let mid_idx = self.alloc(shared);
                    let child_suffix_first = child_suffix[0];
                    self.nodes[child].label = child_suffix;
                    self.nodes[mid_idx].children.insert(child_suffix_first, child);
                    self.nodes[node_idx].children.insert(first_byte, mid_idx);

                    if remaining_suffix.is_empty() {
                        self.nodes[mid_idx].entries.push(value);
                        return;
                    }

                    let leaf_idx = self.alloc(remaining_suffix.to_vec());
                    self.nodes[leaf_idx].entries.push(value);
                    self.nodes[mid_idx].children.insert(remaining_suffix[0], leaf_idx);
                    return;
                }
            }
        }
    }

    /// Removes the entry under `k` matching `v`'s identity; if the list
    /// becomes empty, the key is removed (pruned from its parent). No-op if
    /// `k` is absent or `v` is not in its list.
    pub fn remove(&mut self, key: &[u8], value: FileEntry) {
        let mut path: Vec<(usize, u8)> = Vec::new();
        let mut node_idx = 0usize;
        let mut remaining = key;

        loop {
            if remaining.is_empty() {
                break;
            }
            let first_byte = remaining[0];
            let child_idx = match self.nodes[node_idx].children.get(&first_byte) {
                Some(&c) => c,
                None => return,
            };
            let label_len = self.nodes[child_idx].label.len();
            let prefix_len = common_prefix_len(&self.nodes[child_idx].label, remaining);
            if prefix_len != label_len {
                return;
            }
            path.push((node_idx, first_byte));
            remaining = &remaining[prefix_len..];
            node_idx = child_idx;
        }

        let entries = &mut self.nodes[node_idx].entries;
        match entries.iter().position(|e| *e == value) {
            Some(pos) => {
                entries.remove(pos);
            }
            None => return,
        }

        let mut current = node_idx;
        while let Some((parent_idx, edge_byte)) = path.pop() {
            let childless = self.nodes[current].children.is_empty();
            let no_entries = self.nodes[current].entries.is_empty();
            if childless && no_entries {
                self.nodes[parent_idx].children.remove(&edge_byte);
                current = parent_idx;
            } else {
                break;
            }
        }
    }

    fn dfs_emit(&self, node_idx: usize, buffer: &mut Vec<u8>, cb: &mut dyn FnMut(&[u8], &[FileEntry])) {
        if !self.nodes[node_idx].entries.is_empty() {
            cb(buffer, &self.nodes[node_idx].entries);
        }
        let mut byte_keys: Vec<u8> = self.nodes[node_idx].children.keys().copied().collect();
        byte_keys.sort_unstable();
        for b in byte_keys {
            let child = self.nodes[node_idx].children[&b];
            let label_len = self.nodes[child].label.len();
            buffer.extend_from_slice(&self.nodes[child].label);
            self.dfs_emit(child, buffer, cb);
            buffer.truncate(buffer.len() - label_len);
        }
    }

    /// Invokes `cb(key, value_list)` for every stored key with `prefix` as a
    /// prefix, in deterministic left-to-right trie order.
    pub fn visit_subtree(&self, prefix: &[u8], mut cb: impl FnMut(&[u8], &[FileEntry])) {
        let mut node_idx = 0usize;
        let mut remaining = prefix;
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            if remaining.is_empty() {
                break;
            }
            let first_byte = remaining[0];
            let child_idx = match self.nodes[node_idx].children.get(&first_byte) {
                Some(&c) => c,
                None => return,
            };
            let label = &self.nodes[child_idx].label;
            let common = common_prefix_len(label, remaining);

            if common < label.len() && common < remaining.len() {
                return;
            }

            if common == remaining.len() {
                buffer.extend_from_slice(label);
                node_idx = child_idx;
                break;
            }

            buffer.extend_from_slice(label);
            remaining = &remaining[common..];
            node_idx = child_idx;
        }

        let mut cb_ref: &mut dyn FnMut(&[u8], &[FileEntry]) = &mut cb;
        self.dfs_emit(node_idx, &mut buffer, &mut cb_ref);
    }

    /// Invokes `cb` for every stored key that contains `infix` as a
    /// contiguous substring. Walks the trie maintaining a KMP automaton
    /// state over `infix`; once a node's accumulated key fully matches, the
    /// entire subtree below it qualifies without further matching (Design
    /// Notes §9).
    pub fn visit_substring(&self, infix: &[u8], mut cb: impl FnMut(&[u8], &[FileEntry])) {
        let mut cb_ref: &mut dyn FnMut(&[u8], &[FileEntry]) = &mut cb;

        if infix.is_empty() {
            let mut buffer = Vec::new();
            self.dfs_emit(0, &mut buffer, &mut cb_ref);
            return;
        }

        let lps = compute_lps(infix);
        let mut buffer = Vec::new();
        self.substring_walk(0, &mut buffer, 0, infix, &lps, &mut cb_ref);
    }

    fn substring_walk(
        &self,
        node_idx: usize,
        buffer: &mut Vec<u8>,
        state: usize,
        pattern: &[u8],
        lps: &[usize],
        cb: &mut dyn FnMut(&[u8], &[FileEntry]),
    ) {
        if state >= pattern.len() {
            self.dfs_emit(node_idx, buffer, cb);
            return;
        }

        // This node is reached only when neither an ancestor nor its own
        // label completed the match, so its accumulated key does not
        // contain `pattern`. Its entries (if any) must not be emitted here;
        // a true match is already covered by the `state >= pattern.len()`
        // branch above and by the `matched_within` dfs_emit call below.
        let mut byte_keys: Vec<u8> = self.nodes[node_idx].children.keys().copied().collect();
        byte_keys.sort_unstable();

        for b in byte_keys {
            let child = self.nodes[node_idx].children[&b];
            let label = self.nodes[child].label.clone();

            let mut child_state = state;
            let mut matched_within = false;
            for &byte in &label {
                child_state = kmp_step(child_state, byte, pattern, lps);
                if child_state == pattern.len() {
                    matched_within = true;
                    break;
                }
            }

            buffer.extend_from_slice(&label);
            if matched_within {
                self.dfs_emit(child, buffer, cb);
            } else {
                self.substring_walk(child, buffer, child_state, pattern, lps, cb);
            }
            buffer.truncate(buffer.len() - label.len());
        }
    }

    /// Invokes `cb(key, value_list, skipped)` for every stored key that
    /// contains `pattern` as a subsequence, `skipped` being the minimal
    /// count of non-matching characters between the first and last matched
    /// position over all valid alignments.
    pub fn visit_fuzzy(&self, pattern: &[u8], mut cb: impl FnMut(&[u8], &[FileEntry], usize)) {
        let mut buffer = Vec::new();
        let mut cb_ref: &mut dyn FnMut(&[u8], &[FileEntry], usize) = &mut cb;
        self.fuzzy_walk(0, &mut buffer, pattern, &mut cb_ref);
    }

    fn fuzzy_walk(
        &self,
        node_idx: usize,
        buffer: &mut Vec<u8>,
        pattern: &[u8],
        cb: &mut dyn FnMut(&[u8], &[FileEntry], usize),
    ) {
        if !self.nodes[node_idx].entries.is_empty() {
            if let Some(skipped) = fuzzy_skip(buffer, pattern) {
                cb(buffer, &self.nodes[node_idx].entries, skipped);
            }
        }

        let mut byte_keys: Vec<u8> = self.nodes[node_idx].children.keys().copied().collect();
        byte_keys.sort_unstable();

        for b in byte_keys {
            let child = self.nodes[node_idx].children[&b];
            let label_len = self.nodes[child].label.len();
            buffer.extend_from_slice(&self.nodes[child].label);
            self.fuzzy_walk(child, buffer, pattern, cb);
            buffer.truncate(buffer.len() - label_len);
        }
    }
}

fn compute_lps(pattern: &[u8]) -> Vec<usize> {
    let mut lps = vec![0usize; pattern.len()];
    let mut len = 0;
    let mut i = 1;
    while i < pattern.len() {
        if pattern[i] == pattern[len] {
            len += 1;
            lps[i] = len;
            i += 1;
        } else if len != 0 {
            len = lps[len - 1];
        } else {
            lps[i] = 0;
            i += 1;
        }
    }
    lps
}

fn kmp_step(mut state: usize, byte: u8, pattern: &[u8], lps: &[usize]) -> usize {
    loop {
        if byte == pattern[state] {
            return state + 1;
        }
        if state == 0 {
            return 0;
        }
        state = lps[state - 1];
    }
}

/// Minimal count of non-matching characters strictly between the first and
/// last matched position, over all ways `pattern` can be read as a
/// subsequence of `key`. `None` if `pattern` is not a subsequence of `key`.
/// Uses the classic minimum-window-subsequence scan (each outer iteration
/// jumps `i` past the previous window's start, making the scan linear in
/// practice for the short basenames this is applied to).
fn fuzzy_skip(key: &[u8], pattern: &[u8]) -> Option<usize> {
    if pattern.is_empty() {
        return Some(0);
    }
    let n = key.len();
    let m = pattern.len();
    let mut i = 0usize;
    let mut best: Option<(usize, usize)> = None;

    while i < n {
        let mut j = 0usize;
        let mut k = i;
        while k < n {
            if key[k] == pattern[j] {
                j += 1;
                if j == m {
                    break;
                }
            }
            k += 1;
        }
        if j < m {
            break;
        }
        let end = k;

        let mut start = end;
        let mut j2 = m - 1;
        loop {
            if key[start] == pattern[j2] {
                if j2 == 0 {
                    break;
                }
                j2 -= 1;
            }
            if start == 0 {
                break;
            }
            start -= 1;
        }

        let window_len = end - start + 1;
        if best.map_or(true, |(bs, be)| window_len < (be - bs + 1)) {
            best = Some((start, end));
        }
        i = start + 1;
    }

    best.map(|(s, e)| (e - s + 1) - m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries_to_ids(list: &[FileEntry]) -> Vec<NodeId> {
        list.iter().map(|e| e.0).collect()
    }

    #[test]
    fn insert_then_prefix_visit() {
        let mut trie = NameTrie::new();
        trie.insert(b"foo.txt", FileEntry(1));
        trie.insert(b"bar.txt", FileEntry(2));

        let mut hits: Vec<Vec<u8>> = Vec::new();
        trie.visit_subtree(b"foo", |k, _| hits.push(k.to_vec()));
        assert_eq!(hits, vec![b"foo.txt".to_vec()]);
    }

    #[test]
    fn prefix_visit_empty_prefix_yields_all_in_order() {
        let mut trie = NameTrie::new();
        trie.insert(b"foo.txt", FileEntry(1));
        trie.insert(b"bar.txt", FileEntry(2));

        let mut hits: Vec<Vec<u8>> = Vec::new();
        trie.visit_subtree(b"", |k, _| hits.push(k.to_vec()));
        assert_eq!(hits, vec![b"bar.txt".to_vec(), b"foo.txt".to_vec()]);
    }

    #[test]
    fn duplicate_basename_multiset() {
        let mut trie = NameTrie::new();
        trie.insert(b"README", FileEntry(1));
        trie.insert(b"README", FileEntry(2));

        let mut count = 0;
        trie.visit_subtree(b"README", |_, v| count = v.len());
        assert_eq!(count, 2);

        trie.remove(b"README", FileEntry(1));
        let mut remaining = Vec::new();
        trie.visit_subtree(b"README", |_, v| remaining = entries_to_ids(v));
        assert_eq!(remaining, vec![2]);

        trie.remove(b"README", FileEntry(2));
        let mut saw_key = false;
        trie.visit_subtree(b"README", |_, _| saw_key = true);
        assert!(!saw_key);
    }

    #[test]
    fn substring_match() {
        let mut trie = NameTrie::new();
        trie.insert(b"report.txt", FileEntry(1));
        trie.insert(b"export.csv", FileEntry(2));
        trie.insert(b"note.md", FileEntry(3));

        let mut hits: Vec<Vec<u8>> = Vec::new();
        trie.visit_substring(b"port", |k, _| hits.push(k.to_vec()));
        hits.sort();
        assert_eq!(hits, vec![b"export.csv".to_vec(), b"report.txt".to_vec()]);
    }

    #[test]
    fn substring_excludes_entry_bearing_prefix_of_a_sibling() {
        // "ab" is itself an entry-bearing internal node on the path to "abc".
        // A non-matching infix must not surface it just because the walk
        // passes through it on the way to a deeper child.
        let mut trie = NameTrie::new();
        trie.insert(b"ab", FileEntry(1));
        trie.insert(b"abc", FileEntry(2));

        let mut hits: Vec<Vec<u8>> = Vec::new();
        trie.visit_substring(b"xy", |k, _| hits.push(k.to_vec()));
        assert!(hits.is_empty());
    }

    #[test]
    fn fuzzy_ranking_by_skip() {
        let mut trie = NameTrie::new();
        trie.insert(b"abc", FileEntry(1));
        trie.insert(b"axbxc", FileEntry(2));
        trie.insert(b"aXXXXbXXXXc", FileEntry(3));

        let mut hits: Vec<(Vec<u8>, usize)> = Vec::new();
        trie.visit_fuzzy(b"abc", |k, _, skipped| hits.push((k.to_vec(), skipped)));
        hits.sort_by_key(|(_, s)| *s);

        assert_eq!(hits[0].0, b"abc".to_vec());
        assert_eq!(hits[0].1, 0);
        assert_eq!(hits[1].0, b"axbxc".to_vec());
        assert_eq!(hits[1].1, 2);
        assert_eq!(hits[2].0, b"aXXXXbXXXXc".to_vec());
        assert_eq!(hits[2].1, 8);
    }

    #[test]
    fn fuzzy_non_subsequence_is_excluded() {
        let mut trie = NameTrie::new();
        trie.insert(b"xyz", FileEntry(1));

        let mut count = 0;
        trie.visit_fuzzy(b"abc", |_, _, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut trie = NameTrie::new();
        trie.insert(b"foo", FileEntry(1));
        trie.remove(b"bar", FileEntry(1));
        trie.remove(b"foo", FileEntry(99));

        let mut count = 0;
        trie.visit_subtree(b"foo", |_, v| count = v.len());
        assert_eq!(count, 1);
    }
}
