use std::collections::HashSet;
use std::fs;
use std::path::Path;

use fsindex_core::{FilterConfig, IndexError};
use fsindex_store::Index;

use crate::populate::{commit_entries, walk_subtree};

/// Reconciles the indexed contents of `dir` with its current on-disk
/// contents (spec §4.3). `change_kind` from the originating event is never
/// consulted; reconciliation is authoritative regardless of what the
/// change source claimed (spec §1, Design Notes §9c).
///
/// Algorithm, verbatim from spec §4.3:
/// 1. Enumerate `dir`'s direct on-disk entries, discard filtered ones → `NEW`.
/// 2. Read indexed children via `children_of(dir)` → `OLD` (empty if `dir`
///    itself is unindexed, which handles a newly created directory reported
///    by its parent's refresh).
/// 3. `created = NEW \ OLD`, `deleted = OLD \ NEW`.
/// 4. For each `created` name: recursively add (directory) or add a leaf
///    (file); files filtered after creation are silently skipped by the
///    same filter check used for `NEW`.
/// 5. For each `deleted` name: recursively remove the subtree.
/// 6. Enumeration failure (e.g. permissions) is treated as `NEW = {}`,
///    which removes the stale subtree, the desired behavior when a
///    directory has vanished.
///
/// Created entries are always processed before deleted ones; a refresh for
/// `dir` only ever touches PathNodes at `dir` and below.
pub fn refresh(index: &mut Index, dir: &Path, filter: &FilterConfig) {
    let new: HashSet<String> = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let path = dir.join(&name);
                if filter.is_filtered(&path) {
                    None
                } else {
                    Some(name)
                }
            })
            .collect(),
        Err(source) => {
            let err = IndexError::IoError { path: dir.to_path_buf(), source };
            log::warn!("refresh: {} (treating as empty)", err);
            HashSet::new()
        }
    };

    let old: HashSet<String> = index.children_of(dir).unwrap_or_default().into_iter().collect();

    let created: Vec<&String> = new.difference(&old).collect();
    let deleted: Vec<&String> = old.difference(&new).collect();

    for name in created {
        let child_path = dir.join(name);
        if filter.is_filtered(&child_path) {
            continue;
        }
        let is_dir = fs::metadata(&child_path).map(|m| m.is_dir()).unwrap_or(false);
        if is_dir {
            let entries = walk_subtree(&child_path, filter);
            commit_entries(index, &entries);
        } else if let Err(err) = index.add_entry(&child_path) {
            log::warn!("refresh: failed to add {}: {}", child_path.display(), err);
        }
    }

    for name in deleted {
        let child_path = dir.join(name);
        if let Err(err) = index.delete_subtree(&child_path) {
            log::warn!("refresh: failed to delete {}: {}", child_path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populate::initial_index;
    use std::fs;

    #[test]
    fn create_then_refresh_adds_children() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();

        let mut index = Index::new();
        let filter = FilterConfig::empty();
        initial_index(&mut index, dir.path(), &filter, Some(1));

        fs::write(dir.path().join("a/foo.txt"), b"x").unwrap();
        fs::write(dir.path().join("a/bar.txt"), b"x").unwrap();
        refresh(&mut index, &dir.path().join("a"), &filter);

        let mut hit = false;
        index.trie.visit_subtree(b"foo.txt", |_, _| hit = true);
        assert!(hit);
    }

    #[test]
    fn refresh_idempotent_with_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.txt"), b"x").unwrap();

        let mut index = Index::new();
        let filter = FilterConfig::empty();
        initial_index(&mut index, dir.path(), &filter, Some(1));

        refresh(&mut index, dir.path(), &filter);
        let count_after_first = index.tree.node_count();
        refresh(&mut index, dir.path(), &filter);
        assert_eq!(index.tree.node_count(), count_after_first);
    }

    #[test]
    fn delete_vanished_directory_on_refresh() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/x"), b"x").unwrap();
        fs::write(dir.path().join("a/y"), b"x").unwrap();

        let mut index = Index::new();
        let filter = FilterConfig::empty();
        initial_index(&mut index, dir.path(), &filter, Some(1));

        fs::remove_dir_all(dir.path().join("a")).unwrap();
        refresh(&mut index, dir.path(), &filter);

        let mut saw_x = false;
        index.trie.visit_subtree(b"x", |_, _| saw_x = true);
        assert!(!saw_x);
        assert!(index.lookup(&dir.path().join("a")).is_none());
    }

    #[test]
    fn new_directory_reported_by_parent_refresh() {
        let dir = tempfile::tempdir().unwrap();

        let mut index = Index::new();
        let filter = FilterConfig::empty();
        initial_index(&mut index, dir.path(), &filter, Some(1));

        fs::create_dir_all(dir.path().join("new_dir")).unwrap();
        fs::write(dir.path().join("new_dir/inner.txt"), b"x").unwrap();

        // The event source reports the containing directory, not the new
        // child directly; children_of(dir) is the "OLD" set used for the
        // newly created directory itself.
        refresh(&mut index, dir.path(), &filter);

        let mut hit = false;
        index.trie.visit_subtree(b"inner.txt", |_, _| hit = true);
        assert!(hit);
    }

    #[test]
    fn refresh_on_unindexed_directory_treats_old_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/fresh.txt"), b"x").unwrap();

        let mut index = Index::new();
        let filter = FilterConfig::empty();
        // Only the root is indexed; "/a" itself was never added.
        index.add_entry(dir.path()).unwrap();

        refresh(&mut index, &dir.path().join("a"), &filter);

        let mut hit = false;
        index.trie.visit_subtree(b"fresh.txt", |_, _| hit = true);
        assert!(hit);
    }

    #[test]
    fn filter_respected_on_refresh() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cache")).unwrap();

        let mut index = Index::new();
        let filter = FilterConfig::new(&[], &["**/cache".to_string(), "**/cache/**".to_string()]).unwrap();
        initial_index(&mut index, dir.path(), &filter, Some(1));

        fs::write(dir.path().join("cache/hot.bin"), b"x").unwrap();
        refresh(&mut index, &dir.path().join("cache"), &filter);

        let mut hit = false;
        index.trie.visit_subtree(b"hot.bin", |_, _| hit = true);
        assert!(!hit);
    }
}
