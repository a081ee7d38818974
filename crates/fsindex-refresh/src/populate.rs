use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fsindex_core::FilterConfig;
use fsindex_store::Index;

/// One path discovered by the walker, flagged as a directory or not. This is
/// the shape spec §6 gives the (external) directory walker: `{absolute_path,
/// is_dir}` pairs, depth-first, with filtered subtrees pruned.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Phase one of initial population: a multi-threaded directory enumeration
/// that *only reads* the filesystem, never touching the Path Tree or
/// Name Trie, so the single-mutator discipline of spec §5 holds even though
/// population itself is parallelized. Modeled on the teacher's pool-backed
/// parallel traversal, but fork-joined per directory (`rayon::Scope::spawn`
/// recursing into subdirectories) rather than a shared work queue, which
/// sidesteps a queue-draining termination race for the same pool shape.
/// Directory-level filter hits prune the whole subtree, never visited,
/// never enqueued, matching spec §4.3.
pub fn collect_entries_parallel(root: &Path, filter: &FilterConfig, threads: Option<usize>) -> Vec<WalkEntry> {
    let results: Mutex<Vec<WalkEntry>> = Mutex::new(vec![WalkEntry { path: root.to_path_buf(), is_dir: true }]);

    let num_threads = threads.unwrap_or_else(|| num_cpus::get().max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .expect("failed to build walk thread pool");

    pool.in_place_scope(|scope| {
        walk_dir_task(scope, root.to_path_buf(), filter, &results);
    });

    results.into_inner().unwrap_or_default()
}

fn walk_dir_task<'scope>(
    scope: &rayon::Scope<'scope>,
    dir: PathBuf,
    filter: &'scope FilterConfig,
    results: &'scope Mutex<Vec<WalkEntry>>,
) {
    let Ok(read_dir) = fs::read_dir(&dir) else {
        return;
    };

    let mut local = Vec::new();
    let mut subdirs = Vec::new();
    for entry in read_dir.flatten() {
        let child_path = entry.path();
        if filter.is_filtered(&child_path) {
            continue;
        }
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        local.push(WalkEntry { path: child_path.clone(), is_dir });
        if is_dir {
            subdirs.push(child_path);
        }
    }

    if !local.is_empty() {
        results.lock().unwrap().extend(local);
    }

    for sub in subdirs {
        scope.spawn(move |s| walk_dir_task(s, sub, filter, results));
    }
}

/// Phase two: applies a flat entry list to the shared structures serially,
/// on the thread that owns them. Order is irrelevant: `Index::add_entry`
/// creates any missing ancestor directories on demand, so a child can be
/// committed before its parent without producing a dangling or duplicated
/// node (spec §4.1's `add` is explicitly idempotent over prefixes).
pub fn commit_entries(index: &mut Index, entries: &[WalkEntry]) {
    for entry in entries {
        if let Err(err) = index.add_entry(&entry.path) {
            log::warn!("skipping unindexable path {}: {}", entry.path.display(), err);
        }
    }
}

/// Populates the Path Tree and Name Trie by walking `root`: every
/// non-filtered entry becomes a PathNode plus a trie entry keyed by its
/// basename (spec §4.3). Directory-level filter hits prune the subtree.
pub fn initial_index(index: &mut Index, root: &Path, filter: &FilterConfig, threads: Option<usize>) {
    if filter.is_filtered(root) {
        return;
    }
    let entries = collect_entries_parallel(root, filter, threads);
    commit_entries(index, &entries);
}

/// Recursively lists `root` and its descendants for the Refresh Engine's
/// "created" case (spec §4.3 step 4): a single newly created subtree is
/// usually small, so a serial `walkdir` traversal is used instead of
/// standing up a thread pool per event. Filtered subtrees are pruned via
/// `filter_entry`, so a rejected directory's children are never visited.
pub fn walk_subtree(root: &Path, filter: &FilterConfig) -> Vec<WalkEntry> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !filter.is_filtered(entry.path()))
        .filter_map(|entry| entry.ok())
        .map(|entry| WalkEntry { path: entry.path().to_path_buf(), is_dir: entry.file_type().is_dir() })
        .collect()
}
