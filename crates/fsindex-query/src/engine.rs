use rayon::slice::ParallelSliceMut;

use fsindex_store::Index;

use crate::request::{Action, Request, Settings};

/// Above this many results, sort in parallel, the same threshold the
/// teacher's tree printer uses for switching to `rayon::slice::ParallelSliceMut`
/// (SPEC_FULL §4.4). Below it, a plain sort avoids thread-pool overhead.
const PARALLEL_SORT_THRESHOLD: usize = 500;

/// Runs one request to completion: dispatches to the trie visitor matching
/// `action`, orders the results per spec §4.4, and streams them to
/// `response_sink`. The sink is always closed exactly once, by `Sender`
/// drop, on every return path, including an empty result set.
pub fn execute(index: &Index, request: Request) {
    let Request { query, settings, response_sink } = request;

    if settings.no_sort {
        stream_unsorted(index, &query, &settings, &response_sink);
        return;
    }

    match settings.action {
        Action::Prefix | Action::Substring => {
            let mut paths = collect_paths(index, &query, settings.action);
            sort_by_length(&mut paths, settings.reverse_sort);
            for path in paths {
                let _ = response_sink.send(path);
            }
        }
        Action::Fuzzy => {
            let mut hits = collect_fuzzy(index, &query);
            sort_fuzzy(&mut hits, settings.reverse_sort);
            for (path, _skipped) in hits {
                let _ = response_sink.send(path);
            }
        }
    }
}

fn stream_unsorted(
    index: &Index,
    query: &[u8],
    settings: &Settings,
    sink: &crossbeam_channel::Sender<String>,
) {
    match settings.action {
        Action::Prefix => index.trie.visit_subtree(query, |_key, entries| {
            for entry in entries {
                if let Some(path) = index.path_of(entry.0) {
                    let _ = sink.send(path.to_string_lossy().into_owned());
                }
            }
        }),
        Action::Substring => index.trie.visit_substring(query, |_key, entries| {
            for entry in entries {
                if let Some(path) = index.path_of(entry.0) {
                    let _ = sink.send(path.to_string_lossy().into_owned());
                }
            }
        }),
        Action::Fuzzy => index.trie.visit_fuzzy(query, |_key, entries, _skipped| {
            for entry in entries {
                if let Some(path) = index.path_of(entry.0) {
                    let _ = sink.send(path.to_string_lossy().into_owned());
                }
            }
        }),
    }
}

fn collect_paths(index: &Index, query: &[u8], action: Action) -> Vec<String> {
    let mut out = Vec::new();
    let visit = |_key: &[u8], entries: &[fsindex_store::FileEntry]| {
        for entry in entries {
            if let Some(path) = index.path_of(entry.0) {
                out.push(path.to_string_lossy().into_owned());
            }
        }
    };
    match action {
        Action::Prefix => index.trie.visit_subtree(query, visit),
        Action::Substring => index.trie.visit_substring(query, visit),
        Action::Fuzzy => unreachable!("fuzzy uses collect_fuzzy"),
    }
    out
}

fn collect_fuzzy(index: &Index, query: &[u8]) -> Vec<(String, usize)> {
    let mut out = Vec::new();
    index.trie.visit_fuzzy(query, |_key, entries, skipped| {
        for entry in entries {
            if let Some(path) = index.path_of(entry.0) {
                out.push((path.to_string_lossy().into_owned(), skipped));
            }
        }
    });
    out
}

/// PREFIX/SUBSTRING sort key is path length; default order is worst-first
/// (longest first, so the best, shortest, result is emitted last, next to
/// an interactive prompt's cursor). `reverse_sort` flips to best-first.
fn sort_by_length(paths: &mut [String], reverse_sort: bool) {
    let cmp = move |a: &String, b: &String| {
        let ord = a.len().cmp(&b.len());
        if reverse_sort {
            ord
        } else {
            ord.reverse()
        }
    };
    if paths.len() > PARALLEL_SORT_THRESHOLD {
        paths.par_sort_by(cmp);
    } else {
        paths.sort_by(cmp);
    }
}

/// FUZZY sort key is `(skipped, path_length)` lexicographically; same
/// worst-first default, `reverse_sort` flip.
fn sort_fuzzy(hits: &mut [(String, usize)], reverse_sort: bool) {
    let cmp = move |a: &(String, usize), b: &(String, usize)| {
        let ord = (a.1, a.0.len()).cmp(&(b.1, b.0.len()));
        if reverse_sort {
            ord
        } else {
            ord.reverse()
        }
    };
    if hits.len() > PARALLEL_SORT_THRESHOLD {
        hits.par_sort_by(cmp);
    } else {
        hits.sort_by(cmp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use fsindex_store::Index;
    use std::path::Path;

    fn build_index() -> Index {
        let mut index = Index::new();
        index.add_entry(Path::new("/a/foo.txt")).unwrap();
        index.add_entry(Path::new("/a/bar.txt")).unwrap();
        index
    }

    #[test]
    fn prefix_query_emits_matching_path() {
        let index = build_index();
        let (tx, rx) = unbounded();
        execute(
            &index,
            Request {
                query: b"foo".to_vec(),
                settings: Settings { action: Action::Prefix, no_sort: false, reverse_sort: false },
                response_sink: tx,
            },
        );
        let results: Vec<String> = rx.iter().collect();
        assert_eq!(results, vec!["/a/foo.txt".to_string()]);
    }

    #[test]
    fn empty_prefix_default_order_is_length_descending() {
        let index = build_index();
        let (tx, rx) = unbounded();
        execute(
            &index,
            Request {
                query: b"".to_vec(),
                settings: Settings { action: Action::Prefix, no_sort: false, reverse_sort: false },
                response_sink: tx,
            },
        );
        let results: Vec<String> = rx.iter().collect();
        assert_eq!(results, vec!["/a/foo.txt".to_string(), "/a/bar.txt".to_string()]);
    }

    #[test]
    fn reverse_sort_flips_prefix_order() {
        let index = build_index();
        let (tx, rx) = unbounded();
        execute(
            &index,
            Request {
                query: b"".to_vec(),
                settings: Settings { action: Action::Prefix, no_sort: false, reverse_sort: true },
                response_sink: tx,
            },
        );
        let results: Vec<String> = rx.iter().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].len() <= results[1].len());
    }

    #[test]
    fn empty_result_set_closes_sink() {
        let index = build_index();
        let (tx, rx) = unbounded();
        execute(
            &index,
            Request {
                query: b"nonexistent".to_vec(),
                settings: Settings { action: Action::Prefix, no_sort: false, reverse_sort: false },
                response_sink: tx,
            },
        );
        assert!(rx.iter().collect::<Vec<_>>().is_empty());
        assert!(rx.recv().is_err());
    }

    #[test]
    fn fuzzy_default_best_result_emitted_last() {
        let mut index = Index::new();
        index.add_entry(Path::new("/x/abc")).unwrap();
        index.add_entry(Path::new("/x/axbxc")).unwrap();
        index.add_entry(Path::new("/x/aXXXXbXXXXc")).unwrap();

        let (tx, rx) = unbounded();
        execute(
            &index,
            Request {
                query: b"abc".to_vec(),
                settings: Settings { action: Action::Fuzzy, no_sort: false, reverse_sort: false },
                response_sink: tx,
            },
        );
        let results: Vec<String> = rx.iter().collect();
        assert_eq!(results.last().unwrap(), "/x/abc");
    }

    #[test]
    fn fuzzy_reverse_sort_best_result_first() {
        let mut index = Index::new();
        index.add_entry(Path::new("/x/abc")).unwrap();
        index.add_entry(Path::new("/x/axbxc")).unwrap();
        index.add_entry(Path::new("/x/aXXXXbXXXXc")).unwrap();

        let (tx, rx) = unbounded();
        execute(
            &index,
            Request {
                query: b"abc".to_vec(),
                settings: Settings { action: Action::Fuzzy, no_sort: false, reverse_sort: true },
                response_sink: tx,
            },
        );
        let results: Vec<String> = rx.iter().collect();
        assert_eq!(results.first().unwrap(), "/x/abc");
    }

    #[test]
    fn substring_query_excludes_non_matching() {
        let mut index = Index::new();
        index.add_entry(Path::new("/p/report.txt")).unwrap();
        index.add_entry(Path::new("/p/export.csv")).unwrap();
        index.add_entry(Path::new("/p/note.md")).unwrap();

        let (tx, rx) = unbounded();
        execute(
            &index,
            Request {
                query: b"port".to_vec(),
                settings: Settings { action: Action::Substring, no_sort: false, reverse_sort: false },
                response_sink: tx,
            },
        );
        let mut results: Vec<String> = rx.iter().collect();
        results.sort();
        assert_eq!(results, vec!["/p/export.csv".to_string(), "/p/report.txt".to_string()]);
    }

    #[test]
    fn no_sort_streams_in_visit_order() {
        let index = build_index();
        let (tx, rx) = unbounded();
        execute(
            &index,
            Request {
                query: b"".to_vec(),
                settings: Settings { action: Action::Prefix, no_sort: true, reverse_sort: false },
                response_sink: tx,
            },
        );
        let results: Vec<String> = rx.iter().collect();
        // Trie traversal order is lexicographic over edges: "bar.txt" sorts
        // before "foo.txt".
        assert_eq!(results, vec!["/a/bar.txt".to_string(), "/a/foo.txt".to_string()]);
    }
}
