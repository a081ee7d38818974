use std::io::{self, BufRead};
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, unbounded};
use notify::{EventKind, RecursiveMode, Watcher};

use fsindex_core::{ColorMode, FilterConfig};
use fsindex_eventloop::{ChangeEvent, ChangeKind, Message};
use fsindex_query::{Action, Request, Settings};
use fsindex_store::Index;

fn main() -> Result<()> {
    fsindex_core::init_logging();
    let args = fsindex_core::parse_args();

    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("failed to resolve root {}", args.root.display()))?;

    let filter = FilterConfig::new(&args.include, &args.exclude).context("invalid filter glob")?;

    let use_colors = match args.color {
        ColorMode::Auto => atty::is(atty::Stream::Stdout),
        ColorMode::Always => true,
        ColorMode::Never => false,
    };

    log::info!("indexing {}", root.display());
    let mut index = Index::new();
    fsindex_refresh::initial_index(&mut index, &root, &filter, args.threads);
    log::info!("initial index: {} nodes", index.tree.node_count());

    let (message_tx, message_rx) = bounded::<Message>(args.queue_capacity);

    let watcher = spawn_watcher(&root, message_tx.clone())?;
    spawn_stdin_reader(message_tx, use_colors);

    ctrlc::set_handler(|| {
        log::info!("interrupted, exiting");
        std::process::exit(0);
    })
    .context("failed to install Ctrl-C handler")?;

    fsindex_eventloop::run(index, filter, message_rx);

    // Keeps the watcher alive for the event loop's lifetime; dropping it
    // earlier would stop delivery of filesystem events.
    drop(watcher);
    Ok(())
}

/// Wires a `notify` recommended watcher to the Event Loop's change channel,
/// translating raw filesystem events into spec §6's `{directory_path,
/// change_kind}` shape. `change_kind` only ever informs logging; the
/// Refresh Engine re-reads and reconciles regardless (spec §1).
fn spawn_watcher(
    root: &std::path::Path,
    message_tx: crossbeam_channel::Sender<Message>,
) -> Result<notify::RecommendedWatcher> {
    let root_fallback = root.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            let change_kind = match event.kind {
                EventKind::Create(_) => ChangeKind::Create,
                EventKind::Remove(_) => ChangeKind::Delete,
                EventKind::Modify(_) => ChangeKind::Create,
                _ => return,
            };
            for path in event.paths {
                let directory_path = path.parent().unwrap_or(&root_fallback).to_path_buf();
                if message_tx.send(Message::Change(ChangeEvent { directory_path, change_kind })).is_err() {
                    return;
                }
            }
        }
        Err(err) => log::warn!("watch error: {}", err),
    })
    .context("failed to create filesystem watcher")?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;

    Ok(watcher)
}

/// Reads `ACTION query [--no-sort] [--reverse]` lines from stdin, one
/// request per line, each handed a fresh unbounded channel as its
/// `response_sink` (spec §6). Results are printed as they arrive; the
/// sink's closure (by `Sender` drop inside the Query Engine) is what ends
/// the `for` loop below. When `use_colors` is set, the query text is
/// highlighted inside each printed path. PREFIX/SUBSTRING queries are a
/// literal substring of the match so this is exact; FUZZY matches are a
/// subsequence, so highlighting is skipped for that action.
fn spawn_stdin_reader(message_tx: crossbeam_channel::Sender<Message>, use_colors: bool) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((request, rx)) = parse_request_line(line) else {
                eprintln!("unrecognized request: {}", line);
                continue;
            };

            let action = request.settings.action;
            let query = String::from_utf8_lossy(&request.query).into_owned();
            if message_tx.send(Message::Query(request)).is_err() {
                break;
            }
            for result in rx.iter() {
                println!("{}", highlight(&result, &query, action, use_colors));
            }
        }
    });
}

/// Wraps the first occurrence of `query` in `path` with an ANSI bold-yellow
/// escape. No-op when colors are disabled, the query is empty, or the
/// action is FUZZY (a subsequence match has no single contiguous span to
/// highlight).
fn highlight(path: &str, query: &str, action: Action, use_colors: bool) -> String {
    if !use_colors || query.is_empty() || action == Action::Fuzzy {
        return path.to_string();
    }
    match path.rfind(query) {
        Some(pos) => format!("{}\x1b[1;33m{}\x1b[0m{}", &path[..pos], &path[pos..pos + query.len()], &path[pos + query.len()..]),
        None => path.to_string(),
    }
}

fn parse_request_line(line: &str) -> Option<(Request, crossbeam_channel::Receiver<String>)> {
    let mut tokens = line.split_whitespace();
    let action = match tokens.next()?.to_ascii_uppercase().as_str() {
        "PREFIX" => Action::Prefix,
        "SUBSTRING" => Action::Substring,
        "FUZZY" => Action::Fuzzy,
        _ => return None,
    };

    let mut query_parts: Vec<&str> = Vec::new();
    let mut no_sort = false;
    let mut reverse_sort = false;
    for token in tokens {
        match token {
            "--no-sort" => no_sort = true,
            "--reverse" => reverse_sort = true,
            other => query_parts.push(other),
        }
    }

    let (tx, rx) = unbounded();
    let request = Request {
        query: query_parts.join(" ").into_bytes(),
        settings: Settings { action, no_sort, reverse_sort },
        response_sink: tx,
    };
    Some((request, rx))
}
