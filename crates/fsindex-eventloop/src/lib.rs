//! Event Loop: the single-threaded multiplexer of spec §4.5. It is the sole
//! mutator and sole reader of the Path Tree and Name Trie (spec §5); change
//! events and query requests arrive over one shared channel and are applied
//! to completion, one at a time, in delivery order.

use std::path::PathBuf;

use crossbeam_channel::Receiver;

use fsindex_core::FilterConfig;
use fsindex_query::Request;
use fsindex_store::Index;

/// Advisory classification from the change source (spec §6). The engine
/// never branches on this; `refresh` always re-reads the directory and
/// reconciles, so a misclassified event is non-fatal (spec §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Delete,
}

/// `{directory_path, change_kind}`, the *containing* directory of the
/// mutated child, per spec §6.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub directory_path: PathBuf,
    pub change_kind: ChangeKind,
}

/// One message arriving at the Event Loop, a change event or a query
/// request. Both producers (the change source, the request source) send
/// onto the same channel so the order messages are applied in is exactly
/// the order they were delivered in, regardless of which producer sent
/// them: two independent channels fed into a `select!` cannot guarantee
/// this, since `select!` picks pseudo-randomly among channels that are
/// simultaneously ready, which can service a later-arriving query ahead of
/// an earlier-arriving change event (spec §5's ordering guarantee).
pub enum Message {
    Change(ChangeEvent),
    Query(Request),
}

/// Runs the multiplexer until the channel disconnects. Each iteration
/// accepts exactly one message and processes it to completion before the
/// next, which is the whole of the concurrency discipline spec §5 relies
/// on: no locks are needed because nothing else ever touches `index`.
///
/// A change event invokes [`fsindex_refresh::refresh`]; a query request
/// invokes [`fsindex_query::execute`]. Within one refresh, created entries
/// are applied before deleted ones (spec §4.3); across requests, a query
/// observes the effect of every change delivered before it and none
/// delivered after, because a single FIFO channel is the only path either
/// kind of message takes to reach this loop.
pub fn run(mut index: Index, filter: FilterConfig, rx: Receiver<Message>) {
    for message in rx {
        match message {
            Message::Change(event) => {
                log::debug!("refresh: {}", event.directory_path.display());
                fsindex_refresh::refresh(&mut index, &event.directory_path, &filter);
            }
            Message::Query(request) => fsindex_query::execute(&index, request),
        }
    }
    log::info!("input channel disconnected, shutting down event loop");
}
