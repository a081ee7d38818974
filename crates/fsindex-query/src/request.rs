use crossbeam_channel::Sender;

/// Trie traversal to dispatch a query to (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Prefix,
    Substring,
    Fuzzy,
}

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub action: Action,
    pub no_sort: bool,
    pub reverse_sort: bool,
}

/// A single query request, matching spec §6's `{query, settings,
/// response_sink}` shape. `response_sink` is a one-shot, ordered, finite
/// stream of result strings; the engine owns closing it, which happens
/// implicitly when the `Sender` half is dropped at the end of
/// [`crate::execute`].
pub struct Request {
    pub query: Vec<u8>,
    pub settings: Settings,
    pub response_sink: Sender<String>,
}
