//! Observable events
//!
//! Events are explicit and typed; each maps to one upper-case wire name.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Store lifecycle
    StoreOpen,
    StoreClose,
    LogReplayed,
    LogTruncated,
    LogShrunk,

    // Collections
    CollectionInitialized,
    CollectionInitFailed,

    // Documents
    DocumentCreated,
    DocumentUpdated,
    DocumentDeleted,
    DocumentPurged,
    PageListed,

    // Service
    ConfigLoaded,
    ServerListening,
    ServerStopped,
    RequestFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpen => "STORE_OPEN",
            Event::StoreClose => "STORE_CLOSE",
            Event::LogReplayed => "LOG_REPLAYED",
            Event::LogTruncated => "LOG_TRUNCATED",
            Event::LogShrunk => "LOG_SHRUNK",

            Event::CollectionInitialized => "COLLECTION_INITIALIZED",
            Event::CollectionInitFailed => "COLLECTION_INIT_FAILED",

            Event::DocumentCreated => "DOCUMENT_CREATED",
            Event::DocumentUpdated => "DOCUMENT_UPDATED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",
            Event::DocumentPurged => "DOCUMENT_PURGED",
            Event::PageListed => "PAGE_LISTED",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ServerListening => "SERVER_LISTENING",
            Event::ServerStopped => "SERVER_STOPPED",
            Event::RequestFailed => "REQUEST_FAILED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
