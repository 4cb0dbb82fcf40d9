//! Observability for docstore
//!
//! Structured one-line JSON logs of typed lifecycle events. Logging is
//! read-only: it never changes execution, and write failures are ignored.
//!
//! ```ignore
//! use docstore::observability::{log_event, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! log_event(Event::StoreOpen, &[("db", ":memory:")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event at INFO
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::info(event.as_str(), fields);
}

/// Log a per-operation event at TRACE
pub fn trace_event(event: Event, fields: &[(&str, &str)]) {
    Logger::trace(event.as_str(), fields);
}
