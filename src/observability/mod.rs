//! Observability for storage handles
//!
//! Every configuration and write event is logged as one timestamped JSON
//! line tagged with the backend implementation's name. Logging is not part
//! of the data contract and may be disabled.
//!
//! ```ignore
//! use jobarchive::observability::{Event, Logger};
//!
//! Logger::event("HdfsStorage", Event::RecordWrite, &[("id", id.as_str())]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};
