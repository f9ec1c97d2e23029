//! Runtime plumbing shared across the engine: the broadcast event bus
//! and tracing subscriber setup.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Result, RuntimeError};
pub use events::{CoreEvent, EventBus, NoticeEvent, Severity, SyncEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
