//! Logging abstractions for host-agnostic logging

mod traits;
mod noop;
mod console;
mod memory;
mod tracing_logger;

pub use traits::{LogLevel, Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::MemoryLogger;
pub use tracing_logger::{TracingLogger, TRACING_TARGET};
