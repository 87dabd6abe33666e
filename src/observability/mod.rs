//! Structured tracing for engine runs.

mod spans;

pub use spans::SpanContext;
