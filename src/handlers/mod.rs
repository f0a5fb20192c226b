//! Pluggable call and message handlers.

pub mod builtin;
pub mod handler;
pub mod registry;

pub use handler::*;
pub use registry::HandlerRegistry;
