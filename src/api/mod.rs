//! HTTP command surface: router, handlers and SSE event stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, AppContext};
