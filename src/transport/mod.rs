//! Transport module - platform-specific local endpoint handling.
//!
//! Provides abstraction over:
//! - Unix Domain Sockets (Linux/macOS)
//! - Named Pipes (Windows)

mod pipe;

pub use pipe::{connect, endpoint_path, generate_endpoint_name, PipeListener, PipeStream};
