//! Utility modules

pub mod redact;

pub use redact::{error_chain, sanitize_body_for_logging};
