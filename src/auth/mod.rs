//! Session resolution module

pub mod middleware;

pub use middleware::{extract_token, session_from_headers, SessionContext};
