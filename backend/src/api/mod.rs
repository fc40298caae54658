//! HTTP API module.
//!
//! This module provides the HTTP server and API types for the rateload backend.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{accept_upload, start_server, AppState, UploadEntry};
pub use types::*;
pub use logs::*;
