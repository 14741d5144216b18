//! archive-search - query toolkit for a photo archive search service
//!
//! Parses free-text and URL search queries, compiles them into backend graph
//! queries, fetches result windows page by page, keeps per-user search
//! sessions with infinite scrolling, and explains matches with highlighted
//! excerpts.

pub mod backend;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod justification;
pub mod query;
pub mod session;

pub use error::{ArchiveError, Result};
