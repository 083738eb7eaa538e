//! Error types for QueryWarden
//!
//! Every failure that reaches a caller is a [`QueryError`]. Display output is
//! the sanitized, caller-facing message; raw warehouse text travels in the
//! non-displayed `detail` fields and in log events only.

mod constructors;
mod types;

pub use types::{QueryError, QueryResult};
