//! Server-side persistent store for Craftgate.
//!
//! Users, skins and the two configuration singletons live as plain files
//! under one root directory. Every write is atomic (temp file + rename)
//! and writes to the same entity are serialized, so concurrent connection
//! handlers can share one [`Repository`] behind an `Arc`.
//!
//! Every failure is a [`RepositoryError`]; no raw I/O error escapes
//! without the path and the kind of record it concerned.

mod error;
mod files;
mod locks;
mod nickname;
mod store;

pub use error::RepositoryError;
pub use nickname::{MAX_NICKNAME_LEN, validate_nickname};
pub use store::Repository;
