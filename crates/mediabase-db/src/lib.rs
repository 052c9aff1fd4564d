//! Database access layer for mediabase
//!
//! Repositories in this crate own the SQL for one entity each and surface
//! errors from `mediabase-core`. Every mutating operation comes in two
//! forms: one that runs against the pool as its own atomic unit, and a `_tx`
//! form that joins the caller's transaction.

pub mod db;

pub use db::transaction::with_transaction;
pub use db::{MediaRepository, TagDiff};
