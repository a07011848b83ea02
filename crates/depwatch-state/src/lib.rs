//! depwatch-state — embedded store for check definitions and results.
//!
//! Backed by [redb](https://docs.rs/redb). Definitions, result history and
//! the latest-result-per-definition view all live in one database file; an
//! in-memory backend is available for tests.
//!
//! # Architecture
//!
//! Domain types are JSON-serialized into redb's `&[u8]` value columns.
//! History rows use the composite key `{definition_id}:{result_id}`
//! (both zero-padded) so a definition's results sort in insertion order
//! and can be range-scanned newest first.
//!
//! The monitor engine talks to storage only through the
//! [`DefinitionStore`] and [`ResultStore`] traits; [`StateStore`] is the
//! redb implementation of both. It is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod traits;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use traits::{DefinitionStore, ResultStore};
pub use types::*;
