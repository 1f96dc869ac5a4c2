//! # Repository Module
//!
//! Data-access facade over a document database. The facade is a pure delegation
//! layer between the application and the database driver:
//!
//! * **Pass-through:** filters, updates, projections and sort specifications are
//!   forwarded verbatim, results are decoded into caller-owned values.
//! * **Explicit lifecycle:** the connection handle ([`Repository`]) is built once
//!   with [`Repository::connect`], shared by cloning, and torn down with
//!   [`Repository::disconnect`].
//! * **Bounded calls:** every operation takes a [`Ctx`] carrying a deadline and/or
//!   a cancellation signal.
//!
//! The operations themselves are described by [`crate::traits::DocumentStore`],
//! implemented here by the database-backed [`Repository`] and by the process-local
//! [`InMemory`] store.

mod context;
pub use context::*;

mod error;
pub use error::*;

mod repository;
pub use repository::*;

mod in_memory;
pub use in_memory::*;
