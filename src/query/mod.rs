//! # Document Query Evaluation
//!
//! A small evaluator for the document query language, used by the in-memory
//! store so that tests and embedded setups behave like a real server without one.
//!
//! The evaluator covers the subset of the language that the facade's callers rely on:
//!
//! -   _Filters_ ([`matches`]): field equality on (dotted) paths, comparison
//!     operators (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`), set membership
//!     (`$in`, `$nin`), `$exists` and the logical combinators `$and`, `$or`, `$nor`.
//!
//! -   _Updates_ ([`apply_update`]): `$set`, `$unset` and `$inc` on dotted paths,
//!     numeric segments address array elements.
//!
//! -   _Projections_ ([`project`]): either exclusion or inclusion, never mixed
//!     (apart from `_id`).
//!
//! -   _Sorting_ ([`sort_documents`]): multi-key, `1` ascending and `-1` descending,
//!     using the cross-type ordering of the wire format.
//!
//! Anything outside this subset is rejected with an [`Error`] rather than being
//! silently ignored.

mod filter;
pub use filter::matches;

mod order;
pub use order::{compare, sort_documents};

mod path;

mod projection;
pub use projection::project;

mod update;
pub use update::apply_update;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("operator `{op}` expects {expected}")]
    BadOperand { op: String, expected: &'static str },

    #[error("update document must contain only update operators, found `{0}`")]
    MissingOperator(String),

    #[error("empty update document")]
    EmptyUpdate,

    #[error("cannot apply `$inc` to non-numeric field `{0}`")]
    NonNumeric(String),

    #[error("`$inc` on field `{0}` overflows a 64-bit integer")]
    Overflow(String),

    #[error("cannot create field `{0}`, an element on its path is not a document")]
    PathConflict(String),

    #[error("field `_id` is immutable")]
    ImmutableId,

    #[error("projection cannot mix inclusion and exclusion")]
    MixedProjection,
}
