use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};

use crate::repo::{Ctx, Error};
use crate::types::{Filter, Projection, Sort, Update};

/// Capability surface of a document store.
///
/// Every operation takes a [`Ctx`] bounding its duration, the name of the
/// collection it works on and the operation payload. Payloads are forwarded to
/// the backend verbatim: no validation, no retries, no rewriting of the query
/// language.
///
/// Implementations are cheap to clone and safe to share between tasks, result
/// values are owned by the caller.
pub trait DocumentStore: Send + Sync {
    /// Liveness probe. Returns `true` or the connectivity error.
    fn ping(&self, ctx: &Ctx) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Inserts a record and returns its generated identifier.
    fn save_one<R>(
        &self,
        ctx: &Ctx,
        collection: &str,
        record: &R,
    ) -> impl Future<Output = Result<String, Error>> + Send
    where
        R: Serialize + Send + Sync;

    /// Inserts records in order, returning one identifier per record in input
    /// order. Records inserted before a failure stay inserted.
    fn save_many<R>(
        &self,
        ctx: &Ctx,
        collection: &str,
        records: &[R],
    ) -> impl Future<Output = Result<Vec<String>, Error>> + Send
    where
        R: Serialize + Send + Sync;

    /// Returns the first record matching `filter`, shaped by `excluded`.
    ///
    /// Fails with [`Error::NotFound`] when nothing matches.
    fn fetch_one<T>(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
        excluded: Projection,
    ) -> impl Future<Output = Result<T, Error>> + Send
    where
        T: DeserializeOwned + Send + Sync + Unpin;

    /// Returns up to `limit` records matching `filter` in `sort` order.
    /// A `limit` of zero means no limit.
    fn fetch_many<T>(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
        limit: i64,
        excluded: Projection,
        sort: Sort,
    ) -> impl Future<Output = Result<Vec<T>, Error>> + Send
    where
        T: DeserializeOwned + Send + Sync + Unpin;

    fn count(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
    ) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Updates the first matching record, returns the number of modified records.
    fn update_one(
        &self,
        ctx: &Ctx,
        collection: &str,
        matching: Filter,
        update: Update,
    ) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Updates every matching record, returns the number of modified records.
    fn update_many(
        &self,
        ctx: &Ctx,
        collection: &str,
        matching: Filter,
        update: Update,
    ) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Deletes the first matching record, returns the number of deleted records.
    fn delete_one(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
    ) -> impl Future<Output = Result<u64, Error>> + Send;

    /// Deletes every matching record, returns the number of deleted records.
    fn delete_many(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
    ) -> impl Future<Output = Result<u64, Error>> + Send;
}
