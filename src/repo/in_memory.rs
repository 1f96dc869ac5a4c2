//! InMemory - process-local document store for testing and development.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{trace, warn};
use mongodb::bson::{self, Bson, Document, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use super::{Ctx, Error};
use crate::query;
use crate::traits::DocumentStore;
use crate::types::{self, Filter, ID_FIELD, Projection, Sort, Update};

type Collections = HashMap<String, Vec<Document>>;

/// Document store kept in process memory.
///
/// Behaves like the database-backed [`super::Repository`] for the supported query
/// subset (see [`crate::query`]): generated object ids, unique `_id`, ordered
/// inserts that stop at the first failure, modified counts that ignore no-op
/// updates. Clone-friendly via `Arc`, clones share the same data.
#[derive(Clone, Default)]
pub struct InMemory {
    collections: Arc<RwLock<Collections>>,
    disconnected: Arc<AtomicBool>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all data and marks every clone as disconnected.
    pub async fn disconnect(&self) {
        warn!("disconnecting in-memory store");
        self.disconnected.store(true, Ordering::SeqCst);
        self.collections.write().await.clear();
    }

    pub fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    /// Names of the collections that currently hold at least one document.
    pub async fn collection_names(&self) -> Vec<String> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn ensure_connected(&self) -> Result<(), Error> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::Disconnected)
        }
    }

    async fn update(
        &self,
        ctx: &Ctx,
        collection: &str,
        matching: Filter,
        update: Update,
        multi: bool,
    ) -> Result<u64, Error> {
        self.ensure_connected()?;

        ctx.run(async {
            let mut collections = self.collections.write().await;
            let Some(docs) = collections.get_mut(collection) else {
                return Ok(0);
            };

            let mut modified = 0;
            for doc in docs {
                if !query::matches(doc, &matching)? {
                    continue;
                }
                if query::apply_update(doc, &update)? {
                    modified += 1;
                }
                if !multi {
                    break;
                }
            }

            Ok::<_, Error>(modified)
        })
        .await
    }

    async fn delete(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
        multi: bool,
    ) -> Result<u64, Error> {
        self.ensure_connected()?;

        ctx.run(async {
            let mut collections = self.collections.write().await;
            let Some(docs) = collections.get_mut(collection) else {
                return Ok(0);
            };

            // Collect positions first so a failing filter deletes nothing
            let mut doomed = Vec::new();
            for (pos, doc) in docs.iter().enumerate() {
                if query::matches(doc, &filter)? {
                    doomed.push(pos);
                    if !multi {
                        break;
                    }
                }
            }
            for pos in doomed.iter().rev() {
                docs.remove(*pos);
            }

            Ok::<_, Error>(doomed.len() as u64)
        })
        .await
    }
}

/// Serializes `record`, assigning a fresh object id when it carries no `_id`.
fn prepare<R: Serialize>(record: &R) -> Result<(Document, Bson), Error> {
    let mut doc = bson::to_document(record)?;

    let id = match doc.get(ID_FIELD) {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            // keep `_id` first, as the server does
            let mut with_id = Document::new();
            with_id.insert(ID_FIELD, id.clone());
            with_id.extend(doc);
            doc = with_id;
            id
        }
    };

    Ok((doc, id))
}

fn insert(docs: &mut Vec<Document>, doc: Document, id: &Bson) -> Result<(), Error> {
    if docs.iter().any(|d| d.get(ID_FIELD) == Some(id)) {
        return Err(Error::Duplicate(format!("duplicate key {{ _id: {} }}", id)));
    }
    docs.push(doc);
    Ok(())
}

fn identifier(id: &Bson) -> Result<String, Error> {
    types::id_to_string(id).ok_or_else(|| Error::InvalidObjectId(id.to_string()))
}

fn effective_limit(limit: i64) -> Option<usize> {
    match limit {
        0 => None,
        // negative limits behave like their absolute value
        l => usize::try_from(l.unsigned_abs()).ok(),
    }
}

impl DocumentStore for InMemory {
    async fn ping(&self, ctx: &Ctx) -> Result<bool, Error> {
        self.ensure_connected()?;
        ctx.run(async { Ok::<_, Error>(true) }).await
    }

    async fn save_one<R>(&self, ctx: &Ctx, collection: &str, record: &R) -> Result<String, Error>
    where
        R: Serialize + Send + Sync,
    {
        self.ensure_connected()?;
        trace!("[{}] save one", collection);

        let (doc, id) = prepare(record)?;

        ctx.run(async {
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_owned()).or_default();
            insert(docs, doc, &id)?;
            identifier(&id)
        })
        .await
    }

    async fn save_many<R>(
        &self,
        ctx: &Ctx,
        collection: &str,
        records: &[R],
    ) -> Result<Vec<String>, Error>
    where
        R: Serialize + Send + Sync,
    {
        self.ensure_connected()?;
        trace!("[{}] save many (#{} records)", collection, records.len());

        if records.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let prepared = records
            .iter()
            .map(prepare)
            .collect::<Result<Vec<_>, _>>()?;

        ctx.run(async {
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.to_owned()).or_default();

            // Ordered insert: stop at the first failure, earlier records stay
            let mut ids = Vec::with_capacity(prepared.len());
            for (doc, id) in prepared {
                insert(docs, doc, &id)?;
                ids.push(id);
            }

            // Identifiers are rendered once the whole batch is stored
            ids.iter().map(identifier).collect::<Result<Vec<_>, Error>>()
        })
        .await
    }

    async fn fetch_one<T>(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
        excluded: Projection,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned + Send + Sync + Unpin,
    {
        self.ensure_connected()?;
        trace!("[{}] fetch one with filter {}", collection, filter);

        ctx.run(async {
            let collections = self.collections.read().await;
            let docs = collections.get(collection).map(Vec::as_slice).unwrap_or_default();

            for doc in docs {
                if query::matches(doc, &filter)? {
                    let shaped = query::project(doc, &excluded)?;
                    return Ok(bson::from_document(shaped)?);
                }
            }

            Err(Error::NotFound)
        })
        .await
    }

    async fn fetch_many<T>(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
        limit: i64,
        excluded: Projection,
        sort: Sort,
    ) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned + Send + Sync + Unpin,
    {
        self.ensure_connected()?;
        trace!(
            "[{}] fetch many with filter {} (limit: {}, sort: {})",
            collection, filter, limit, sort
        );

        ctx.run(async {
            let mut found = Vec::new();
            {
                let collections = self.collections.read().await;
                let docs = collections.get(collection).map(Vec::as_slice).unwrap_or_default();
                for doc in docs {
                    if query::matches(doc, &filter)? {
                        found.push(doc.clone());
                    }
                }
            }

            query::sort_documents(&mut found, &sort)?;
            if let Some(limit) = effective_limit(limit) {
                found.truncate(limit);
            }

            let mut items: Vec<T> = Vec::with_capacity(found.len());
            for doc in &found {
                let shaped = query::project(doc, &excluded)?;
                items.push(bson::from_document(shaped)?);
            }

            Ok::<_, Error>(items)
        })
        .await
    }

    async fn count(&self, ctx: &Ctx, collection: &str, filter: Filter) -> Result<u64, Error> {
        self.ensure_connected()?;
        trace!("[{}] count with filter {}", collection, filter);

        ctx.run(async {
            let collections = self.collections.read().await;
            let docs = collections.get(collection).map(Vec::as_slice).unwrap_or_default();

            let mut count = 0;
            for doc in docs {
                if query::matches(doc, &filter)? {
                    count += 1;
                }
            }

            Ok::<_, Error>(count)
        })
        .await
    }

    async fn update_one(
        &self,
        ctx: &Ctx,
        collection: &str,
        matching: Filter,
        update: Update,
    ) -> Result<u64, Error> {
        trace!("[{}] update one matching {}", collection, matching);
        self.update(ctx, collection, matching, update, false).await
    }

    async fn update_many(
        &self,
        ctx: &Ctx,
        collection: &str,
        matching: Filter,
        update: Update,
    ) -> Result<u64, Error> {
        trace!("[{}] update many matching {}", collection, matching);
        self.update(ctx, collection, matching, update, true).await
    }

    async fn delete_one(&self, ctx: &Ctx, collection: &str, filter: Filter) -> Result<u64, Error> {
        trace!("[{}] delete one with filter {}", collection, filter);
        self.delete(ctx, collection, filter, false).await
    }

    async fn delete_many(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
    ) -> Result<u64, Error> {
        trace!("[{}] delete many with filter {}", collection, filter);
        self.delete(ctx, collection, filter, true).await
    }
}
