use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::TryStreamExt;
use log::{debug, info, trace, warn};
use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, ReadPreference, SelectionCriteria};
use mongodb::{Client, Collection};
use serde::{Serialize, de::DeserializeOwned};

use super::{Ctx, Error};
use crate::params;
use crate::traits::DocumentStore;
use crate::types::{self, Filter, Projection, Sort, Update};

/// Database the liveness probe is issued against.
const ADMIN_DATABASE: &str = "admin";

/// Connection handle to a document database.
///
/// The handle is created once with [`Repository::connect`] and cloned freely,
/// clones share the underlying driver connection pool. Collection handles are
/// resolved on every call and never cached.
///
/// After [`Repository::disconnect`] every operation, on any clone, fails with
/// [`Error::Disconnected`]. Synchronizing shutdown with in-flight calls is up to
/// the owner of the handle.
#[derive(Clone, Debug)]
pub struct Repository {
    client: Client,
    database: String,
    disconnected: Arc<AtomicBool>,
}

impl Repository {
    /// Connects to the store at `uri` and selects `database`.
    ///
    /// Configurables (pool size, app name, server selection timeout) are applied on
    /// top of the URI options. The primary is pinged before returning, so an
    /// unreachable store fails here instead of on first use.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, Error> {
        let mut options = ClientOptions::parse(uri).await?;

        let conf = params::configurables();
        if let Some(app_name) = &conf.app_name {
            options.app_name = Some(app_name.clone());
        }
        if let Some(max_pool_size) = conf.max_pool_size {
            options.max_pool_size = Some(max_pool_size);
        }
        if let Some(timeout) = conf.server_selection_timeout {
            options.server_selection_timeout = Some(timeout);
        }

        let client = Client::with_options(options)?;
        let repo = Self {
            client,
            database: database.to_owned(),
            disconnected: Arc::new(AtomicBool::new(false)),
        };

        repo.ping(&Ctx::background()).await?;

        info!("connected to database `{}`", repo.database);

        Ok(repo)
    }

    /// Closes the driver connections.
    ///
    /// Waits for outstanding cursors and sessions to be dropped. Calling it more
    /// than once is harmless.
    pub async fn disconnect(&self) {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            debug!("database `{}` already disconnected", self.database);
            return;
        }

        warn!("disconnecting from database `{}`", self.database);
        self.client.clone().shutdown().await;
    }

    pub fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    /// Raw driver client, for operations outside the facade surface.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Resolves a collection handle in the selected database.
    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.typed(name)
    }

    fn typed<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.client.database(&self.database).collection::<T>(name)
    }

    fn ensure_connected(&self) -> Result<(), Error> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::Disconnected)
        }
    }
}

fn identifier(id: &mongodb::bson::Bson) -> Result<String, Error> {
    types::id_to_string(id).ok_or_else(|| Error::InvalidObjectId(id.to_string()))
}

impl DocumentStore for Repository {
    async fn ping(&self, ctx: &Ctx) -> Result<bool, Error> {
        self.ensure_connected()?;

        ctx.run(async {
            self.client
                .database(ADMIN_DATABASE)
                .run_command(doc! { "ping": 1 })
                .selection_criteria(SelectionCriteria::ReadPreference(ReadPreference::Primary))
                .await?;
            Ok::<_, Error>(true)
        })
        .await
    }

    async fn save_one<R>(&self, ctx: &Ctx, collection: &str, record: &R) -> Result<String, Error>
    where
        R: Serialize + Send + Sync,
    {
        self.ensure_connected()?;
        trace!("[{}] save one", collection);

        let handle = self.typed::<R>(collection);

        ctx.run(async {
            let result = handle.insert_one(record).await?;
            identifier(&result.inserted_id)
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

        let handle = self.typed::<R>(collection);

        ctx.run(async {
            let result = handle.insert_many(records).await?;

            // Identifiers are keyed by input position
            let mut ids: Vec<_> = result.inserted_ids.into_iter().collect();
            ids.sort_unstable_by_key(|(index, _)| *index);

            ids.iter()
                .map(|(_, id)| identifier(id))
                .collect::<Result<Vec<_>, _>>()
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

        let handle = self.typed::<T>(collection);

        ctx.run(async {
            handle
                .find_one(filter)
                .projection(excluded)
                .await?
                .ok_or(Error::NotFound)
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

        let handle = self.typed::<T>(collection);

        ctx.run(async {
            let cursor = handle
                .find(filter)
                .projection(excluded)
                .sort(sort)
                .limit(limit)
                .await?;

            // the cursor is closed when dropped
            let items: Vec<T> = cursor.try_collect().await?;
            trace!("[{}] fetched #{} records", collection, items.len());

            Ok::<_, Error>(items)
        })
        .await
    }

    async fn count(&self, ctx: &Ctx, collection: &str, filter: Filter) -> Result<u64, Error> {
        self.ensure_connected()?;
        trace!("[{}] count with filter {}", collection, filter);

        let handle = self.collection(collection);

        ctx.run(async { Ok::<_, Error>(handle.count_documents(filter).await?) })
            .await
    }

    async fn update_one(
        &self,
        ctx: &Ctx,
        collection: &str,
        matching: Filter,
        update: Update,
    ) -> Result<u64, Error> {
        self.ensure_connected()?;
        trace!("[{}] update one matching {}", collection, matching);

        let handle = self.collection(collection);

        ctx.run(async {
            let result = handle.update_one(matching, update).await?;
            Ok::<_, Error>(result.modified_count)
        })
        .await
    }

    async fn update_many(
        &self,
        ctx: &Ctx,
        collection: &str,
        matching: Filter,
        update: Update,
    ) -> Result<u64, Error> {
        self.ensure_connected()?;
        trace!("[{}] update many matching {}", collection, matching);

        let handle = self.collection(collection);

        ctx.run(async {
            let result = handle.update_many(matching, update).await?;
            Ok::<_, Error>(result.modified_count)
        })
        .await
    }

    async fn delete_one(&self, ctx: &Ctx, collection: &str, filter: Filter) -> Result<u64, Error> {
        self.ensure_connected()?;
        trace!("[{}] delete one with filter {}", collection, filter);

        let handle = self.collection(collection);

        ctx.run(async {
            let result = handle.delete_one(filter).await?;
            Ok::<_, Error>(result.deleted_count)
        })
        .await
    }

    async fn delete_many(
        &self,
        ctx: &Ctx,
        collection: &str,
        filter: Filter,
    ) -> Result<u64, Error> {
        self.ensure_connected()?;
        trace!("[{}] delete many with filter {}", collection, filter);

        let handle = self.collection(collection);

        ctx.run(async {
            let result = handle.delete_many(filter).await?;
            Ok::<_, Error>(result.deleted_count)
        })
        .await
    }
}
