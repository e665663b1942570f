//! Per-profile persistent cache.
//!
//! A [`PersistentCacheStore`] holds one serializable document for one
//! (cache name, profile) pair. Reads are served from memory once the document
//! has been loaded. Writes are read-modify-write updates funneled through a
//! single writer task per store, so updates issued for the same store are
//! applied one at a time in the order they were issued, and the in-memory copy
//! only moves forward after the backend accepted the new value.

use std::{future::Future, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error, warn};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::{
    error::{LearningTimeError, LearningTimeResult},
    models::ProfileId,
};

/// Durable key-value storage behind the cache. Keys are scoped per profile.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn load(&self, cache_name: &str, profile_id: &ProfileId) -> Result<Option<String>>;

    async fn store(&self, cache_name: &str, profile_id: &ProfileId, payload: String) -> Result<()>;

    async fn delete(&self, cache_name: &str, profile_id: &ProfileId) -> Result<()>;
}

pub trait CacheValue: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static {}

type UpdateFn<T> = Box<dyn FnOnce(T) -> T + Send + 'static>;

enum CacheCommand<T> {
    Update {
        update: UpdateFn<T>,
        reply: oneshot::Sender<LearningTimeResult<T>>,
    },
    Clear {
        reply: oneshot::Sender<LearningTimeResult<()>>,
    },
}

struct CacheInner<T> {
    cache_name: &'static str,
    profile_id: ProfileId,
    backend: Arc<dyn CacheBackend>,
    /// `None` until the persisted document has been loaded.
    committed: RwLock<Option<T>>,
}

impl<T: CacheValue> CacheInner<T> {
    async fn ensure_loaded(&self) -> LearningTimeResult<T> {
        let mut guard = self.committed.write().await;
        if let Some(value) = guard.as_ref() {
            return Ok(value.clone());
        }

        let value = self
            .load_from_backend()
            .await
            .map_err(|err| LearningTimeError::load(self.cache_name, &self.profile_id, err))?;
        *guard = Some(value.clone());
        Ok(value)
    }

    async fn load_from_backend(&self) -> Result<T> {
        match self.backend.load(self.cache_name, &self.profile_id).await? {
            Some(payload) => serde_json::from_str(&payload)
                .with_context(|| format!("corrupt {} payload", self.cache_name)),
            None => Ok(T::default()),
        }
    }

    async fn apply_update(&self, update: UpdateFn<T>) -> LearningTimeResult<T> {
        let current = self.ensure_loaded().await?;
        let next = update(current);

        let persisted: Result<()> = async {
            let payload = serde_json::to_string(&next)
                .with_context(|| format!("failed to serialize {}", self.cache_name))?;
            self.backend
                .store(self.cache_name, &self.profile_id, payload)
                .await
        }
        .await;

        if let Err(err) = persisted {
            warn!(
                "Failed to persist {} for profile {}: {err:#}",
                self.cache_name, self.profile_id
            );
            return Err(LearningTimeError::persist(
                self.cache_name,
                &self.profile_id,
                err,
            ));
        }

        *self.committed.write().await = Some(next.clone());
        Ok(next)
    }

    async fn clear(&self) -> LearningTimeResult<()> {
        self.backend
            .delete(self.cache_name, &self.profile_id)
            .await
            .map_err(|err| LearningTimeError::persist(self.cache_name, &self.profile_id, err))?;
        *self.committed.write().await = Some(T::default());
        Ok(())
    }

    fn closed(&self) -> LearningTimeError {
        LearningTimeError::Closed {
            cache: self.cache_name,
            profile_id: self.profile_id.clone(),
        }
    }
}

pub struct PersistentCacheStore<T> {
    inner: Arc<CacheInner<T>>,
    sender: mpsc::UnboundedSender<CacheCommand<T>>,
}

impl<T: CacheValue> PersistentCacheStore<T> {
    /// Creates the store and spawns its writer task, which starts by priming
    /// the in-memory copy from the backend. Must be called inside a Tokio
    /// runtime.
    pub fn new(
        cache_name: &'static str,
        profile_id: ProfileId,
        backend: Arc<dyn CacheBackend>,
    ) -> Self {
        let inner = Arc::new(CacheInner {
            cache_name,
            profile_id,
            backend,
            committed: RwLock::new(None),
        });
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(inner.clone(), receiver));
        Self { inner, sender }
    }

    pub fn cache_name(&self) -> &'static str {
        self.inner.cache_name
    }

    pub fn profile_id(&self) -> &ProfileId {
        &self.inner.profile_id
    }

    /// Latest committed document. A read racing an in-flight write may observe
    /// the value from before that write.
    pub async fn read(&self) -> LearningTimeResult<T> {
        if let Some(value) = self.inner.committed.read().await.as_ref() {
            return Ok(value.clone());
        }
        self.inner.ensure_loaded().await
    }

    /// Loads the persisted document into memory if that has not happened yet.
    pub async fn prime(&self) -> LearningTimeResult<()> {
        self.inner.ensure_loaded().await.map(|_| ())
    }

    /// Queues `update` against the current document and resolves to the value
    /// that was committed. The update is queued before this returns, so call
    /// order is commit order. Dropping the returned future does not cancel the
    /// write.
    pub fn store_data_async<F>(
        &self,
        update: F,
    ) -> impl Future<Output = LearningTimeResult<T>> + Send + 'static
    where
        F: FnOnce(T) -> T + Send + 'static,
    {
        let (reply, reply_rx) = oneshot::channel();
        let queued = self
            .sender
            .send(CacheCommand::Update {
                update: Box::new(update),
                reply,
            })
            .is_ok();
        let closed = self.inner.closed();

        async move {
            if !queued {
                return Err(closed);
            }
            reply_rx.await.unwrap_or(Err(closed))
        }
    }

    /// Deletes the persisted document and resets memory to the default value.
    /// Ordered with respect to queued updates.
    pub fn clear(&self) -> impl Future<Output = LearningTimeResult<()>> + Send + 'static {
        let (reply, reply_rx) = oneshot::channel();
        let queued = self.sender.send(CacheCommand::Clear { reply }).is_ok();
        let closed = self.inner.closed();

        async move {
            if !queued {
                return Err(closed);
            }
            reply_rx.await.unwrap_or(Err(closed))
        }
    }
}

async fn run_writer<T: CacheValue>(
    inner: Arc<CacheInner<T>>,
    mut receiver: mpsc::UnboundedReceiver<CacheCommand<T>>,
) {
    if let Err(err) = inner.ensure_loaded().await {
        error!(
            "Failed to prime {} ahead of data retrieval for profile {}: {err}",
            inner.cache_name, inner.profile_id
        );
    }

    while let Some(command) = receiver.recv().await {
        match command {
            CacheCommand::Update { update, reply } => {
                let result = inner.apply_update(update).await;
                if reply.send(result).is_err() {
                    debug!(
                        "Caller stopped waiting on {} write for profile {}",
                        inner.cache_name, inner.profile_id
                    );
                }
            }
            CacheCommand::Clear { reply } => {
                let _ = reply.send(inner.clear().await);
            }
        }
    }

    debug!(
        "Cache writer for {} (profile {}) shutting down",
        inner.cache_name, inner.profile_id
    );
}
