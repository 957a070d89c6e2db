use crate::MethodEntry;
use std::collections::HashMap;
use std::sync::Arc;

pub type EntryMap<S> = HashMap<String, Arc<MethodEntry<S>>>;

/// Closure-passing access to the endpoint's method table, so the endpoint
/// interface does not depend on a particular mutex type.
#[async_trait::async_trait]
pub trait WithEntries<S>: Send + Sync
where
    S: Send + Sync + 'static,
{
    async fn with_entries<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut EntryMap<S>) -> R + Send,
        R: Send;
}

#[async_trait::async_trait]
impl<S> WithEntries<S> for tokio::sync::Mutex<EntryMap<S>>
where
    S: Send + Sync + 'static,
{
    async fn with_entries<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut EntryMap<S>) -> R + Send,
        R: Send,
    {
        let mut guard = self.lock().await;
        f(&mut guard)
    }
}
