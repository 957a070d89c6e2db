use crate::{EntryMap, ServiceEndpointInterface};
use magicproxy_service::{RuntimeConfig, ServiceBackend, ServiceContract};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A concrete service endpoint: one contract, its registered invokers and
/// the runtime configuration they dispatch with.
///
/// Shared by every connection of a server; per-connection state lives in the
/// service object `S`.
pub struct ServiceEndpoint<S>
where
    S: ServiceBackend,
{
    contract: Arc<ServiceContract>,
    config: Arc<RuntimeConfig>,
    entries: Arc<Mutex<EntryMap<S>>>,
}

impl<S> ServiceEndpoint<S>
where
    S: ServiceBackend,
{
    pub fn new(contract: Arc<ServiceContract>, config: Arc<RuntimeConfig>) -> Self {
        Self {
            contract,
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn contract_arc(&self) -> Arc<ServiceContract> {
        self.contract.clone()
    }

    pub fn config_arc(&self) -> Arc<RuntimeConfig> {
        self.config.clone()
    }
}

#[async_trait::async_trait]
impl<S> ServiceEndpointInterface<S> for ServiceEndpoint<S>
where
    S: ServiceBackend,
{
    type EntriesLock = Mutex<EntryMap<S>>;

    fn contract(&self) -> &ServiceContract {
        &self.contract
    }

    fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn get_entries(&self) -> Arc<Self::EntriesLock> {
        self.entries.clone()
    }
}
