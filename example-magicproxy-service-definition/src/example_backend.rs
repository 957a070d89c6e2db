use crate::{Backend, BackendFlags};
use chrono::{DateTime, FixedOffset, Utc};
use magicproxy_service::{ConnectionInfo, ServiceBackend, WireType};
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

const SUPPORTED_CLIENT_VERSION: i32 = 77;

/// Reference [`Backend`] implementation used by the demo and the tests.
pub struct ExampleBackend {
    info: ConnectionInfo,
    state: AtomicU32,
    count: AtomicI64,
}

impl ExampleBackend {
    pub fn new(info: ConnectionInfo) -> Self {
        Self {
            info,
            state: AtomicU32::new(0),
            count: AtomicI64::new(0),
        }
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn flags(&self) -> BackendFlags {
        BackendFlags::from_bits_retain(self.state.load(Ordering::SeqCst))
    }

    fn set(&self, flags: BackendFlags) {
        self.state.fetch_or(flags.bits(), Ordering::SeqCst);
    }

    fn clear(&self, flags: BackendFlags) {
        self.state.fetch_and(!flags.bits(), Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ServiceBackend for ExampleBackend {
    fn connection_state(&self) -> u32 {
        self.state.load(Ordering::SeqCst)
    }

    async fn approve_connection(&self) -> Option<String> {
        if self.info.client_certificate().is_none() {
            return Some("No client cert".to_string());
        }
        self.set(BackendFlags::CLIENT_CERT_OK);
        None
    }
}

#[async_trait::async_trait]
impl Backend for ExampleBackend {
    async fn client_update_required(&self, version: i32) -> anyhow::Result<bool> {
        if version == SUPPORTED_CLIENT_VERSION {
            self.set(BackendFlags::CLIENT_VERSION_OK);
        } else {
            self.clear(BackendFlags::CLIENT_VERSION_OK);
        }
        Ok(version != SUPPORTED_CLIENT_VERSION)
    }

    async fn authenticate(&self, user: String, password: String) -> anyhow::Result<bool> {
        let ok = user == "foo" && password == "bar";
        if ok {
            self.set(BackendFlags::LOGGED_IN);
        } else {
            self.clear(BackendFlags::LOGGED_IN);
        }
        tracing::info!("[{}] authenticate {}: {}", self.info.id, user, ok);
        Ok(ok)
    }

    async fn logout(&self) -> anyhow::Result<()> {
        self.clear(BackendFlags::LOGGED_IN);
        Ok(())
    }

    async fn foo(&self, x: i32) -> anyhow::Result<f64> {
        let count = self.count.fetch_add(1, Ordering::SeqCst);
        Ok(count as f64 * f64::from(x) * 277.2)
    }

    async fn simple_action(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn simple_throws(&self) -> anyhow::Result<()> {
        anyhow::bail!("server side failure!")
    }

    async fn date_test(
        &self,
        _dt: DateTime<Utc>,
        dto: DateTime<FixedOffset>,
    ) -> anyhow::Result<DateTime<FixedOffset>> {
        Ok(dto)
    }

    async fn do_bar(&self, _x: i32) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_raw(&self, count: i32) -> anyhow::Result<Vec<u8>> {
        let mut bytes = vec![0u8; usize::try_from(count)?];
        if let Some(first) = bytes.first_mut() {
            *first = 0x55;
        }
        let len = bytes.len();
        if len > 1 {
            bytes[len - 1] = 0x66;
        }
        Ok(bytes)
    }

    async fn update<T: WireType>(&self, _value: T) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_from_db<T: WireType + Default>(&self, _id: i32) -> anyhow::Result<T> {
        Ok(T::default())
    }

    async fn get_null<T: WireType>(&self) -> anyhow::Result<Option<T>> {
        Ok(None)
    }

    async fn nested<T: WireType + Default>(&self) -> anyhow::Result<Vec<T>> {
        Ok(vec![T::default(), T::default()])
    }
}
