use crate::BackendFlags;
use chrono::{DateTime, FixedOffset, Utc};
use magicproxy_service::{WireType, type_arg};
use magicproxy_service_caller::{CallerError, ServiceCallerInterface, call_args};
use std::sync::Arc;

/// Calls [`Backend`](crate::Backend) methods through any caller, a network
/// client or an in-process mock alike.
pub struct BackendProxy<C> {
    caller: Arc<C>,
}

impl<C> Clone for BackendProxy<C> {
    fn clone(&self) -> Self {
        Self {
            caller: self.caller.clone(),
        }
    }
}

impl<C> BackendProxy<C>
where
    C: ServiceCallerInterface,
{
    pub fn new(caller: Arc<C>) -> Self {
        Self { caller }
    }

    pub fn caller(&self) -> &Arc<C> {
        &self.caller
    }

    /// The last connection state reported by the server.
    pub fn flags(&self) -> BackendFlags {
        BackendFlags::from_bits_retain(self.caller.connection_state())
    }

    pub async fn client_update_required(&self, version: i32) -> Result<bool, CallerError> {
        self.caller
            .call_method("client_update_required", vec![], call_args![version])
            .await
    }

    pub async fn authenticate(&self, user: &str, password: &str) -> Result<bool, CallerError> {
        self.caller
            .call_method("authenticate", vec![], call_args![user, password])
            .await
    }

    pub async fn logout(&self) -> Result<(), CallerError> {
        self.caller.call_unit("logout", vec![], vec![]).await
    }

    pub async fn foo(&self, x: i32) -> Result<f64, CallerError> {
        self.caller.call_method("foo", vec![], call_args![x]).await
    }

    pub async fn simple_action(&self) -> Result<(), CallerError> {
        self.caller.call_unit("simple_action", vec![], vec![]).await
    }

    pub async fn simple_throws(&self) -> Result<(), CallerError> {
        self.caller.call_unit("simple_throws", vec![], vec![]).await
    }

    pub async fn date_test(
        &self,
        dt: DateTime<Utc>,
        dto: DateTime<FixedOffset>,
    ) -> Result<DateTime<FixedOffset>, CallerError> {
        self.caller
            .call_method("date_test", vec![], call_args![dt, dto])
            .await
    }

    pub async fn do_bar(&self, x: i32) -> Result<(), CallerError> {
        self.caller.call_unit("do_bar", vec![], call_args![x]).await
    }

    pub async fn get_raw(&self, count: i32) -> Result<Vec<u8>, CallerError> {
        self.caller
            .call_method_raw("get_raw", vec![], call_args![count])
            .await
    }

    pub async fn update<T: WireType>(&self, value: &T) -> Result<(), CallerError> {
        self.caller
            .call_unit("update", vec![type_arg::<T>()], call_args![value])
            .await
    }

    pub async fn get_from_db<T: WireType>(&self, id: i32) -> Result<T, CallerError> {
        self.caller
            .call_method("get_from_db", vec![type_arg::<T>()], call_args![id])
            .await
    }

    pub async fn get_null<T: WireType>(&self) -> Result<Option<T>, CallerError> {
        self.caller
            .call_method("get_null", vec![type_arg::<T>()], vec![])
            .await
    }

    pub async fn nested<T: WireType>(&self) -> Result<Vec<T>, CallerError> {
        self.caller
            .call_method("nested", vec![type_arg::<T>()], vec![])
            .await
    }
}
