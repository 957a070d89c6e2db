use crate::{Bar, Person};
use chrono::{DateTime, FixedOffset, Utc};
use magicproxy_service::{ServiceBackend, TypeToken, WireType};
use magicproxy_service_endpoint::{
    EndpointError, Invoker, ServiceEndpointInterface, invoker, raw_invoker, select_type,
    unit_invoker,
};
use std::sync::Arc;

/// The example service interface.
///
/// One implementation object exists per connection; it owns the
/// [`BackendFlags`](crate::BackendFlags) state of that connection.
#[async_trait::async_trait]
pub trait Backend: ServiceBackend {
    /// Returns `true` when `version` is too old. A supported version sets
    /// `CLIENT_VERSION_OK`.
    async fn client_update_required(&self, version: i32) -> anyhow::Result<bool>;

    async fn authenticate(&self, user: String, password: String) -> anyhow::Result<bool>;

    async fn logout(&self) -> anyhow::Result<()>;

    async fn foo(&self, x: i32) -> anyhow::Result<f64>;

    async fn simple_action(&self) -> anyhow::Result<()>;

    async fn simple_throws(&self) -> anyhow::Result<()>;

    async fn date_test(
        &self,
        dt: DateTime<Utc>,
        dto: DateTime<FixedOffset>,
    ) -> anyhow::Result<DateTime<FixedOffset>>;

    async fn do_bar(&self, x: i32) -> anyhow::Result<()>;

    /// Bulk payload, transferred without structured encoding.
    async fn get_raw(&self, count: i32) -> anyhow::Result<Vec<u8>>;

    async fn update<T: WireType>(&self, value: T) -> anyhow::Result<()>;

    async fn get_from_db<T: WireType + Default>(&self, id: i32) -> anyhow::Result<T>;

    async fn get_null<T: WireType>(&self) -> anyhow::Result<Option<T>>;

    async fn nested<T: WireType + Default>(&self) -> anyhow::Result<Vec<T>>;
}

/// Expands `$body` once per type a generic [`Backend`] method can be
/// instantiated with, binding the matching type to `$alias`.
macro_rules! backend_type {
    ($token:expr, |$alias:ident| $body:expr) => {
        select_type!(
            $token,
            |$alias| $body,
            [bool, i32, i64, f64, String, Person, Bar]
        )
    };
}

fn single(types: &[TypeToken]) -> Option<TypeToken> {
    match types {
        [t] => Some(*t),
        _ => None,
    }
}

/// Registers every [`Backend`] method on `endpoint`.
pub async fn register_backend<S, E>(endpoint: &E) -> Result<(), EndpointError>
where
    S: Backend,
    E: ServiceEndpointInterface<S>,
{
    endpoint
        .register(
            "client_update_required",
            invoker(|svc: Arc<S>, (version,): (i32,)| async move {
                svc.client_update_required(version).await
            }),
        )
        .await?;

    endpoint
        .register(
            "authenticate",
            invoker(|svc: Arc<S>, (user, password): (String, String)| async move {
                svc.authenticate(user, password).await
            }),
        )
        .await?;

    endpoint
        .register(
            "logout",
            unit_invoker(|svc: Arc<S>, (): ()| async move { svc.logout().await }),
        )
        .await?;

    endpoint
        .register(
            "foo",
            invoker(|svc: Arc<S>, (x,): (i32,)| async move { svc.foo(x).await }),
        )
        .await?;

    endpoint
        .register(
            "simple_action",
            unit_invoker(|svc: Arc<S>, (): ()| async move { svc.simple_action().await }),
        )
        .await?;

    endpoint
        .register(
            "simple_throws",
            unit_invoker(|svc: Arc<S>, (): ()| async move { svc.simple_throws().await }),
        )
        .await?;

    endpoint
        .register(
            "date_test",
            invoker(
                |svc: Arc<S>, (dt, dto): (DateTime<Utc>, DateTime<FixedOffset>)| async move {
                    svc.date_test(dt, dto).await
                },
            ),
        )
        .await?;

    endpoint
        .register(
            "do_bar",
            unit_invoker(|svc: Arc<S>, (x,): (i32,)| async move { svc.do_bar(x).await }),
        )
        .await?;

    endpoint
        .register(
            "get_raw",
            raw_invoker(|svc: Arc<S>, (count,): (i32,)| async move { svc.get_raw(count).await }),
        )
        .await?;

    endpoint
        .register_generic("update", |types: &[TypeToken]| -> Option<Invoker<S>> {
            backend_type!(single(types)?, |T| unit_invoker(
                |svc: Arc<S>, (value,): (T,)| async move { svc.update::<T>(value).await }
            ))
        })
        .await?;

    endpoint
        .register_generic("get_from_db", |types: &[TypeToken]| -> Option<Invoker<S>> {
            backend_type!(single(types)?, |T| invoker(
                |svc: Arc<S>, (id,): (i32,)| async move { svc.get_from_db::<T>(id).await }
            ))
        })
        .await?;

    endpoint
        .register_generic("get_null", |types: &[TypeToken]| -> Option<Invoker<S>> {
            backend_type!(single(types)?, |T| invoker(|svc: Arc<S>, (): ()| async move {
                svc.get_null::<T>().await
            }))
        })
        .await?;

    endpoint
        .register_generic("nested", |types: &[TypeToken]| -> Option<Invoker<S>> {
            backend_type!(single(types)?, |T| invoker(|svc: Arc<S>, (): ()| async move {
                svc.nested::<T>().await
            }))
        })
        .await?;

    endpoint.verify().await
}
