use crate::BackendFlags;
use chrono::{DateTime, FixedOffset, Utc};
use magicproxy_service::{
    ContractError, MethodDescriptor, ReturnShape, ServiceContract, ServiceDescriptor,
    TypeDescriptor,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static BACKEND_CONTRACT: OnceCell<Arc<ServiceContract>> = OnceCell::new();

/// The [`Backend`](crate::Backend) interface as a method table.
pub fn backend_descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new("Backend")
        .with_flags::<BackendFlags>()
        .default_required(BackendFlags::all())
        .method(
            MethodDescriptor::new("client_update_required")
                .param::<i32>("version")
                .returns(ReturnShape::future::<bool>())
                .requires(BackendFlags::CLIENT_CERT_OK),
        )
        .method(
            MethodDescriptor::new("authenticate")
                .param::<String>("user")
                .param::<String>("password")
                .returns(ReturnShape::future::<bool>())
                .requires(BackendFlags::CLIENT_CERT_OK | BackendFlags::CLIENT_VERSION_OK)
                .authenticate(),
        )
        .method(MethodDescriptor::new("logout"))
        .method(
            MethodDescriptor::new("foo")
                .param::<i32>("x")
                .returns(ReturnShape::future::<f64>())
                .requires(BackendFlags::LOGGED_IN),
        )
        .method(MethodDescriptor::new("simple_action"))
        .method(MethodDescriptor::new("simple_throws"))
        .method(
            MethodDescriptor::new("date_test")
                .param::<DateTime<Utc>>("dt")
                .param::<DateTime<FixedOffset>>("dto")
                .returns(ReturnShape::future::<DateTime<FixedOffset>>()),
        )
        .method(MethodDescriptor::new("do_bar").param::<i32>("x"))
        .method(
            MethodDescriptor::new("get_raw")
                .param::<i32>("count")
                .returns(ReturnShape::future::<Vec<u8>>()),
        )
        .method(
            MethodDescriptor::new("update")
                .type_param("T")
                .generic_param("value", "T"),
        )
        .method(
            MethodDescriptor::new("get_from_db")
                .type_param("T")
                .param::<i32>("id")
                .returns(ReturnShape::future_generic("T")),
        )
        .method(
            MethodDescriptor::new("get_null")
                .type_param("T")
                .returns(ReturnShape::Future(TypeDescriptor::named("Option<T>"))),
        )
        .method(
            MethodDescriptor::new("nested")
                .type_param("T")
                .returns(ReturnShape::Future(TypeDescriptor::named("Vec<T>"))),
        )
}

/// The validated contract, built on first use and shared afterwards.
pub fn backend_contract() -> Result<Arc<ServiceContract>, ContractError> {
    BACKEND_CONTRACT
        .get_or_try_init(|| ServiceContract::build(backend_descriptor()).map(Arc::new))
        .cloned()
}
