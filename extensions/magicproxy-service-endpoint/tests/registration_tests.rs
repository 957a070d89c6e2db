mod common;

use common::{Counter, contract};
use magicproxy_service::RuntimeConfig;
use magicproxy_service_endpoint::{
    EndpointError, ServiceEndpoint, ServiceEndpointInterface, invoker, unit_invoker,
};
use std::sync::Arc;

fn empty_endpoint() -> ServiceEndpoint<Counter> {
    ServiceEndpoint::new(contract(), Arc::new(RuntimeConfig::default()))
}

#[tokio::test]
async fn rejects_methods_outside_the_contract() {
    let endpoint = empty_endpoint();

    let result = endpoint
        .register(
            "bogus",
            unit_invoker(|_svc: Arc<Counter>, (): ()| async move { anyhow::Ok(()) }),
        )
        .await;

    assert_eq!(result, Err(EndpointError::UnknownMethod("bogus".into())));
}

#[tokio::test]
async fn rejects_duplicate_registration() {
    let endpoint = empty_endpoint();
    let fail = || unit_invoker(|_svc: Arc<Counter>, (): ()| async move { anyhow::Ok(()) });

    endpoint.register("fail", fail()).await.unwrap();
    let result = endpoint.register("fail", fail()).await;

    assert_eq!(result, Err(EndpointError::AlreadyRegistered("fail".into())));
}

#[tokio::test]
async fn generic_and_plain_bindings_are_not_interchangeable() {
    let endpoint = empty_endpoint();

    let plain_for_generic = endpoint
        .register(
            "echo",
            invoker(|_svc: Arc<Counter>, (v,): (i32,)| async move { anyhow::Ok(v) }),
        )
        .await;
    assert!(matches!(
        plain_for_generic,
        Err(EndpointError::BindingMismatch { .. })
    ));

    let generic_for_plain = endpoint.register_generic("fail", |_| None).await;
    assert!(matches!(
        generic_for_plain,
        Err(EndpointError::BindingMismatch { .. })
    ));
}

#[tokio::test]
async fn verify_lists_unregistered_methods() {
    let endpoint = empty_endpoint();
    endpoint
        .register(
            "fail",
            unit_invoker(|_svc: Arc<Counter>, (): ()| async move { anyhow::Ok(()) }),
        )
        .await
        .unwrap();

    let err = endpoint.verify().await.unwrap_err();
    assert_eq!(
        err,
        EndpointError::Unregistered(vec![
            "blob".into(),
            "double".into(),
            "echo".into(),
            "explode".into(),
            "login".into(),
            "toggle".into(),
        ])
    );
}
