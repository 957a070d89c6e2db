#![allow(dead_code)]

use bitflags::bitflags;
use magicproxy_service::{
    MethodDescriptor, ReturnShape, RuntimeConfig, ServiceBackend, ServiceContract,
    ServiceDescriptor, TypeToken,
};
use magicproxy_service_endpoint::{
    ServiceEndpoint, ServiceEndpointInterface, invoker, raw_invoker, select_type, unit_invoker,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        const APPROVED = 1;
        const LOGGED_IN = 2;
        const TOGGLED = 4;
    }
}

/// A service that counts how often its guarded method actually ran, and
/// how many `toggle` calls were ever running at once.
#[derive(Default)]
pub struct Counter {
    pub state: AtomicU32,
    pub doubled: AtomicUsize,
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
    pub decline: bool,
}

#[async_trait::async_trait]
impl ServiceBackend for Counter {
    fn connection_state(&self) -> u32 {
        self.state.load(Ordering::SeqCst)
    }

    async fn approve_connection(&self) -> Option<String> {
        if self.decline {
            return Some("not today".to_string());
        }
        self.state
            .fetch_or(Flags::APPROVED.bits(), Ordering::SeqCst);
        None
    }
}

pub fn contract() -> Arc<ServiceContract> {
    Arc::new(
        ServiceContract::build(
            ServiceDescriptor::new("Counter")
                .with_flags::<Flags>()
                .default_required(Flags::empty())
                .method(
                    MethodDescriptor::new("login")
                        .param::<String>("user")
                        .returns(ReturnShape::future::<bool>())
                        .authenticate(),
                )
                .method(
                    MethodDescriptor::new("double")
                        .param::<i32>("x")
                        .returns(ReturnShape::future::<i32>())
                        .requires(Flags::LOGGED_IN),
                )
                .method(
                    MethodDescriptor::new("toggle")
                        .param::<bool>("flip")
                        .returns(ReturnShape::future::<u32>()),
                )
                .method(MethodDescriptor::new("fail"))
                .method(MethodDescriptor::new("explode").param::<i32>("code"))
                .method(
                    MethodDescriptor::new("blob")
                        .param::<i32>("len")
                        .returns(ReturnShape::future::<Vec<u8>>()),
                )
                .method(
                    MethodDescriptor::new("echo")
                        .type_param("T")
                        .generic_param("value", "T")
                        .returns(ReturnShape::future_generic("T")),
                ),
        )
        .unwrap(),
    )
}

pub async fn endpoint(config: RuntimeConfig) -> Arc<ServiceEndpoint<Counter>> {
    let endpoint = ServiceEndpoint::new(contract(), Arc::new(config));

    endpoint
        .register(
            "login",
            invoker(|svc: Arc<Counter>, (user,): (String,)| async move {
                let ok = user == "admin";
                if ok {
                    svc.state
                        .fetch_or(Flags::LOGGED_IN.bits(), Ordering::SeqCst);
                }
                anyhow::Ok(ok)
            }),
        )
        .await
        .unwrap();

    endpoint
        .register(
            "double",
            invoker(|svc: Arc<Counter>, (x,): (i32,)| async move {
                svc.doubled.fetch_add(1, Ordering::SeqCst);
                anyhow::Ok(x * 2)
            }),
        )
        .await
        .unwrap();

    endpoint
        .register(
            "toggle",
            invoker(|svc: Arc<Counter>, (flip,): (bool,)| async move {
                let running = svc.running.fetch_add(1, Ordering::SeqCst) + 1;
                svc.peak.fetch_max(running, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                if flip {
                    svc.state.fetch_xor(Flags::TOGGLED.bits(), Ordering::SeqCst);
                }
                svc.running.fetch_sub(1, Ordering::SeqCst);
                anyhow::Ok(svc.state.load(Ordering::SeqCst))
            }),
        )
        .await
        .unwrap();

    endpoint
        .register(
            "fail",
            unit_invoker(|_svc: Arc<Counter>, (): ()| async move {
                Err::<(), _>(anyhow::anyhow!("disk on fire").context("server side failure!"))
            }),
        )
        .await
        .unwrap();

    endpoint
        .register(
            "explode",
            unit_invoker(|_svc: Arc<Counter>, (code,): (i32,)| async move {
                if code != 0 {
                    panic!("kaboom {code}");
                }
                anyhow::Ok(())
            }),
        )
        .await
        .unwrap();

    endpoint
        .register(
            "blob",
            raw_invoker(|_svc: Arc<Counter>, (len,): (i32,)| async move {
                anyhow::Ok(vec![0xABu8; len.max(0) as usize])
            }),
        )
        .await
        .unwrap();

    endpoint
        .register_generic("echo", |types: &[TypeToken]| {
            let [t] = types else { return None };
            select_type!(
                *t,
                |T| invoker(|_svc: Arc<Counter>, (value,): (T,)| async move { anyhow::Ok(value) }),
                [i32, String, Vec<u32>]
            )
        })
        .await
        .unwrap();

    endpoint.verify().await.unwrap();
    Arc::new(endpoint)
}
