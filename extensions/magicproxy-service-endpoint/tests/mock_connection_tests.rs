mod common;

use common::{Counter, Flags, endpoint};
use magicproxy_service::RuntimeConfig;
use magicproxy_service_caller::{CallerError, ServiceCallerInterface, call_args};
use magicproxy_service_endpoint::MockConnection;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn double(conn: &MockConnection<Counter>, x: i32) -> Result<i32, CallerError> {
    conn.call_method("double", vec![], call_args!(x)).await
}

#[tokio::test]
async fn calls_fail_until_connected() {
    let conn = MockConnection::new(
        endpoint(RuntimeConfig::default()).await,
        Arc::new(Counter::default()),
    );

    let err = double(&conn, 1).await.unwrap_err();
    assert!(matches!(err, CallerError::NotConnected));
    assert_eq!(err.to_string(), "Proxy not connected");
}

#[tokio::test]
async fn declined_connection_reports_reason() {
    let service = Counter {
        decline: true,
        ..Counter::default()
    };
    let conn = MockConnection::new(endpoint(RuntimeConfig::default()).await, Arc::new(service));

    let err = conn.connect().await.unwrap_err();
    assert!(matches!(err, CallerError::Declined(ref reason) if reason == "not today"));
    assert!(!conn.is_connected());
}

#[tokio::test]
async fn login_flow_updates_client_state() -> Result<(), CallerError> {
    // 1. --- SETUP ---
    let conn = MockConnection::new(
        endpoint(RuntimeConfig::default()).await,
        Arc::new(Counter::default()),
    );
    conn.connect().await.unwrap();
    assert_eq!(conn.connection_state(), Flags::APPROVED.bits());

    // 2. --- EXECUTION: Pre-check fails locally ---
    let err = double(&conn, 2).await.unwrap_err();
    assert!(matches!(err, CallerError::NotAuthorized { .. }));
    assert_eq!(conn.service().doubled.load(Ordering::SeqCst), 0);

    // 3. --- EXECUTION: Login pushes the new state back ---
    let ok: bool = conn
        .call_method("login", vec![], call_args!("admin"))
        .await
        .unwrap();
    assert!(ok);
    assert_eq!(
        conn.connection_state(),
        (Flags::APPROVED | Flags::LOGGED_IN).bits()
    );

    // 4. --- ASSERTION ---
    assert_eq!(double(&conn, 21).await.unwrap(), 42);
    assert_eq!(conn.service().doubled.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn remote_failure_does_not_break_the_connection() -> Result<(), CallerError> {
    let conn = MockConnection::new(
        endpoint(RuntimeConfig::default()).await,
        Arc::new(Counter::default()),
    );
    conn.connect().await.unwrap();

    let err = conn.call_unit("fail", vec![], vec![]).await.unwrap_err();
    let message = err.remote_message().unwrap();
    assert!(message.starts_with("Impl Exception: server side failure!"));

    let bytes = conn
        .call_method_raw("blob", vec![], call_args!(2))
        .await
        .unwrap();
    assert_eq!(bytes, vec![0xAB, 0xAB]);
    Ok(())
}

#[tokio::test]
async fn sniffer_sees_every_exchange() -> Result<(), CallerError> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let conn = {
        let seen = seen.clone();
        MockConnection::new(
            endpoint(RuntimeConfig::default()).await,
            Arc::new(Counter::default()),
        )
        .with_wire_sniffer(move |request, error, response| {
            seen.lock().unwrap().push((
                String::from_utf8(request.to_vec()).unwrap(),
                error.map(str::to_string),
                response.to_vec(),
            ));
        })
    };
    conn.connect().await.unwrap();

    let _: bool = conn
        .call_method("login", vec![], call_args!("x"))
        .await
        .unwrap();
    conn.call_unit("fail", vec![], vec![]).await.unwrap_err();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, r#"["login",[],["x"]]"#);
    assert_eq!(seen[0].1, None);
    assert_eq!(seen[0].2, b"false");
    assert!(seen[1].1.as_deref().unwrap().starts_with("Impl Exception"));
    assert!(seen[1].2.is_empty());
    Ok(())
}

#[tokio::test]
async fn oversized_requests_are_refused() -> Result<(), CallerError> {
    let conn = MockConnection::new(
        endpoint(RuntimeConfig::default().with_max_message_size(16)).await,
        Arc::new(Counter::default()),
    );
    conn.connect().await.unwrap();

    let err = conn
        .call_method::<bool>("login", vec![], call_args!("a-rather-long-user-name"))
        .await
        .unwrap_err();
    assert!(matches!(err, CallerError::Message(_)));
    Ok(())
}

#[tokio::test]
async fn concurrent_callers_are_serialized() -> Result<(), CallerError> {
    // 1. --- SETUP: Slow connection, logged in ---
    let conn = Arc::new(
        MockConnection::new(
            endpoint(RuntimeConfig::default()).await,
            Arc::new(Counter::default()),
        )
        .with_request_delay(Duration::from_millis(5)),
    );
    let transitions = Arc::new(Mutex::new(Vec::new()));
    {
        let transitions = transitions.clone();
        conn.set_busy_handler(move |busy| transitions.lock().unwrap().push(busy));
    }
    conn.connect().await.unwrap();
    let _: bool = conn
        .call_method("login", vec![], call_args!("admin"))
        .await
        .unwrap();
    transitions.lock().unwrap().clear();

    // 2. --- EXECUTION: Many callers at once ---
    let mut tasks = Vec::new();
    for i in 0..10 {
        let conn = conn.clone();
        tasks.push(tokio::spawn(async move { double(&conn, i).await }));
    }
    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap().unwrap());
    }

    // 3. --- ASSERTION ---
    results.sort();
    assert_eq!(results, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    assert_eq!(conn.service().doubled.load(Ordering::SeqCst), 10);
    assert!(!conn.is_busy());
    let transitions = transitions.lock().unwrap();
    assert_eq!(transitions.first(), Some(&true));
    assert_eq!(transitions.last(), Some(&false));
    Ok(())
}

#[tokio::test]
async fn overlapping_callers_run_one_at_a_time_and_keep_the_last_state() {
    // 1. --- SETUP ---
    const N: usize = 12;
    let conn = Arc::new(MockConnection::new(
        endpoint(RuntimeConfig::default()).await,
        Arc::new(Counter::default()),
    ));
    conn.connect().await.unwrap();
    let completed = Arc::new(Mutex::new(Vec::new()));

    // 2. --- EXECUTION: Five callers flip a flag, all record the state they got back ---
    let mut tasks = Vec::new();
    for i in 0..N {
        let conn = conn.clone();
        let completed = completed.clone();
        tasks.push(tokio::spawn(async move {
            let state: u32 = conn.call_method("toggle", vec![], call_args!(i < 5)).await?;
            completed.lock().unwrap().push(state);
            Ok::<_, CallerError>(())
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // 3. --- ASSERTION ---
    assert_eq!(conn.service().peak.load(Ordering::SeqCst), 1);
    let completed = completed.lock().unwrap();
    assert_eq!(completed.len(), N);
    assert_eq!(Some(&conn.connection_state()), completed.last());
    assert_eq!(
        conn.connection_state(),
        (Flags::APPROVED | Flags::TOGGLED).bits()
    );
}
