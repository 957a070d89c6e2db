use bitflags::bitflags;
use magicproxy_service::{
    MethodDescriptor, RequestEnvelope, ResponseEnvelope, ReturnShape, SerializerConfig,
    ServiceContract, ServiceDescriptor,
};
use magicproxy_service_caller::{CallerError, ServiceCallerInterface, call_args};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Flags: u32 {
        const LOGGED_IN = 1;
    }
}

fn contract() -> ServiceContract {
    ServiceContract::build(
        ServiceDescriptor::new("Calc")
            .with_flags::<Flags>()
            .method(
                MethodDescriptor::new("add")
                    .param::<i32>("a")
                    .param::<i32>("b")
                    .returns(ReturnShape::future::<i32>()),
            )
            .method(
                MethodDescriptor::new("secret")
                    .returns(ReturnShape::future::<String>())
                    .requires(Flags::LOGGED_IN),
            )
            .method(
                MethodDescriptor::new("blob")
                    .param::<i32>("len")
                    .returns(ReturnShape::future::<Vec<u8>>()),
            )
            .method(MethodDescriptor::new("reset")),
    )
    .unwrap()
}

/// Answers every request with a canned response and remembers what was sent.
struct ScriptedCaller {
    contract: ServiceContract,
    serializer: SerializerConfig,
    state: AtomicU32,
    response: ResponseEnvelope,
    sent: Mutex<Vec<RequestEnvelope>>,
}

impl ScriptedCaller {
    fn new(response: ResponseEnvelope) -> Self {
        Self {
            contract: contract(),
            serializer: SerializerConfig::default(),
            state: AtomicU32::new(0),
            response,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn ok(data: &[u8]) -> Self {
        Self::new(ResponseEnvelope {
            state: 0,
            error: None,
            data: data.to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl ServiceCallerInterface for ScriptedCaller {
    fn contract(&self) -> &ServiceContract {
        &self.contract
    }

    fn serializer(&self) -> &SerializerConfig {
        &self.serializer
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn connection_state(&self) -> u32 {
        self.state.load(Ordering::SeqCst)
    }

    async fn exchange(&self, request: Vec<u8>) -> Result<ResponseEnvelope, CallerError> {
        let envelope = RequestEnvelope::from_bytes(&request, &self.serializer)?;
        self.sent.lock().unwrap().push(envelope);
        self.state.store(self.response.state, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

async fn add(caller: &ScriptedCaller, a: i32, b: i32) -> Result<i32, CallerError> {
    caller.call_method("add", vec![], call_args!(a, b)).await
}

#[tokio::test]
async fn sends_envelope_and_decodes_result() {
    let caller = ScriptedCaller::ok(b"5");

    assert_eq!(add(&caller, 2, 3).await.unwrap(), 5);

    let sent = caller.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method(), "add");
    assert_eq!(sent[0].args(), [serde_json::json!(2), serde_json::json!(3)]);
}

#[tokio::test]
async fn remote_error_is_passed_through_verbatim() {
    let caller = ScriptedCaller::new(ResponseEnvelope {
        state: 0,
        error: Some("Impl Exception: boom".into()),
        data: Vec::new(),
    });

    let err = add(&caller, 1, 1).await.unwrap_err();
    assert_eq!(err.remote_message(), Some("Impl Exception: boom"));
    assert_eq!(err.to_string(), "Impl Exception: boom");
}

#[tokio::test]
async fn unmet_flags_fail_locally() {
    let caller = ScriptedCaller::ok(br#""hidden""#);

    let err = caller
        .call_method::<String>("secret", vec![], vec![])
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Method [secret] is not allowed, state(s) missing: [LOGGED_IN]"
    );
    assert!(caller.sent.lock().unwrap().is_empty());

    caller.state.store(Flags::LOGGED_IN.bits(), Ordering::SeqCst);
    let value: String = caller.call_method("secret", vec![], vec![]).await.unwrap();
    assert_eq!(value, "hidden");
}

#[tokio::test]
async fn raw_bytes_bypass_decoding() {
    let payload = vec![0x55, 0x00, 0xff, 0x66];
    let caller = ScriptedCaller::ok(&payload);

    let bytes = caller
        .call_method_raw("blob", vec![], vec![serde_json::json!(4)])
        .await
        .unwrap();
    assert_eq!(bytes, payload);

    let err = caller
        .call_method::<Vec<u8>>("blob", vec![], vec![serde_json::json!(4)])
        .await
        .unwrap_err();
    assert!(matches!(err, CallerError::Signature { .. }));
}

#[tokio::test]
async fn shape_mismatches_are_rejected_before_sending() {
    let caller = ScriptedCaller::ok(b"null");

    let arity = caller
        .call_method::<i32>("add", vec![], vec![serde_json::json!(1)])
        .await
        .unwrap_err();
    assert!(matches!(arity, CallerError::Signature { .. }));

    let unknown = caller.call_unit("nope", vec![], vec![]).await.unwrap_err();
    assert_eq!(unknown.to_string(), "Method [nope] not found");

    let type_args = caller
        .call_unit("reset", vec!["i32".into()], vec![])
        .await
        .unwrap_err();
    assert!(matches!(type_args, CallerError::Signature { .. }));

    assert!(caller.sent.lock().unwrap().is_empty());

    caller.call_unit("reset", vec![], vec![]).await.unwrap();
    assert_eq!(caller.sent.lock().unwrap().len(), 1);
}
