use crate::{
    Args, Binding, EndpointError, InvokeError, Invoker, MethodEntry, Reply, WithEntries,
};
use futures::FutureExt;
use magicproxy::message::Message;
use magicproxy_service::{
    ErrorDetail, MethodContract, RequestEnvelope, RequestError, RuntimeConfig, ServiceBackend,
    ServiceContract, TypeToken,
};
use serde_json::Value;
use std::any::Any;
use std::collections::hash_map::Entry;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The result of handling one request payload.
#[derive(Debug)]
pub struct Outcome {
    /// `None` when the payload was empty or not a valid envelope.
    pub method: Option<String>,
    pub result: Result<Vec<u8>, RequestError>,
    pub elapsed: Duration,
}

impl Outcome {
    /// The response message carrying this outcome and the given state word.
    pub fn into_message(self, state: u32) -> Message {
        match self.result {
            Ok(data) => Message::with_data(state, data),
            Err(err) => Message::with_error(state, &err.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait ServiceEndpointInterface<S>: Send + Sync
where
    S: ServiceBackend,
{
    type EntriesLock: WithEntries<S>;

    fn contract(&self) -> &ServiceContract;

    fn config(&self) -> &RuntimeConfig;

    fn get_entries(&self) -> Arc<Self::EntriesLock>;

    /// Binds a non-generic contract method to its invoker.
    async fn register(&self, method: &str, invoker: Invoker<S>) -> Result<(), EndpointError> {
        self.bind(method, Binding::Direct(invoker)).await
    }

    /// Binds a generic contract method to a builder that produces one
    /// invoker per combination of concrete type arguments.
    async fn register_generic<F>(&self, method: &str, builder: F) -> Result<(), EndpointError>
    where
        F: Fn(&[TypeToken]) -> Option<Invoker<S>> + Send + Sync + 'static,
    {
        self.bind(method, Binding::Generic(Arc::new(builder))).await
    }

    #[doc(hidden)]
    async fn bind(&self, method: &str, binding: Binding<S>) -> Result<(), EndpointError> {
        let contract = self
            .contract()
            .method(method)
            .cloned()
            .ok_or_else(|| EndpointError::UnknownMethod(method.to_string()))?;

        let mismatch = match (&binding, contract.is_generic()) {
            (Binding::Direct(_), true) => Some("is generic; register it with register_generic"),
            (Binding::Generic(_), false) => Some("is not generic; register it with register"),
            _ => None,
        };
        if let Some(reason) = mismatch {
            return Err(EndpointError::BindingMismatch {
                method: method.to_string(),
                reason,
            });
        }

        self.get_entries()
            .with_entries(|entries| match entries.entry(method.to_string()) {
                Entry::Occupied(_) => Err(EndpointError::AlreadyRegistered(method.to_string())),
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(MethodEntry::new(contract, binding)));
                    Ok(())
                }
            })
            .await
    }

    /// Fails unless every contract method has been registered.
    async fn verify(&self) -> Result<(), EndpointError> {
        let registered: Vec<String> = self
            .get_entries()
            .with_entries(|entries| entries.keys().cloned().collect())
            .await;

        let mut missing: Vec<String> = self
            .contract()
            .methods()
            .map(|m| m.name().to_string())
            .filter(|name| !registered.contains(name))
            .collect();
        missing.sort();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(EndpointError::Unregistered(missing))
        }
    }

    async fn method_entry(&self, method: &str) -> Option<Arc<MethodEntry<S>>> {
        self.get_entries()
            .with_entries(|entries| entries.get(method).cloned())
            .await
    }

    /// Checks the method's required flags against the connection state.
    fn authorize(&self, method: &MethodContract, state: u32) -> Result<(), RequestError> {
        let missing = method.missing_flags(state);
        if missing == 0 {
            Ok(())
        } else {
            Err(RequestError::NotAuthorized {
                method: method.name().to_string(),
                missing: self.contract().describe_flags(missing),
            })
        }
    }

    /// Resolves, authorizes and executes one request against `service`.
    ///
    /// Failures of any kind come back as a [`RequestError`]; nothing here
    /// affects later requests on the same connection.
    async fn dispatch(
        &self,
        service: &Arc<S>,
        request: RequestEnvelope,
    ) -> Result<Vec<u8>, RequestError> {
        let (method, type_args, args) = request.into_parts();

        {
            let contract = self
                .contract()
                .method(&method)
                .ok_or_else(|| RequestError::MethodNotFound(method.clone()))?;
            self.authorize(contract, service.connection_state())?;
        }

        let entry = self
            .method_entry(&method)
            .await
            .ok_or_else(|| RequestError::MethodNotFound(method.clone()))?;

        let config = self.config();
        let invoker = std::panic::catch_unwind(AssertUnwindSafe(|| {
            entry.resolve(&type_args, config)
        }))
        .unwrap_or_else(|panic| Err(RequestError::Parse(panic_error(panic).to_string())))?;
        let reply = invoke(invoker, service.clone(), args)
            .await
            .map_err(|err| render_invoke_error(err, config.error_detail))?;

        encode_reply(reply, config)
    }

    /// Decodes a raw request payload and dispatches it, timing the work.
    ///
    /// An empty payload yields an empty, successful outcome.
    async fn handle_request(&self, service: &Arc<S>, payload: &[u8]) -> Outcome {
        let started = Instant::now();
        if payload.is_empty() {
            return Outcome {
                method: None,
                result: Ok(Vec::new()),
                elapsed: started.elapsed(),
            };
        }

        let request = match RequestEnvelope::from_bytes(payload, &self.config().serializer) {
            Ok(request) => request,
            Err(err) => {
                return Outcome {
                    method: None,
                    result: Err(RequestError::Parse(err.to_string())),
                    elapsed: started.elapsed(),
                };
            }
        };

        let method = request.method().to_string();
        let result = self.dispatch(service, request).await;
        Outcome {
            method: Some(method),
            result,
            elapsed: started.elapsed(),
        }
    }
}

/// Runs an invoker, turning a panic in the method body into an
/// implementation error.
async fn invoke<S>(invoker: Invoker<S>, service: Arc<S>, args: Args) -> Result<Reply, InvokeError>
where
    S: Send + Sync + 'static,
{
    match std::panic::catch_unwind(AssertUnwindSafe(|| invoker(service, args))) {
        Ok(future) => AssertUnwindSafe(future)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(InvokeError::Implementation(panic_error(panic)))),
        Err(panic) => Err(InvokeError::Implementation(panic_error(panic))),
    }
}

fn panic_error(panic: Box<dyn Any + Send>) -> anyhow::Error {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("panicked: {message}")
}

fn render_invoke_error(err: InvokeError, detail: ErrorDetail) -> RequestError {
    match err {
        InvokeError::Implementation(err) => RequestError::Implementation(match detail {
            ErrorDetail::Full => format!("{err:?}"),
            ErrorDetail::Redacted => err.to_string(),
        }),
        other => RequestError::Parse(other.to_string()),
    }
}

fn encode_reply(reply: Reply, config: &RuntimeConfig) -> Result<Vec<u8>, RequestError> {
    let encoded = match reply {
        Reply::Raw(bytes) => return Ok(bytes),
        Reply::Unit => config.serializer.encode(&Value::Null),
        Reply::Value(value) => config.serializer.encode(&value),
    };
    encoded.map_err(|err| RequestError::Parse(err.to_string()))
}
