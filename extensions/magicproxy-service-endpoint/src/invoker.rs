use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Positional arguments as decoded from the request envelope.
pub type Args = Vec<Value>;

pub type InvokeFuture = Pin<Box<dyn Future<Output = Result<Reply, InvokeError>> + Send>>;

/// A method call bound to concrete parameter and result types.
pub type Invoker<S> = Arc<dyn Fn(Arc<S>, Args) -> InvokeFuture + Send + Sync>;

/// What an invoked method produced, before wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(Value),
    /// Returned to the caller without structured encoding.
    Raw(Vec<u8>),
    Unit,
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("expected {expected} argument(s), got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("argument {index} could not be decoded: {source}")]
    Argument {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("result could not be encoded: {0}")]
    Result(#[source] serde_json::Error),

    /// The method body failed (or panicked).
    #[error("{0}")]
    Implementation(anyhow::Error),
}

/// Statically typed parameter lists, decoded from positional arguments.
pub trait FromArgs: Sized + Send + 'static {
    fn from_args(args: Args) -> Result<Self, InvokeError>;
}

fn check_arity(args: &Args, expected: usize) -> Result<(), InvokeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(InvokeError::ArgumentCount {
            expected,
            actual: args.len(),
        })
    }
}

fn decode_arg<T: DeserializeOwned>(index: usize, value: Option<Value>) -> Result<T, InvokeError> {
    serde_json::from_value(value.unwrap_or(Value::Null))
        .map_err(|source| InvokeError::Argument { index, source })
}

impl FromArgs for () {
    fn from_args(args: Args) -> Result<Self, InvokeError> {
        check_arity(&args, 0)
    }
}

macro_rules! impl_from_args {
    ($arity:expr; $($ty:ident : $index:tt),+) => {
        impl<$($ty),+> FromArgs for ($($ty,)+)
        where
            $($ty: DeserializeOwned + Send + 'static),+
        {
            fn from_args(args: Args) -> Result<Self, InvokeError> {
                check_arity(&args, $arity)?;
                let mut values = args.into_iter();
                Ok(($(decode_arg::<$ty>($index, values.next())?,)+))
            }
        }
    };
}

impl_from_args!(1; A: 0);
impl_from_args!(2; A: 0, B: 1);
impl_from_args!(3; A: 0, B: 1, C: 2);
impl_from_args!(4; A: 0, B: 1, C: 2, D: 3);
impl_from_args!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_from_args!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Builds an invoker for a method with a structured result.
///
/// Arguments are decoded before the method is called; a decoding failure
/// never reaches the implementation.
pub fn invoker<S, A, R, F, Fut>(method: F) -> Invoker<S>
where
    S: Send + Sync + 'static,
    A: FromArgs,
    R: Serialize + Send + 'static,
    F: Fn(Arc<S>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
{
    Arc::new(move |service: Arc<S>, args: Args| -> InvokeFuture {
        let call = A::from_args(args).map(|args| method(service, args));
        Box::pin(async move {
            let value = call?.await.map_err(InvokeError::Implementation)?;
            let value = serde_json::to_value(&value).map_err(InvokeError::Result)?;
            Ok(Reply::Value(value))
        })
    })
}

/// Builds an invoker for a method whose result is a raw byte sequence.
pub fn raw_invoker<S, A, F, Fut>(method: F) -> Invoker<S>
where
    S: Send + Sync + 'static,
    A: FromArgs,
    F: Fn(Arc<S>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<u8>>> + Send + 'static,
{
    Arc::new(move |service: Arc<S>, args: Args| -> InvokeFuture {
        let call = A::from_args(args).map(|args| method(service, args));
        Box::pin(async move {
            let bytes = call?.await.map_err(InvokeError::Implementation)?;
            Ok(Reply::Raw(bytes))
        })
    })
}

/// Builds an invoker for a method that resolves to nothing.
pub fn unit_invoker<S, A, F, Fut>(method: F) -> Invoker<S>
where
    S: Send + Sync + 'static,
    A: FromArgs,
    F: Fn(Arc<S>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |service: Arc<S>, args: Args| -> InvokeFuture {
        let call = A::from_args(args).map(|args| method(service, args));
        Box::pin(async move {
            call?.await.map_err(InvokeError::Implementation)?;
            Ok(Reply::Unit)
        })
    })
}

/// Picks the monomorphized instantiation matching a runtime type token.
///
/// Each listed type is tried in turn; inside `body` the chosen type is
/// available under the alias. Evaluates to `None` when no listed type
/// matches.
///
/// ```ignore
/// endpoint.register_generic("get_from_db", |types| {
///     let [t] = types else { return None };
///     select_type!(*t, |T| invoker(move |svc: Arc<Svc>, (id,): (i32,)| async move {
///         svc.get_from_db::<T>(id).await
///     }), [i32, String, Person])
/// }).await?;
/// ```
#[macro_export]
macro_rules! select_type {
    ($token:expr, |$alias:ident| $body:expr, [$($ty:ty),+ $(,)?]) => {{
        let token: $crate::TypeToken = $token;
        let mut selected = None;
        $(
            if selected.is_none() && token.is::<$ty>() {
                #[allow(dead_code)]
                type $alias = $ty;
                selected = Some($body);
            }
        )+
        selected
    }};
}
