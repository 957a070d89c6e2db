use crate::Invoker;
use magicproxy_service::{MethodContract, RequestError, RuntimeConfig, TypeToken};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Produces the invoker for one combination of concrete type arguments, or
/// `None` when the combination is not supported.
pub type GenericBuilder<S> = Arc<dyn Fn(&[TypeToken]) -> Option<Invoker<S>> + Send + Sync>;

pub enum Binding<S> {
    Direct(Invoker<S>),
    Generic(GenericBuilder<S>),
}

/// A contract method together with its implementation.
///
/// Generic methods keep one invoker per ordered list of type-argument names.
/// The cache is append-only; lookup and insertion happen under one lock, so
/// each combination is built exactly once per endpoint.
pub struct MethodEntry<S> {
    contract: MethodContract,
    binding: Binding<S>,
    instantiations: Mutex<HashMap<Vec<String>, Invoker<S>>>,
    builds: AtomicUsize,
}

impl<S> MethodEntry<S> {
    pub fn new(contract: MethodContract, binding: Binding<S>) -> Self {
        Self {
            contract,
            binding,
            instantiations: Mutex::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn contract(&self) -> &MethodContract {
        &self.contract
    }

    /// Returns the invoker for `type_args`, building and caching it on first
    /// use of a generic combination.
    pub fn resolve(
        &self,
        type_args: &[String],
        config: &RuntimeConfig,
    ) -> Result<Invoker<S>, RequestError> {
        let name = self.contract.name();
        let expected = self.contract.type_params().len();
        if type_args.len() != expected {
            return Err(RequestError::Parse(format!(
                "method [{name}] takes {expected} type argument(s), {} given",
                type_args.len()
            )));
        }

        let builder = match &self.binding {
            Binding::Direct(invoker) => return Ok(invoker.clone()),
            Binding::Generic(builder) => builder,
        };

        let mut cache = self
            .instantiations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(invoker) = cache.get(type_args) {
            return Ok(invoker.clone());
        }

        let tokens = type_args
            .iter()
            .map(|type_arg| config.resolve_type(type_arg))
            .collect::<Result<Vec<_>, _>>()?;

        let invoker = builder(&tokens).ok_or_else(|| {
            RequestError::Parse(format!(
                "method [{name}] has no instantiation for [{}]",
                type_args.join(", ")
            ))
        })?;

        self.builds.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("built {}<{}>", name, type_args.join(", "));
        cache.insert(type_args.to_vec(), invoker.clone());
        Ok(invoker)
    }

    /// How many generic instantiations have been built so far.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn instantiation_count(&self) -> usize {
        self.instantiations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
