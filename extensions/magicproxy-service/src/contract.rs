use crate::{
    ContractError,
    descriptor::{
        MethodDescriptor, MethodKind, ParamDescriptor, ReturnShape, ServiceDescriptor, TypeShape,
    },
};
use std::collections::{HashMap, HashSet};

/// Validated, immutable metadata for one service method.
#[derive(Debug, Clone)]
pub struct MethodContract {
    name: String,
    params: Vec<ParamDescriptor>,
    type_params: Vec<&'static str>,
    returns: ReturnShape,
    required_flags: u32,
    kind: MethodKind,
}

impl MethodContract {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn type_params(&self) -> &[&'static str] {
        &self.type_params
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn returns(&self) -> &ReturnShape {
        &self.returns
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// The resolved requirement: the method's own annotation, else the
    /// interface default, else `0` (unrestricted).
    pub fn required_flags(&self) -> u32 {
        self.required_flags
    }

    /// Bits required by this method that `state` does not have.
    pub fn missing_flags(&self, state: u32) -> u32 {
        self.required_flags & !state
    }
}

/// The method table of a service interface.
///
/// Built once per interface with [`ServiceContract::build`] and shared
/// read-only afterwards (typically behind an `Arc`).
#[derive(Debug)]
pub struct ServiceContract {
    name: String,
    methods: HashMap<String, MethodContract>,
    known_flags: u32,
    describe_flags: fn(u32) -> String,
}

impl ServiceContract {
    /// Validates `descriptor` and produces the method table.
    ///
    /// Checks run in this order, each over every method before the next
    /// begins:
    ///
    /// 1. No two methods share a name.
    /// 2. Every method returns a future (and authenticate methods resolve to `bool`).
    /// 3. No parameter is a reference or raw pointer.
    ///
    /// Afterwards, generic placeholders must name a declared type parameter
    /// and required masks may only use bits the flag type defines.
    ///
    /// # Errors
    ///
    /// The first violation found, naming the offending method.
    pub fn build(descriptor: ServiceDescriptor) -> Result<Self, ContractError> {
        let ServiceDescriptor {
            name,
            default_required,
            known_flags,
            describe_flags,
            methods,
        } = descriptor;

        check_unique_names(&name, &methods)?;

        for method in &methods {
            if !method.returns.is_future() {
                return Err(ContractError::NotAsync {
                    method: method.name.clone(),
                });
            }
            if method.kind == MethodKind::Authenticate
                && !method.returns.element().is_some_and(|ty| ty.is_bool())
            {
                return Err(ContractError::AuthenticateNotBool {
                    method: method.name.clone(),
                });
            }
        }

        for method in &methods {
            let invalid: Vec<String> = method
                .params
                .iter()
                .filter(|p| p.ty.is_by_reference())
                .map(|p| format!("{} {}", p.ty.name(), p.name))
                .collect();
            if !invalid.is_empty() {
                return Err(ContractError::InvalidParameters {
                    method: method.name.clone(),
                    params: invalid.join(", "),
                });
            }
        }

        let mut table = HashMap::with_capacity(methods.len());
        for method in methods {
            check_type_params(&method)?;

            let required_flags = method.required_flags.or(default_required).unwrap_or(0);
            let unknown = required_flags & !known_flags;
            if unknown != 0 {
                return Err(ContractError::UnknownFlags {
                    method: method.name,
                    bits: unknown,
                });
            }

            table.insert(
                method.name.clone(),
                MethodContract {
                    name: method.name,
                    params: method.params,
                    type_params: method.type_params,
                    returns: method.returns,
                    required_flags,
                    kind: method.kind,
                },
            );
        }

        Ok(Self {
            name,
            methods: table,
            known_flags,
            describe_flags,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&MethodContract> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodContract> {
        self.methods.values()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn known_flags(&self) -> u32 {
        self.known_flags
    }

    /// Renders a flag mask with the interface's flag names.
    pub fn describe_flags(&self, bits: u32) -> String {
        (self.describe_flags)(bits)
    }
}

fn check_unique_names(service: &str, methods: &[MethodDescriptor]) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    let mut overloads: Vec<&str> = Vec::new();
    for method in methods {
        if !seen.insert(method.name.as_str()) && !overloads.contains(&method.name.as_str()) {
            overloads.push(&method.name);
        }
    }

    if overloads.is_empty() {
        Ok(())
    } else {
        Err(ContractError::DuplicateMethod {
            service: service.to_string(),
            method: overloads.join(", "),
        })
    }
}

fn check_type_params(method: &MethodDescriptor) -> Result<(), ContractError> {
    let used = method
        .params
        .iter()
        .map(|p| p.ty)
        .chain(method.returns.element().copied())
        .filter(|ty| ty.shape() == TypeShape::Generic);

    for ty in used {
        if !method.type_params.contains(&ty.name()) {
            return Err(ContractError::UndeclaredTypeParameter {
                method: method.name.clone(),
                type_param: ty.name().to_string(),
            });
        }
    }
    Ok(())
}
