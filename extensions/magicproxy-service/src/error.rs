use thiserror::Error;

/// A service interface that cannot be turned into a contract.
///
/// These are configuration errors, raised once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("{service} contains overloads: {method}")]
    DuplicateMethod { service: String, method: String },

    #[error("method {method} does not return a future")]
    NotAsync { method: String },

    #[error("{method} contains invalid by-reference/pointer parameters: {params}")]
    InvalidParameters { method: String, params: String },

    #[error("authenticate method {method}() must resolve to bool")]
    AuthenticateNotBool { method: String },

    #[error("method {method} requires flag bits {bits:#x} unknown to the flag type")]
    UnknownFlags { method: String, bits: u32 },

    #[error("method {method} uses undeclared type parameter {type_param}")]
    UndeclaredTypeParameter { method: String, type_param: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Type [{0}] could not be resolved")]
pub struct TypeResolutionError(pub String);

#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedded type names are refused so a payload cannot pick the type it
    /// is decoded into.
    #[error("embedded type name at {path} is not allowed")]
    EmbeddedTypeName { path: String },
}

/// A failure attributable to a single request.
///
/// The `Display` form is exactly what travels in the response error segment;
/// the connection stays open after any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Method [{0}] not found")]
    MethodNotFound(String),

    #[error("Method [{method}] is not allowed, state(s) missing: [{missing}]")]
    NotAuthorized { method: String, missing: String },

    #[error(transparent)]
    TypeResolution(#[from] TypeResolutionError),

    #[error("Impl Exception: {0}")]
    Implementation(String),

    #[error("Parse/Dispatch Exception {0}")]
    Parse(String),
}
