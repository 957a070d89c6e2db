use crate::CallerError;
use magicproxy_service::{
    MethodContract, RequestEnvelope, ResponseEnvelope, SerializerConfig, ServiceContract,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Encodes one positional argument.
pub fn to_arg<T: Serialize + ?Sized>(value: &T) -> Result<Value, CallerError> {
    Ok(serde_json::to_value(value)?)
}

/// The capability of making calls against a service contract.
///
/// Anything that can move one request to a server and hand back its
/// response (a network client, or an in-process mock) implements the
/// required methods and gains the typed call paths.
#[async_trait::async_trait]
pub trait ServiceCallerInterface: Send + Sync {
    // --- METHODS TO BE IMPLEMENTED BY THE STRUCT ---

    fn contract(&self) -> &ServiceContract;

    fn serializer(&self) -> &SerializerConfig;

    fn is_connected(&self) -> bool;

    /// The state word carried by the most recent message from the server.
    fn connection_state(&self) -> u32;

    /// Sends one encoded request envelope and waits for its response.
    ///
    /// Implementations must not let two exchanges overlap on one connection.
    async fn exchange(&self, request: Vec<u8>) -> Result<ResponseEnvelope, CallerError>;

    // --- METHODS PROVIDED AUTOMATICALLY BY THE TRAIT ---

    /// Looks the method up and checks its requirement against the last known
    /// connection state.
    fn check_required_flags(&self, method: &str) -> Result<&MethodContract, CallerError> {
        let contract = self.contract();
        let entry = contract
            .method(method)
            .ok_or_else(|| CallerError::UnknownMethod(method.to_string()))?;

        let missing = entry.missing_flags(self.connection_state());
        if missing != 0 {
            return Err(CallerError::NotAuthorized {
                method: method.to_string(),
                missing: contract.describe_flags(missing),
            });
        }
        Ok(entry)
    }

    /// Sends `[method, type_args, args]` and returns the raw response payload.
    async fn call_envelope(
        &self,
        method: &str,
        type_args: Vec<String>,
        args: Vec<Value>,
    ) -> Result<Vec<u8>, CallerError> {
        if !self.is_connected() {
            return Err(CallerError::NotConnected);
        }

        {
            let entry = self.check_required_flags(method)?;
            if args.len() != entry.arity() {
                return Err(CallerError::Signature {
                    method: method.to_string(),
                    reason: format!(
                        "takes {} argument(s), {} given",
                        entry.arity(),
                        args.len()
                    ),
                });
            }
            if type_args.len() != entry.type_params().len() {
                return Err(CallerError::Signature {
                    method: method.to_string(),
                    reason: format!(
                        "takes {} type argument(s), {} given",
                        entry.type_params().len(),
                        type_args.len()
                    ),
                });
            }
        }

        let request = RequestEnvelope::new(method, type_args, args).to_bytes(self.serializer())?;
        let response = self.exchange(request).await?;
        response.into_result().map_err(CallerError::Remote)
    }

    /// Calls a method with a structured result and decodes it as `R`.
    async fn call_method<R>(
        &self,
        method: &str,
        type_args: Vec<String>,
        args: Vec<Value>,
    ) -> Result<R, CallerError>
    where
        R: DeserializeOwned + Send,
    {
        self.expect_return(method, |entry| !entry.returns().is_raw_bytes(), "returns raw bytes")?;

        let bytes = self.call_envelope(method, type_args, args).await?;
        Ok(self.serializer().decode(&bytes)?)
    }

    /// Calls a method declared to return raw bytes; the payload is returned
    /// exactly as received.
    async fn call_method_raw(
        &self,
        method: &str,
        type_args: Vec<String>,
        args: Vec<Value>,
    ) -> Result<Vec<u8>, CallerError> {
        self.expect_return(
            method,
            |entry| entry.returns().is_raw_bytes(),
            "does not return raw bytes",
        )?;

        self.call_envelope(method, type_args, args).await
    }

    /// Calls a method that resolves to nothing.
    async fn call_unit(
        &self,
        method: &str,
        type_args: Vec<String>,
        args: Vec<Value>,
    ) -> Result<(), CallerError> {
        self.expect_return(method, |entry| entry.returns().is_unit(), "returns a value")?;

        self.call_envelope(method, type_args, args).await?;
        Ok(())
    }

    #[doc(hidden)]
    fn expect_return(
        &self,
        method: &str,
        accepts: fn(&MethodContract) -> bool,
        reason: &str,
    ) -> Result<(), CallerError> {
        match self.contract().method(method) {
            Some(entry) if !accepts(entry) => Err(CallerError::Signature {
                method: method.to_string(),
                reason: reason.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
