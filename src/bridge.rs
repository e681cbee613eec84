use crate::error::Error;
use crate::future::Future;
use crate::sample::Sample;

/// Distinguishes a Service Module's backend without leaking backend-specific detail into the
/// consumer/provider surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceBackendKind {
    /// Samples and operation calls stay inside this process; dispatch is synchronous.
    InProcess,
    /// Samples and operation calls cross an external bus; dispatch may complete asynchronously.
    Wire,
}

/// The contract a data element's backend must satisfy regardless of transport.
///
/// [`crate::service::DataElement`] is the in-process realization of the consumer-facing half of
/// this contract. A wire-backed realization — serializing published values onto an external bus
/// and deserializing inbound samples into the same cache shape — is a separate adapter crate's
/// concern; this trait is the seam that keeps a Service Module's generated code identical on both
/// sides of that choice.
pub trait DataElementBridge<T>: Send + Sync {
    fn backend_kind(&self) -> ServiceBackendKind;

    fn publish(&self, value: &T)
    where
        T: Clone;

    fn current(&self) -> Result<Sample<T>, Error>;
}

/// The contract an operation's backend must satisfy regardless of transport.
///
/// For [`ServiceBackendKind::InProcess`] the returned future is already resolved by the time
/// `call` returns. For [`ServiceBackendKind::Wire`] it resolves later, when the remote reply (or a
/// transport failure) arrives on a callback thread. Consumers observe no difference beyond that
/// timing.
pub trait OperationBridge<Req, Resp>: Send + Sync {
    fn backend_kind(&self) -> ServiceBackendKind;

    fn call(&self, request: Req) -> Future<Resp>;
}
