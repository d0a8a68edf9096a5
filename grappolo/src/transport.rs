//! Defines the interfaces that [`ManagedChannel`](crate::ManagedChannel) requires in order
//! to establish and drive a transport to a remote [`Endpoint`](crate::Endpoint).

use crate::Endpoint;

/// Interface that provides functionality to issue a single
/// request/response exchange over an established transport.
///
/// The request and response types are opaque to the channel: they are
/// pre-serialized payloads or schema-typed objects produced by an external
/// code generator.
///
/// Implementations must be safe to share across concurrent calls; the
/// channel never serializes access to the transport.
#[async_trait::async_trait]
pub trait UnaryTransport: Send + Sync + 'static {
    /// The request message consumed by a single exchange.
    type Request: Send + 'static;
    /// The response message produced by the remote peer.
    type Response: Send + 'static;

    /// Send `request` to the remote peer and wait for its response.
    ///
    /// Deadlines and cancellation are enforced by the caller; implementations
    /// must abort the in-flight exchange when the returned future is dropped.
    async fn call_unary(&self, request: Self::Request) -> Result<Self::Response, anyhow::Error>;
}

/// Interface that provides functionality to establish a live
/// [`UnaryTransport`] to a given [`Endpoint`](crate::Endpoint).
///
/// The channel invokes this lazily, on the first call issued after creation,
/// and bounds the attempt with its configured connect timeout.
#[async_trait::async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    /// The transport produced on a successful connection attempt.
    type Transport: UnaryTransport;

    /// Establish a transport to `endpoint`.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Transport, anyhow::Error>;
}
