//! Implements [`TransportConnector`] and [`UnaryTransport`] for gRPC via
//! tonic.
//!
//! Requests carry a `/package.Service/Method` path and a pre-serialized
//! payload; framing, compression and HTTP/2 multiplexing stay inside tonic.

use crate::{Endpoint, TransportConnector, UnaryTransport};
use anyhow::Context as _;
use bytes::{Buf, BufMut, Bytes};
use http::uri::PathAndQuery;
use std::task::{Context, Poll};
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::transport::Channel;
use tonic::{body::Body, client::GrpcService, Status};
use tower_service::Service;

/// Connects to an [`Endpoint`] over gRPC.
///
/// This is the connector a [`ManagedChannel`](crate::ManagedChannel) is built
/// with unless [`connector`](crate::ManagedChannelBuilder::connector) swaps in
/// another one.
#[derive(Debug, Clone, Default)]
pub struct GrpcConnector;

#[async_trait::async_trait]
impl TransportConnector for GrpcConnector {
    type Transport = GrpcTransport;

    #[tracing::instrument(level = "debug", skip(self))]
    async fn connect(&self, endpoint: &Endpoint) -> Result<GrpcTransport, anyhow::Error> {
        let endpoint = tonic::transport::Endpoint::from_shared(endpoint.to_string())
            .context("endpoint is not a valid gRPC uri")?;

        let channel = endpoint
            .connect()
            .await
            .context("failed to establish a gRPC connection")?;

        Ok(GrpcTransport { channel })
    }
}

/// A live gRPC connection produced by [`GrpcConnector`].
///
/// All concurrent calls multiplex over the one underlying HTTP/2 connection.
/// Besides the raw [`UnaryTransport`] surface, this implements tonic's
/// [`GrpcService`] so that generated clients can be constructed directly on
/// top of it, e.g. `GreeterClient::new(transport)`.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    channel: Channel,
}

impl Service<http::Request<Body>> for GrpcTransport {
    type Response = http::Response<<Channel as GrpcService<Body>>::ResponseBody>;
    type Error = <Channel as GrpcService<Body>>::Error;
    type Future = <Channel as GrpcService<Body>>::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        GrpcService::poll_ready(&mut self.channel, cx)
    }

    fn call(&mut self, request: http::Request<Body>) -> Self::Future {
        GrpcService::call(&mut self.channel, request)
    }
}

/// One unary gRPC exchange: the full method path plus the request message,
/// already serialized by whatever schema compiler the caller uses.
#[derive(Debug, Clone)]
pub struct GrpcRequest {
    path: PathAndQuery,
    message: Bytes,
}

impl GrpcRequest {
    /// Build a request for `/{service}/{method}` carrying `message`.
    ///
    /// `service` is the full, package-qualified service name,
    /// e.g. `greet.Greeter` or `grpc.health.v1.Health`.
    pub fn new<M: Into<Bytes>>(
        service: &str,
        method: &str,
        message: M,
    ) -> Result<Self, anyhow::Error> {
        anyhow::ensure!(!service.is_empty(), "`service` must not be empty");
        anyhow::ensure!(!method.is_empty(), "`method` must not be empty");

        let path = PathAndQuery::from_maybe_shared(format!("/{}/{}", service, method))
            .context("`service` and `method` do not form a valid gRPC path")?;

        Ok(Self {
            path,
            message: message.into(),
        })
    }

    /// The `/package.Service/Method` path this request is addressed to.
    pub fn path(&self) -> &PathAndQuery {
        &self.path
    }
}

#[async_trait::async_trait]
impl UnaryTransport for GrpcTransport {
    type Request = GrpcRequest;
    type Response = Bytes;

    async fn call_unary(&self, request: GrpcRequest) -> Result<Bytes, anyhow::Error> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());

        grpc.ready().await.context("the gRPC service was not ready")?;

        let response = grpc
            .unary(
                tonic::Request::new(request.message),
                request.path,
                IdentityCodec::default(),
            )
            .await
            .context("the unary exchange failed")?;

        Ok(response.into_inner())
    }
}

/// Passes pre-serialized messages through tonic's framing untouched.
#[derive(Debug, Clone, Default)]
struct IdentityCodec;

impl Codec for IdentityCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = IdentityCodec;
    type Decoder = IdentityCodec;

    fn encoder(&mut self) -> Self::Encoder {
        IdentityCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        IdentityCodec
    }
}

impl Encoder for IdentityCodec {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Bytes, dst: &mut EncodeBuf<'_>) -> Result<(), Status> {
        dst.put(item);
        Ok(())
    }
}

impl Decoder for IdentityCodec {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Bytes>, Status> {
        // The buffer is bounded to exactly one length-prefixed message.
        Ok(Some(src.copy_to_bytes(src.remaining())))
    }
}
