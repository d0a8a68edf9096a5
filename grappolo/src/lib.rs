//! `grappolo` manages one logical connection to a remote gRPC endpoint and
//! executes unary calls over it with deadlines, cancellation and concurrent
//! fan-out.
//!
//! The wire protocol, serialization and name resolution all stay inside the
//! transport stack (`tonic` by default): this crate owns the channel
//! lifecycle, the per-call deadline/cancellation discipline and the batch
//! join semantics, nothing else.
//!
//! # Simple example
//!
//! A channel is cheap to build and connects lazily, on the first call issued
//! over it.
//!
//! ```rust
//! use grappolo::ManagedChannel;
//!
//! let channel = ManagedChannel::builder(("my.hostname", 5000))
//!     .build()
//!     .expect("failed to construct ManagedChannel");
//! ```
//!
//! The endpoint must come from configuration; it is never baked into the
//! crate. Anything that converts into an [`Endpoint`] works, including a
//! `scheme://host:port` string:
//!
//! ```rust
//! use grappolo::ManagedChannel;
//!
//! let address = std::env::var("GRAPPOLO_ENDPOINT")
//!     .unwrap_or_else(|_| "http://localhost:5000".into());
//!
//! let channel = ManagedChannel::builder(address)
//!     .connect_timeout(std::time::Duration::from_secs(2))
//!     .build()
//!     .expect("failed to construct ManagedChannel");
//! ```
//!
//! # Issuing calls
//!
//! A single call takes a request, an optional deadline and an optional
//! cancellation token, and resolves to exactly one [`CallOutcome`]:
//!
//! ```rust,no_run
//! use grappolo::{CallOptions, GrpcRequest, ManagedChannel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), anyhow::Error> {
//!     let channel = ManagedChannel::builder(("my.hostname", 5000)).build()?;
//!
//!     let request = GrpcRequest::new("greet.Greeter", "SayHello", encoded_hello())?;
//!     let options = CallOptions::new().timeout(std::time::Duration::from_secs(3));
//!
//!     match channel.invoke(request, options).await {
//!         Ok(payload) => println!("{} response bytes", payload.len()),
//!         Err(error) => eprintln!("call failed: {}", error),
//!     }
//!
//!     channel.shutdown().await;
//!     Ok(())
//! }
//! # fn encoded_hello() -> Vec<u8> { Vec::new() }
//! ```
//!
//! A batch fans out concurrently over the same connection and comes back in
//! request order, under either [`FanOutPolicy::FailFast`] or
//! [`FanOutPolicy::CollectAll`]:
//!
//! ```rust,no_run
//! use grappolo::{CallOptions, FanOutPolicy, GrpcRequest, ManagedChannel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), anyhow::Error> {
//!     let channel = ManagedChannel::builder(("my.hostname", 5000)).build()?;
//!
//!     let requests = (0..10)
//!         .map(|i| GrpcRequest::new("greet.Greeter", "SayHello", format!("User{}", i)))
//!         .collect::<Result<Vec<_>, _>>()?;
//!
//!     let outcomes = channel
//!         .invoke_all(requests, CallOptions::new(), FanOutPolicy::CollectAll)
//!         .await?;
//!
//!     for (index, outcome) in outcomes.iter().enumerate() {
//!         println!("request {}: {:?}", index, outcome.is_ok());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Plugging in a different transport
//!
//! The channel is generic over its transport; anything implementing
//! [`TransportConnector`] and [`UnaryTransport`] can replace the default
//! gRPC stack (the test suite does exactly this to simulate latency and
//! failures):
//!
//! ```rust
//! use grappolo::{Endpoint, ManagedChannel, TransportConnector, UnaryTransport};
//!
//! struct LoopbackConnector;
//! struct Loopback;
//!
//! #[async_trait::async_trait]
//! impl TransportConnector for LoopbackConnector {
//!     type Transport = Loopback;
//!
//!     async fn connect(&self, _endpoint: &Endpoint) -> Result<Loopback, anyhow::Error> {
//!         Ok(Loopback)
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl UnaryTransport for Loopback {
//!     type Request = String;
//!     type Response = String;
//!
//!     async fn call_unary(&self, request: String) -> Result<String, anyhow::Error> {
//!         Ok(request)
//!     }
//! }
//!
//! let channel = ManagedChannel::builder(("localhost", 5000))
//!     .connector(LoopbackConnector)
//!     .build()
//!     .expect("failed to construct ManagedChannel");
//! ```
//!
//! # Internals
//!
//! The channel keeps its transport behind a small state machine
//! (`Unconnected → Connected → ShuttingDown → Closed`) guarded by an async
//! read/write lock: calls share the transport through cheap `Arc` clones,
//! while shutdown takes the lock exclusively, cancels a channel-wide token
//! and lets the transport drop with the last in-flight call. Every call is
//! raced against that token, its own cancellation token and its deadline;
//! losing the race drops the exchange future, which is what aborts the
//! underlying HTTP/2 stream.

mod endpoint;
mod fan_out;
mod grpc;
mod invoke;
mod managed_channel;
mod transport;

pub use endpoint::*;
pub use fan_out::*;
pub use grpc::*;
pub use invoke::*;
pub use managed_channel::*;
pub use transport::*;
