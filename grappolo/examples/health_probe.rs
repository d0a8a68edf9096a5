//! Probes a gRPC server's health endpoint with a fail-fast batch: the first
//! failing probe cancels the rest.
//!
//! The endpoint comes from the `GRAPPOLO_ENDPOINT` environment variable. The
//! probe targets the server-wide health service; a `HealthCheckRequest` with
//! an empty service name encodes to zero bytes.

use anyhow::Context;
use bytes::Bytes;
use grappolo::{CallError, CallOptions, FanOutPolicy, GrpcRequest, ManagedChannel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address = std::env::var("GRAPPOLO_ENDPOINT")
        .context("set GRAPPOLO_ENDPOINT to the server address")?;

    let channel = ManagedChannel::builder(address)
        .connect_timeout(std::time::Duration::from_secs(2))
        .build()
        .context("failed to build ManagedChannel")?;

    let probes = (0..5)
        .map(|_| GrpcRequest::new("grpc.health.v1.Health", "Check", Bytes::new()))
        .collect::<Result<Vec<_>, _>>()?;

    let outcomes = channel
        .invoke_all(
            probes,
            CallOptions::new().timeout(std::time::Duration::from_secs(1)),
            FanOutPolicy::FailFast,
        )
        .await?;

    channel.shutdown().await;

    let mut exit_code = 0;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(_) => println!("probe {}: healthy", i),
            Err(CallError::Cancelled) => println!("probe {}: cancelled", i),
            Err(error) => {
                exit_code = 1;
                eprintln!("probe {}: {}", i, error);
            }
        }
    }

    std::process::exit(exit_code);
}
