//! Issues a batch of `greet.Greeter/SayHello` calls concurrently over one
//! managed channel and prints every response.
//!
//! The endpoint comes from the `GRAPPOLO_ENDPOINT` environment variable,
//! e.g. `GRAPPOLO_ENDPOINT=http://localhost:50051`.

use anyhow::Context;
use grappolo::{CallOptions, FanOutPolicy, GrpcRequest, ManagedChannel};
use prost::Message;

#[derive(Clone, PartialEq, Message)]
struct HelloRequest {
    #[prost(string, tag = "1")]
    name: String,
}

#[derive(Clone, PartialEq, Message)]
struct HelloReply {
    #[prost(string, tag = "1")]
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address = std::env::var("GRAPPOLO_ENDPOINT")
        .context("set GRAPPOLO_ENDPOINT to the greeter server address")?;

    let channel = ManagedChannel::builder(address)
        .connect_timeout(std::time::Duration::from_secs(2))
        .build()
        .context("failed to build ManagedChannel")?;

    let requests = (0..10)
        .map(|i| {
            let hello = HelloRequest {
                name: format!("User{}", i),
            };
            GrpcRequest::new("greet.Greeter", "SayHello", hello.encode_to_vec())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let outcomes = channel
        .invoke_all(
            requests,
            CallOptions::new().timeout(std::time::Duration::from_secs(3)),
            FanOutPolicy::CollectAll,
        )
        .await?;

    let mut failures = 0;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(payload) => {
                let reply = HelloReply::decode(payload)?;
                println!("Server Response {}: {}", i, reply.message);
            }
            Err(error) => {
                failures += 1;
                eprintln!("Request {} failed: {}", i, error);
            }
        }
    }

    channel.shutdown().await;

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
