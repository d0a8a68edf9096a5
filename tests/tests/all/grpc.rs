use bytes::Bytes;
use grappolo::{CallOptions, FanOutPolicy, GrpcRequest, ManagedChannel};
use prost::Message;
use tests::test_server::TestServer;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::{HealthCheckRequest, HealthCheckResponse};

async fn health_server() -> TestServer {
    TestServer::start(tonic_health::server::health_reporter().1).await
}

fn health_check_payload() -> Bytes {
    // The server-wide service is addressed by the empty service name.
    HealthCheckRequest {
        service: String::new(),
    }
    .encode_to_vec()
    .into()
}

#[tokio::test]
async fn a_raw_unary_call_reaches_a_real_grpc_server() {
    let server = health_server().await;

    let channel = ManagedChannel::builder(format!("http://{}", server.address()))
        .build()
        .expect("failed to build ManagedChannel");

    let request = GrpcRequest::new("grpc.health.v1.Health", "Check", health_check_payload())
        .expect("failed to build request");

    let payload = channel
        .invoke(
            request,
            CallOptions::new().timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .expect("call failed");

    let response = HealthCheckResponse::decode(payload).expect("malformed response");
    assert_eq!(response.status, ServingStatus::Serving as i32);

    channel.shutdown().await;
    server.shutdown_sync().await;
}

#[tokio::test]
async fn a_batch_of_raw_calls_shares_the_connection() {
    let server = health_server().await;

    let channel = ManagedChannel::builder(format!("http://{}", server.address()))
        .build()
        .expect("failed to build ManagedChannel");

    let requests = (0..10)
        .map(|_| GrpcRequest::new("grpc.health.v1.Health", "Check", health_check_payload()))
        .collect::<Result<Vec<_>, _>>()
        .expect("failed to build requests");

    let outcomes = channel
        .invoke_all(
            requests,
            CallOptions::new().timeout(std::time::Duration::from_secs(5)),
            FanOutPolicy::CollectAll,
        )
        .await
        .expect("batch aborted");

    assert_eq!(outcomes.len(), 10);
    for outcome in outcomes {
        let response =
            HealthCheckResponse::decode(outcome.expect("call failed")).expect("malformed response");
        assert_eq!(response.status, ServingStatus::Serving as i32);
    }

    channel.shutdown().await;
    server.shutdown_sync().await;
}

#[tokio::test]
async fn generated_clients_ride_the_managed_transport() {
    let server = health_server().await;

    let channel = ManagedChannel::builder(format!("http://{}", server.address()))
        .build()
        .expect("failed to build ManagedChannel");

    // The acquired transport implements tonic's `GrpcService`, so tonic
    // generated clients can be constructed straight on top of it.
    let transport = channel.acquire().await.expect("failed to acquire");
    let mut client = HealthClient::new(transport.as_ref().clone());

    let response = client
        .check(HealthCheckRequest {
            service: String::new(),
        })
        .await
        .expect("health check failed");

    assert_eq!(
        response.into_inner().status,
        ServingStatus::Serving as i32
    );

    channel.shutdown().await;
    server.shutdown_sync().await;
}

#[tokio::test]
async fn an_unknown_method_surfaces_as_a_transport_error() {
    let server = health_server().await;

    let channel = ManagedChannel::builder(format!("http://{}", server.address()))
        .build()
        .expect("failed to build ManagedChannel");

    let request = GrpcRequest::new("grpc.health.v1.Health", "Nope", Bytes::new())
        .expect("failed to build request");

    let outcome = channel
        .invoke(
            request,
            CallOptions::new().timeout(std::time::Duration::from_secs(5)),
        )
        .await;

    assert!(matches!(
        outcome,
        Err(grappolo::CallError::Transport { .. })
    ));

    channel.shutdown().await;
    server.shutdown_sync().await;
}
