use grappolo::{CallError, CallOptions, ManagedChannel};
use tests::mock::{MockConnector, MockRequest, MockTransport};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn channel() -> ManagedChannel<MockTransport> {
    ManagedChannel::builder(("localhost", 5000))
        .connector(MockConnector::new())
        .build()
        .expect("failed to build ManagedChannel")
}

#[tokio::test(start_paused = true)]
async fn a_response_before_the_deadline_succeeds() {
    let response = channel()
        .invoke(
            MockRequest::reply(Duration::from_millis(10), "pong"),
            CallOptions::new().timeout(Duration::from_secs(1)),
        )
        .await
        .expect("call failed");

    assert_eq!(response, "pong");
}

#[tokio::test(start_paused = true)]
async fn an_unresponsive_remote_times_out_at_the_deadline() {
    let deadline = Duration::from_millis(250);

    let started = Instant::now();
    let outcome = channel()
        .invoke(MockRequest::Hang, CallOptions::new().timeout(deadline))
        .await;
    let wall = started.elapsed();

    match outcome {
        Err(CallError::Timeout { elapsed }) => assert!(elapsed >= deadline),
        other => panic!("expected a timeout, got {:?}", other),
    }
    assert!(wall >= deadline);
    assert!(wall < deadline + Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn a_transport_failure_carries_its_cause() {
    let outcome = channel()
        .invoke(
            MockRequest::fail(Duration::from_millis(5), "connection reset"),
            CallOptions::new().timeout(Duration::from_secs(1)),
        )
        .await;

    match outcome {
        Err(CallError::Transport { reason }) => {
            assert!(reason.to_string().contains("connection reset"));
        }
        other => panic!("expected a transport error, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn cancelling_the_token_abandons_the_call() {
    let token = CancellationToken::new();
    let channel = channel();

    let pending = tokio::spawn({
        let channel = channel.clone();
        let token = token.clone();
        async move {
            channel
                .invoke(
                    MockRequest::Hang,
                    CallOptions::new()
                        .timeout(Duration::from_secs(30))
                        .cancellation_token(token),
                )
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let outcome = pending.await.expect("task panicked");
    assert!(matches!(outcome, Err(CallError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn cancellation_takes_precedence_over_an_expired_deadline() {
    let token = CancellationToken::new();
    token.cancel();

    let outcome = channel()
        .invoke(
            MockRequest::Hang,
            CallOptions::new()
                .deadline(Instant::now() - Duration::from_secs(1))
                .cancellation_token(token),
        )
        .await;

    assert!(matches!(outcome, Err(CallError::Cancelled)));
}
