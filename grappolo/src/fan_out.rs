//! Implements the batch surface of a [`ManagedChannel`]: N independent unary
//! calls dispatched concurrently over the one shared transport and joined
//! into an index-ordered outcome sequence.

use crate::{
    invoke::dispatch, CallOptions, CallOutcome, ChannelError, ManagedChannel, UnaryTransport,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Determines whether one failing call aborts its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutPolicy {
    /// The first failure cancels every still-pending call in the batch;
    /// their outcomes are reported as
    /// [`CallError::Cancelled`](crate::CallError::Cancelled).
    FailFast,
    /// Every call runs to a terminal outcome regardless of its siblings.
    CollectAll,
}

impl<T: UnaryTransport> ManagedChannel<T> {
    /// Issue every request in `requests` concurrently and collect their
    /// outcomes.
    ///
    /// The returned sequence is ordered by request index, independent of the
    /// order in which calls complete on the wire, and always holds exactly
    /// one outcome per request. The shared transport is acquired once; if
    /// that fails, the whole batch is aborted and no call is dispatched.
    ///
    /// Cancelling the [`CallOptions`] token cancels the batch top-down. An
    /// empty batch resolves immediately without touching the channel.
    #[tracing::instrument(level = "debug", skip(self, requests, options), fields(batch_size = requests.len()))]
    pub async fn invoke_all(
        &self,
        requests: Vec<T::Request>,
        options: CallOptions,
        policy: FanOutPolicy,
    ) -> Result<Vec<CallOutcome<T::Response>>, ChannelError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let transport = self.acquire().await?;

        // Each call gets the batch token as its cancellation source. Deriving
        // it from the caller's token propagates external cancellation
        // top-down, while `FailFast` can cancel the batch without touching
        // the caller's token.
        let batch = match &options.cancellation {
            Some(token) => token.child_token(),
            None => CancellationToken::new(),
        };

        let mut handles = Vec::with_capacity(requests.len());
        for request in requests {
            let transport = Arc::clone(&transport);
            let batch = batch.clone();
            let shutdown = self.shutdown_token().clone();
            let deadline = options.deadline;

            handles.push(tokio::spawn(async move {
                let outcome =
                    dispatch(transport.as_ref(), request, deadline, &batch, &shutdown).await;
                if policy == FanOutPolicy::FailFast && outcome.is_err() {
                    batch.cancel();
                }
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) if join_error.is_panic() => {
                    std::panic::resume_unwind(join_error.into_panic())
                }
                Err(_) => Err(crate::CallError::Cancelled),
            });
        }

        Ok(outcomes)
    }
}
