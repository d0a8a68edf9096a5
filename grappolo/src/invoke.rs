//! Implements the single-call surface of a [`ManagedChannel`]: one request,
//! one response, bounded by a deadline and a cancellation token.

use crate::{ChannelError, ManagedChannel, UnaryTransport};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// The terminal result of one dispatched call: exactly one per request, even
/// under cancellation or transport failure.
pub type CallOutcome<R> = Result<R, CallError>;

/// Everything that can go wrong with an individual call.
///
/// Per-call failures are captured into that call's [`CallOutcome`] and never
/// terminate sibling calls, except under
/// [`FanOutPolicy::FailFast`](crate::FanOutPolicy::FailFast).
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The channel could not be acquired in the first place.
    #[error("the channel could not be acquired")]
    Channel(#[from] ChannelError),
    /// No response arrived before the deadline. The in-flight exchange has
    /// been aborted; there is no partial response to return.
    #[error("the call exceeded its deadline after {elapsed:?}")]
    Timeout {
        /// How long the call had been running when it was abandoned.
        elapsed: Duration,
    },
    /// The transport failed mid-call, e.g. the connection was reset.
    #[error("the transport failed mid-call: {reason}")]
    Transport {
        /// What the transport reported.
        reason: anyhow::Error,
    },
    /// The call was cancelled, either through its
    /// [`CallOptions`] token or because the channel shut down.
    #[error("the call was cancelled")]
    Cancelled,
}

/// Per-call settings: an optional deadline and an optional cancellation
/// token.
///
/// ```rust
/// use grappolo::CallOptions;
/// use tokio_util::sync::CancellationToken;
///
/// let stop = CancellationToken::new();
/// let options = CallOptions::new()
///     .timeout(std::time::Duration::from_secs(3))
///     .cancellation_token(stop.clone());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub(crate) deadline: Option<Instant>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl CallOptions {
    /// Options with no deadline and no cancellation token: the call runs
    /// until the transport produces an outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandon the call at `deadline` with [`CallError::Timeout`].
    pub fn deadline(self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    /// Convenience over [`CallOptions::deadline`]: the deadline is `timeout`
    /// from now.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// Abandon the call with [`CallError::Cancelled`] as soon as `token` is
    /// cancelled. Cancellation takes precedence over the deadline.
    pub fn cancellation_token(self, token: CancellationToken) -> Self {
        Self {
            cancellation: Some(token),
            ..self
        }
    }
}

impl<T: UnaryTransport> ManagedChannel<T> {
    /// Issue a single unary call over this channel.
    ///
    /// The transport is established first if this is the channel's first
    /// call. No retries are performed on failure: retry policy, if any, is
    /// the caller's responsibility.
    #[tracing::instrument(level = "debug", skip(self, request, options))]
    pub async fn invoke(
        &self,
        request: T::Request,
        options: CallOptions,
    ) -> CallOutcome<T::Response> {
        let transport = self.acquire().await.map_err(CallError::Channel)?;
        let cancellation = options.cancellation.clone().unwrap_or_default();

        dispatch(
            transport.as_ref(),
            request,
            options.deadline,
            &cancellation,
            self.shutdown_token(),
        )
        .await
    }
}

/// Drive one exchange on an already acquired transport.
///
/// The select is biased so that cancellation is observed before the deadline
/// when both have fired; dropping the exchange future is what aborts the
/// in-flight call.
pub(crate) async fn dispatch<T: UnaryTransport>(
    transport: &T,
    request: T::Request,
    deadline: Option<Instant>,
    cancellation: &CancellationToken,
    shutdown: &CancellationToken,
) -> CallOutcome<T::Response> {
    let started = Instant::now();

    let exchange = async {
        let call = transport.call_unary(request);
        match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                Ok(result) => result.map_err(|reason| CallError::Transport { reason }),
                Err(_) => Err(CallError::Timeout {
                    elapsed: started.elapsed(),
                }),
            },
            None => call.await.map_err(|reason| CallError::Transport { reason }),
        }
    };

    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(CallError::Cancelled),
        _ = shutdown.cancelled() => Err(CallError::Cancelled),
        outcome = exchange => outcome,
    }
}
