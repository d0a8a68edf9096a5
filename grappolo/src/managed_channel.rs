//! Provides the builder and implementation of [`ManagedChannel`], the owner of
//! the one logical connection all calls are issued over.

use crate::{
    grpc::{GrpcConnector, GrpcTransport},
    Endpoint, TransportConnector, UnaryTransport,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounds how long a connection attempt may take before `acquire`
/// gives up with [`ChannelError::ConnectTimeout`], unless
/// [`ManagedChannelBuilder::connect_timeout`] overrides it.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors surfaced by the channel itself, as opposed to individual calls.
///
/// A channel error aborts a whole batch: no call is dispatched over a channel
/// that could not be acquired.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The endpoint could not be reached.
    #[error("failed to connect to `{endpoint}`: {reason}")]
    Connect {
        /// The endpoint the connection attempt targeted.
        endpoint: Endpoint,
        /// What the connector reported.
        reason: anyhow::Error,
    },
    /// The endpoint did not accept a connection within the setup timeout.
    #[error("connecting to `{endpoint}` timed out after {timeout:?}")]
    ConnectTimeout {
        /// The endpoint the connection attempt targeted.
        endpoint: Endpoint,
        /// The configured setup timeout.
        timeout: Duration,
    },
    /// The channel has been shut down.
    #[error("the channel is closed")]
    Closed,
}

enum ChannelState<T> {
    Unconnected,
    Connected(Arc<T>),
    ShuttingDown,
    Closed,
}

struct ChannelShared<T: UnaryTransport> {
    endpoint: Endpoint,
    connector: Box<dyn TransportConnector<Transport = T>>,
    connect_timeout: Duration,
    state: RwLock<ChannelState<T>>,
    shutdown: CancellationToken,
}

/// A cheaply cloneable handle to one logical connection to a remote
/// [`Endpoint`].
///
/// The underlying transport is established lazily, on the first call, and
/// shared by every concurrent call issued afterwards; no caller owns it
/// exclusively. [`ManagedChannel::shutdown`] releases it and cancels whatever
/// is still in flight.
///
/// ```rust
/// use grappolo::ManagedChannel;
///
/// let channel = ManagedChannel::builder(("my.hostname", 5000))
///     .build()
///     .expect("failed to construct ManagedChannel");
/// ```
pub struct ManagedChannel<T: UnaryTransport> {
    inner: Arc<ChannelShared<T>>,
}

impl<T: UnaryTransport> Clone for ManagedChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ManagedChannel<GrpcTransport> {
    /// Start configuring a `ManagedChannel` by passing in the [`Endpoint`]
    /// of the server you want to call - e.g. `my.service.uri` and `5000`.
    ///
    /// The channel connects over gRPC by default; use
    /// [`ManagedChannelBuilder::connector`] to plug in a different transport.
    pub fn builder<E>(endpoint: E) -> ManagedChannelBuilder<GrpcConnector, E>
    where
        E: TryInto<Endpoint> + Send + Sync + 'static,
        E::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send + Sync,
    {
        ManagedChannelBuilder::new_with_endpoint(endpoint)
    }
}

impl<T: UnaryTransport> ManagedChannel<T> {
    /// Return the live transport, establishing it first if no connection
    /// exists yet.
    ///
    /// Concurrent callers share one connection attempt: whoever holds the
    /// state lock connects, everyone else reuses the result. A failed attempt
    /// leaves the channel unconnected, so a later call may retry.
    pub async fn acquire(&self) -> Result<Arc<T>, ChannelError> {
        {
            let state = self.inner.state.read().await;
            match &*state {
                ChannelState::Connected(transport) => return Ok(Arc::clone(transport)),
                ChannelState::ShuttingDown | ChannelState::Closed => {
                    return Err(ChannelError::Closed)
                }
                ChannelState::Unconnected => {}
            }
        }

        let mut state = self.inner.state.write().await;

        // Someone else may have connected or shut down while we waited
        // for the write lock.
        match &*state {
            ChannelState::Connected(transport) => return Ok(Arc::clone(transport)),
            ChannelState::ShuttingDown | ChannelState::Closed => return Err(ChannelError::Closed),
            ChannelState::Unconnected => {}
        }

        tracing::debug!("establishing connection to `{}`", self.inner.endpoint);

        let transport = tokio::time::timeout(
            self.inner.connect_timeout,
            self.inner.connector.connect(&self.inner.endpoint),
        )
        .await
        .map_err(|_| ChannelError::ConnectTimeout {
            endpoint: self.inner.endpoint.clone(),
            timeout: self.inner.connect_timeout,
        })?
        .map_err(|reason| ChannelError::Connect {
            endpoint: self.inner.endpoint.clone(),
            reason,
        })?;

        let transport = Arc::new(transport);
        *state = ChannelState::Connected(Arc::clone(&transport));

        tracing::debug!("connected to `{}`", self.inner.endpoint);

        Ok(transport)
    }

    /// Shut the channel down, releasing the underlying transport.
    ///
    /// In-flight calls observe [`CallError::Cancelled`](crate::CallError::Cancelled);
    /// any call issued afterwards fails with [`ChannelError::Closed`]. Shutting
    /// down an already closed channel is a no-op.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.write().await;
        if matches!(*state, ChannelState::ShuttingDown | ChannelState::Closed) {
            return;
        }

        // Dropping the `Connected` handle releases the transport once the
        // last in-flight call lets go of its own reference.
        *state = ChannelState::ShuttingDown;
        self.inner.shutdown.cancel();
        *state = ChannelState::Closed;

        tracing::debug!("channel to `{}` closed", self.inner.endpoint);
    }

    /// Whether [`ManagedChannel::shutdown`] has run.
    pub async fn is_closed(&self) -> bool {
        matches!(*self.inner.state.read().await, ChannelState::Closed)
    }

    /// The endpoint this channel talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Cancelled exactly once, when the channel shuts down.
    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }
}

/// Builder to configure and create a [`ManagedChannel`].
pub struct ManagedChannelBuilder<C, E> {
    endpoint: E,
    connector: C,
    connect_timeout: Option<Duration>,
}

impl<E> ManagedChannelBuilder<GrpcConnector, E>
where
    E: TryInto<Endpoint> + 'static,
    E::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send + Sync,
{
    /// Set the [`Endpoint`] of the server to call
    /// - e.g. `my.service.uri` and `5000`.
    pub fn new_with_endpoint(endpoint: E) -> ManagedChannelBuilder<GrpcConnector, E> {
        Self {
            endpoint,
            connector: GrpcConnector::default(),
            connect_timeout: None,
        }
    }
}

impl<C: TransportConnector, E> ManagedChannelBuilder<C, E>
where
    E: TryInto<Endpoint> + 'static,
    E::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send + Sync,
{
    /// Set a custom [`TransportConnector`].
    pub fn connector<C2: TransportConnector>(self, connector: C2) -> ManagedChannelBuilder<C2, E> {
        ManagedChannelBuilder {
            connector,
            endpoint: self.endpoint,
            connect_timeout: self.connect_timeout,
        }
    }

    /// Bound the time a connection attempt may take.
    ///
    /// Defaults to [`DEFAULT_CONNECT_TIMEOUT`] if not set.
    pub fn connect_timeout(self, connect_timeout: Duration) -> ManagedChannelBuilder<C, E> {
        Self {
            connect_timeout: Some(connect_timeout),
            ..self
        }
    }

    /// Construct a [`ManagedChannel`] from the [`ManagedChannelBuilder`] instance.
    ///
    /// The channel starts unconnected; the transport is established on the
    /// first call issued over it.
    pub fn build(self) -> Result<ManagedChannel<C::Transport>, anyhow::Error> {
        let endpoint: Endpoint = self
            .endpoint
            .try_into()
            .map_err(Into::into)
            .map_err(|err| anyhow::anyhow!(err))?;

        Ok(ManagedChannel {
            inner: Arc::new(ChannelShared {
                endpoint,
                connector: Box::new(self.connector),
                connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
                state: RwLock::new(ChannelState::Unconnected),
                shutdown: CancellationToken::new(),
            }),
        })
    }
}

const _: () = {
    const fn assert_is_send<T: Send>() {}
    assert_is_send::<ManagedChannel<GrpcTransport>>();
    assert_is_send::<ManagedChannelBuilder<GrpcConnector, Endpoint>>();
};
