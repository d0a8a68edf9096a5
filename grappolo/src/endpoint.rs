use anyhow::Context;

/// Defines the remote peer a [`ManagedChannel`](crate::ManagedChannel) talks to:
/// a `scheme`, a `host` and a `port`.
///
/// The address is treated as opaque; name resolution and load balancing are left
/// to the underlying transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// The URI scheme, e.g. `http` or `https`.
    scheme: String,
    /// The hostname of the remote peer.
    host: String,
    /// The remote port.
    port: u16,
}

impl Endpoint {
    /// Create an [`Endpoint`] from a valid `scheme`, `host` and `port`.
    ///
    /// This function will fail if the parts do not assemble into a valid URI.
    pub fn from_parts<S: ToString, H: ToString>(
        scheme: S,
        host: H,
        port: u16,
    ) -> Result<Self, anyhow::Error> {
        let scheme = scheme.to_string();
        let host = host.to_string();

        format!("{}://{}:{}", scheme, host, port)
            .parse::<http::Uri>()
            .context("invalid endpoint")?;

        Ok(Self { scheme, host, port })
    }

    /// Get the `scheme` part of an `Endpoint`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Get the `host` part of an `Endpoint`.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the `port` part of an `Endpoint`.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// ```
/// let endpoint = grappolo::Endpoint::try_from(("localhost", 8090)).unwrap();
/// assert_eq!(endpoint.scheme(), "http");
/// assert_eq!(endpoint.host(), "localhost");
/// assert_eq!(endpoint.port(), 8090);
/// ```
impl TryFrom<(&str, u16)> for Endpoint {
    type Error = anyhow::Error;

    fn try_from((host, port): (&str, u16)) -> Result<Self, Self::Error> {
        Self::from_parts("http", host, port)
    }
}

/// ```
/// let endpoint = grappolo::Endpoint::try_from((String::from("localhost"), 8090)).unwrap();
/// assert_eq!(endpoint.host(), "localhost");
/// assert_eq!(endpoint.port(), 8090);
/// ```
impl TryFrom<(String, u16)> for Endpoint {
    type Error = anyhow::Error;

    fn try_from((host, port): (String, u16)) -> Result<Self, Self::Error> {
        Self::from_parts("http", host, port)
    }
}

/// ```
/// let endpoint = grappolo::Endpoint::try_from("https://my.hostname:5000").unwrap();
/// assert_eq!(endpoint.scheme(), "https");
/// assert_eq!(endpoint.host(), "my.hostname");
/// assert_eq!(endpoint.port(), 5000);
/// ```
///
/// A path segment is rejected: the endpoint identifies a peer, not a method.
///
/// ```
/// assert!(grappolo::Endpoint::try_from("https://my.hostname:5000/greet.Greeter/SayHello").is_err());
/// ```
impl TryFrom<&str> for Endpoint {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let uri = value.parse::<http::Uri>().context("invalid endpoint")?;

        let scheme = uri
            .scheme_str()
            .context("endpoint is missing a scheme, e.g. `http://`")?;
        let host = uri.host().context("endpoint is missing a host")?;
        let port = match uri.port_u16() {
            Some(port) => port,
            None => match scheme {
                "http" => 80,
                "https" => 443,
                _ => anyhow::bail!("endpoint is missing a port"),
            },
        };

        if let Some(path_and_query) = uri.path_and_query() {
            anyhow::ensure!(
                path_and_query.as_str() == "/" || path_and_query.as_str().is_empty(),
                "endpoint must not carry a path, got `{}`",
                path_and_query
            );
        }

        Self::from_parts(scheme, host, port)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Endpoint::try_from(value.as_str())
    }
}
