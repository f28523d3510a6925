//! Network probes used as component health checks.
//!
//! - [`TcpProbe`] is healthy when a TCP connection can be opened
//! - [`HttpProbe`] is healthy when a GET returns a 2xx status

use std::time::Duration;

use tokio::net::TcpStream;
use vigil_health::{BoxError, CheckFuture, CheckOutcome, CheckReport, HealthCheck, HealthStatus};

/// Connects to a TCP address.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
}

impl TcpProbe {
    /// Creates a probe for `host:port`.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// The probed address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl HealthCheck for TcpProbe {
    fn check(&self) -> CheckFuture<'_> {
        Box::pin(async move {
            let stream = TcpStream::connect(&self.address).await?;
            let peer = stream.peer_addr()?;
            Ok(CheckOutcome::Report(
                CheckReport::healthy().with_detail("peer", peer.to_string()),
            ))
        })
    }
}

/// Issues a GET request.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    /// Creates a probe for `url`, giving up on the request after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not HTTP(S) or the client cannot be
    /// built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BoxError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("probe URL must be http or https: {url}").into());
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    /// The probed URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HealthCheck for HttpProbe {
    fn check(&self) -> CheckFuture<'_> {
        Box::pin(async move {
            let response = self.client.get(&self.url).send().await?;
            let status = response.status();

            let report = if status.is_success() {
                CheckReport::healthy()
            } else {
                CheckReport::new(HealthStatus::Unhealthy)
                    .with_success_rate(0.0)
                    .with_error_rate(100.0)
                    .with_error_message(format!("HTTP {status}"))
            };
            Ok(CheckOutcome::Report(
                report.with_detail("status_code", status.as_u16()),
            ))
        })
    }
}
