//! HTTP client factory with consistent timeout configuration.
//!
//! Provider status clients and the email sender go through this module so
//! every outbound call is bounded.

use reqwest::Client;
use std::time::Duration;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default request timeout for calls that are not on the webhook path.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build an HTTP client with the default connect timeout and `request_timeout`.
///
/// Status queries run inside a webhook delivery, so their timeout must stay
/// well under the request timeout of the server.
pub fn try_build_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
}
