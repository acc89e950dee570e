use std::time::Duration;

use crate::error::NetworkError;

const SYSTEM_PROXY_ENV: &str = "NEGOTIUM_ENABLE_SYSTEM_PROXY";

/// Builds the client used for every negotiation, analysis and history call.
///
/// The backend normally runs on localhost, where a system proxy would only
/// get in the way, so proxy discovery is skipped unless
/// `NEGOTIUM_ENABLE_SYSTEM_PROXY` is set. Discovery reads platform settings
/// and can panic; in that case we retry with `no_proxy`. `timeout` bounds
/// each whole request, and a timeout surfaces as `NetworkError::Transport`.
pub fn build_http_client_with_timeout(
    timeout: Option<Duration>,
) -> Result<reqwest::Client, NetworkError> {
    if system_proxy_enabled() {
        if let Ok(Ok(client)) = std::panic::catch_unwind(|| attempt_build(timeout, false)) {
            return Ok(client);
        }

        tracing::warn!(
            "System proxy discovery failed for the backend client; continuing without a proxy"
        );
    }

    match std::panic::catch_unwind(|| attempt_build(timeout, true)) {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(error)) => Err(NetworkError::Transport(format!(
            "could not build the backend HTTP client: {}",
            error
        ))),
        Err(_) => Err(NetworkError::Transport(
            "building the backend HTTP client panicked".to_string(),
        )),
    }
}

fn system_proxy_enabled() -> bool {
    proxy_flag_set(std::env::var(SYSTEM_PROXY_ENV).ok().as_deref())
}

fn proxy_flag_set(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

fn attempt_build(
    timeout: Option<Duration>,
    no_proxy: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if no_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_discovery_is_opt_in() {
        assert!(!proxy_flag_set(None));
        assert!(!proxy_flag_set(Some("0")));
        assert!(!proxy_flag_set(Some("yes")));
        assert!(proxy_flag_set(Some("1")));
        assert!(proxy_flag_set(Some(" TRUE ")));
    }

    #[test]
    fn builds_client_with_request_timeout() {
        assert!(attempt_build(Some(Duration::from_secs(5)), true).is_ok());
    }
}
