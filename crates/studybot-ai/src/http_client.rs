use std::net::IpAddr;
use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::Result;

const DISABLE_SYSTEM_PROXY_ENV: &str = "STUDYBOT_DISABLE_SYSTEM_PROXY";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a client for talking to `base_url`.
///
/// Loopback targets never go through the system proxy; other targets skip it
/// only when `STUDYBOT_DISABLE_SYSTEM_PROXY` is set. `timeout` bounds the
/// whole request, streamed body included.
pub fn build_http_client(base_url: &str, timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if should_disable_system_proxy(base_url) {
        builder = builder.no_proxy();
    }
    Ok(builder.build()?)
}

fn should_disable_system_proxy(base_url: &str) -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    is_loopback(base_url)
}

fn is_loopback(base_url: &str) -> bool {
    let Ok(url) = Url::parse(base_url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    host.eq_ignore_ascii_case("localhost")
        || host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}
