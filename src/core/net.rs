// src/core/net.rs
//
// Blocking HTTPS GET with a browser-looking header set and a random
// pre-request pause, so a daily poll does not look like a bot hammering.

use std::{thread, time::Duration};

use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};

use crate::config::consts::{REQUEST_TIMEOUT_SECS, URL_LOG_CHARS, USER_AGENT};
use crate::config::DelayRange;
use crate::core::sanitize::truncate_chars;
use crate::error::FetchError;

/// Anything that can turn a URL into page text.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str, delay: DelayRange) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(verify_tls: bool) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| FetchError::Request { url: s!("<client>"), reason: e.to_string() })?;

        if !verify_tls {
            logd!("Net: certificate verification is off");
        }
        Ok(Self { client })
    }
}

/// Seconds to wait, uniform over the inclusive range.
pub fn pick_delay(delay: DelayRange) -> u64 {
    if delay.max_secs <= delay.min_secs {
        return delay.min_secs;
    }
    rand::rng().random_range(delay.min_secs..=delay.max_secs)
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, delay: DelayRange) -> Result<String, FetchError> {
        let wait = pick_delay(delay);
        logd!("Net: waiting {wait}s before {}", truncate_chars(url, URL_LOG_CHARS));
        thread::sleep(Duration::from_secs(wait));

        let request_err = |e: reqwest::Error| FetchError::Request { url: s!(url), reason: e.to_string() };

        let resp = self.client.get(url).send().map_err(request_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: s!(url), status: status.as_u16() });
        }

        // reqwest picks the charset from Content-Type when present
        let body = resp.text().map_err(request_err)?;
        if body.trim().is_empty() {
            return Err(FetchError::Empty { url: s!(url) });
        }
        logd!("Net: {} bytes from {}", body.len(), truncate_chars(url, URL_LOG_CHARS));
        Ok(body)
    }
}
