//! One-shot HTTP transport with explicit cookie handling.
//!
//! Redirects are never followed: the login flow alternates between the
//! OAuth host and the session host, so redirect targets come back as data
//! and the authenticator decides the host/path transitions itself.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use tracing::debug;

use crate::error::TransportError;
use crate::session::CookieSet;

/// Default ceiling for a single upstream request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One upstream request. A `form_body` implies
/// `Content-Type: application/x-www-form-urlencoded`.
#[derive(Debug)]
pub struct RequestSpec<'a> {
    pub method: Method,
    pub host: &'a str,
    pub path: &'a str,
    pub form_body: Option<String>,
    pub cookies: &'a CookieSet,
    pub referer: Option<&'a str>,
}

/// Result of one request. Non-2xx statuses are normal, inspectable data;
/// redirect targets come back in `location` instead of being followed.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub new_cookies: Vec<(String, String)>,
    pub location: Option<String>,
}

impl Exchange {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Seam over the HTTP layer so the login flow and gateway access are
/// testable without a network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, spec: RequestSpec<'_>) -> Result<Exchange, TransportError>;
}

/// `reqwest`-backed transport.
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let mut headers = header::HeaderMap::new();
        // The upstream serves gzip-mangled bodies to some clients; identity
        // keeps the grant response inspectable as plain text.
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("pl,en-US;q=0.7,en;q=0.3"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(TransportError::Network)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for Transport {
    async fn execute(&self, spec: RequestSpec<'_>) -> Result<Exchange, TransportError> {
        let url = format!("https://{}{}", spec.host, spec.path);

        let mut request = match spec.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !spec.cookies.is_empty() {
            request = request.header(header::COOKIE, spec.cookies.header_value());
        }
        if let Some(referer) = spec.referer {
            request = request.header(header::REFERER, referer.to_string());
        }
        if let Some(body) = spec.form_body {
            request = request
                .header(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                )
                .body(body);
        }

        debug!(url = %url, method = ?spec.method, "upstream request");

        let response = request.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let new_cookies = parse_set_cookies(response.headers());
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let body = response.text().await.map_err(classify)?;
        debug!(url = %url, status = status, bytes = body.len(), "upstream response");

        Ok(Exchange {
            status,
            headers,
            body,
            new_cookies,
            location,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err)
    }
}

/// Parse name/value pairs out of every `Set-Cookie` header, keeping only
/// the first `;`-delimited segment (attributes are irrelevant upstream).
fn parse_set_cookies(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| {
            let pair = raw.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_set_cookie_headers() {
        let mut headers = header::HeaderMap::new();
        headers.append(
            header::SET_COOKIE,
            "SDZIENNIKSID=abc123; path=/; HttpOnly".parse().unwrap(),
        );
        headers.append(header::SET_COOKIE, "oauth_token=xyz".parse().unwrap());

        let cookies = parse_set_cookies(&headers);
        assert_eq!(
            cookies,
            vec![
                ("SDZIENNIKSID".to_string(), "abc123".to_string()),
                ("oauth_token".to_string(), "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn ignores_malformed_set_cookie() {
        let mut headers = header::HeaderMap::new();
        headers.append(header::SET_COOKIE, "no-equals-sign".parse().unwrap());
        assert!(parse_set_cookies(&headers).is_empty());
    }

    #[test]
    fn exchange_success_range() {
        let mut exchange = Exchange::default();
        exchange.status = 200;
        assert!(exchange.is_success());
        exchange.status = 302;
        assert!(!exchange.is_success());
    }
}
