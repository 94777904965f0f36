//! Multi-step cookie-based login against the Synergia upstream.
//!
//! The flow is an explicit state machine: each step is strictly sequential
//! and consumes the cookies produced by the previous one. A single
//! `CookieSet` is threaded through the steps; nothing is shared or global.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::session::{CookieSet, Session};
use crate::transport::{Exchange, HttpTransport, Method, RequestSpec};

/// Host serving the OAuth login sequence.
pub const OAUTH_HOST: &str = "api.librus.pl";
/// Host serving the session pages and the REST gateway.
pub const SYNERGIA_HOST: &str = "synergia.librus.pl";

const AUTH_INIT_PATH: &str = "/OAuth/Authorization?client_id=46&response_type=code&scope=mydata";
const AUTH_GRANT_PATH: &str = "/OAuth/Authorization?client_id=46";

/// Presence of either cookie denotes an established Synergia session.
pub const SESSION_COOKIE_NAMES: [&str; 2] = ["DZIENNIKSID", "SDZIENNIKSID"];

/// Continuation hop cap. The upstream occasionally inserts consent or
/// two-factor hops; anything past this smells like a redirect loop.
const MAX_CONTINUATION_HOPS: usize = 3;

/// Progress through the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Init,
    CredentialsSubmitted,
    GrantEvaluated,
    SessionEstablished,
}

/// Outcome of the grant step, decided structurally from the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// Credentials accepted, no further hop required.
    Established,
    /// Credentials accepted, the upstream named the next step.
    Continue(String),
    /// Credentials rejected.
    Rejected,
}

/// Evaluate the grant response.
///
/// The upstream has alternated historically between a plain 302 redirect
/// and a JSON body carrying a `goTo` field, so both continuation shapes
/// are recognized structurally rather than by exact shape.
pub fn evaluate_grant(exchange: &Exchange) -> GrantOutcome {
    if exchange.status != 200 && exchange.status != 302 {
        return GrantOutcome::Rejected;
    }

    if let Ok(body) = serde_json::from_str::<Value>(&exchange.body) {
        let reported_error = body.get("status").and_then(Value::as_str) == Some("error")
            || body.get("errors").is_some();
        if reported_error {
            return GrantOutcome::Rejected;
        }
        if let Some(target) = body.get("goTo").and_then(Value::as_str) {
            return GrantOutcome::Continue(target.to_string());
        }
    }

    if let Some(location) = &exchange.location {
        return GrantOutcome::Continue(location.clone());
    }

    GrantOutcome::Established
}

/// Split a continuation target into (host, path). Relative targets resolve
/// against the host that issued the response; absolute ones switch hosts
/// mid-flow (the upstream alternates between the OAuth and session hosts).
fn split_target(target: &str, current_host: &str) -> AuthResult<(String, String)> {
    if target.starts_with("http://") || target.starts_with("https://") {
        let parsed = url::Url::parse(target).map_err(|_| AuthError::ProtocolChanged {
            reason: format!("unparseable continuation target: {target}"),
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| AuthError::ProtocolChanged {
                reason: "continuation target has no host".to_string(),
            })?
            .to_string();
        let mut path = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }
        Ok((host, path))
    } else if target.starts_with('/') {
        Ok((current_host.to_string(), target.to_string()))
    } else {
        Ok((current_host.to_string(), format!("/{target}")))
    }
}

/// Drives the login state machine against a transport.
pub struct Authenticator<'a, T: HttpTransport> {
    transport: &'a T,
}

impl<'a, T: HttpTransport> Authenticator<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Run the full login flow, producing an authenticated session or a
    /// classified failure. Each login starts from a fresh, empty cookie set.
    pub async fn login(&self, login: &str, password: &str) -> AuthResult<Session> {
        let mut state = LoginState::Init;
        let mut cookies = CookieSet::new();
        debug!(state = ?state, "login started");

        // Init: an unauthenticated GET seeds the cookie set.
        let init = self
            .transport
            .execute(RequestSpec {
                method: Method::Get,
                host: OAUTH_HOST,
                path: AUTH_INIT_PATH,
                form_body: None,
                cookies: &cookies,
                referer: None,
            })
            .await?;
        cookies.merge(&init.new_cookies);
        state = LoginState::CredentialsSubmitted;
        debug!(state = ?state, cookies = cookies.len(), "login initiated");

        // Submit the credential pair. The upstream rejects requests whose
        // Referer does not match the previous step's URL.
        let init_url = format!("https://{OAUTH_HOST}{AUTH_INIT_PATH}");
        let form = format!(
            "action=login&login={}&pass={}",
            urlencoding::encode(login),
            urlencoding::encode(password)
        );
        let grant = self
            .transport
            .execute(RequestSpec {
                method: Method::Post,
                host: OAUTH_HOST,
                path: AUTH_GRANT_PATH,
                form_body: Some(form),
                cookies: &cookies,
                referer: Some(&init_url),
            })
            .await?;
        cookies.merge(&grant.new_cookies);
        state = LoginState::GrantEvaluated;
        debug!(state = ?state, status = grant.status, "grant response received");

        let mut outcome = evaluate_grant(&grant);
        if outcome == GrantOutcome::Rejected {
            return Err(AuthError::InvalidCredentials);
        }

        // Follow the continuation chain, merging cookies at every hop and
        // chaining the referer to the previous step's URL.
        let mut referer = format!("https://{OAUTH_HOST}{AUTH_GRANT_PATH}");
        let mut current_host = OAUTH_HOST.to_string();
        let mut hops = 0usize;
        while let GrantOutcome::Continue(target) = outcome {
            if hops >= MAX_CONTINUATION_HOPS {
                return Err(AuthError::ProtocolChanged {
                    reason: format!("more than {MAX_CONTINUATION_HOPS} continuation hops"),
                });
            }
            hops += 1;

            let (host, path) = split_target(&target, &current_host)?;
            debug!(hop = hops, host = %host, path = %path, "following login continuation");
            let next = self
                .transport
                .execute(RequestSpec {
                    method: Method::Get,
                    host: &host,
                    path: &path,
                    form_body: None,
                    cookies: &cookies,
                    referer: Some(&referer),
                })
                .await?;
            cookies.merge(&next.new_cookies);
            referer = format!("https://{host}{path}");
            current_host = host;

            outcome = match next.location {
                Some(location) => GrantOutcome::Continue(location),
                None => GrantOutcome::Established,
            };
        }

        if !cookies.contains_any(&SESSION_COOKIE_NAMES) {
            warn!("login flow finished without a recognized session cookie");
            return Err(AuthError::NoSessionCookies);
        }

        state = LoginState::SessionEstablished;
        debug!(state = ?state, cookies = cookies.len(), "session established");
        Ok(Session::new(cookies))
    }
}
