//! Authenticated access to the REST gateway and the legacy rendered pages.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SYNERGIA_HOST;
use crate::session::Session;
use crate::transport::{Exchange, HttpTransport, Method, RequestSpec};

/// Gateway resource paths are relative to this base.
pub const GATEWAY_BASE: &str = "/gateway/api/2.0";

/// Legacy rendered grades page, scraped when the REST listings fall short.
pub const GRADES_PAGE: &str = "/przegladaj_oceny/uczen";
/// Legacy rendered weekly plan page.
pub const TIMETABLE_PAGE: &str = "/przegladaj_plan_lekcji";

/// Seam between normalization and the upstream.
///
/// Absent resources come back as `None`, never as an error: school
/// deployments differ in which REST endpoints are enabled, so a missing
/// resource is a normal outcome that callers replace with a typed default.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Authenticated GET of a gateway resource, e.g. `/Grades`.
    async fn fetch_json(&self, path: &str) -> Option<Value>;

    /// Authenticated GET of a server-rendered page, e.g. `/przegladaj_plan_lekcji`.
    async fn fetch_page(&self, path: &str) -> Option<String>;
}

/// Real gateway bound to one established, read-only session.
pub struct SynergiaGateway<'a, T: HttpTransport> {
    transport: &'a T,
    session: &'a Session,
}

impl<'a, T: HttpTransport> SynergiaGateway<'a, T> {
    pub fn new(transport: &'a T, session: &'a Session) -> Self {
        Self { transport, session }
    }

    /// Best-effort activation of the gateway API for this session.
    ///
    /// Some accounts work without it, so failures here are diagnostics,
    /// never login failures.
    pub async fn activate(&self) {
        let Some(token_info) = self.fetch_json("/Auth/TokenInfo").await else {
            debug!("TokenInfo unavailable; continuing without gateway activation");
            return;
        };
        let identifier = match token_info.get("UserIdentifier") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                debug!("TokenInfo carried no UserIdentifier; continuing without activation");
                return;
            }
        };
        self.fetch_json(&format!("/Auth/UserInfo/{identifier}")).await;
    }

    async fn get(&self, path: &str) -> Option<Exchange> {
        let result = self
            .transport
            .execute(RequestSpec {
                method: Method::Get,
                host: SYNERGIA_HOST,
                path,
                form_body: None,
                cookies: self.session.cookies(),
                referer: None,
            })
            .await;

        match result {
            Ok(exchange) if exchange.is_success() => Some(exchange),
            Ok(exchange) => {
                warn!(path = %path, status = exchange.status, "resource unavailable");
                None
            }
            Err(err) => {
                warn!(path = %path, error = %err, "resource fetch failed");
                None
            }
        }
    }
}

#[async_trait]
impl<T: HttpTransport> Gateway for SynergiaGateway<'_, T> {
    async fn fetch_json(&self, path: &str) -> Option<Value> {
        let full_path = format!("{GATEWAY_BASE}{path}");
        let exchange = self.get(&full_path).await?;
        match serde_json::from_str(&exchange.body) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(path = %path, error = %err, "resource body is not JSON");
                None
            }
        }
    }

    async fn fetch_page(&self, path: &str) -> Option<String> {
        Some(self.get(path).await?.body)
    }
}

/// Reference-by-id shape used throughout gateway records.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct IdRef {
    #[serde(rename = "Id")]
    pub id: i64,
}

/// Reference that may carry an inline display name.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NamedRef {
    #[serde(rename = "Id")]
    pub id: Option<i64>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
}

/// Deserialize the array nested under the envelope's plural resource key,
/// tolerating absence and per-item shape drift.
pub(crate) fn listing<T: DeserializeOwned>(envelope: &Value, key: &str) -> Vec<T> {
    envelope
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// The gateway serves numeric fields both as numbers and numeric strings.
pub(crate) fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_reads_nested_array() {
        let envelope = json!({ "Subjects": [ { "Id": 1 }, { "Id": 2 } ] });
        let refs: Vec<IdRef> = listing(&envelope, "Subjects");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].id, 1);
    }

    #[test]
    fn listing_tolerates_missing_key_and_bad_items() {
        let envelope = json!({ "Grades": [ { "Id": 1 }, "garbage" ] });
        let refs: Vec<IdRef> = listing(&envelope, "Subjects");
        assert!(refs.is_empty());

        let refs: Vec<IdRef> = listing(&envelope, "Grades");
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn as_u32_accepts_numbers_and_numeric_strings() {
        assert_eq!(as_u32(&json!(3)), Some(3));
        assert_eq!(as_u32(&json!("7")), Some(7));
        assert_eq!(as_u32(&json!(" 2 ")), Some(2));
        assert_eq!(as_u32(&json!(null)), None);
        assert_eq!(as_u32(&json!("x")), None);
    }
}
