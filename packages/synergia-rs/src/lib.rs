//! Resilient client for the Librus Synergia school information service.
//!
//! The upstream exposes a multi-step cookie-based login sequence, a
//! partially-implemented REST gateway, and legacy server-rendered pages.
//! This crate drives the login as an explicit state machine, then retrieves
//! and normalizes heterogeneous record types (grades in several systems,
//! attendance, timetable) from whichever source a given school deployment
//! actually provides, degrading gracefully per resource.
//!
//! One [`Client::login_and_fetch`] call is one logical session: a fresh
//! cookie set, a sequential login, then concurrent read-only retrievals,
//! and nothing persisted afterwards.

pub mod attendance;
pub mod auth;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod grades;
pub mod models;
pub mod profile;
pub mod resolve;
pub mod scrape;
pub mod session;
pub mod timetable;
pub mod transport;

pub use error::{AuthError, AuthResult, TransportError};
pub use models::{
    AggregatedProfile, AttendanceRecord, AttendanceSummary, GradeKind, GradeRecord, Timetable,
    TimetableEntry,
};
pub use session::{CookieSet, Session};

use std::time::Duration;

use auth::Authenticator;
use gateway::SynergiaGateway;
use transport::Transport;

/// High-level entry point. Each call to [`Client::login_and_fetch`] runs a
/// complete login with a fresh cookie set; sessions are never pooled or
/// reused across calls.
pub struct Client {
    transport: Transport,
}

impl Client {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            transport: Transport::new()?,
        })
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            transport: Transport::with_timeout(timeout)?,
        })
    }

    /// Authenticate, then aggregate the student profile.
    ///
    /// Resource fetches are only attempted after a successful login; a
    /// classified [`AuthError`] is the only failure this returns, since
    /// every per-resource failure downgrades to that field's default.
    pub async fn login_and_fetch(
        &self,
        login: &str,
        password: &str,
    ) -> AuthResult<AggregatedProfile> {
        let session = Authenticator::new(&self.transport)
            .login(login, password)
            .await?;

        let gateway = SynergiaGateway::new(&self.transport, &session);
        gateway.activate().await;
        Ok(profile::fetch_profile(&gateway).await)
    }
}
