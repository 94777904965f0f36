//! Concurrent aggregation of the independent per-resource retrievals.

use serde_json::Value;

use crate::gateway::Gateway;
use crate::models::AggregatedProfile;
use crate::{attendance, grades, timetable};

async fn fetch_lucky_number<G: Gateway>(gateway: &G) -> Option<i64> {
    gateway
        .fetch_json("/LuckyNumbers")
        .await?
        .get("LuckyNumber")?
        .get("LuckyNumber")?
        .as_i64()
}

async fn fetch_user<G: Gateway>(gateway: &G) -> Option<Value> {
    gateway.fetch_json("/Me").await?.get("Me").cloned()
}

/// Issue all retrievals concurrently against one established session.
///
/// The session is read-only here, so the fetches share it freely. Each
/// retrieval degrades to its documented default on its own; one failing
/// resource never aborts or delays its siblings, and relative completion
/// order is immaterial.
pub async fn fetch_profile<G: Gateway>(gateway: &G) -> AggregatedProfile {
    let (grades, attendance, timetable, lucky_number, user) = tokio::join!(
        grades::fetch_grades(gateway),
        attendance::fetch_attendance(gateway),
        timetable::fetch_timetable(gateway),
        fetch_lucky_number(gateway),
        fetch_user(gateway),
    );

    AggregatedProfile {
        grades,
        attendance,
        timetable,
        lucky_number,
        user,
    }
}
