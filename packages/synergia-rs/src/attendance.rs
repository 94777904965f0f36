//! Attendance retrieval and normalization.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::gateway::{as_u32, listing, Gateway, IdRef};
use crate::models::{AttendanceRecord, AttendanceSummary};
use crate::resolve::IdentifierMap;

#[derive(Debug, Deserialize)]
struct RawAttendance {
    #[serde(rename = "Type")]
    kind: Option<IdRef>,
    #[serde(rename = "Date")]
    date: Option<String>,
    // Served both as a number and a numeric string.
    #[serde(rename = "LessonNo")]
    lesson_no: Option<Value>,
}

fn normalize_attendance(raw: Vec<RawAttendance>, types: &IdentifierMap) -> AttendanceSummary {
    let mut summary: BTreeMap<String, u32> = BTreeMap::new();
    let records = raw
        .into_iter()
        .map(|entry| {
            let type_id = entry.kind.map(|r| r.id);
            let type_name = types.resolve(type_id);
            *summary.entry(type_name.clone()).or_insert(0) += 1;
            AttendanceRecord {
                type_name,
                type_id,
                date: entry.date,
                lesson_no: entry.lesson_no.as_ref().and_then(as_u32),
            }
        })
        .collect();

    AttendanceSummary { summary, records }
}

/// Fetch the attendance listing and its type lookup concurrently, producing
/// per-type counts plus the ordered raw record list. An absent listing
/// degrades to the empty summary.
pub async fn fetch_attendance<G: Gateway>(gateway: &G) -> AttendanceSummary {
    let (attendances, types) = tokio::join!(
        gateway.fetch_json("/Attendances"),
        gateway.fetch_json("/Attendances/Types"),
    );

    let Some(attendances) = attendances else {
        return AttendanceSummary::default();
    };

    let raw: Vec<RawAttendance> = listing(&attendances, "Attendances");
    let types = IdentifierMap::from_listing(types.as_ref(), &["Types"]);
    normalize_attendance(raw, &types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_per_resolved_type_name() {
        let raw: Vec<RawAttendance> = vec![
            serde_json::from_value(json!({ "Type": { "Id": 1 }, "Date": "2024-03-01", "LessonNo": "2" }))
                .unwrap(),
            serde_json::from_value(json!({ "Type": { "Id": 1 }, "Date": "2024-03-02", "LessonNo": 5 }))
                .unwrap(),
            serde_json::from_value(json!({ "Type": { "Id": 9 }, "Date": "2024-03-02" })).unwrap(),
        ];
        let types_envelope = json!({ "Types": [ { "Id": 1, "Name": "Spóźnienie" } ] });
        let types = IdentifierMap::from_listing(Some(&types_envelope), &["Types"]);

        let result = normalize_attendance(raw, &types);
        assert_eq!(result.summary.get("Spóźnienie"), Some(&2));
        assert_eq!(result.summary.get("#9"), Some(&1));
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.records[0].lesson_no, Some(2));
        assert_eq!(result.records[1].lesson_no, Some(5));
        assert_eq!(result.records[2].lesson_no, None);
    }

    #[test]
    fn record_order_follows_input_order() {
        let raw: Vec<RawAttendance> = vec![
            serde_json::from_value(json!({ "Date": "2024-03-05" })).unwrap(),
            serde_json::from_value(json!({ "Date": "2024-03-01" })).unwrap(),
        ];
        let result = normalize_attendance(raw, &IdentifierMap::default());
        assert_eq!(result.records[0].date.as_deref(), Some("2024-03-05"));
        assert_eq!(result.records[1].date.as_deref(), Some("2024-03-01"));
    }
}
