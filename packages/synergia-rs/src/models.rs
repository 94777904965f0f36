//! Normalized domain records returned to callers.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Which extraction path produced a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradeKind {
    Standard,
    Point,
    HtmlFallback,
}

/// One normalized grade.
///
/// `value` is always a display string: the literal grade symbol for
/// standard grades, `"earned/max"` for point-based grades.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub subject: String,
    pub value: String,
    pub category: String,
    pub weight: u32,
    pub date: Option<String>,
    pub semester: Option<u32>,
    pub is_final: bool,
    pub is_semestral: bool,
    pub kind: GradeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    pub type_id: Option<i64>,
    pub date: Option<String>,
    pub lesson_no: Option<u32>,
}

/// Per-type counts plus the ordered raw record list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub summary: BTreeMap<String, u32>,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub date: String,
    pub lesson_no: u32,
    pub time_range: Option<String>,
    pub subject: String,
    pub teacher: Option<String>,
    pub room: Option<String>,
    pub is_cancelled: bool,
    pub is_substitution: bool,
}

/// Lessons grouped by ISO date.
pub type Timetable = BTreeMap<String, Vec<TimetableEntry>>;

/// Final response envelope. Every field is independently sourced and
/// degrades to its documented default when its source fails; there are no
/// cross-field invariants.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedProfile {
    pub grades: Vec<GradeRecord>,
    pub attendance: AttendanceSummary,
    pub timetable: Option<Timetable>,
    pub lucky_number: Option<i64>,
    pub user: Option<Value>,
}
