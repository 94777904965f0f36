//! Grade retrieval and normalization across the upstream's grade systems.
//!
//! The REST listings reference subjects and categories only by id, so the
//! lookup resources load concurrently with the grades themselves and the
//! ids are resolved into display names here. When the REST surface falls
//! short the rendered grades page supplies fallback entries, deduplicated
//! with REST precedence.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::gateway::{listing, Gateway, IdRef, GRADES_PAGE};
use crate::models::{GradeKind, GradeRecord};
use crate::resolve::IdentifierMap;
use crate::scrape;

#[derive(Debug, Deserialize)]
struct RawGrade {
    #[serde(rename = "Subject")]
    subject: Option<IdRef>,
    #[serde(rename = "Grade")]
    grade: String,
    #[serde(rename = "Category")]
    category: Option<IdRef>,
    #[serde(rename = "Weight")]
    weight: Option<u32>,
    #[serde(rename = "Date")]
    date: Option<String>,
    #[serde(rename = "Semester")]
    semester: Option<u32>,
    #[serde(rename = "IsFinal", default)]
    is_final: bool,
    #[serde(rename = "IsSemester", default)]
    is_semestral: bool,
}

#[derive(Debug, Deserialize)]
struct RawPointGrade {
    #[serde(rename = "Subject")]
    subject: Option<IdRef>,
    #[serde(rename = "StudentPoints")]
    student_points: Option<f64>,
    #[serde(rename = "MaxPoints")]
    max_points: Option<f64>,
    #[serde(rename = "Category")]
    category: Option<IdRef>,
    #[serde(rename = "Weight")]
    weight: Option<u32>,
    #[serde(rename = "Date")]
    date: Option<String>,
    #[serde(rename = "Semester")]
    semester: Option<u32>,
}

struct GradeLookups {
    subjects: IdentifierMap,
    categories: IdentifierMap,
    point_categories: IdentifierMap,
}

fn normalize_standard(raw: Vec<RawGrade>, lookups: &GradeLookups) -> Vec<GradeRecord> {
    raw.into_iter()
        .map(|g| GradeRecord {
            subject: lookups.subjects.resolve(g.subject.map(|r| r.id)),
            value: g.grade,
            category: lookups.categories.resolve(g.category.map(|r| r.id)),
            weight: g.weight.unwrap_or(1),
            date: g.date,
            semester: g.semester,
            is_final: g.is_final,
            is_semestral: g.is_semestral,
            kind: GradeKind::Standard,
        })
        .collect()
}

fn normalize_points(raw: Vec<RawPointGrade>, lookups: &GradeLookups) -> Vec<GradeRecord> {
    raw.into_iter()
        .map(|g| {
            let earned = g.student_points.unwrap_or(0.0);
            let max = g.max_points.unwrap_or(0.0);
            GradeRecord {
                subject: lookups.subjects.resolve(g.subject.map(|r| r.id)),
                value: format!("{earned}/{max}"),
                category: lookups.point_categories.resolve(g.category.map(|r| r.id)),
                weight: g.weight.unwrap_or(1),
                date: g.date,
                semester: g.semester,
                is_final: false,
                is_semestral: false,
                kind: GradeKind::Point,
            }
        })
        .collect()
}

fn dedup_key(record: &GradeRecord) -> (String, String, String) {
    (
        record.subject.clone(),
        record.value.clone(),
        record.category.clone(),
    )
}

/// Merge REST-sourced and fallback-sourced grades, deduplicating on the
/// (subject, value, category) triple. REST entries win on collision.
pub fn merge_grades(rest: Vec<GradeRecord>, fallback: Vec<GradeRecord>) -> Vec<GradeRecord> {
    let mut seen: HashSet<(String, String, String)> = rest.iter().map(dedup_key).collect();
    let mut merged = rest;
    for record in fallback {
        if seen.insert(dedup_key(&record)) {
            merged.push(record);
        }
    }
    merged
}

/// Fetch and normalize all grade systems for one session.
///
/// The rendered grades page is scraped only when a REST grade listing is
/// absent; its entries merge in behind the REST-sourced ones.
pub async fn fetch_grades<G: Gateway>(gateway: &G) -> Vec<GradeRecord> {
    let (grades, point_grades, subjects, categories, point_categories) = tokio::join!(
        gateway.fetch_json("/Grades"),
        gateway.fetch_json("/PointGrades"),
        gateway.fetch_json("/Subjects"),
        gateway.fetch_json("/Grades/Categories"),
        gateway.fetch_json("/PointGrades/Categories"),
    );

    let lookups = GradeLookups {
        subjects: IdentifierMap::from_listing(subjects.as_ref(), &["Subjects"]),
        categories: IdentifierMap::from_listing(categories.as_ref(), &["Categories"]),
        point_categories: IdentifierMap::from_listing(
            point_categories.as_ref(),
            &["Categories", "PointGradesCategories"],
        ),
    };

    let rest_incomplete = grades.is_none() || point_grades.is_none();

    let mut rest = normalize_standard(
        grades.as_ref().map(|v| listing(v, "Grades")).unwrap_or_default(),
        &lookups,
    );
    rest.extend(normalize_points(
        point_grades
            .as_ref()
            .map(|v| listing(v, "PointGrades"))
            .unwrap_or_default(),
        &lookups,
    ));

    let fallback = if rest_incomplete {
        debug!("REST grade listings incomplete; scraping rendered grades page");
        match gateway.fetch_page(GRADES_PAGE).await {
            Some(html) => scrape::extract_grades(&html),
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    merge_grades(rest, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookups() -> GradeLookups {
        let subjects = json!({ "Subjects": [ { "Id": 42, "Name": "Matematyka" } ] });
        let categories = json!({ "Categories": [ { "Id": 7, "Name": "Sprawdzian" } ] });
        GradeLookups {
            subjects: IdentifierMap::from_listing(Some(&subjects), &["Subjects"]),
            categories: IdentifierMap::from_listing(Some(&categories), &["Categories"]),
            point_categories: IdentifierMap::from_listing(None, &["Categories"]),
        }
    }

    #[test]
    fn standard_grade_keeps_literal_symbol() {
        let raw: Vec<RawGrade> = vec![serde_json::from_value(json!({
            "Subject": { "Id": 42 },
            "Grade": "4+",
            "Category": { "Id": 7 },
            "Weight": 3,
            "Date": "2024-03-01",
            "Semester": 2,
        }))
        .unwrap()];

        let records = normalize_standard(raw, &lookups());
        assert_eq!(records[0].subject, "Matematyka");
        assert_eq!(records[0].value, "4+");
        assert_eq!(records[0].category, "Sprawdzian");
        assert_eq!(records[0].weight, 3);
        assert_eq!(records[0].kind, GradeKind::Standard);
    }

    #[test]
    fn point_grade_formats_earned_over_max() {
        let raw: Vec<RawPointGrade> = vec![serde_json::from_value(json!({
            "Subject": { "Id": 42 },
            "StudentPoints": 7,
            "MaxPoints": 10,
        }))
        .unwrap()];

        let records = normalize_points(raw, &lookups());
        assert_eq!(records[0].value, "7/10");
        assert_eq!(records[0].kind, GradeKind::Point);
    }

    #[test]
    fn point_grade_keeps_fractional_points() {
        let raw: Vec<RawPointGrade> = vec![serde_json::from_value(json!({
            "StudentPoints": 7.5,
            "MaxPoints": 10,
        }))
        .unwrap()];

        let records = normalize_points(raw, &lookups());
        assert_eq!(records[0].value, "7.5/10");
    }

    #[test]
    fn unresolvable_subject_becomes_hash_label() {
        let raw: Vec<RawGrade> = vec![serde_json::from_value(json!({
            "Subject": { "Id": 77 },
            "Grade": "5",
        }))
        .unwrap()];

        let records = normalize_standard(raw, &lookups());
        assert_eq!(records[0].subject, "#77");
    }

    fn record(subject: &str, value: &str, category: &str, kind: GradeKind) -> GradeRecord {
        GradeRecord {
            subject: subject.to_string(),
            value: value.to_string(),
            category: category.to_string(),
            weight: 1,
            date: None,
            semester: None,
            is_final: false,
            is_semestral: false,
            kind,
        }
    }

    #[test]
    fn merge_keeps_rest_record_on_collision() {
        let rest = vec![record("Fizyka", "7/10", "Kartkówka", GradeKind::Point)];
        let fallback = vec![
            record("Fizyka", "7/10", "Kartkówka", GradeKind::HtmlFallback),
            record("Fizyka", "3/10", "Kartkówka", GradeKind::HtmlFallback),
        ];

        let merged = merge_grades(rest, fallback);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].kind, GradeKind::Point);
        assert_eq!(merged[1].value, "3/10");
    }

    #[test]
    fn merge_is_deterministic_on_repeat() {
        let rest = vec![record("A", "5", "x", GradeKind::Standard)];
        let fallback = vec![
            record("B", "4", "y", GradeKind::HtmlFallback),
            record("A", "5", "x", GradeKind::HtmlFallback),
        ];

        let first = merge_grades(rest.clone(), fallback.clone());
        let second = merge_grades(rest, fallback);
        assert_eq!(first, second);
    }
}
