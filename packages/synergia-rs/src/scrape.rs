//! Heuristic extraction from the legacy server-rendered pages.
//!
//! These parsers activate when a REST resource is unavailable or known to
//! omit information that only appears in rendered markup. They are
//! fail-soft by construction: a structure mismatch yields fewer records,
//! never an error that aborts the request.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::{GradeKind, GradeRecord, Timetable, TimetableEntry};

lazy_static! {
    static ref DATE_RE: Regex = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
    static ref TIME_RE: Regex = Regex::new(r"^\d{1,2}:\d{2}").unwrap();
    // "s. 12", "s.12", "sala 5", or a bare room number like "114" / "12a".
    static ref ROOM_RE: Regex = Regex::new(r"(?i)^(?:s\.?|sala)\s*\S+$|^\d+[a-z]?$").unwrap();
}

fn cell_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract grade entries from the rendered grades page.
///
/// The grades table is identified by content, not position: among the
/// `table.decorated` candidates, the one that actually contains titled
/// grade anchors wins (the first decorated table is sometimes an unrelated
/// summary). Per row, the first non-link cell of sufficient length is the
/// subject label; each titled anchor yields one record.
pub fn extract_grades(html: &str) -> Vec<GradeRecord> {
    let document = Html::parse_document(html);
    let Ok(table_sel) = Selector::parse("table.decorated") else {
        return Vec::new();
    };
    let Ok(row_sel) = Selector::parse("tr") else {
        return Vec::new();
    };
    let Ok(cell_sel) = Selector::parse("td") else {
        return Vec::new();
    };
    let Ok(link_sel) = Selector::parse("a") else {
        return Vec::new();
    };
    let Ok(graded_sel) = Selector::parse("a[title]") else {
        return Vec::new();
    };

    let table = document
        .select(&table_sel)
        .find(|table| table.select(&graded_sel).next().is_some());
    let Some(table) = table else {
        debug!("no decorated table with graded entries; skipping grade extraction");
        return Vec::new();
    };

    let mut grades = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 2 {
            continue;
        }

        let subject = cells.iter().find_map(|cell| {
            if cell.select(&link_sel).next().is_some() {
                return None;
            }
            let text = cell_text(cell);
            (text.len() >= 2).then_some(text)
        });
        let Some(subject) = subject else { continue };

        for anchor in row.select(&graded_sel) {
            let value = cell_text(&anchor);
            if value.is_empty() {
                continue;
            }
            let title = anchor.value().attr("title").unwrap_or_default();
            let category = title.split(';').next().unwrap_or("").trim();

            grades.push(GradeRecord {
                subject: subject.clone(),
                value,
                category: if category.is_empty() {
                    "Ocena".to_string()
                } else {
                    category.to_string()
                },
                weight: 1,
                date: DATE_RE.find(title).map(|m| m.as_str().to_string()),
                semester: None,
                is_final: false,
                is_semestral: false,
                kind: GradeKind::HtmlFallback,
            });
        }
    }

    grades
}

/// Split a lesson cell into (subject, teacher, room) along its structural
/// sub-elements and line breaks. The room is picked by pattern; the first
/// remaining line is assumed to be the teacher.
fn split_lesson_cell(cell: &ElementRef) -> Option<(String, Option<String>, Option<String>)> {
    let lines: Vec<String> = cell
        .text()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "\u{a0}")
        .map(str::to_string)
        .collect();

    let subject = lines.first().filter(|line| line.len() >= 2)?.clone();

    let mut teacher = None;
    let mut room = None;
    for line in lines.iter().skip(1) {
        if room.is_none() && ROOM_RE.is_match(line) {
            room = Some(line.clone());
        } else if teacher.is_none() {
            teacher = Some(line.clone());
        }
    }

    Some((subject, teacher, room))
}

/// Extract the weekly plan from the rendered timetable page.
///
/// The first row carrying embedded `YYYY-MM-DD` dates maps columns to
/// days; rows whose first cell parses as a lesson number contribute one
/// entry per dated column. Returns `None` when zero structural matches
/// are found.
pub fn extract_timetable(html: &str) -> Option<Timetable> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table.decorated").ok()?;
    let row_sel = Selector::parse("tr").ok()?;
    let header_sel = Selector::parse("th, td").ok()?;
    let cell_sel = Selector::parse("td").ok()?;

    let table = document.select(&table_sel).next()?;
    let rows: Vec<ElementRef> = table.select(&row_sel).collect();

    // Column → date map from the first row carrying embedded dates.
    let mut columns: BTreeMap<usize, String> = BTreeMap::new();
    for row in &rows {
        for (index, cell) in row.select(&header_sel).enumerate() {
            let text = cell_text(&cell);
            if let Some(found) = DATE_RE.find(&text) {
                columns.insert(index, found.as_str().to_string());
            }
        }
        if !columns.is_empty() {
            break;
        }
    }
    if columns.is_empty() {
        debug!("no dated header row in timetable page");
        return None;
    }

    let mut timetable = Timetable::new();
    for row in &rows {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 2 {
            continue;
        }
        let Ok(lesson_no) = cell_text(&cells[0]).parse::<u32>() else {
            continue;
        };
        let time_range = cells
            .get(1)
            .map(cell_text)
            .filter(|text| TIME_RE.is_match(text));

        for (index, date) in &columns {
            let Some(cell) = cells.get(*index) else { continue };
            let Some((subject, teacher, room)) = split_lesson_cell(cell) else {
                continue;
            };
            let text = cell_text(cell).to_lowercase();
            timetable
                .entry(date.clone())
                .or_insert_with(Vec::new)
                .push(TimetableEntry {
                    date: date.clone(),
                    lesson_no,
                    time_range: time_range.clone(),
                    subject,
                    teacher,
                    room,
                    is_cancelled: text.contains("odwołane") || text.contains("anulowane"),
                    is_substitution: text.contains("zastępstwo"),
                });
        }
    }

    for entries in timetable.values_mut() {
        entries.sort_by_key(|entry| entry.lesson_no);
    }

    if timetable.is_empty() {
        None
    } else {
        Some(timetable)
    }
}
