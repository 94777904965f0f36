//! Timetable retrieval: REST resource first, rendered plan page second.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::fallback::{first_hit, FetchStrategy};
use crate::gateway::{as_u32, Gateway, NamedRef, TIMETABLE_PAGE};
use crate::models::{Timetable, TimetableEntry};
use crate::resolve::IdentifierMap;
use crate::scrape;

#[derive(Debug, Deserialize)]
struct RawLesson {
    #[serde(rename = "LessonNo")]
    lesson_no: Option<Value>,
    #[serde(rename = "HourFrom")]
    hour_from: Option<String>,
    #[serde(rename = "HourTo")]
    hour_to: Option<String>,
    #[serde(rename = "Subject")]
    subject: Option<NamedRef>,
    #[serde(rename = "Teacher")]
    teacher: Option<RawTeacher>,
    #[serde(rename = "Classroom")]
    classroom: Option<NamedRef>,
    #[serde(rename = "IsCanceled", default)]
    is_canceled: bool,
    #[serde(rename = "IsSubstitutionClass", default)]
    is_substitution: bool,
}

#[derive(Debug, Deserialize)]
struct RawTeacher {
    #[serde(rename = "FirstName")]
    first_name: Option<String>,
    #[serde(rename = "LastName")]
    last_name: Option<String>,
}

/// Flatten the REST timetable — date keys holding nested lesson-slot
/// groups — into date-grouped entries. Classroom ids resolve through the
/// lookup; a slot that does not match the expected shape is skipped.
fn normalize_timetable(timetable: &Value, rooms: &IdentifierMap) -> Option<Timetable> {
    let days = timetable.as_object()?;

    let mut result = Timetable::new();
    for (date, slots) in days {
        let mut entries = Vec::new();
        for slot in slots.as_array().into_iter().flatten() {
            for lesson in slot.as_array().into_iter().flatten() {
                let Ok(raw) = serde_json::from_value::<RawLesson>(lesson.clone()) else {
                    continue;
                };
                let Some(subject) = raw.subject.as_ref().and_then(|s| s.name.clone()) else {
                    continue;
                };
                let Some(lesson_no) = raw.lesson_no.as_ref().and_then(as_u32) else {
                    continue;
                };

                let time_range = match (raw.hour_from, raw.hour_to) {
                    (Some(from), Some(to)) => Some(format!("{from}-{to}")),
                    _ => None,
                };
                let teacher = raw
                    .teacher
                    .map(|t| {
                        [t.first_name, t.last_name]
                            .into_iter()
                            .flatten()
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .filter(|name| !name.is_empty());
                let room = raw
                    .classroom
                    .and_then(|c| c.name.or_else(|| c.id.map(|id| rooms.resolve(Some(id)))));

                entries.push(TimetableEntry {
                    date: date.clone(),
                    lesson_no,
                    time_range,
                    subject,
                    teacher,
                    room,
                    is_cancelled: raw.is_canceled,
                    is_substitution: raw.is_substitution,
                });
            }
        }
        if !entries.is_empty() {
            entries.sort_by_key(|entry| entry.lesson_no);
            result.insert(date.clone(), entries);
        }
    }

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

struct RestTimetable<'a, G: Gateway> {
    gateway: &'a G,
}

#[async_trait]
impl<G: Gateway> FetchStrategy<Timetable> for RestTimetable<'_, G> {
    async fn try_fetch(&self) -> Option<Timetable> {
        let (envelope, classrooms) = tokio::join!(
            self.gateway.fetch_json("/Timetables"),
            self.gateway.fetch_json("/Classrooms"),
        );
        let envelope = envelope?;
        let rooms = IdentifierMap::from_listing(classrooms.as_ref(), &["Classrooms"]);
        normalize_timetable(envelope.get("Timetable")?, &rooms)
    }
}

struct PlanPageTimetable<'a, G: Gateway> {
    gateway: &'a G,
}

#[async_trait]
impl<G: Gateway> FetchStrategy<Timetable> for PlanPageTimetable<'_, G> {
    async fn try_fetch(&self) -> Option<Timetable> {
        let html = self.gateway.fetch_page(TIMETABLE_PAGE).await?;
        scrape::extract_timetable(&html)
    }
}

/// Fetch the timetable through the strategy chain: REST when the school
/// enables it, the rendered plan page otherwise. `None` only when both
/// sources come up empty.
pub async fn fetch_timetable<G: Gateway>(gateway: &G) -> Option<Timetable> {
    let rest = RestTimetable { gateway };
    let page = PlanPageTimetable { gateway };
    first_hit(&[&rest as &dyn FetchStrategy<Timetable>, &page]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_slot_groups_and_resolves_rooms() {
        let timetable = json!({
            "2024-03-04": [
                [ {
                    "LessonNo": "1",
                    "HourFrom": "08:00",
                    "HourTo": "08:45",
                    "Subject": { "Id": 3, "Name": "Matematyka" },
                    "Teacher": { "FirstName": "Anna", "LastName": "Kowalska" },
                    "Classroom": { "Id": 12 },
                } ],
                [],
                [ {
                    "LessonNo": 2,
                    "Subject": { "Id": 4, "Name": "Fizyka" },
                    "IsCanceled": true,
                } ],
            ],
            "2024-03-05": [ [] ],
        });
        let rooms_envelope = json!({ "Classrooms": [ { "Id": 12, "Name": "114" } ] });
        let rooms = IdentifierMap::from_listing(Some(&rooms_envelope), &["Classrooms"]);

        let result = normalize_timetable(&timetable, &rooms).expect("entries expected");
        assert_eq!(result.len(), 1, "empty days are omitted");

        let monday = &result["2024-03-04"];
        assert_eq!(monday.len(), 2);
        assert_eq!(monday[0].subject, "Matematyka");
        assert_eq!(monday[0].teacher.as_deref(), Some("Anna Kowalska"));
        assert_eq!(monday[0].room.as_deref(), Some("114"));
        assert_eq!(monday[0].time_range.as_deref(), Some("08:00-08:45"));
        assert!(monday[1].is_cancelled);
        assert_eq!(monday[1].room, None);
    }

    #[test]
    fn unresolvable_classroom_gets_hash_label() {
        let timetable = json!({
            "2024-03-04": [ [ {
                "LessonNo": 1,
                "Subject": { "Name": "Chemia" },
                "Classroom": { "Id": 99 },
            } ] ],
        });
        let result = normalize_timetable(&timetable, &IdentifierMap::default()).unwrap();
        assert_eq!(result["2024-03-04"][0].room.as_deref(), Some("#99"));
    }

    #[test]
    fn empty_or_foreign_shape_is_none() {
        assert!(normalize_timetable(&json!({}), &IdentifierMap::default()).is_none());
        assert!(normalize_timetable(&json!([1, 2]), &IdentifierMap::default()).is_none());
    }
}
