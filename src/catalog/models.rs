//! Wire models for the two catalog calls and the flat records built from
//! them.
//!
//! The catalog serves PascalCase JSON with liberal use of `null`; every wire
//! field is optional and flattening decides the defaults.

use serde::{Deserialize, Serialize};

/// Top level of a search response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResponse {
    pub courses: Option<Vec<CourseResult>>,
}

/// One course entry in a search response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CourseResult {
    pub id: Option<String>,
    pub subject_code: Option<String>,
    pub number: Option<String>,
    pub title: Option<String>,
    pub matching_section_ids: Option<Vec<String>>,
}

impl CourseResult {
    /// Converts the wire course into a match, or `None` when the relevance
    /// engine returned it without any matched sections.
    pub fn into_match(self) -> Option<CourseMatch> {
        let course_id = self.id.unwrap_or_default();
        let section_ids = self.matching_section_ids.unwrap_or_default();
        if course_id.is_empty() || section_ids.is_empty() {
            return None;
        }
        Some(CourseMatch {
            course_id,
            subject_code: self.subject_code.unwrap_or_default(),
            course_number: self.number.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            section_ids,
        })
    }
}

/// A course surfaced by a subject search, with the section ids that matched
/// the filter. Drives the follow-up detail call; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseMatch {
    pub course_id: String,
    pub subject_code: String,
    pub course_number: String,
    pub title: String,
    pub section_ids: Vec<String>,
}

/// Top level of a section-detail response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectionsResponse {
    pub sections_retrieved: Option<SectionsRetrieved>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectionsRetrieved {
    pub terms_and_sections: Option<Vec<TermGroup>>,
}

/// Sections grouped under one academic term.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TermGroup {
    pub term: Option<TermInfo>,
    pub sections: Option<Vec<SectionWrapper>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TermInfo {
    pub description: Option<String>,
}

/// Wrapper the catalog places around each section. Faculty fields live on
/// the wrapper, beside the section object rather than inside it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectionWrapper {
    pub section: Option<SectionInfo>,
    pub faculty_display: Option<String>,
    pub instructor_details: Option<Vec<InstructorDetail>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstructorDetail {
    pub faculty_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SectionInfo {
    pub id: Option<String>,
    pub course_id: Option<String>,
    pub section_name_display: Option<String>,
    pub section_title_display: Option<String>,
    pub available: Option<i32>,
    pub capacity: Option<i32>,
    pub enrolled: Option<i32>,
    pub waitlisted: Option<i32>,
    pub start_date_display: Option<String>,
    pub end_date_display: Option<String>,
    pub location_display: Option<String>,
    pub minimum_credits: Option<f64>,
    pub formatted_meeting_times: Option<Vec<MeetingTimeInfo>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeetingTimeInfo {
    pub days_of_week_display: Option<String>,
    pub start_time_display: Option<String>,
    pub end_time_display: Option<String>,
    pub building_display: Option<String>,
    pub room_display: Option<String>,
    pub is_online: Option<bool>,
}

impl MeetingTimeInfo {
    fn into_meeting(self) -> MeetingTime {
        MeetingTime {
            days: self.days_of_week_display.unwrap_or_default(),
            start_time: self.start_time_display.unwrap_or_default(),
            end_time: self.end_time_display.unwrap_or_default(),
            location: join_location(
                self.building_display.as_deref(),
                self.room_display.as_deref(),
            ),
            is_online: self.is_online.unwrap_or(false),
        }
    }
}

/// One scheduled meeting of a section, as the catalog displays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingTime {
    pub days: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub is_online: bool,
}

/// The flattened, persisted form of one course section.
///
/// The write timestamp and owning job id are stamped by the store at upsert
/// time rather than carried here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub section_id: String,
    pub course_id: String,
    pub subject_code: String,
    pub course_number: String,
    pub section_number: String,
    pub title: String,
    pub available: i32,
    pub capacity: i32,
    pub enrolled: i32,
    pub waitlisted: i32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub credits: Option<f64>,
    pub term: Option<String>,
    pub meeting_times: Vec<MeetingTime>,
    pub instructors: Vec<String>,
}

impl SectionWrapper {
    /// Flattens the wrapper into the persisted record shape.
    ///
    /// Subject and number are the first two hyphen-delimited tokens of the
    /// section display name ("CSC-151-D01" yields "CSC"/"151"); that is how
    /// the source system encodes them. Returns `None` when the wrapper
    /// carries no usable section id.
    pub fn into_record(self, term: Option<&str>) -> Option<SectionRecord> {
        let section = self.section?;
        let section_id = section.id.unwrap_or_default();
        if section_id.is_empty() {
            return None;
        }

        let section_number = section.section_name_display.unwrap_or_default();
        let (subject_code, course_number) = split_section_name(&section_number);
        let instructors = collect_instructors(
            self.faculty_display.as_deref(),
            self.instructor_details.as_deref().unwrap_or_default(),
        );

        Some(SectionRecord {
            section_id,
            course_id: section.course_id.unwrap_or_default(),
            subject_code,
            course_number,
            section_number,
            title: section.section_title_display.unwrap_or_default(),
            available: counter(section.available),
            capacity: counter(section.capacity),
            enrolled: counter(section.enrolled),
            waitlisted: counter(section.waitlisted),
            start_date: none_if_blank(section.start_date_display),
            end_date: none_if_blank(section.end_date_display),
            location: none_if_blank(section.location_display),
            credits: section.minimum_credits,
            term: term.map(str::to_string),
            meeting_times: section
                .formatted_meeting_times
                .unwrap_or_default()
                .into_iter()
                .map(MeetingTimeInfo::into_meeting)
                .collect(),
            instructors,
        })
    }
}

/// Splits a section display name into subject code and course number.
fn split_section_name(name: &str) -> (String, String) {
    let mut parts = name.split('-');
    let subject = parts.next().unwrap_or_default().to_string();
    let number = parts.next().unwrap_or_default().to_string();
    (subject, number)
}

/// Enrollment counters are never negative; absent and null both mean zero.
fn counter(value: Option<i32>) -> i32 {
    value.unwrap_or(0).max(0)
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Joins building and room display fields with a single space, collapsing
/// empty components so the result carries no stray whitespace.
fn join_location(building: Option<&str>, room: Option<&str>) -> String {
    let building = building.unwrap_or_default().trim();
    let room = room.unwrap_or_default().trim();
    match (building.is_empty(), room.is_empty()) {
        (true, true) => String::new(),
        (false, true) => building.to_string(),
        (true, false) => room.to_string(),
        (false, false) => format!("{building} {room}"),
    }
}

/// Instructor names start from the wrapper's display field, then append
/// detail names not already present. First-seen order, exact-match dedup.
fn collect_instructors(display: Option<&str>, details: &[InstructorDetail]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    if let Some(display) = display {
        if !display.is_empty() {
            names.push(display.to_string());
        }
    }
    for detail in details {
        if let Some(name) = detail.faculty_name.as_deref() {
            if !name.is_empty() && !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Aggregate enrollment figures over a set of sections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnrollmentStats {
    pub total_sections: usize,
    pub total_capacity: i64,
    pub total_enrolled: i64,
    pub total_available: i64,
    pub total_waitlisted: i64,
    /// Enrolled over capacity as a percentage, rounded to two decimals.
    pub average_utilization: f64,
    pub sections_full: usize,
    pub sections_with_waitlist: usize,
}

impl EnrollmentStats {
    pub fn from_sections(sections: &[SectionRecord]) -> Self {
        let total_capacity: i64 = sections.iter().map(|s| i64::from(s.capacity)).sum();
        let total_enrolled: i64 = sections.iter().map(|s| i64::from(s.enrolled)).sum();
        let average_utilization = if total_capacity > 0 {
            (total_enrolled as f64 / total_capacity as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total_sections: sections.len(),
            total_capacity,
            total_enrolled,
            total_available: sections.iter().map(|s| i64::from(s.available)).sum(),
            total_waitlisted: sections.iter().map(|s| i64::from(s.waitlisted)).sum(),
            average_utilization,
            sections_full: sections.iter().filter(|s| s.available == 0).count(),
            sections_with_waitlist: sections.iter().filter(|s| s.waitlisted > 0).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper(section: SectionInfo) -> SectionWrapper {
        SectionWrapper {
            section: Some(section),
            faculty_display: None,
            instructor_details: None,
        }
    }

    fn bare_section(id: &str, name: &str) -> SectionInfo {
        SectionInfo {
            id: Some(id.to_string()),
            course_id: Some("COURSE-1".to_string()),
            section_name_display: Some(name.to_string()),
            section_title_display: Some("Intro".to_string()),
            available: None,
            capacity: None,
            enrolled: None,
            waitlisted: None,
            start_date_display: None,
            end_date_display: None,
            location_display: None,
            minimum_credits: None,
            formatted_meeting_times: None,
        }
    }

    fn record(available: i32, capacity: i32, enrolled: i32, waitlisted: i32) -> SectionRecord {
        SectionRecord {
            section_id: "S1".to_string(),
            course_id: "C1".to_string(),
            subject_code: "CSC".to_string(),
            course_number: "151".to_string(),
            section_number: "CSC-151-D01".to_string(),
            title: String::new(),
            available,
            capacity,
            enrolled,
            waitlisted,
            start_date: None,
            end_date: None,
            location: None,
            credits: None,
            term: None,
            meeting_times: Vec::new(),
            instructors: Vec::new(),
        }
    }

    #[test]
    fn test_course_without_matches_is_dropped() {
        let with_matches = CourseResult {
            id: Some("C1".to_string()),
            subject_code: Some("CSC".to_string()),
            number: Some("151".to_string()),
            title: Some("Intro".to_string()),
            matching_section_ids: Some(vec!["S1".to_string()]),
        };
        assert!(with_matches.into_match().is_some());

        let without_matches = CourseResult {
            id: Some("C2".to_string()),
            subject_code: None,
            number: None,
            title: None,
            matching_section_ids: Some(Vec::new()),
        };
        assert!(without_matches.into_match().is_none());

        let null_matches = CourseResult {
            id: Some("C3".to_string()),
            subject_code: None,
            number: None,
            title: None,
            matching_section_ids: None,
        };
        assert!(null_matches.into_match().is_none());
    }

    #[test]
    fn test_split_section_name() {
        assert_eq!(
            split_section_name("CSC-151-D01"),
            ("CSC".to_string(), "151".to_string())
        );
        assert_eq!(
            split_section_name("MAT-271"),
            ("MAT".to_string(), "271".to_string())
        );
        assert_eq!(
            split_section_name("CSC"),
            ("CSC".to_string(), String::new())
        );
        assert_eq!(split_section_name(""), (String::new(), String::new()));
        // Extra tokens beyond the first two are section designators.
        assert_eq!(
            split_section_name("ACA-122-N80-X"),
            ("ACA".to_string(), "122".to_string())
        );
    }

    #[test]
    fn test_join_location_collapses_empty_components() {
        assert_eq!(join_location(Some("Central"), Some("201")), "Central 201");
        assert_eq!(join_location(Some("Central"), None), "Central");
        assert_eq!(join_location(Some(""), Some("201")), "201");
        assert_eq!(join_location(None, None), "");
        assert_eq!(join_location(Some(" Central "), Some(" 201 ")), "Central 201");
    }

    #[test]
    fn test_instructors_dedup_first_seen() {
        let details = vec![
            InstructorDetail {
                faculty_name: Some("A. Turing".to_string()),
            },
            InstructorDetail {
                faculty_name: Some("G. Hopper".to_string()),
            },
            InstructorDetail {
                faculty_name: Some("A. Turing".to_string()),
            },
            InstructorDetail { faculty_name: None },
        ];
        let names = collect_instructors(Some("A. Turing"), &details);
        assert_eq!(names, vec!["A. Turing", "G. Hopper"]);
    }

    #[test]
    fn test_instructors_without_display_field() {
        let details = vec![InstructorDetail {
            faculty_name: Some("G. Hopper".to_string()),
        }];
        assert_eq!(collect_instructors(None, &details), vec!["G. Hopper"]);
        assert_eq!(collect_instructors(Some(""), &[]), Vec::<String>::new());
    }

    #[test]
    fn test_null_counters_default_to_zero() {
        let record = wrapper(bare_section("S1", "CSC-151-D01"))
            .into_record(Some("Fall 2026"))
            .expect("record should flatten");
        assert_eq!(record.available, 0);
        assert_eq!(record.capacity, 0);
        assert_eq!(record.enrolled, 0);
        assert_eq!(record.waitlisted, 0);
        assert_eq!(record.subject_code, "CSC");
        assert_eq!(record.course_number, "151");
        assert_eq!(record.term.as_deref(), Some("Fall 2026"));
    }

    #[test]
    fn test_negative_counters_clamped() {
        let mut section = bare_section("S1", "CSC-151-D01");
        section.available = Some(-3);
        section.capacity = Some(25);
        let record = wrapper(section).into_record(None).expect("record");
        assert_eq!(record.available, 0);
        assert_eq!(record.capacity, 25);
    }

    #[test]
    fn test_record_requires_section_id() {
        let mut section = bare_section("", "CSC-151-D01");
        assert!(wrapper(section).into_record(None).is_none());

        section = bare_section("S1", "CSC-151-D01");
        section.id = None;
        assert!(wrapper(section).into_record(None).is_none());

        let empty_wrapper = SectionWrapper {
            section: None,
            faculty_display: None,
            instructor_details: None,
        };
        assert!(empty_wrapper.into_record(None).is_none());
    }

    #[test]
    fn test_blank_display_fields_become_none() {
        let mut section = bare_section("S1", "CSC-151-D01");
        section.location_display = Some("   ".to_string());
        section.start_date_display = Some("8/18/2026".to_string());
        let record = wrapper(section).into_record(None).expect("record");
        assert_eq!(record.location, None);
        assert_eq!(record.start_date.as_deref(), Some("8/18/2026"));
    }

    #[test]
    fn test_meeting_times_flatten() {
        let mut section = bare_section("S1", "CSC-151-D01");
        section.formatted_meeting_times = Some(vec![MeetingTimeInfo {
            days_of_week_display: Some("M/W".to_string()),
            start_time_display: Some("9:00 AM".to_string()),
            end_time_display: Some("10:15 AM".to_string()),
            building_display: Some("Levine".to_string()),
            room_display: Some("2212".to_string()),
            is_online: None,
        }]);
        let record = wrapper(section).into_record(None).expect("record");
        assert_eq!(
            record.meeting_times,
            vec![MeetingTime {
                days: "M/W".to_string(),
                start_time: "9:00 AM".to_string(),
                end_time: "10:15 AM".to_string(),
                location: "Levine 2212".to_string(),
                is_online: false,
            }]
        );
    }

    #[test]
    fn test_enrollment_stats() {
        let sections = vec![
            record(0, 25, 25, 4),
            record(10, 30, 20, 0),
            record(5, 20, 15, 1),
        ];
        let stats = EnrollmentStats::from_sections(&sections);
        assert_eq!(stats.total_sections, 3);
        assert_eq!(stats.total_capacity, 75);
        assert_eq!(stats.total_enrolled, 60);
        assert_eq!(stats.total_available, 15);
        assert_eq!(stats.total_waitlisted, 5);
        assert_eq!(stats.average_utilization, 80.0);
        assert_eq!(stats.sections_full, 1);
        assert_eq!(stats.sections_with_waitlist, 2);
    }

    #[test]
    fn test_enrollment_stats_rounds_two_decimals() {
        let sections = vec![record(1, 3, 2, 0)];
        let stats = EnrollmentStats::from_sections(&sections);
        assert_eq!(stats.average_utilization, 66.67);
    }

    #[test]
    fn test_enrollment_stats_zero_capacity() {
        let stats = EnrollmentStats::from_sections(&[record(0, 0, 0, 0)]);
        assert_eq!(stats.average_utilization, 0.0);
        // Zero available counts as full even with zero capacity.
        assert_eq!(stats.sections_full, 1);
    }
}
