//! HTTP client for the Colleague Self-Service course catalog.
//!
//! The catalog has no public API; both operations replay the internal calls
//! its own search page makes, authenticated with credentials harvested from
//! the landing page.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header;
use reqwest::redirect;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::errors::{CatalogError, SessionInitError};
use super::json::parse_json_with_context;
use super::models::{CourseMatch, CourseResult, SearchResponse, SectionRecord, SectionsResponse};
use super::session::{self, ANTIFORGERY_COOKIE, Session, VERIFICATION_TOKEN_NAME};

/// Page that issues the antiforgery cookie and verification token.
const LANDING_PATH: &str = "/Student/Courses";
const SEARCH_PATH: &str = "/Student/Courses/PostSearchCriteria";
const SECTIONS_PATH: &str = "/Student/Courses/Sections";

/// The catalog behaves inconsistently for non-browser user agents.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:140.0) Gecko/20100101 Firefox/140.0";

const BOOTSTRAP_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const AJAX_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const AJAX_CONTENT_TYPE: &str = "application/json, charset=utf-8";

/// Bound on bootstrap redirect hops.
const MAX_REDIRECTS: usize = 5;

/// Page size large enough that a subject search returns in one page.
const QUANTITY_PER_PAGE: u32 = 500;

/// Catalog operations the sync pipeline drives.
///
/// Implemented by [`CatalogApi`] against the live site and by in-memory
/// fakes in orchestrator tests.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Bootstraps an authenticated session from the landing page.
    async fn acquire_session(&self) -> Result<Session, SessionInitError>;

    /// Searches one subject under one term, returning only courses that
    /// matched at least one section.
    async fn search(
        &self,
        session: &Session,
        subject: &str,
        term: &str,
    ) -> Result<Vec<CourseMatch>, CatalogError>;

    /// Fetches flattened section records for one course's matched sections.
    async fn section_details(
        &self,
        session: &Session,
        course_id: &str,
        section_ids: &[String],
    ) -> Result<Vec<SectionRecord>, CatalogError>;
}

/// Client for one Colleague Self-Service instance.
pub struct CatalogApi {
    http: reqwest::Client,
    landing_url: Url,
    search_url: Url,
    sections_url: Url,
    origin: String,
}

impl CatalogApi {
    /// Builds a client rooted at `base_url`.
    ///
    /// Redirects are never followed automatically; the bootstrap walks them
    /// by hand so cookies set by intermediate hops are captured.
    pub fn new(base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let landing_url = base_url
            .join(LANDING_PATH)
            .context("Invalid catalog base URL")?;
        let search_url = base_url
            .join(SEARCH_PATH)
            .context("Invalid catalog base URL")?;
        let sections_url = base_url
            .join(SECTIONS_PATH)
            .context("Invalid catalog base URL")?;
        let origin = base_url.origin().ascii_serialization();

        Ok(Self {
            http,
            landing_url,
            search_url,
            sections_url,
            origin,
        })
    }

    /// Fetches the landing page, walking redirects and collecting every
    /// `Set-Cookie` header seen along the way.
    async fn fetch_landing(
        &self,
    ) -> Result<(BTreeMap<String, String>, Vec<String>, String), SessionInitError> {
        let mut url = self.landing_url.clone();
        let mut cookies: BTreeMap<String, String> = BTreeMap::new();
        let mut raw_set_cookie: Vec<String> = Vec::new();

        for _ in 0..MAX_REDIRECTS {
            let mut request = self
                .http
                .get(url.clone())
                .header(header::USER_AGENT, USER_AGENT)
                .header(header::ACCEPT, BOOTSTRAP_ACCEPT)
                .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5");
            if !cookies.is_empty() {
                request = request.header(header::COOKIE, cookie_header(&cookies));
            }

            let response = request.send().await?;
            for value in response.headers().get_all(header::SET_COOKIE) {
                if let Ok(text) = value.to_str() {
                    raw_set_cookie.push(text.to_string());
                    if let Some((name, value)) = session::parse_set_cookie(text) {
                        cookies.insert(name, value);
                    }
                }
            }

            let status = response.status();
            if status.is_redirection() {
                let target = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|location| location.to_str().ok())
                    .and_then(|location| url.join(location).ok());
                match target {
                    Some(next) => {
                        debug!(from = %url, to = %next, "Following landing page redirect");
                        url = next;
                        continue;
                    }
                    None => return Err(SessionInitError::BootstrapFailed { status }),
                }
            }
            if !status.is_success() {
                return Err(SessionInitError::BootstrapFailed { status });
            }

            let body = response.text().await?;
            return Ok((cookies, raw_set_cookie, body));
        }

        Err(SessionInitError::TooManyRedirects(MAX_REDIRECTS))
    }

    async fn bootstrap_session(&self) -> Result<Session, SessionInitError> {
        let (mut cookies, raw_set_cookie, body) = self.fetch_landing().await?;

        let has_antiforgery = cookies
            .get(ANTIFORGERY_COOKIE)
            .is_some_and(|value| !value.is_empty());
        if !has_antiforgery {
            match session::scan_raw_antiforgery(&raw_set_cookie) {
                Some(value) => {
                    cookies.insert(ANTIFORGERY_COOKIE.to_string(), value);
                }
                None => {
                    return Err(SessionInitError::MissingCookie {
                        name: ANTIFORGERY_COOKIE,
                    });
                }
            }
        }

        let token =
            session::extract_verification_token(&body).ok_or(SessionInitError::MissingToken)?;

        debug!(cookies = cookies.len(), "Catalog session acquired");
        Ok(Session::new(cookies, token, Utc::now()))
    }

    /// Applies the header set every authenticated call requires: the joined
    /// cookie pairs, the echoed verification token, the guest-user marker,
    /// and AJAX identification.
    fn authenticated_post(&self, url: &Url, session: &Session) -> reqwest::RequestBuilder {
        self.http
            .post(url.clone())
            .header(header::COOKIE, session.cookie_header())
            .header(VERIFICATION_TOKEN_NAME, session.verification_token())
            .header("__IsGuestUser", "true")
            .header("X-Requested-With", "XMLHttpRequest")
            .header(header::ACCEPT, AJAX_ACCEPT)
            .header(header::CONTENT_TYPE, AJAX_CONTENT_TYPE)
            .header(header::ORIGIN, self.origin.as_str())
            .header(header::REFERER, self.landing_url.as_str())
            .header(header::USER_AGENT, USER_AGENT)
    }

    async fn run_search(
        &self,
        session: &Session,
        subject: &str,
        term: &str,
    ) -> Result<Vec<CourseMatch>, CatalogError> {
        debug!(subject, term, "Searching catalog");
        let response = self
            .authenticated_post(&self.search_url, session)
            .json(&search_payload(subject, term))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::RequestFailed {
                status,
                url: self.search_url.to_string(),
            });
        }

        let body = response.text().await?;
        parse_search_response(&body).map_err(|source| CatalogError::ParseFailed {
            status,
            url: self.search_url.to_string(),
            source,
        })
    }

    async fn run_section_details(
        &self,
        session: &Session,
        course_id: &str,
        section_ids: &[String],
    ) -> Result<Vec<SectionRecord>, CatalogError> {
        debug!(course_id, sections = section_ids.len(), "Fetching section details");
        let payload = json!({
            "courseId": course_id,
            "sectionIds": section_ids,
        });
        let response = self
            .authenticated_post(&self.sections_url, session)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::RequestFailed {
                status,
                url: self.sections_url.to_string(),
            });
        }

        let body = response.text().await?;
        parse_sections_response(&body).map_err(|source| CatalogError::ParseFailed {
            status,
            url: self.sections_url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl CourseCatalog for CatalogApi {
    async fn acquire_session(&self) -> Result<Session, SessionInitError> {
        self.bootstrap_session().await
    }

    async fn search(
        &self,
        session: &Session,
        subject: &str,
        term: &str,
    ) -> Result<Vec<CourseMatch>, CatalogError> {
        self.run_search(session, subject, term).await
    }

    async fn section_details(
        &self,
        session: &Session,
        course_id: &str,
        section_ids: &[String],
    ) -> Result<Vec<SectionRecord>, CatalogError> {
        self.run_section_details(session, course_id, section_ids)
            .await
    }
}

fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The fixed-shape filter body the catalog's own search page posts. Only the
/// subject and term slots vary; everything else stays at its idle default.
fn search_payload(subject: &str, term: &str) -> serde_json::Value {
    let terms: Vec<String> = if term.is_empty() {
        Vec::new()
    } else {
        vec![term.to_string()]
    };

    json!({
        "keyword": null,
        "terms": terms,
        "requirement": null,
        "subrequirement": null,
        "courseIds": null,
        "sectionIds": null,
        "requirementText": null,
        "subrequirementText": "",
        "group": null,
        "startTime": null,
        "endTime": null,
        "openSections": null,
        "subjects": [subject.trim().to_uppercase()],
        "academicLevels": [],
        "courseLevels": [],
        "synonyms": [],
        "courseTypes": [],
        "topicCodes": [],
        "days": [],
        "locations": [],
        "faculty": [],
        "onlineCategories": null,
        "keywordComponents": [],
        "startDate": null,
        "endDate": null,
        "startsAtTime": null,
        "endsByTime": null,
        "pageNumber": 1,
        "sortOn": "None",
        "sortDirection": "Ascending",
        "subjectsBadge": [],
        "locationsBadge": [],
        "termFiltersBadge": [],
        "daysBadge": [],
        "facultyBadge": [],
        "academicLevelsBadge": [],
        "courseLevelsBadge": [],
        "courseTypesBadge": [],
        "topicCodesBadge": [],
        "onlineCategoriesBadge": [],
        "openSectionsBadge": "",
        "openAndWaitlistedSectionsBadge": "",
        "subRequirementText": null,
        "quantityPerPage": QUANTITY_PER_PAGE,
        "openAndWaitlistedSections": null,
        "searchResultsView": "CatalogListing",
    })
}

/// Parses a search response into matches, dropping courses the relevance
/// engine returned with no matched sections.
fn parse_search_response(body: &str) -> anyhow::Result<Vec<CourseMatch>> {
    let response: SearchResponse = parse_json_with_context(body)?;
    Ok(response
        .courses
        .unwrap_or_default()
        .into_iter()
        .filter_map(CourseResult::into_match)
        .collect())
}

/// Parses a section-detail response, flattening every term group.
fn parse_sections_response(body: &str) -> anyhow::Result<Vec<SectionRecord>> {
    let response: SectionsResponse = parse_json_with_context(body)?;
    let groups = response
        .sections_retrieved
        .and_then(|retrieved| retrieved.terms_and_sections)
        .unwrap_or_default();

    let mut records = Vec::new();
    for group in groups {
        let term = group
            .term
            .and_then(|term| term.description)
            .filter(|description| !description.trim().is_empty());
        for wrapper in group.sections.unwrap_or_default() {
            if let Some(record) = wrapper.into_record(term.as_deref()) {
                records.push(record);
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_payload_normalizes_subject() {
        let payload = search_payload(" csc ", "2026FA");
        assert_eq!(payload["subjects"], json!(["CSC"]));
        assert_eq!(payload["terms"], json!(["2026FA"]));
        assert_eq!(payload["pageNumber"], json!(1));
        assert_eq!(payload["quantityPerPage"], json!(QUANTITY_PER_PAGE));
        assert_eq!(payload["searchResultsView"], json!("CatalogListing"));
        assert_eq!(payload["sortOn"], json!("None"));
    }

    #[test]
    fn test_search_payload_empty_term() {
        let payload = search_payload("MAT", "");
        assert_eq!(payload["terms"], json!([]));
    }

    #[test]
    fn test_parse_search_response_drops_zero_match_courses() {
        let body = r#"{
            "Courses": [
                {
                    "Id": "C1",
                    "SubjectCode": "CSC",
                    "Number": "151",
                    "Title": "Intro to Programming",
                    "MatchingSectionIds": ["S1", "S2"]
                },
                {
                    "Id": "C2",
                    "SubjectCode": "CSC",
                    "Number": "251",
                    "Title": "Relevance Noise",
                    "MatchingSectionIds": []
                }
            ],
            "TotalItems": 2
        }"#;
        let matches = parse_search_response(body).expect("body should parse");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].course_id, "C1");
        assert_eq!(matches[0].section_ids, vec!["S1", "S2"]);
    }

    #[test]
    fn test_parse_search_response_tolerates_missing_courses() {
        assert!(parse_search_response("{}").expect("parse").is_empty());
        assert!(
            parse_search_response(r#"{"Courses": null}"#)
                .expect("parse")
                .is_empty()
        );
    }

    #[test]
    fn test_parse_search_response_rejects_wrong_shape() {
        assert!(parse_search_response(r#"{"Courses": 5}"#).is_err());
        assert!(parse_search_response("not json").is_err());
    }

    #[test]
    fn test_parse_sections_response_flattens_term_groups() {
        let body = r#"{
            "SectionsRetrieved": {
                "TermsAndSections": [
                    {
                        "Term": { "Description": "2026 Fall Semester" },
                        "Sections": [
                            {
                                "Section": {
                                    "Id": "S1",
                                    "CourseId": "C1",
                                    "SectionNameDisplay": "CSC-151-D01",
                                    "SectionTitleDisplay": "Intro to Programming",
                                    "Available": 5,
                                    "Capacity": 24,
                                    "Enrolled": 19,
                                    "Waitlisted": null,
                                    "LocationDisplay": "Central Campus",
                                    "MinimumCredits": 3.0,
                                    "FormattedMeetingTimes": [
                                        {
                                            "DaysOfWeekDisplay": "M/W",
                                            "StartTimeDisplay": "9:00 AM",
                                            "EndTimeDisplay": "10:15 AM",
                                            "BuildingDisplay": "Levine",
                                            "RoomDisplay": "2212",
                                            "IsOnline": false
                                        }
                                    ]
                                },
                                "FacultyDisplay": "A. Turing",
                                "InstructorDetails": [
                                    { "FacultyName": "A. Turing" },
                                    { "FacultyName": "G. Hopper" }
                                ]
                            }
                        ]
                    },
                    {
                        "Term": null,
                        "Sections": [
                            {
                                "Section": {
                                    "Id": "S2",
                                    "SectionNameDisplay": "CSC-151-OL1"
                                }
                            }
                        ]
                    }
                ]
            }
        }"#;
        let records = parse_sections_response(body).expect("body should parse");
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.section_id, "S1");
        assert_eq!(first.subject_code, "CSC");
        assert_eq!(first.course_number, "151");
        assert_eq!(first.term.as_deref(), Some("2026 Fall Semester"));
        assert_eq!(first.waitlisted, 0);
        assert_eq!(first.instructors, vec!["A. Turing", "G. Hopper"]);
        assert_eq!(first.meeting_times[0].location, "Levine 2212");

        let second = &records[1];
        assert_eq!(second.section_id, "S2");
        assert_eq!(second.term, None);
        assert_eq!(second.capacity, 0);
    }

    #[test]
    fn test_parse_sections_response_tolerates_empty_payloads() {
        assert!(parse_sections_response("{}").expect("parse").is_empty());
        assert!(
            parse_sections_response(r#"{"SectionsRetrieved": {"TermsAndSections": null}}"#)
                .expect("parse")
                .is_empty()
        );
    }
}
