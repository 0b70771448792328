//! Session credentials and their extraction from the catalog landing page.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

/// Cookie the catalog issues to bind a browsing session to its anti-CSRF
/// protection. Required on every authenticated call.
pub const ANTIFORGERY_COOKIE: &str = ".ColleagueSelfServiceAntiforgery";

/// Field, header, and script-variable name the catalog uses for its
/// verification token.
pub const VERIFICATION_TOKEN_NAME: &str = "__RequestVerificationToken";

/// How long acquired credentials are trusted. A run never refreshes
/// mid-flight; it is expected to finish well inside this window.
pub const SESSION_VALIDITY_MINUTES: i64 = 25;

/// Authentication context for one sync run: the cookies and verification
/// token harvested from the landing page. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    cookies: BTreeMap<String, String>,
    verification_token: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        cookies: BTreeMap<String, String>,
        verification_token: String,
        acquired_at: DateTime<Utc>,
    ) -> Self {
        Self {
            cookies,
            verification_token,
            acquired_at,
            expires_at: acquired_at + Duration::minutes(SESSION_VALIDITY_MINUTES),
        }
    }

    /// Value for the `Cookie` header: every pair joined with `; `.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn verification_token(&self) -> &str {
        &self.verification_token
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Usable means both credential artifacts are present and the validity
    /// window has not lapsed.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.cookies
            .get(ANTIFORGERY_COOKIE)
            .is_some_and(|value| !value.is_empty())
            && !self.verification_token.is_empty()
            && !self.is_expired(now)
    }
}

/// Scans `html` for the verification token.
///
/// The catalog has served the token in several encodings over time; each is
/// tried in order and the first match wins. Later patterns never overwrite an
/// earlier match.
pub fn extract_verification_token(html: &str) -> Option<String> {
    static PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
        [
            // <input name="__RequestVerificationToken" value="...">
            Regex::new(r#"name=["']__RequestVerificationToken["'][^>]*?value=["']([^"']+)["']"#)
                .unwrap(),
            // <input value="..." name="__RequestVerificationToken">
            Regex::new(r#"value=["']([^"']+)["'][^>]*?name=["']__RequestVerificationToken["']"#)
                .unwrap(),
            // <meta name="__RequestVerificationToken" content="...">
            Regex::new(
                r#"<meta[^>]*?name=["']__RequestVerificationToken["'][^>]*?content=["']([^"']+)["']"#,
            )
            .unwrap(),
            // __RequestVerificationToken: '...' (inline script assignment)
            Regex::new(r#"__RequestVerificationToken["']?\s*[:=]\s*["']([^"']+)["']"#).unwrap(),
        ]
    });

    PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|token| token.as_str().to_string())
    })
}

/// Parses one `Set-Cookie` header into its name/value pair, dropping
/// attributes.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let parsed = cookie::Cookie::parse(header).ok()?;
    Some((parsed.name().to_string(), parsed.value().to_string()))
}

/// Scans raw `Set-Cookie` header text for the antiforgery pair.
///
/// Fallback for cookie encodings the structured parser rejects.
pub fn scan_raw_antiforgery(headers: &[String]) -> Option<String> {
    static RAW_PAIR: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(&format!("{}=([^;]+)", regex::escape(ANTIFORGERY_COOKIE))).unwrap()
    });

    headers.iter().find_map(|header| {
        RAW_PAIR
            .captures(header)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim().to_string())
    })
}
