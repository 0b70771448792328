use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while bootstrapping a catalog session.
///
/// All of these are fatal to a sync run: without the antiforgery cookie and
/// verification token no authenticated call can succeed.
#[derive(Debug, Error)]
pub enum SessionInitError {
    /// The landing page answered with a non-success status.
    #[error("Landing page request failed with status {status}")]
    BootstrapFailed { status: StatusCode },
    /// The landing page kept redirecting without settling on a document.
    #[error("Landing page did not resolve within {0} redirects")]
    TooManyRedirects(usize),
    /// No antiforgery cookie was found, in structured or raw header form.
    #[error("No '{name}' cookie in landing page response")]
    MissingCookie { name: &'static str },
    /// None of the known token encodings matched the landing page body.
    #[error("No verification token found in landing page")]
    MissingToken,
    /// A network or transport failure before a usable response arrived.
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

/// Errors raised by the authenticated search and section-detail calls.
///
/// The orchestrator treats these as recoverable: a failure is scoped to one
/// subject/term pair and never aborts the run.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog answered with a non-success status.
    #[error("Request to {url} failed with status {status}")]
    RequestFailed { status: StatusCode, url: String },
    /// The response body did not match the expected shape.
    #[error("Failed to parse catalog response from {url} (status {status})")]
    ParseFailed {
        status: StatusCode,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    /// A network or transport failure.
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}
