//! Colleague Self-Service catalog protocol: session bootstrap, search, and
//! section detail retrieval.

pub mod client;
pub mod errors;
mod json;
pub mod models;
pub mod session;

pub use client::{CatalogApi, CourseCatalog};
pub use errors::{CatalogError, SessionInitError};
pub use models::{CourseMatch, EnrollmentStats, MeetingTime, SectionRecord};
pub use session::Session;
