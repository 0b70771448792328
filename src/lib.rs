//! Course-enrollment sync for a Colleague Self-Service catalog.
//!
//! The catalog exposes no public API. This crate bootstraps an authenticated
//! browsing session from the landing page, replays the site's internal
//! search and section-detail calls for each configured subject and term, and
//! persists one batched snapshot per run to PostgreSQL under a tracked sync
//! job.
#![recursion_limit = "256"]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod sync;
