//! Job-oriented orchestration of the fetch-and-persist pipeline.

pub mod runner;

pub use runner::{SyncOutcome, SyncRunner};
