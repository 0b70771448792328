//! Command-line arguments.

use clap::{Parser, ValueEnum};

/// Output format for tracing logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable multi-line output.
    Pretty,
    /// Newline-delimited JSON events.
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "colleague", version, about = "Course enrollment sync for Colleague Self-Service")]
pub struct Args {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,
}
