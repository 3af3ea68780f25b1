//! jpxbrl - fact-resolution engine for Japanese securities-report XBRL
//!
//! Classifies a filing (consolidation, fiscal season, quarter), derives the
//! context identifiers its taxonomy generation uses, and resolves each metric
//! of an account-item catalog to a normalized value.
//!
//! Licensed under AGPL-3.0

pub mod catalog;
pub mod classify;
pub mod config;
pub mod context;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod query;
pub mod report;
pub mod resolve;
pub mod segment;

pub use parser::Parser;

// Re-export main types
pub use catalog::{CandidateList, Catalog};
pub use classify::{classify, Classification, ConsolidationKind, SeasonKind};
pub use config::ResolverConfig;
pub use context::{ContextSet, Spellings};
pub use model::{Document, Element};
pub use normalize::{FactValue, ValueKind};
pub use query::{DocumentModel, Query};
pub use report::{
    assemble_report, FactRecord, ReportAssembler, ReportKind, ReportStrategy, ResultsForecast,
    SecurityReport,
};
pub use resolve::FactResolver;
pub use segment::{resolve_segments, SegmentRecord};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Quarter error: {0}")]
    Quarter(String),

    #[error("Context error: {0}")]
    Context(String),
}
