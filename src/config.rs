use crate::context::Spellings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Resolver settings. Every field has a default, so a config file only needs
/// the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Namespace prefixes that carry facts, in probe order.
    pub fact_prefixes: Vec<String>,
    pub spellings: Spellings,
    pub filing_date_context: String,
    /// Context-id fragments naming the filing type (annual, Q1..Q3).
    pub segment_filing_markers: Vec<String>,
    /// Aggregate member that must not be counted as a segment of its own.
    pub segment_aggregate_marker: String,
    /// Dimension local names treated as operating segments.
    pub segment_axes: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fact_prefixes: ["jpcrp_cor", "jppfs_cor", "jpigp_cor", "jpdei_cor", "tse-t-ed"]
                .into_iter()
                .map(String::from)
                .collect(),
            spellings: Spellings::all(),
            filing_date_context: "FilingDateInstant".to_string(),
            segment_filing_markers: ["-asr_", "-q1r_", "-q2r_", "-q3r_"]
                .into_iter()
                .map(String::from)
                .collect(),
            segment_aggregate_marker: "ReportableSegmentsMember".to_string(),
            segment_axes: vec!["OperatingSegmentsAxis".to_string()],
        }
    }
}

impl ResolverConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fact_prefixes.is_empty() {
            return Err(Error::Config("fact_prefixes must not be empty".to_string()));
        }
        if self.spellings.is_empty() {
            return Err(Error::Config("at least one context spelling is required".to_string()));
        }
        if self.filing_date_context.trim().is_empty() {
            return Err(Error::Config("filing_date_context must not be empty".to_string()));
        }
        if self.segment_aggregate_marker.is_empty() {
            return Err(Error::Config(
                "segment_aggregate_marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
