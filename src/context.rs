// Context identifiers per period role. Each role lists every taxonomy spelling, tried in order.

use crate::classify::{ConsolidationKind, SeasonKind};
use crate::query::{DocumentModel, NameTest, Query};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Spellings: u8 {
        /// `CurrentYearConsolidatedDuration`
        const INFIX = 0b0001;
        /// `CurrentYearDuration_NonConsolidatedMember`
        const MEMBER_SUFFIX = 0b0010;
        /// `CurrentYearDuration_Consolidated`
        const LEGACY_SUFFIX = 0b0100;
        /// `CurrentYearDuration` (consolidated scope only)
        const BARE = 0b1000;
    }
}

impl Default for Spellings {
    fn default() -> Self {
        Spellings::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Duration,
    Instant,
}

impl PeriodKind {
    fn token(self) -> &'static str {
        match self {
            PeriodKind::Duration => "Duration",
            PeriodKind::Instant => "Instant",
        }
    }
}

pub fn spell(
    role: &str,
    span: &str,
    kind: PeriodKind,
    consolidation: ConsolidationKind,
    spellings: Spellings,
) -> Vec<String> {
    let scope = consolidation.token();
    let kind = kind.token();
    let mut ids = Vec::with_capacity(4);

    if spellings.contains(Spellings::INFIX) {
        ids.push(format!("{role}{span}{scope}{kind}"));
    }
    if spellings.contains(Spellings::MEMBER_SUFFIX) {
        ids.push(format!("{role}{span}{kind}_{scope}Member"));
    }
    if spellings.contains(Spellings::LEGACY_SUFFIX) {
        ids.push(format!("{role}{span}{kind}_{scope}"));
    }
    if spellings.contains(Spellings::BARE) && consolidation == ConsolidationKind::Consolidated {
        ids.push(format!("{role}{span}{kind}"));
    }
    ids
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSet {
    pub consolidation: ConsolidationKind,
    pub season: SeasonKind,
    pub duration: Vec<String>,
    pub prior_duration: Vec<String>,
    pub instant: Vec<String>,
    pub filing_date_instant: Vec<String>,
    /// Reported only; probes use the spellings above.
    pub consolidation_suffix: String,
    #[serde(skip)]
    spellings: Spellings,
}

impl ContextSet {
    pub const FILING_DATE_INSTANT: &'static str = "FilingDateInstant";

    pub fn derive(
        consolidation: ConsolidationKind,
        season: Option<SeasonKind>,
        spellings: Spellings,
    ) -> Result<Self> {
        let season = season.ok_or_else(|| {
            Error::Context(format!(
                "no fiscal season for {} scope",
                consolidation.token()
            ))
        })?;

        let span = season.token();
        let mut duration = spell("Current", span, PeriodKind::Duration, consolidation, spellings);
        let mut prior_duration = spell("Prior", span, PeriodKind::Duration, consolidation, spellings);
        prior_duration.extend(spell("Prior1", span, PeriodKind::Duration, consolidation, spellings));
        if season != SeasonKind::FullYear {
            // Quarterly reports tag year-to-date figures with a YTD span.
            duration.extend(spell("Current", "YTD", PeriodKind::Duration, consolidation, spellings));
            prior_duration.extend(spell("Prior", "YTD", PeriodKind::Duration, consolidation, spellings));
            prior_duration.extend(spell("Prior1", "YTD", PeriodKind::Duration, consolidation, spellings));
        }
        let instant = spell("Current", span, PeriodKind::Instant, consolidation, spellings);

        let contexts = Self {
            consolidation,
            season,
            duration,
            prior_duration,
            instant,
            filing_date_instant: vec![Self::FILING_DATE_INSTANT.to_string()],
            consolidation_suffix: format!("_{}Member", consolidation.token()),
            spellings,
        };
        tracing::debug!(
            consolidation = consolidation.token(),
            season = span,
            duration = ?contexts.duration,
            instant = ?contexts.instant,
            "derived context identifiers"
        );
        Ok(contexts)
    }

    pub fn with_filing_date(mut self, id: &str) -> Self {
        self.filing_date_instant = vec![id.to_string()];
        self
    }

    /// Full-year forecast identifiers: a Q4 filing forecasts the next fiscal year.
    pub fn forecast(&self, quarter: u8) -> Vec<String> {
        let role = if quarter == 4 { "Next" } else { "Current" };
        spell(role, "Year", PeriodKind::Duration, self.consolidation, self.spellings)
    }

    pub fn year_duration(&self) -> Vec<String> {
        spell("Current", "Year", PeriodKind::Duration, self.consolidation, self.spellings)
    }

    pub fn spellings(&self) -> Spellings {
        self.spellings
    }
}

pub fn period_date<'d, D>(doc: &'d D, ids: &[String], field: &str) -> Option<&'d str>
where
    D: DocumentModel + ?Sized,
{
    ids.iter().find_map(|id| {
        let query = Query::context(std::slice::from_ref(id))
            .child(NameTest::xbrli("period"))
            .child(NameTest::xbrli(field));
        doc.query_first(&query)
            .map(|e| e.text())
            .filter(|t| !t.is_empty())
    })
}
