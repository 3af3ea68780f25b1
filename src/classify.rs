//! Consolidation scope, fiscal season and quarter of a filing.

use crate::config::ResolverConfig;
use crate::context::{period_date, spell, ContextSet, PeriodKind, Spellings};
use crate::normalize::month_of;
use crate::query::{DocumentModel, NameTest, Query};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsolidationKind {
    Consolidated,
    NonConsolidated,
}

impl ConsolidationKind {
    /// Scope token as written in context identifiers.
    pub fn token(self) -> &'static str {
        match self {
            ConsolidationKind::Consolidated => "Consolidated",
            ConsolidationKind::NonConsolidated => "NonConsolidated",
        }
    }

    /// 1 for consolidated figures, 0 for the parent alone.
    pub fn flag(self) -> i64 {
        match self {
            ConsolidationKind::Consolidated => 1,
            ConsolidationKind::NonConsolidated => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeasonKind {
    FullYear,
    Quarter,
    AccumulatedQ1,
    AccumulatedQ2,
    AccumulatedQ3,
}

impl SeasonKind {
    /// Probe order.
    pub const PRIORITY: [SeasonKind; 5] = [
        SeasonKind::FullYear,
        SeasonKind::Quarter,
        SeasonKind::AccumulatedQ1,
        SeasonKind::AccumulatedQ2,
        SeasonKind::AccumulatedQ3,
    ];

    pub fn token(self) -> &'static str {
        match self {
            SeasonKind::FullYear => "Year",
            SeasonKind::Quarter => "Quarter",
            SeasonKind::AccumulatedQ1 => "AccumulatedQ1",
            SeasonKind::AccumulatedQ2 => "AccumulatedQ2",
            SeasonKind::AccumulatedQ3 => "AccumulatedQ3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub consolidation: ConsolidationKind,
    pub season: SeasonKind,
}

impl Classification {
    pub fn contexts(&self, config: &ResolverConfig) -> Result<ContextSet> {
        Ok(
            ContextSet::derive(self.consolidation, Some(self.season), config.spellings)?
                .with_filing_date(&config.filing_date_context),
        )
    }
}

pub fn classify<D>(doc: &D, config: &ResolverConfig) -> Result<Classification>
where
    D: DocumentModel + ?Sized,
{
    let spellings = config.spellings;
    let consolidation = find_consolidation(doc, spellings).unwrap_or_else(|| {
        tracing::debug!("no consolidation marker context, assuming consolidated");
        ConsolidationKind::Consolidated
    });

    let mut classification = find_season(doc, consolidation, spellings).map(|season| Classification {
        consolidation,
        season,
    });

    // Filers without subsidiaries only carry non-consolidated instants
    if classification.is_none() && consolidation == ConsolidationKind::Consolidated {
        let consolidation = ConsolidationKind::NonConsolidated;
        classification = find_season(doc, consolidation, spellings).map(|season| Classification {
            consolidation,
            season,
        });
    }

    let classification = classification.ok_or_else(|| {
        Error::Classification(
            "no season context under either consolidation scope".to_string(),
        )
    })?;
    tracing::debug!(
        consolidation = classification.consolidation.token(),
        season = classification.season.token(),
        "classified filing"
    );
    Ok(classification)
}

/// Context declared with an entity identifier under any of `ids`.
fn has_context<D>(doc: &D, ids: &[String]) -> bool
where
    D: DocumentModel + ?Sized,
{
    let query = Query::context(ids)
        .child(NameTest::xbrli("entity"))
        .child(NameTest::xbrli("identifier"));
    doc.query_first(&query).is_some()
}

fn scope_markers(consolidation: ConsolidationKind, spellings: Spellings) -> Vec<String> {
    ["Year", "YTD"]
        .into_iter()
        .flat_map(|span| spell("Current", span, PeriodKind::Duration, consolidation, spellings))
        .collect()
}

pub fn find_consolidation<D>(doc: &D, spellings: Spellings) -> Option<ConsolidationKind>
where
    D: DocumentModel + ?Sized,
{
    [ConsolidationKind::Consolidated, ConsolidationKind::NonConsolidated]
        .into_iter()
        .find(|&kind| has_context(doc, &scope_markers(kind, spellings)))
}

pub fn find_season<D>(
    doc: &D,
    consolidation: ConsolidationKind,
    spellings: Spellings,
) -> Option<SeasonKind>
where
    D: DocumentModel + ?Sized,
{
    SeasonKind::PRIORITY.into_iter().find(|season| {
        let ids = spell(
            "Current",
            season.token(),
            PeriodKind::Instant,
            consolidation,
            spellings,
        );
        let found = has_context(doc, &ids);
        tracing::trace!(season = season.token(), found, "season probe");
        found
    })
}

/// Quarter from the fiscal-year-end month and the month of the report instant.
///
/// The two branches use different boundary strictness; both are load-bearing.
pub fn quarter_from_months(end_month: Option<u32>, instant_month: Option<u32>) -> Result<u8> {
    let end = end_month
        .ok_or_else(|| Error::Quarter("fiscal period end date not found".to_string()))?;
    let instant =
        instant_month.ok_or_else(|| Error::Quarter("instant date not found".to_string()))?;

    let quarter = if instant <= end {
        match end - instant {
            diff if diff < 3 => 4,
            diff if diff < 6 => 3,
            diff if diff < 9 => 2,
            _ => 1,
        }
    } else {
        match instant - end {
            diff if diff <= 3 => 1,
            diff if diff <= 6 => 2,
            diff if diff <= 9 => 3,
            _ => 4,
        }
    };
    Ok(quarter)
}

/// Quarter of the filing. The fiscal-year end comes from the cover-page date when
/// given, else from the current full-year duration context.
pub fn find_quarter<D>(doc: &D, contexts: &ContextSet, fiscal_year_end: Option<&str>) -> Result<u8>
where
    D: DocumentModel + ?Sized,
{
    let end_month = fiscal_year_end
        .and_then(month_of)
        .or_else(|| period_date(doc, &contexts.year_duration(), "endDate").and_then(month_of));
    let instant_month = period_date(doc, &contexts.instant, "instant").and_then(month_of);

    let quarter = quarter_from_months(end_month, instant_month)?;
    tracing::debug!(?end_month, ?instant_month, quarter, "derived quarter");
    Ok(quarter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;

    fn context(id: &str, period: &str) -> String {
        format!(
            r#"<xbrli:context id="{id}"><xbrli:entity><xbrli:identifier scheme="http://disclosure.edinet-fsa.go.jp">E00001-000</xbrli:identifier></xbrli:entity><xbrli:period>{period}</xbrli:period></xbrli:context>"#
        )
    }

    fn instance(contexts: &[String]) -> crate::Document {
        let xml = format!(
            r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance">{}</xbrli:xbrl>"#,
            contexts.concat()
        );
        Parser::new().parse_str(&xml).unwrap()
    }

    fn duration(start: &str, end: &str) -> String {
        format!("<xbrli:startDate>{start}</xbrli:startDate><xbrli:endDate>{end}</xbrli:endDate>")
    }

    fn instant(date: &str) -> String {
        format!("<xbrli:instant>{date}</xbrli:instant>")
    }

    #[test]
    fn consolidated_annual_report() {
        let doc = instance(&[
            context("CurrentYearDuration", &duration("2015-04-01", "2016-03-31")),
            context("CurrentYearInstant", &instant("2016-03-31")),
            context("CurrentYearInstant_NonConsolidatedMember", &instant("2016-03-31")),
        ]);
        let c = classify(&doc, &ResolverConfig::default()).unwrap();
        assert_eq!(c.consolidation, ConsolidationKind::Consolidated);
        assert_eq!(c.season, SeasonKind::FullYear);
    }

    #[test]
    fn non_consolidated_only_filer() {
        let doc = instance(&[
            context(
                "CurrentYTDDuration_NonConsolidatedMember",
                &duration("2016-04-01", "2016-06-30"),
            ),
            context("CurrentQuarterInstant_NonConsolidatedMember", &instant("2016-06-30")),
        ]);
        let c = classify(&doc, &ResolverConfig::default()).unwrap();
        assert_eq!(c.consolidation, ConsolidationKind::NonConsolidated);
        assert_eq!(c.season, SeasonKind::Quarter);
    }

    #[test]
    fn retries_non_consolidated_when_consolidated_has_no_season() {
        // Marker says consolidated, but only non-consolidated instants exist.
        let doc = instance(&[
            context("CurrentYearConsolidatedDuration", &duration("2015-04-01", "2016-03-31")),
            context("CurrentAccumulatedQ2NonConsolidatedInstant", &instant("2015-09-30")),
        ]);
        let c = classify(&doc, &ResolverConfig::default()).unwrap();
        assert_eq!(c.consolidation, ConsolidationKind::NonConsolidated);
        assert_eq!(c.season, SeasonKind::AccumulatedQ2);
    }

    #[test]
    fn season_priority_prefers_full_year() {
        let doc = instance(&[
            context("CurrentAccumulatedQ1ConsolidatedInstant", &instant("2015-06-30")),
            context("CurrentYearConsolidatedInstant", &instant("2016-03-31")),
        ]);
        let c = classify(&doc, &ResolverConfig::default()).unwrap();
        assert_eq!(c.season, SeasonKind::FullYear);
    }

    #[test]
    fn context_without_entity_identifier_does_not_count() {
        let xml = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance">
            <xbrli:context id="CurrentYearInstant"><xbrli:period><xbrli:instant>2016-03-31</xbrli:instant></xbrli:period></xbrli:context>
        </xbrli:xbrl>"#;
        let doc = Parser::new().parse_str(xml).unwrap();
        let err = classify(&doc, &ResolverConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }

    #[test]
    fn unclassifiable_document() {
        let doc = instance(&[context("SomethingElse", &instant("2016-03-31"))]);
        let err = classify(&doc, &ResolverConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
    }

    #[test]
    fn quarter_boundaries() {
        let q = |end, instant| quarter_from_months(Some(end), Some(instant)).unwrap();
        // instant <= end
        assert_eq!(q(3, 3), 4);
        assert_eq!(q(3, 1), 4);
        assert_eq!(q(12, 9), 3);
        assert_eq!(q(12, 6), 2);
        assert_eq!(q(12, 4), 2);
        assert_eq!(q(12, 3), 1);
        assert_eq!(q(12, 1), 1);
        // instant > end
        assert_eq!(q(3, 6), 1);
        assert_eq!(q(3, 9), 2);
        assert_eq!(q(3, 12), 3);
        assert_eq!(q(1, 11), 4);
        // same inputs, same answer
        assert_eq!(q(12, 6), q(12, 6));
    }

    #[test]
    fn quarter_needs_both_months() {
        assert!(matches!(quarter_from_months(None, Some(6)), Err(Error::Quarter(_))));
        assert!(matches!(quarter_from_months(Some(3), None), Err(Error::Quarter(_))));
    }

    #[test]
    fn quarter_from_document() {
        let doc = instance(&[
            context("CurrentYTDDuration", &duration("2016-04-01", "2016-09-30")),
            context("CurrentYearDuration", &duration("2016-04-01", "2017-03-31")),
            context("CurrentAccumulatedQ2Instant", &instant("2016-09-30")),
        ]);
        let contexts = ContextSet::derive(
            ConsolidationKind::Consolidated,
            Some(SeasonKind::AccumulatedQ2),
            Spellings::all(),
        )
        .unwrap();
        assert_eq!(find_quarter(&doc, &contexts, Some("2017-03-31")).unwrap(), 2);
        // falls back to the full-year duration end date
        assert_eq!(find_quarter(&doc, &contexts, None).unwrap(), 2);
        assert_eq!(find_quarter(&doc, &contexts, Some("garbage")).unwrap(), 2);
    }

    #[test]
    fn quarter_without_instant_context() {
        let doc = instance(&[context("CurrentYearDuration", &duration("2016-04-01", "2017-03-31"))]);
        let contexts =
            ContextSet::derive(ConsolidationKind::Consolidated, Some(SeasonKind::FullYear), Spellings::all())
                .unwrap();
        let err = find_quarter(&doc, &contexts, None).unwrap_err();
        assert!(matches!(err, Error::Quarter(_)));
    }
}
