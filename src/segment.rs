//! Operating-segment enumeration and segment-scoped facts.
//!
//! Segment facts use compound context ids such as
//! `CurrentYearDuration_jpcrp030000-asr_E00001-000AutomobileReportableSegmentsMember`:
//! the duration id, the filing-type marker, then the member name with its
//! qualifier colon removed.

use crate::catalog::{CandidateList, Catalog};
use crate::config::ResolverConfig;
use crate::context::ContextSet;
use crate::normalize::{to_millions, Millions};
use crate::query::{DocumentModel, NameTest, Predicate, Query};
use crate::resolve::FactResolver;
use ahash::AHashSet;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentRecord {
    pub context_ref_name: String,
    pub display_name: String,
    pub sales: Option<Millions>,
    pub operating_profit: Option<Millions>,
}

/// Segment records for the current duration, or none for single-segment filers.
pub fn resolve_segments<D>(
    resolver: &FactResolver<'_, D>,
    catalog: &Catalog,
    contexts: &ContextSet,
    config: &ResolverConfig,
) -> Vec<SegmentRecord>
where
    D: DocumentModel + ?Sized,
{
    if let Some(single) = catalog.get("single_segment") {
        if resolver.resolve_unscoped(single).is_some() {
            tracing::debug!("single-segment filer, skipping segment enumeration");
            return Vec::new();
        }
    }

    let sales = catalog.get("segment_sales");
    let operating_profit = catalog.get("segment_operating_profit");

    let records: Vec<SegmentRecord> = segment_members(resolver.document(), contexts, config)
        .into_iter()
        .map(|(context_ref_name, display_name)| {
            let scoped = |items: Option<&CandidateList>| {
                items
                    .and_then(|c| resolver.resolve_segment(c, &contexts.duration, &context_ref_name))
                    .and_then(to_millions)
            };
            SegmentRecord {
                sales: scoped(sales),
                operating_profit: scoped(operating_profit),
                display_name,
                context_ref_name,
            }
        })
        .collect();

    tracing::debug!(segments = records.len(), "resolved segments");
    records
}

/// `(context_ref_name, display_name)` of each distinct segment member, in
/// document order.
pub fn segment_members<D>(
    doc: &D,
    contexts: &ContextSet,
    config: &ResolverConfig,
) -> Vec<(String, String)>
where
    D: DocumentModel + ?Sized,
{
    let query = Query::new()
        .descendant(NameTest::xbrli("xbrl"))
        .child(NameTest::xbrli("context"))
        .filter(Predicate::starts_with(
            "id",
            contexts.duration.iter().map(|id| format!("{id}_")),
        ))
        .filter(Predicate::contains(
            "id",
            config.segment_filing_markers.iter().cloned(),
        ))
        .filter(Predicate::text_after("id", &config.segment_aggregate_marker).negate())
        .descendant(NameTest::xbrldi("explicitMember"));

    let mut seen = AHashSet::new();
    let mut members = Vec::new();
    for element in doc.query_all(&query) {
        let on_segment_axis = element
            .attribute("dimension")
            .map(|d| d.rsplit(':').next().unwrap_or(d))
            .is_some_and(|axis| config.segment_axes.iter().any(|a| a == axis));
        if !on_segment_axis {
            continue;
        }

        let text = element.text();
        let context_ref_name: String = text.chars().filter(|&c| c != ':').collect();
        let display_name = text.rsplit(':').next().unwrap_or(text).trim().to_string();
        if context_ref_name.is_empty() || display_name.is_empty() {
            continue;
        }
        if seen.insert(context_ref_name.clone()) {
            members.push((context_ref_name, display_name));
        }
    }
    members
}
