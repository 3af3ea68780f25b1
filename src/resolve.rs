// Fact resolution: candidate tags × fact prefixes × context spellings
use crate::catalog::CandidateList;
use crate::config::ResolverConfig;
use crate::query::{DocumentModel, Predicate, Query};

/// Probes one document for catalog entries.
///
/// Only prefixes that are both configured and declared on the document root are
/// probed, so a TDnet summary never matches EDINET vocabularies by accident.
pub struct FactResolver<'d, D: DocumentModel + ?Sized> {
    doc: &'d D,
    prefixes: Vec<String>,
}

impl<'d, D: DocumentModel + ?Sized> FactResolver<'d, D> {
    pub fn new(doc: &'d D, config: &ResolverConfig) -> Self {
        let declared = doc.namespace_prefixes();
        let prefixes: Vec<String> = config
            .fact_prefixes
            .iter()
            .filter(|p| declared.contains(&p.as_str()))
            .cloned()
            .collect();
        if prefixes.is_empty() {
            tracing::warn!(?declared, "document declares none of the configured fact prefixes");
        }
        Self { doc, prefixes }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn document(&self) -> &'d D {
        self.doc
    }

    /// First fact of `candidates` under the earliest of `contexts` that has one.
    pub fn resolve(&self, candidates: &CandidateList, contexts: &[String]) -> Option<&'d str> {
        let probes: Vec<Vec<Predicate>> = contexts
            .iter()
            .map(|id| vec![Predicate::equals("contextRef", [id.as_str()])])
            .collect();
        self.resolve_with(candidates, &probes)
    }

    /// First fact of `candidates` in any context.
    pub fn resolve_unscoped(&self, candidates: &CandidateList) -> Option<&'d str> {
        self.resolve_with(candidates, &[Vec::new()])
    }

    /// Segment-scoped fact: the contextRef starts with a duration spelling and
    /// contains the member's reference name.
    pub fn resolve_segment(
        &self,
        candidates: &CandidateList,
        duration: &[String],
        member_ref: &str,
    ) -> Option<&'d str> {
        if member_ref.is_empty() {
            return None;
        }
        let probes: Vec<Vec<Predicate>> = duration
            .iter()
            .map(|id| {
                vec![
                    Predicate::starts_with("contextRef", [id.as_str()]),
                    Predicate::contains("contextRef", [member_ref]),
                ]
            })
            .collect();
        self.resolve_with(candidates, &probes)
    }

    // Tier, then context spelling; all tags and prefixes of a tier go in one probe.
    fn resolve_with(&self, candidates: &CandidateList, probes: &[Vec<Predicate>]) -> Option<&'d str> {
        if self.prefixes.is_empty() {
            return None;
        }
        for (tier, names) in candidates.tiers().into_iter().enumerate() {
            for (spelling, predicates) in probes.iter().enumerate() {
                let query = predicates
                    .iter()
                    .cloned()
                    .fold(Query::facts(&self.prefixes, names), Query::filter);
                if let Some(element) = self.doc.query_first(&query) {
                    tracing::trace!(
                        tier,
                        spelling,
                        fact = %element.qualified_name(),
                        context = element.attribute("contextRef").unwrap_or_default(),
                        "resolved fact"
                    );
                    return Some(element.text());
                }
            }
        }
        None
    }
}
