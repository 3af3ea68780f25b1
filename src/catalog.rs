//! Account-item catalog: candidate tag names per semantic metric.
//!
//! The catalog is versioned data. Supporting a new taxonomy generation means
//! appending candidate names to `catalogs/edinet.json` (or a user-supplied
//! file), never touching the resolver.

use crate::{Error, Result};
use ahash::AHashMap;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN: &str = include_str!("../catalogs/edinet.json");

/// Ordered candidate tag names for one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateList {
    /// One combined probe; the first match in document order wins.
    Flat(Vec<String>),
    /// Whole tiers tried in order; the first tier with any match wins.
    Tiered(Vec<Vec<String>>),
}

impl CandidateList {
    /// Tiers in probe order. A flat list is a single tier.
    pub fn tiers(&self) -> Vec<&[String]> {
        match self {
            CandidateList::Flat(names) => vec![names.as_slice()],
            CandidateList::Tiered(tiers) => tiers.iter().map(Vec::as_slice).collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.tiers().into_iter().flatten()
    }

    fn derive(&self, templates: &[String]) -> CandidateList {
        let expand = |names: &[String]| -> Vec<String> {
            names
                .iter()
                .flat_map(|name| templates.iter().map(move |t| t.replace("{}", name)))
                .collect()
        };
        match self {
            CandidateList::Flat(names) => CandidateList::Flat(expand(names.as_slice())),
            CandidateList::Tiered(tiers) => {
                CandidateList::Tiered(tiers.iter().map(|tier| expand(tier.as_slice())).collect())
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EntrySpec {
    List(CandidateList),
    /// Every name of `from`, rewritten through each template (`"ChangeIn{}"`).
    Derived { from: String, templates: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: String,
    items: BTreeMap<String, EntrySpec>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    items: AHashMap<CompactString, CandidateList>,
}

impl Catalog {
    /// Catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut items = AHashMap::with_capacity(file.items.len());

        // Plain lists first so derived entries can refer to them in any order
        for (name, spec) in &file.items {
            if let EntrySpec::List(list) = spec {
                validate_list(name, list)?;
                items.insert(CompactString::new(name), list.clone());
            }
        }

        for (name, spec) in &file.items {
            let EntrySpec::Derived { from, templates } = spec else {
                continue;
            };
            let base = match file.items.get(from) {
                Some(EntrySpec::List(base)) => base,
                Some(EntrySpec::Derived { .. }) => {
                    return Err(Error::Catalog(format!(
                        "{name}: derived from derived entry {from}"
                    )))
                }
                None => return Err(Error::Catalog(format!("{name}: unknown base entry {from}"))),
            };
            if templates.is_empty() {
                return Err(Error::Catalog(format!("{name}: no templates")));
            }
            if let Some(bad) = templates.iter().find(|t| !t.contains("{}")) {
                return Err(Error::Catalog(format!(
                    "{name}: template {bad:?} has no {{}} placeholder"
                )));
            }
            items.insert(CompactString::new(name), base.derive(templates));
        }

        tracing::debug!(version = %file.version, items = items.len(), "loaded account-item catalog");
        Ok(Self {
            version: file.version,
            items,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, item: &str) -> Option<&CandidateList> {
        self.items.get(item)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Expanded catalog, sorted by item name.
    pub fn to_json(&self) -> Result<String> {
        let items: BTreeMap<&str, &CandidateList> =
            self.items.iter().map(|(k, v)| (k.as_str(), v)).collect();
        let value = serde_json::json!({
            "version": self.version,
            "items": items,
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

fn validate_list(name: &str, list: &CandidateList) -> Result<()> {
    let tiers = list.tiers();
    if tiers.is_empty() || tiers.iter().any(|tier| tier.is_empty()) {
        return Err(Error::Catalog(format!("{name}: empty candidate list")));
    }
    if let Some(bad) = list.names().find(|n| n.trim().is_empty() || n.trim() != n.as_str()) {
        return Err(Error::Catalog(format!("{name}: invalid tag name {bad:?}")));
    }
    Ok(())
}
