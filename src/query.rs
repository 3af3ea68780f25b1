// Path queries over the document tree (XPath-style steps and attribute predicates)

use crate::model::{Document, Element, XBRLDI_NS, XBRLI_NS};
use compact_str::CompactString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
    Uri(CompactString),
    /// Matches the prefix as written, or the URI the root element binds to it.
    Prefix(CompactString),
}

#[derive(Debug, Clone)]
pub struct NameTest {
    pub namespaces: Vec<Namespace>,
    /// Empty means any local name.
    pub local_names: Vec<CompactString>,
}

impl NameTest {
    pub fn xbrli(local: &str) -> Self {
        Self {
            namespaces: vec![Namespace::Uri(XBRLI_NS.into())],
            local_names: vec![local.into()],
        }
    }

    pub fn xbrldi(local: &str) -> Self {
        Self {
            namespaces: vec![Namespace::Uri(XBRLDI_NS.into())],
            local_names: vec![local.into()],
        }
    }

    pub fn prefixed<P, N>(prefixes: P, local_names: N) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            namespaces: prefixes
                .into_iter()
                .map(|p| Namespace::Prefix(p.as_ref().into()))
                .collect(),
            local_names: local_names
                .into_iter()
                .map(|n| CompactString::new(n.as_ref()))
                .collect(),
        }
    }

    fn matches(&self, doc: &Document, element: &Element) -> bool {
        if !self.local_names.is_empty() && !self.local_names.contains(&element.local_name) {
            return false;
        }
        self.namespaces.iter().any(|ns| match ns {
            Namespace::Uri(uri) => element.namespace.as_deref() == Some(uri.as_str()),
            Namespace::Prefix(prefix) => {
                element.prefix.as_deref() == Some(prefix.as_str())
                    || (element.namespace.is_some()
                        && doc.namespace_uri(prefix) == element.namespace.as_deref())
            }
        })
    }
}

#[derive(Debug, Clone)]
pub enum Predicate {
    Equals { attr: CompactString, values: Vec<String> },
    StartsWith { attr: CompactString, prefixes: Vec<String> },
    Contains { attr: CompactString, needles: Vec<String> },
    /// `marker` occurs in the attribute and is followed by more text.
    TextAfter { attr: CompactString, marker: String },
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn equals<I>(attr: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Predicate::Equals {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn starts_with<I>(attr: &str, prefixes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Predicate::StartsWith {
            attr: attr.into(),
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains<I>(attr: &str, needles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Predicate::Contains {
            attr: attr.into(),
            needles: needles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn text_after(attr: &str, marker: &str) -> Self {
        Predicate::TextAfter {
            attr: attr.into(),
            marker: marker.to_string(),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    fn matches(&self, element: &Element) -> bool {
        match self {
            Predicate::Equals { attr, values } => element
                .attribute(attr)
                .is_some_and(|v| values.iter().any(|x| x == v)),
            Predicate::StartsWith { attr, prefixes } => element
                .attribute(attr)
                .is_some_and(|v| prefixes.iter().any(|p| v.starts_with(p.as_str()))),
            Predicate::Contains { attr, needles } => element
                .attribute(attr)
                .is_some_and(|v| needles.iter().any(|n| v.contains(n.as_str()))),
            Predicate::TextAfter { attr, marker } => element
                .attribute(attr)
                .and_then(|v| v.find(marker.as_str()).map(|at| at + marker.len() < v.len()))
                .unwrap_or(false),
            Predicate::Not(inner) => !inner.matches(element),
        }
    }
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    name: NameTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    steps: Vec<Step>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(mut self, name: NameTest) -> Self {
        self.steps.push(Step {
            axis: Axis::Child,
            name,
            predicates: Vec::new(),
        });
        self
    }

    pub fn descendant(mut self, name: NameTest) -> Self {
        self.steps.push(Step {
            axis: Axis::Descendant,
            name,
            predicates: Vec::new(),
        });
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.predicates.push(predicate);
        }
        self
    }

    /// `//xbrli:xbrl/xbrli:context[@id = one of ids]`
    pub fn context(ids: &[String]) -> Self {
        Query::new()
            .descendant(NameTest::xbrli("xbrl"))
            .child(NameTest::xbrli("context"))
            .filter(Predicate::equals("id", ids.iter().cloned()))
    }

    /// Top-level facts: `//xbrli:xbrl/{prefix}:{name}` for every prefix/name pair.
    pub fn facts<P, N>(prefixes: P, names: N) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Query::new()
            .descendant(NameTest::xbrli("xbrl"))
            .child(NameTest::prefixed(prefixes, names))
    }

    fn evaluate<'d>(&self, doc: &'d Document, first_only: bool) -> Vec<&'d Element> {
        let Some(root) = doc.root() else {
            return Vec::new();
        };
        if self.steps.is_empty() {
            return Vec::new();
        }

        // Virtual document node: the root is its only child.
        let mut current: Vec<&Element> = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            let last = index + 1 == self.steps.len();
            let mut marked = vec![false; doc.len()];

            let consider = |candidate: &'d Element, marked: &mut Vec<bool>| {
                if !marked[candidate.id]
                    && step.name.matches(doc, candidate)
                    && step.predicates.iter().all(|p| p.matches(candidate))
                {
                    marked[candidate.id] = true;
                }
            };

            if index == 0 {
                consider(root, &mut marked);
                if step.axis == Axis::Descendant {
                    for element in doc.descendants(root) {
                        consider(element, &mut marked);
                    }
                }
            } else {
                for &context in &current {
                    match step.axis {
                        Axis::Child => {
                            for element in doc.children(context) {
                                consider(element, &mut marked);
                            }
                        }
                        Axis::Descendant => {
                            for element in doc.descendants(context) {
                                consider(element, &mut marked);
                            }
                        }
                    }
                }
            }

            // Collect in document order
            let mut next = Vec::new();
            for (id, hit) in marked.iter().enumerate() {
                if *hit {
                    next.push(&doc.elements[id]);
                    if last && first_only {
                        break;
                    }
                }
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }
}

/// Read-only access to a parsed filing, as the resolution engine consumes it.
pub trait DocumentModel {
    fn query_first(&self, query: &Query) -> Option<&Element>;

    // document order
    fn query_all(&self, query: &Query) -> Vec<&Element>;

    fn namespace_prefixes(&self) -> Vec<&str>;
}

impl DocumentModel for Document {
    fn query_first(&self, query: &Query) -> Option<&Element> {
        query.evaluate(self, true).into_iter().next()
    }

    fn query_all(&self, query: &Query) -> Vec<&Element> {
        query.evaluate(self, false)
    }

    fn namespace_prefixes(&self) -> Vec<&str> {
        self.root_namespaces.iter().map(|ns| ns.prefix.as_str()).collect()
    }
}
