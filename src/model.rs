use compact_str::CompactString;

// ============================================================================
// Document Tree - immutable, namespace-aware view of one XBRL instance
// ============================================================================

pub const XBRLI_NS: &str = "http://www.xbrl.org/2003/instance";
pub const XBRLDI_NS: &str = "http://xbrl.org/2006/xbrldi";

/// Index of an element inside [`Document::elements`]. Indices follow document order.
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: CompactString,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: NodeId,
    pub prefix: Option<CompactString>,
    pub local_name: CompactString,
    pub namespace: Option<CompactString>,
    pub attributes: Vec<Attribute>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub(crate) content: String,
}

impl Element {
    pub fn text(&self) -> &str {
        self.content.trim()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.to_string(),
        }
    }
}

// Namespace declared on the root element
#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub prefix: CompactString,
    pub uri: CompactString,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    pub elements: Vec<Element>,
    pub root_namespaces: Vec<NamespaceDecl>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(elements: usize) -> Self {
        Self {
            elements: Vec::with_capacity(elements),
            root_namespaces: Vec::new(),
        }
    }

    pub fn root(&self) -> Option<&Element> {
        self.elements.first()
    }

    pub fn children<'a>(&'a self, element: &'a Element) -> impl Iterator<Item = &'a Element> + 'a {
        element.children.iter().filter_map(|&id| self.elements.get(id))
    }

    /// All elements below `element`, in document order.
    pub fn descendants(&self, element: &Element) -> &[Element] {
        let start = element.id + 1;
        let mut end = start;
        while end < self.elements.len() && self.is_ancestor(element.id, end) {
            end += 1;
        }
        &self.elements[start..end]
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.elements[node].parent {
            if parent == ancestor {
                return true;
            }
            if parent < ancestor {
                return false;
            }
            node = parent;
        }
        false
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.root_namespaces
            .iter()
            .find(|ns| ns.prefix == prefix)
            .map(|ns| ns.uri.as_str())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub(crate) fn push(&mut self, mut element: Element) -> NodeId {
        let id = self.elements.len();
        element.id = id;
        if let Some(parent) = element.parent {
            self.elements[parent].children.push(id);
        }
        self.elements.push(element);
        id
    }

    pub(crate) fn append_text(&mut self, id: NodeId, text: &str) {
        if let Some(element) = self.elements.get_mut(id) {
            element.content.push_str(text);
        }
    }
}
