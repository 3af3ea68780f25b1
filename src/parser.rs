// XML → document tree, namespace-resolved with quick-xml
use crate::{model::*, Error, Result};
use compact_str::CompactString;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::path::Path;

pub struct Parser {
    capacity: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self { capacity: 4096 }
    }

    /// Expected element count, used to pre-size the tree.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[cfg(not(feature = "mmap"))]
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let content = std::fs::read(path)?;
        self.parse_bytes(&content)
    }

    #[cfg(feature = "mmap")]
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        let file = std::fs::File::open(path)?;
        // SAFETY: read-only mapping, dropped before this function returns
        let map = unsafe { memmap2::Mmap::map(&file)? };
        self.parse_bytes(&map)
    }

    pub fn parse_str(&self, xml: &str) -> Result<Document> {
        self.parse_bytes(xml.as_bytes())
    }

    pub fn parse_bytes(&self, data: &[u8]) -> Result<Document> {
        // Skip BOM if present
        let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
            &data[3..]
        } else {
            data
        };

        let mut reader = NsReader::from_reader(data);
        let mut builder = TreeBuilder {
            doc: Document::with_capacity(self.capacity),
            stack: Vec::with_capacity(32),
        };
        let mut buf = Vec::new();

        loop {
            let (resolved, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|e| Error::Parse(e.to_string()))?;

            match event {
                Event::Start(start) => {
                    let id = builder.open(&resolved, &start)?;
                    builder.stack.push(id);
                }
                Event::Empty(start) => {
                    builder.open(&resolved, &start)?;
                }
                Event::End(_) => {
                    builder.stack.pop();
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| Error::Parse(e.to_string()))?;
                    builder.text(&text);
                }
                Event::CData(cdata) => {
                    let bytes = cdata.into_inner();
                    builder.text(&String::from_utf8_lossy(&bytes));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !builder.stack.is_empty() {
            return Err(Error::Parse(format!(
                "unexpected end of document, {} element(s) left open",
                builder.stack.len()
            )));
        }
        if builder.doc.is_empty() {
            return Err(Error::Parse("document has no root element".to_string()));
        }

        tracing::debug!(
            elements = builder.doc.len(),
            namespaces = builder.doc.root_namespaces.len(),
            "parsed document tree"
        );
        Ok(builder.doc)
    }
}

struct TreeBuilder {
    doc: Document,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    fn open(&mut self, resolved: &ResolveResult, start: &BytesStart) -> Result<NodeId> {
        let is_root = self.doc.is_empty();
        let name = start.name();

        let prefix = name.prefix().map(|p| lossy(p.as_ref()));
        let local_name = lossy(name.local_name().as_ref());
        let namespace = match resolved {
            ResolveResult::Bound(ns) => Some(lossy(ns.as_ref())),
            _ => None,
        };

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Parse(e.to_string()))?;
            let key = attr.key.as_ref();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(e.to_string()))?
                .into_owned();

            if is_root {
                if let Some(declared) = key.strip_prefix(b"xmlns:") {
                    self.doc.root_namespaces.push(NamespaceDecl {
                        prefix: lossy(declared),
                        uri: CompactString::new(&value),
                    });
                }
            }

            attributes.push(Attribute {
                name: lossy(key),
                value,
            });
        }

        Ok(self.doc.push(Element {
            id: 0,
            prefix,
            local_name,
            namespace,
            attributes,
            parent: self.stack.last().copied(),
            children: Vec::new(),
            content: String::new(),
        }))
    }

    fn text(&mut self, text: &str) {
        if let Some(&id) = self.stack.last() {
            self.doc.append_text(id, text);
        }
    }
}

fn lossy(bytes: &[u8]) -> CompactString {
    CompactString::new(String::from_utf8_lossy(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrl xmlns="http://www.xbrl.org/2003/instance" xmlns:hoge="http://example.com/hoge" xmlns:fuga="http://example.com/fuga">
  <context id="ctx1">
    <entity>
      <identifier scheme="http://disclosure.edinet-fsa.go.jp">E00001-000</identifier>
    </entity>
    <period>
      <instant>2023-12-31</instant>
    </period>
  </context>
  <hoge:Amount contextRef="ctx1">1&amp;2</hoge:Amount>
  <fuga:Note contextRef="ctx1"><![CDATA[<p>raw</p>]]></fuga:Note>
  <fuga:Empty contextRef="ctx1"/>
</xbrl>"#;

    #[test]
    fn builds_tree_in_document_order() {
        let doc = Parser::new().parse_str(MINIMAL).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.local_name, "xbrl");
        assert_eq!(root.namespace.as_deref(), Some(XBRLI_NS));

        let names: Vec<_> = doc.elements.iter().map(|e| e.local_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "xbrl", "context", "entity", "identifier", "period", "instant", "Amount", "Note",
                "Empty"
            ]
        );
        assert_eq!(doc.descendants(&doc.elements[1]).len(), 4);
    }

    #[test]
    fn records_root_namespace_prefixes() {
        let doc = Parser::new().parse_str(MINIMAL).unwrap();
        let prefixes: Vec<_> = doc.root_namespaces.iter().map(|n| n.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["hoge", "fuga"]);
        assert_eq!(doc.namespace_uri("fuga"), Some("http://example.com/fuga"));
    }

    #[test]
    fn unescapes_text_and_keeps_cdata() {
        let doc = Parser::new().parse_str(MINIMAL).unwrap();
        let amount = doc.elements.iter().find(|e| e.local_name == "Amount").unwrap();
        assert_eq!(amount.text(), "1&2");
        assert_eq!(amount.prefix.as_deref(), Some("hoge"));
        assert_eq!(amount.attribute("contextRef"), Some("ctx1"));

        let note = doc.elements.iter().find(|e| e.local_name == "Note").unwrap();
        assert_eq!(note.text(), "<p>raw</p>");

        let empty = doc.elements.iter().find(|e| e.local_name == "Empty").unwrap();
        assert_eq!(empty.text(), "");
    }

    #[test]
    fn skips_byte_order_mark() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(MINIMAL.as_bytes());
        let doc = Parser::new().parse_bytes(&bytes).unwrap();
        assert_eq!(doc.root().unwrap().local_name, "xbrl");
    }

    #[test]
    fn rejects_truncated_document() {
        let err = Parser::new().parse_str("<xbrl><context>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let err = Parser::new().parse_str("   ").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn parses_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.xbrl");
        std::fs::write(&path, MINIMAL).unwrap();

        let doc = Parser::new().parse_file(&path).unwrap();
        assert_eq!(doc.len(), 9);
    }
}
