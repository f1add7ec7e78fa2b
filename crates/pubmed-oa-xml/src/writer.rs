//! Serialization of a parsed tree back to markup using quick-xml events.
//!
//! Compact mode reproduces the parsed content as-is. Pretty mode indents
//! element-only content by [`INDENT`] spaces per level and leaves mixed
//! content (text interleaved with inline markup) untouched, so the text of
//! every element survives a pretty-print/re-parse cycle.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use roxmltree::{Document, Node, NodeType};

use crate::XmlError;

const INDENT: usize = 2;
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

pub(crate) fn serialize(doc: &Document<'_>, pretty: bool) -> Result<String, XmlError> {
    let mut out = Serializer {
        writer: Writer::new(Vec::new()),
        pretty,
    };
    out.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    // The document node only holds the root element, comments and PIs.
    for child in doc.root().children() {
        out.raw(b"\n");
        out.write_node(child, 0, false)?;
    }
    if pretty {
        out.raw(b"\n");
    }

    String::from_utf8(out.writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
}

struct Serializer {
    writer: Writer<Vec<u8>>,
    pretty: bool,
}

impl Serializer {
    fn emit(&mut self, event: Event<'_>) -> Result<(), XmlError> {
        self.writer
            .write_event(event)
            .map_err(|e| XmlError::Write(e.to_string()))
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.writer.get_mut().extend_from_slice(bytes);
    }

    fn break_line(&mut self, depth: usize) {
        self.raw(b"\n");
        let pad = vec![b' '; depth * INDENT];
        self.raw(&pad);
    }

    /// `indented` is true when the parent holds element-only content in
    /// pretty mode: whitespace-only text is dropped and every other child
    /// starts on its own line.
    fn write_node(&mut self, node: Node<'_, '_>, depth: usize, indented: bool) -> Result<(), XmlError> {
        match node.node_type() {
            NodeType::Element => self.write_element(node, depth, indented),
            NodeType::Text => {
                let text = node.text().unwrap_or_default();
                if indented && text.trim().is_empty() {
                    return Ok(());
                }
                self.emit(Event::Text(BytesText::new(text)))
            }
            NodeType::Comment => {
                if indented {
                    self.break_line(depth);
                }
                self.emit(Event::Comment(BytesText::from_escaped(
                    node.text().unwrap_or_default(),
                )))
            }
            NodeType::PI => {
                if indented {
                    self.break_line(depth);
                }
                if let Some(pi) = node.pi() {
                    let body = match pi.value {
                        Some(value) => format!("<?{} {}?>", pi.target, value),
                        None => format!("<?{}?>", pi.target),
                    };
                    self.raw(body.as_bytes());
                }
                Ok(())
            }
            NodeType::Root => {
                for child in node.children() {
                    self.write_node(child, depth, indented)?;
                }
                Ok(())
            }
        }
    }

    fn write_element(&mut self, node: Node<'_, '_>, depth: usize, indented: bool) -> Result<(), XmlError> {
        let name = qualify(node, node.tag_name().namespace(), node.tag_name().name());
        let mut start = BytesStart::new(name.clone());

        for (prefix, uri) in declared_namespaces(node) {
            let key = match prefix {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
        for attr in node.attributes() {
            let key = qualify(node, attr.namespace(), attr.name());
            start.push_attribute((key.as_str(), attr.value()));
        }

        if indented {
            self.break_line(depth);
        }
        if !node.has_children() {
            return self.emit(Event::Empty(start));
        }
        self.emit(Event::Start(start))?;

        let element_only = self.pretty && is_element_only(node);
        for child in node.children() {
            self.write_node(child, depth + 1, element_only)?;
        }
        if element_only {
            self.break_line(depth);
        }
        self.emit(Event::End(BytesEnd::new(name)))
    }
}

/// True when `node` has child elements and every text child is whitespace.
fn is_element_only(node: Node<'_, '_>) -> bool {
    node.children().any(|c| c.is_element())
        && node
            .children()
            .filter(|c| c.is_text())
            .all(|c| c.text().is_none_or(|t| t.trim().is_empty()))
}

/// Prefix a local name with whatever prefix is bound to `namespace` here.
fn qualify(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    let Some(uri) = namespace else {
        return local.to_string();
    };
    let prefix = node
        .lookup_prefix(uri)
        .or_else(|| (uri == XML_NAMESPACE).then_some("xml"));
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

/// Namespace bindings introduced on `node` itself (not inherited from its parent).
fn declared_namespaces(node: Node<'_, '_>) -> Vec<(Option<String>, String)> {
    let binding = |ns: &roxmltree::Namespace<'_>| (ns.name().map(str::to_string), ns.uri().to_string());
    let inherited: Vec<(Option<String>, String)> = node
        .parent_element()
        .map(|p| p.namespaces().map(binding).collect())
        .unwrap_or_default();
    node.namespaces()
        .map(binding)
        .filter(|b| b.0.as_deref() != Some("xml") && !inherited.contains(b))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::LoadedDocument;
    use crate::text::text_content;

    fn round_trip(xml: &str, pretty: bool) -> String {
        let loaded = LoadedDocument::from_string(xml);
        let tree = loaded.parse().unwrap();
        tree.serialize(pretty).unwrap()
    }

    #[test]
    fn test_compact_preserves_markup() {
        let out = round_trip(r#"<a x="1"><b>t &amp; u</b><c/></a>"#, false);
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(out.contains(r#"<a x="1"><b>t &amp; u</b><c/></a>"#));
    }

    #[test]
    fn test_pretty_indents_element_only_content() {
        let out = round_trip("<a><b><c>x</c></b><d/></a>", true);
        assert!(out.contains("<a>\n  <b>\n    <c>x</c>\n  </b>\n  <d/>\n</a>"), "{out}");
    }

    #[test]
    fn test_pretty_leaves_mixed_content_alone() {
        let out = round_trip(r#"<a><p>One <xref rid="r1">1</xref><xref rid="r2">2</xref> two</p></a>"#, true);
        assert!(
            out.contains(r#"<p>One <xref rid="r1">1</xref><xref rid="r2">2</xref> two</p>"#),
            "{out}"
        );
    }

    #[test]
    fn test_namespaces_are_declared_once() {
        let xml = r#"<article xmlns:xlink="http://www.w3.org/1999/xlink"><fig><graphic xlink:href="a.jpg"/></fig></article>"#;
        let out = round_trip(xml, true);
        assert_eq!(out.matches("xmlns:xlink").count(), 1, "{out}");
        assert!(out.contains(r#"<graphic xlink:href="a.jpg"/>"#), "{out}");
    }

    #[test]
    fn test_pretty_output_reparses_to_same_text() {
        let xml = "<article><front><title>A <i>b</i> c</title></front><body><p>x</p></body></article>";
        let pretty = round_trip(xml, true);
        let again = LoadedDocument::from_string(pretty);
        let tree = again.parse().unwrap();
        let title = tree.query("//title").unwrap();
        assert_eq!(title[0].text(), "A b c");
        let body = tree.document().descendants().find(|n| n.has_tag_name("p")).unwrap();
        assert_eq!(text_content(body), "x");
    }

    #[test]
    fn test_comments_survive() {
        let out = round_trip("<a><!-- note --><b/></a>", true);
        assert!(out.contains("<!-- note -->"), "{out}");
    }
}
