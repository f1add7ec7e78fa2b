//! Path queries over a parsed document.
//!
//! The supported language is the XPath subset the JATS extractors need:
//!
//! - absolute (`/a`, `//a`) or relative (`a/b`, `.//a`) paths
//! - `/` selects children, `//` selects descendants
//! - steps: an element name (matched on local name; an optional prefix is
//!   resolved against the in-scope namespaces), `*`, `.`, `..`, `text()`,
//!   and a final `@attr`
//! - one predicate per element step: `[@attr]` or `[@attr="value"]`
//!
//! Results are deduplicated and returned in document order.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;
use thiserror::Error;

use crate::text::text_content;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Za-z_][\w.\-]*:)?[A-Za-z_][\w.\-]*$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty path")]
    Empty,
    #[error("empty step at byte {0}")]
    EmptyStep(usize),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("unterminated predicate in step {0:?}")]
    UnterminatedPredicate(String),
    #[error("unsupported predicate in step {0:?}")]
    UnsupportedPredicate(String),
    #[error("attribute step must come last: {0:?}")]
    AttributeNotLast(String),
    #[error("unsupported axis for step {0:?}")]
    UnsupportedAxis(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QName {
    prefix: Option<String>,
    local: String,
}

impl QName {
    fn parse(raw: &str) -> Result<Self, QueryError> {
        if !NAME_RE.is_match(raw) {
            return Err(QueryError::InvalidName(raw.to_string()));
        }
        Ok(match raw.split_once(':') {
            Some((prefix, local)) => QName {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => QName {
                prefix: None,
                local: raw.to_string(),
            },
        })
    }

    /// Element names match on local name. Without a prefix the namespace is
    /// ignored, which lets queries work on both namespaced and plain JATS.
    fn matches_element(&self, node: Node<'_, '_>) -> bool {
        if !node.is_element() || node.tag_name().name() != self.local {
            return false;
        }
        match &self.prefix {
            None => true,
            Some(prefix) => node
                .lookup_namespace_uri(Some(prefix.as_str()))
                .is_some_and(|uri| node.tag_name().namespace() == Some(uri)),
        }
    }

    /// Attribute names are namespace-exact: `@href` never matches `xlink:href`.
    fn attribute<'a, 'input>(&self, node: Node<'a, 'input>) -> Option<&'a str> {
        let uri = match &self.prefix {
            Some(prefix) => Some(node.lookup_namespace_uri(Some(prefix.as_str()))?),
            None => None,
        };
        node.attributes()
            .find(|attr| attr.name() == self.local && attr.namespace() == uri)
            .map(|attr| attr.value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Element(QName),
    AnyElement,
    Text,
    SelfNode,
    Parent,
    Attribute(QName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Has(QName),
    Equals(QName, String),
}

impl Predicate {
    fn parse(inner: &str, step: &str) -> Result<Self, QueryError> {
        let unsupported = || QueryError::UnsupportedPredicate(step.to_string());
        let body = inner.trim().strip_prefix('@').ok_or_else(unsupported)?;
        match body.split_once('=') {
            None => Ok(Predicate::Has(QName::parse(body.trim())?)),
            Some((name, literal)) => {
                let literal = literal.trim();
                let value = literal
                    .strip_prefix('"')
                    .and_then(|l| l.strip_suffix('"'))
                    .or_else(|| literal.strip_prefix('\'').and_then(|l| l.strip_suffix('\'')))
                    .ok_or_else(unsupported)?;
                Ok(Predicate::Equals(
                    QName::parse(name.trim())?,
                    value.to_string(),
                ))
            }
        }
    }

    fn matches(&self, node: Node<'_, '_>) -> bool {
        match self {
            Predicate::Has(name) => name.attribute(node).is_some(),
            Predicate::Equals(name, value) => name.attribute(node) == Some(value.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicate: Option<Predicate>,
}

impl Step {
    fn parse(axis: Axis, raw: &str) -> Result<Self, QueryError> {
        let (head, predicate) = match raw.find('[') {
            Some(open) => {
                let inner = raw[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| QueryError::UnterminatedPredicate(raw.to_string()))?;
                (&raw[..open], Some(Predicate::parse(inner, raw)?))
            }
            None => (raw, None),
        };

        let test = match head {
            "." => NodeTest::SelfNode,
            ".." => NodeTest::Parent,
            "*" => NodeTest::AnyElement,
            "text()" => NodeTest::Text,
            _ => match head.strip_prefix('@') {
                Some(name) => NodeTest::Attribute(QName::parse(name)?),
                None => NodeTest::Element(QName::parse(head)?),
            },
        };

        if axis == Axis::Descendant && matches!(test, NodeTest::SelfNode | NodeTest::Parent) {
            return Err(QueryError::UnsupportedAxis(raw.to_string()));
        }
        if predicate.is_some() && !matches!(test, NodeTest::Element(_) | NodeTest::AnyElement) {
            return Err(QueryError::UnsupportedPredicate(raw.to_string()));
        }

        Ok(Step {
            axis,
            test,
            predicate,
        })
    }

    fn accepts(&self, node: Node<'_, '_>) -> bool {
        let hit = match &self.test {
            NodeTest::Element(name) => name.matches_element(node),
            NodeTest::AnyElement => node.is_element(),
            NodeTest::Text => node.is_text(),
            _ => false,
        };
        hit && self.predicate.as_ref().is_none_or(|p| p.matches(node))
    }
}

/// Byte offset of the next `/` that is not inside a predicate or a quoted literal.
fn step_end(s: &str) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '/' if depth == 0 => return i,
                _ => {}
            },
        }
    }
    s.len()
}

/// One result of a query.
#[derive(Debug, Clone, Copy)]
pub enum Match<'a, 'input> {
    /// An element, text or document node.
    Node(Node<'a, 'input>),
    /// An attribute value together with the element that carries it.
    Attribute {
        node: Node<'a, 'input>,
        value: &'a str,
    },
}

impl<'a, 'input> Match<'a, 'input> {
    /// String value: flattened text for elements, the text itself for text
    /// nodes, the value for attributes.
    pub fn text(&self) -> String {
        match self {
            Match::Node(node) if node.is_text() => node.text().unwrap_or_default().to_string(),
            Match::Node(node) => text_content(*node),
            Match::Attribute { value, .. } => value.to_string(),
        }
    }

    /// The matched node, or the owner element for attribute matches.
    pub fn node(&self) -> Node<'a, 'input> {
        match self {
            Match::Node(node) => *node,
            Match::Attribute { node, .. } => *node,
        }
    }
}

/// A compiled path query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    absolute: bool,
    steps: Vec<Step>,
}

impl Query {
    pub fn parse(path: &str) -> Result<Self, QueryError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(QueryError::Empty);
        }

        let (absolute, mut axis, mut rest) = if let Some(r) = path.strip_prefix("//") {
            (true, Axis::Descendant, r)
        } else if let Some(r) = path.strip_prefix('/') {
            (true, Axis::Child, r)
        } else {
            (false, Axis::Child, path)
        };

        let mut steps = Vec::new();
        loop {
            let end = step_end(rest);
            let raw = &rest[..end];
            if raw.is_empty() {
                return Err(QueryError::EmptyStep(path.len() - rest.len()));
            }
            steps.push(Step::parse(axis, raw)?);
            rest = &rest[end..];
            if rest.is_empty() {
                break;
            }
            if let Some(r) = rest.strip_prefix("//") {
                axis = Axis::Descendant;
                rest = r;
            } else if let Some(r) = rest.strip_prefix('/') {
                axis = Axis::Child;
                rest = r;
            }
        }

        let last = steps.len() - 1;
        if steps[..last]
            .iter()
            .any(|s| matches!(s.test, NodeTest::Attribute(_)))
        {
            return Err(QueryError::AttributeNotLast(path.to_string()));
        }

        Ok(Query { absolute, steps })
    }

    /// Evaluate against `context`. Absolute paths start from the document
    /// node regardless of the context.
    pub fn evaluate<'a, 'input>(&self, context: Node<'a, 'input>) -> Vec<Match<'a, 'input>> {
        let start = if self.absolute {
            context.document().root()
        } else {
            context
        };
        let mut current = vec![start];

        for step in &self.steps {
            if let NodeTest::Attribute(name) = &step.test {
                let owners = match step.axis {
                    Axis::Child => current,
                    Axis::Descendant => {
                        let mut all = BTreeMap::new();
                        for node in current {
                            all.extend(node.descendants().map(|d| (d.id().get(), d)));
                        }
                        all.into_values().collect()
                    }
                };
                return owners
                    .into_iter()
                    .filter_map(|node| name.attribute(node).map(|value| Match::Attribute { node, value }))
                    .collect();
            }

            // Keyed on the node index, which follows document order.
            let mut next: BTreeMap<u32, Node<'a, 'input>> = BTreeMap::new();
            for node in &current {
                match (&step.test, step.axis) {
                    (NodeTest::SelfNode, _) => {
                        next.insert(node.id().get(), *node);
                    }
                    (NodeTest::Parent, _) => {
                        if let Some(parent) = node.parent() {
                            next.insert(parent.id().get(), parent);
                        }
                    }
                    (_, Axis::Child) => {
                        next.extend(node.children().filter(|c| step.accepts(*c)).map(|c| (c.id().get(), c)));
                    }
                    (_, Axis::Descendant) => {
                        next.extend(
                            node.descendants()
                                .skip(1)
                                .filter(|c| step.accepts(*c))
                                .map(|c| (c.id().get(), c)),
                        );
                    }
                }
            }
            current = next.into_values().collect();
            if current.is_empty() {
                break;
            }
        }

        current.into_iter().map(Match::Node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<article xmlns:xlink="http://www.w3.org/1999/xlink">
  <front>
    <article-meta>
      <article-id pub-id-type="pmid">111</article-id>
      <article-id pub-id-type="pmc">PMC222</article-id>
      <title-group><article-title>On <italic>k</italic>-SAT</article-title></title-group>
    </article-meta>
  </front>
  <body>
    <sec><title>Intro</title><p>One <xref ref-type="bibr" rid="r1">1</xref> two</p></sec>
    <fig id="f1"><graphic xlink:href="f1.jpg" href="plain.jpg"/></fig>
  </body>
</article>"#;

    fn texts(doc: &roxmltree::Document<'_>, path: &str) -> Vec<String> {
        Query::parse(path)
            .unwrap()
            .evaluate(doc.root())
            .iter()
            .map(|m| m.text())
            .collect()
    }

    #[test]
    fn test_predicate_equals() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        assert_eq!(
            texts(&doc, r#"//article-meta/article-id[@pub-id-type="pmc"]"#),
            vec!["PMC222"]
        );
        assert_eq!(
            texts(&doc, "//article-meta/article-id[@pub-id-type='pmid']"),
            vec!["111"]
        );
    }

    #[test]
    fn test_text_steps() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        // Direct text children only
        assert_eq!(texts(&doc, "//title-group/article-title/text()"), vec!["On ", "-SAT"]);
        // All descendant text, in document order
        assert_eq!(
            texts(&doc, "//title-group/article-title//text()"),
            vec!["On ", "k", "-SAT"]
        );
        // Element string value flattens nested markup
        assert_eq!(texts(&doc, "//article-title"), vec!["On k-SAT"]);
    }

    #[test]
    fn test_attribute_steps() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        assert_eq!(texts(&doc, "//fig[@id]/@id"), vec!["f1"]);
        assert_eq!(texts(&doc, "//graphic/@xlink:href"), vec!["f1.jpg"]);
        assert_eq!(texts(&doc, "//graphic/@href"), vec!["plain.jpg"]);
        assert!(texts(&doc, "//graphic/@nope:href").is_empty());
        assert_eq!(texts(&doc, "//body//@rid"), vec!["r1"]);
    }

    #[test]
    fn test_relative_and_parent_steps() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let p = doc.descendants().find(|n| n.has_tag_name("p")).unwrap();
        let q = Query::parse("../title/text()").unwrap();
        let hits = q.evaluate(p);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text(), "Intro");

        let rids: Vec<String> = Query::parse(r#".//xref[@ref-type="bibr"]/@rid"#)
            .unwrap()
            .evaluate(p)
            .iter()
            .map(|m| m.text())
            .collect();
        assert_eq!(rids, vec!["r1"]);
    }

    #[test]
    fn test_absolute_path_ignores_context() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let fig = doc.descendants().find(|n| n.has_tag_name("fig")).unwrap();
        let hits = Query::parse("//article-id").unwrap().evaluate(fig);
        assert_eq!(hits.len(), 2);
        let hits = Query::parse("/article/front").unwrap().evaluate(fig);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_overlapping_descendants_are_deduplicated() {
        let doc = roxmltree::Document::parse("<a><g><g><s>x</s></g><s>y</s></g></a>").unwrap();
        assert_eq!(texts(&doc, "//g//s"), vec!["x", "y"]);
        assert_eq!(texts(&doc, "//g//text()"), vec!["x", "y"]);
    }

    #[test]
    fn test_parent_steps_merge_into_document_order() {
        let doc =
            roxmltree::Document::parse("<a><b><c/><c/></b><d><c/></d><b><c/></b></a>").unwrap();
        let names: Vec<String> = Query::parse("//c/..")
            .unwrap()
            .evaluate(doc.root())
            .iter()
            .map(|m| m.node().tag_name().name().to_string())
            .collect();
        assert_eq!(names, vec!["b", "d", "b"]);
    }

    #[test]
    fn test_namespaced_elements_match_on_local_name() {
        let xml = r#"<article xmlns="http://jats.nlm.nih.gov"><front><journal-title>J</journal-title></front></article>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        assert_eq!(texts(&doc, "/article/front/journal-title"), vec!["J"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        assert!(texts(&doc, "//ref-list/ref").is_empty());
        assert!(texts(&doc, "//front/nothing/@id").is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Query::parse(""), Err(QueryError::Empty));
        assert_eq!(Query::parse("   "), Err(QueryError::Empty));
        assert!(matches!(Query::parse("/"), Err(QueryError::EmptyStep(_))));
        assert!(matches!(Query::parse("a//"), Err(QueryError::EmptyStep(_))));
        assert!(matches!(Query::parse("a///b"), Err(QueryError::EmptyStep(_))));
        assert!(matches!(Query::parse("//a[@id"), Err(QueryError::UnterminatedPredicate(_))));
        assert!(matches!(Query::parse("//a[1]"), Err(QueryError::UnsupportedPredicate(_))));
        assert!(matches!(Query::parse("//a[@id=x]"), Err(QueryError::UnsupportedPredicate(_))));
        assert!(matches!(Query::parse("//@id/a"), Err(QueryError::AttributeNotLast(_))));
        assert!(matches!(Query::parse("//1abc"), Err(QueryError::InvalidName(_))));
        assert!(matches!(Query::parse("a//.."), Err(QueryError::UnsupportedAxis(_))));
        assert!(matches!(Query::parse("text()[@x]"), Err(QueryError::UnsupportedPredicate(_))));
    }

    #[test]
    fn test_slash_inside_predicate_literal() {
        let doc = roxmltree::Document::parse(r#"<a><b k="x/y">1</b><b k="z">2</b></a>"#).unwrap();
        assert_eq!(texts(&doc, r#"//b[@k="x/y"]"#), vec!["1"]);
    }
}
