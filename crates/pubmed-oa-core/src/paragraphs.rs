//! Body paragraphs with their section title and resolved citations.

use pubmed_oa_xml::{Node, Tree, direct_text, normalize_space, text_content};
use serde::Serialize;

use crate::field::extract_all;
use crate::metadata::ArticleIds;
use crate::references::Bibliography;

const PARAGRAPHS: &str = "//body//p";
const CITATION_MARKERS: &str = r#".//xref[@ref-type="bibr"]/@rid"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParagraphRecord {
    pub pmid: String,
    pub pmc: String,
    pub text: String,
    /// Cited reference ids in the order they appear.
    pub references: Vec<String>,
    /// `pmid_cited` of every reference that resolved to a non-empty pmid.
    pub ref_pmids: Vec<String>,
    pub section: String,
}

/// Extract every body paragraph, resolving citations against `bibliography`.
pub fn extract_paragraphs(tree: &Tree<'_>, bibliography: &Bibliography) -> Vec<ParagraphRecord> {
    let ids = ArticleIds::from_tree(tree);
    tree.query(PARAGRAPHS)
        .unwrap_or_default()
        .into_iter()
        .map(|hit| {
            let p = hit.node();
            let references: Vec<String> = extract_all(p, CITATION_MARKERS)
                .iter()
                .flat_map(|rid| rid.split_whitespace())
                .map(str::to_string)
                .collect();
            let ref_pmids = resolve_citations(&references, bibliography);
            ParagraphRecord {
                pmid: ids.pmid.clone(),
                pmc: ids.pmc.clone(),
                text: normalize_space(&direct_text(p)),
                references,
                ref_pmids,
                section: section_title(p),
            }
        })
        .collect()
}

/// Resolve ids in order. Unknown ids, empty pmids and repeats are dropped.
pub fn resolve_citations(references: &[String], bibliography: &Bibliography) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::new();
    for pmid in references.iter().filter_map(|id| bibliography.resolve(id)) {
        if !resolved.iter().any(|r| r == pmid) {
            resolved.push(pmid.to_string());
        }
    }
    resolved
}

/// Title of the nearest enclosing element that has a direct `title` child.
/// The search stops at `body`.
fn section_title(p: Node<'_, '_>) -> String {
    for ancestor in p.ancestors().skip(1).filter(Node::is_element) {
        if let Some(title) = ancestor.children().find(|c| c.has_tag_name("title")) {
            return normalize_space(&text_content(title));
        }
        if ancestor.has_tag_name("body") {
            break;
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubmed_oa_xml::LoadedDocument;

    const XML: &str = r#"<article>
<front><article-meta><article-id pub-id-type="pmid">7</article-id></article-meta></front>
<body>
  <p>Preamble with no section.</p>
  <sec id="s1"><title>Introduction</title>
    <p>Known <xref ref-type="bibr" rid="r1">1</xref> and unknown <xref ref-type="bibr" rid="r2">2</xref>.</p>
    <sec id="s1a"><title>Background <italic>details</italic></title>
      <p>Grouped <xref ref-type="bibr" rid="r1 r3">1,3</xref> and figure <xref ref-type="fig" rid="f1">1</xref>.</p>
      <list><list-item><p>Listed <xref ref-type="bibr" rid="r1">1</xref><xref ref-type="bibr" rid="r1">1</xref></p></list-item></list>
    </sec>
  </sec>
</body>
<back><ref-list>
  <ref id="r1"><element-citation publication-type="journal"><pub-id pub-id-type="pmid">12345</pub-id></element-citation></ref>
  <ref id="r3"><element-citation publication-type="journal"><source>No pmid</source></element-citation></ref>
</ref-list></back>
</article>"#;

    fn paragraphs() -> Vec<ParagraphRecord> {
        let loaded = LoadedDocument::from_string(XML);
        let tree = loaded.parse().unwrap();
        let bib = Bibliography::build(&tree);
        extract_paragraphs(&tree, &bib)
    }

    #[test]
    fn test_partial_resolution() {
        let paras = paragraphs();
        let p = &paras[1];
        assert_eq!(p.references, vec!["r1", "r2"]);
        assert_eq!(p.ref_pmids, vec!["12345"]);
        assert_eq!(p.text, "Known and unknown .");
        assert_eq!(p.pmid, "7");
    }

    #[test]
    fn test_section_is_nearest_title() {
        let paras = paragraphs();
        assert_eq!(paras[0].section, "");
        assert_eq!(paras[1].section, "Introduction");
        assert_eq!(paras[2].section, "Background details");
        assert_eq!(paras[3].section, "Background details");
    }

    #[test]
    fn test_multi_id_rid_and_other_xref_types() {
        let paras = paragraphs();
        assert_eq!(paras[2].references, vec!["r1", "r3"]);
        assert_eq!(paras[2].ref_pmids, vec!["12345"]);
    }

    #[test]
    fn test_ref_pmids_bounded_and_deduplicated() {
        let paras = paragraphs();
        let listed = &paras[3];
        assert_eq!(listed.references, vec!["r1", "r1"]);
        assert_eq!(listed.ref_pmids, vec!["12345"]);
        for p in &paras {
            assert!(p.ref_pmids.len() <= p.references.len());
        }
    }

    #[test]
    fn test_no_body_no_paragraphs() {
        let loaded = LoadedDocument::from_string("<article><front><p>not body</p></front></article>");
        let tree = loaded.parse().unwrap();
        let bib = Bibliography::build(&tree);
        assert!(extract_paragraphs(&tree, &bib).is_empty());
    }
}
