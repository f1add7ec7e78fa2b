//! Bibliography extraction.

use std::collections::HashMap;

use pubmed_oa_xml::{Node, Tree, normalize_space, text_content};
use serde::Serialize;

use crate::field::{Combine, extract_field};
use crate::metadata::ArticleIds;

const REFERENCES: &str = "//ref-list/ref[@id]";
const PUBLICATION_TYPE: &str = "publication-type";
const ARTICLE_TITLE: &str = "article-title";
const SOURCE: &str = "source";
const PUB_ID_PMID: &str = r#"pub-id[@pub-id-type="pmid"]"#;

/// One bibliography entry. `pmid`/`pmc` identify the citing document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitationRecord {
    pub ref_id: String,
    /// Contributor names, given names first.
    pub names: Vec<String>,
    pub article_title: String,
    pub journal: String,
    pub journal_type: String,
    pub pmid: String,
    pub pmc: String,
    pub pmid_cited: String,
}

/// A document's bibliography, in reference-list order and indexed by `ref_id`.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    records: Vec<CitationRecord>,
    by_id: HashMap<String, usize>,
}

impl Bibliography {
    pub fn build(tree: &Tree<'_>) -> Self {
        let ids = ArticleIds::from_tree(tree);
        let mut bib = Bibliography::default();

        for hit in tree.query(REFERENCES).unwrap_or_default() {
            let entry = hit.node();
            let ref_id = entry.attribute("id").unwrap_or_default();
            let Some(citation) = citation_element(entry) else {
                tracing::debug!(origin = tree.origin(), ref_id, "reference without publication-type, skipped");
                continue;
            };
            if bib.by_id.contains_key(ref_id) {
                tracing::warn!(origin = tree.origin(), ref_id, "duplicate reference id, keeping first");
                continue;
            }

            let record = CitationRecord {
                ref_id: ref_id.to_string(),
                names: contributor_names(citation),
                article_title: extract_field(citation, ARTICLE_TITLE, Combine::First, ""),
                journal: extract_field(citation, SOURCE, Combine::First, ""),
                journal_type: citation
                    .attribute(PUBLICATION_TYPE)
                    .unwrap_or_default()
                    .to_string(),
                pmid: ids.pmid.clone(),
                pmc: ids.pmc.clone(),
                pmid_cited: extract_field(citation, PUB_ID_PMID, Combine::First, ""),
            };
            bib.by_id.insert(record.ref_id.clone(), bib.records.len());
            bib.records.push(record);
        }

        tracing::debug!(origin = tree.origin(), entries = bib.records.len(), "built bibliography");
        bib
    }

    pub fn get(&self, ref_id: &str) -> Option<&CitationRecord> {
        self.by_id.get(ref_id).map(|&i| &self.records[i])
    }

    /// The cited work's pmid, if the entry exists and carries a non-empty one.
    pub fn resolve(&self, ref_id: &str) -> Option<&str> {
        self.get(ref_id)
            .map(|r| r.pmid_cited.as_str())
            .filter(|pmid| !pmid.is_empty())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CitationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CitationRecord> {
        self.records
    }
}

/// The first child of a `ref` carrying a publication type, looking through
/// `citation-alternatives` wrappers.
fn citation_element<'a, 'input>(entry: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    entry.children().filter(Node::is_element).find_map(|child| {
        if child.has_attribute(PUBLICATION_TYPE) {
            Some(child)
        } else if child.has_tag_name("citation-alternatives") {
            citation_element(child)
        } else {
            None
        }
    })
}

/// Names are stored surname first; read each `name`'s parts back to front.
fn contributor_names(citation: Node<'_, '_>) -> Vec<String> {
    citation
        .descendants()
        .filter(|n| n.has_tag_name("name"))
        .map(|name| {
            let parts: Vec<String> = name
                .children()
                .filter(Node::is_element)
                .map(|part| normalize_space(&text_content(part)))
                .filter(|part| !part.is_empty())
                .collect();
            parts.into_iter().rev().collect::<Vec<_>>().join(" ")
        })
        .filter(|name| !name.is_empty())
        .collect()
}
