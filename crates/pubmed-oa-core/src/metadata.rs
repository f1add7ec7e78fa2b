use pubmed_oa_xml::Tree;
use serde::Serialize;

use crate::field::{Combine, extract_field, extract_optional};

const TITLE: &str = "//title-group/article-title//text()";
const SUBTITLE: &str = "//title-group/subtitle//text()";
const ABSTRACT: &str = "//abstract//text()";
const JOURNAL_TITLE: &str = "//journal-title-group/journal-title";
const JOURNAL_TITLE_FALLBACK: &str = "/article/front/journal-meta/journal-title";
const PMID: &str = r#"//article-meta/article-id[@pub-id-type="pmid"]"#;
const PMC: &str = r#"//article-meta/article-id[@pub-id-type="pmc"]"#;
const PUBLISHER_ID: &str = r#"//article-meta/article-id[@pub-id-type="publisher-id"]"#;
const PUBLICATION_YEAR: &str = "//pub-date/year";
const SUBJECTS: &str = "//article-categories//subj-group//text()";

/// Document-level fields. Every field is always present; absent values are `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub full_title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub journal_title: String,
    pub pmid: String,
    pub pmc: String,
    pub publisher_id: String,
    pub publication_year: String,
    pub subjects: String,
    /// Origin of the document, only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

/// The citing document's own identifiers, stamped onto bibliography,
/// paragraph and figure records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleIds {
    pub pmid: String,
    pub pmc: String,
}

impl ArticleIds {
    pub fn from_tree(tree: &Tree<'_>) -> Self {
        let root = tree.root();
        Self {
            pmid: extract_field(root, PMID, Combine::First, ""),
            pmc: extract_field(root, PMC, Combine::First, ""),
        }
    }
}

pub fn extract_metadata(tree: &Tree<'_>) -> MetadataRecord {
    let root = tree.root();
    let ids = ArticleIds::from_tree(tree);

    let title = extract_field(root, TITLE, Combine::Space, "");
    let subtitle = extract_field(root, SUBTITLE, Combine::Space, "");
    let full_title = [title, subtitle]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let journal_title = extract_optional(root, JOURNAL_TITLE, Combine::First)
        .or_else(|| extract_optional(root, JOURNAL_TITLE_FALLBACK, Combine::First))
        .unwrap_or_default();

    let record = MetadataRecord {
        full_title,
        abstract_text: extract_field(root, ABSTRACT, Combine::Space, ""),
        journal_title,
        pmid: ids.pmid,
        pmc: ids.pmc,
        publisher_id: extract_field(root, PUBLISHER_ID, Combine::First, ""),
        publication_year: extract_field(root, PUBLICATION_YEAR, Combine::First, ""),
        subjects: extract_field(root, SUBJECTS, Combine::Comma, ""),
        source_path: None,
    };
    tracing::debug!(origin = tree.origin(), pmid = %record.pmid, "extracted metadata");
    record
}
