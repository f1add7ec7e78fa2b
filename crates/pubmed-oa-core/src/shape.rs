use std::fmt;
use std::str::FromStr;

use pubmed_oa_xml::Tree;
use serde::Serialize;

use crate::affiliations::{Affiliation, AffiliationIndex};
use crate::article::{ArticleRecord, extract_article};
use crate::authors::{AuthorAffiliationRecord, extract_author_affiliations};
use crate::figures::{FigureCaptionRecord, extract_captions};
use crate::metadata::{MetadataRecord, extract_metadata};
use crate::paragraphs::{ParagraphRecord, extract_paragraphs};
use crate::references::{Bibliography, CitationRecord};

/// Which record shape to project a document into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Shape {
    #[default]
    Article,
    Metadata,
    Authors,
    Affiliations,
    References,
    Paragraphs,
    Captions,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::Article,
        Shape::Metadata,
        Shape::Authors,
        Shape::Affiliations,
        Shape::References,
        Shape::Paragraphs,
        Shape::Captions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Shape::Article => "article",
            Shape::Metadata => "metadata",
            Shape::Authors => "authors",
            Shape::Affiliations => "affiliations",
            Shape::References => "references",
            Shape::Paragraphs => "paragraphs",
            Shape::Captions => "captions",
        }
    }

    /// Run the matching extractor. `include_path` stamps the tree's origin
    /// onto article and metadata records.
    pub fn extract(self, tree: &Tree<'_>, include_path: bool) -> Extracted {
        let source_path = include_path.then(|| tree.origin().to_string());
        match self {
            Shape::Article => {
                let mut article = extract_article(tree);
                article.metadata.source_path = source_path;
                Extracted::Article(article)
            }
            Shape::Metadata => {
                let mut metadata = extract_metadata(tree);
                metadata.source_path = source_path;
                Extracted::Metadata(metadata)
            }
            Shape::Authors => Extracted::Authors(extract_author_affiliations(tree)),
            Shape::Affiliations => Extracted::Affiliations(AffiliationIndex::build(tree).into_vec()),
            Shape::References => Extracted::References(Bibliography::build(tree).into_records()),
            Shape::Paragraphs => {
                let bibliography = Bibliography::build(tree);
                Extracted::Paragraphs(extract_paragraphs(tree, &bibliography))
            }
            Shape::Captions => Extracted::Captions(extract_captions(tree)),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Shape::ALL
            .into_iter()
            .find(|shape| shape.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Shape::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown shape '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// The output of one extractor. Serializes as the bare record, list of
/// records, or `null` for a document without figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Extracted {
    Article(ArticleRecord),
    Metadata(MetadataRecord),
    Authors(Vec<AuthorAffiliationRecord>),
    Affiliations(Vec<Affiliation>),
    References(Vec<CitationRecord>),
    Paragraphs(Vec<ParagraphRecord>),
    Captions(Option<Vec<FigureCaptionRecord>>),
}

impl Extracted {
    /// Number of records (rows) this result contributes to a table.
    pub fn len(&self) -> usize {
        match self {
            Extracted::Article(_) | Extracted::Metadata(_) => 1,
            Extracted::Authors(v) => v.len(),
            Extracted::Affiliations(v) => v.len(),
            Extracted::References(v) => v.len(),
            Extracted::Paragraphs(v) => v.len(),
            Extracted::Captions(v) => v.as_ref().map_or(0, Vec::len),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
