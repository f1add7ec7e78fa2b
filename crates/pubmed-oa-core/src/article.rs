use pubmed_oa_xml::Tree;
use serde::Serialize;

use crate::affiliations::{Affiliation, AffiliationIndex};
use crate::authors::{AuthorAffiliationRecord, extract_author_affiliations};
use crate::metadata::{MetadataRecord, extract_metadata};

/// Metadata together with the flattened author list and the affiliation list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    #[serde(flatten)]
    pub metadata: MetadataRecord,
    pub author_list: Vec<AuthorAffiliationRecord>,
    pub affiliation_list: Vec<Affiliation>,
}

pub fn extract_article(tree: &Tree<'_>) -> ArticleRecord {
    ArticleRecord {
        metadata: extract_metadata(tree),
        author_list: extract_author_affiliations(tree),
        affiliation_list: AffiliationIndex::build(tree).into_vec(),
    }
}
