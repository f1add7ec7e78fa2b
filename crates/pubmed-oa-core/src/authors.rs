//! Authors and the author/affiliation join.

use pubmed_oa_xml::Tree;
use serde::Serialize;

use crate::field::{Combine, extract_all, extract_field};

const AUTHORS: &str = r#"//contrib-group/contrib[@contrib-type="author"]"#;
const SURNAME: &str = "name/surname";
const GIVEN_NAMES: &str = "name/given-names";
const AFF_REFS: &str = r#"xref[@ref-type="aff"]/@rid"#;

/// One author contributor with the affiliation ids it points to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub last_name: String,
    pub first_name: String,
    pub affiliation_ids: Vec<String>,
}

/// One row per (author, affiliation reference) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorAffiliationRecord {
    pub first_name: String,
    pub last_name: String,
    pub affiliation_id: String,
}

/// Author contributors in document order.
///
/// A missing surname or given name becomes `""` rather than dropping the
/// author. A `rid` holding several space-separated ids counts as several
/// references.
pub fn extract_authors(tree: &Tree<'_>) -> Vec<Author> {
    tree.query(AUTHORS)
        .unwrap_or_default()
        .into_iter()
        .map(|hit| {
            let contrib = hit.node();
            Author {
                last_name: extract_field(contrib, SURNAME, Combine::First, ""),
                first_name: extract_field(contrib, GIVEN_NAMES, Combine::First, ""),
                affiliation_ids: extract_all(contrib, AFF_REFS)
                    .iter()
                    .flat_map(|rid| rid.split_whitespace())
                    .map(str::to_string)
                    .collect(),
            }
        })
        .collect()
}

/// Expand every author into one record per referenced affiliation, or a
/// single record with an empty reference when it has none.
pub fn flatten_author_affiliations(authors: &[Author]) -> Vec<AuthorAffiliationRecord> {
    let mut records = Vec::new();
    for author in authors {
        let record = |affiliation_id: &str| AuthorAffiliationRecord {
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            affiliation_id: affiliation_id.to_string(),
        };
        if author.affiliation_ids.is_empty() {
            records.push(record(""));
        } else {
            records.extend(author.affiliation_ids.iter().map(|id| record(id)));
        }
    }
    records
}

pub fn extract_author_affiliations(tree: &Tree<'_>) -> Vec<AuthorAffiliationRecord> {
    flatten_author_affiliations(&extract_authors(tree))
}
