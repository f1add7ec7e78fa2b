use pubmed_oa_xml::Tree;
use serde::Serialize;

use crate::field::{Combine, extract_field};

const AFFILIATIONS: &str = "//aff[@id]";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Affiliation {
    pub id: String,
    pub text: String,
}

/// Affiliation id -> normalised affiliation text, in document order.
///
/// Never empty: a document without identified affiliations holds a single
/// placeholder entry whose id and text are both `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliationIndex {
    entries: Vec<Affiliation>,
}

impl AffiliationIndex {
    pub fn build(tree: &Tree<'_>) -> Self {
        let mut entries: Vec<Affiliation> = Vec::new();
        for hit in tree.query(AFFILIATIONS).unwrap_or_default() {
            let node = hit.node();
            let id = node.attribute("id").unwrap_or_default().to_string();
            if entries.iter().any(|a| a.id == id) {
                tracing::warn!(origin = tree.origin(), id = %id, "duplicate affiliation id, keeping first");
                continue;
            }
            entries.push(Affiliation {
                text: extract_field(node, ".", Combine::First, ""),
                id,
            });
        }

        if entries.is_empty() {
            entries.push(Affiliation::default());
        }
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Affiliation> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Affiliation> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubmed_oa_xml::LoadedDocument;

    #[test]
    fn test_flattens_nested_markup() {
        let loaded = LoadedDocument::from_string(
            r#"<article><front><aff id="a1"><label>1</label>
      <institution>Dept. of <italic>Biology</italic></institution>,
      Springfield</aff><aff id="a2">Elsewhere</aff></front></article>"#,
        );
        let tree = loaded.parse().unwrap();
        let index = AffiliationIndex::build(&tree);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("a1"), Some("1 Dept. of Biology, Springfield"));
        assert_eq!(index.get("a2"), Some("Elsewhere"));
        assert_eq!(index.get("a3"), None);
    }

    #[test]
    fn test_placeholder_when_no_affiliations() {
        let loaded = LoadedDocument::from_string("<article><front><aff>No id here</aff></front></article>");
        let tree = loaded.parse().unwrap();
        let index = AffiliationIndex::build(&tree);
        assert_eq!(index.into_vec(), vec![Affiliation::default()]);
    }
}
