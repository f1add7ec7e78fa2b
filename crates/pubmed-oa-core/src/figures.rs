use pubmed_oa_xml::Tree;
use serde::Serialize;

use crate::field::{Combine, extract_field, extract_optional};
use crate::metadata::ArticleIds;

const FIGURES: &str = "//fig";
const LABEL: &str = "label";
// Each caption child is flattened whole so inline markup joins its neighbours.
const CAPTION: &str = "caption/*";
const GRAPHIC_HREF: &str = "graphic/@xlink:href";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FigureCaptionRecord {
    pub pmid: String,
    pub pmc: String,
    pub fig_caption: String,
    pub fig_id: String,
    pub fig_label: String,
    /// The `xlink:href` of the figure's graphic, if it has one.
    pub graphic_ref: Option<String>,
}

/// Caption records for every figure with an id, or `None` when the
/// document has no figures at all.
///
/// A figure without an `id` is skipped; its siblings are unaffected.
pub fn extract_captions(tree: &Tree<'_>) -> Option<Vec<FigureCaptionRecord>> {
    let figures = tree.query(FIGURES).unwrap_or_default();
    if figures.is_empty() {
        return None;
    }

    let ids = ArticleIds::from_tree(tree);
    let mut records = Vec::with_capacity(figures.len());
    for hit in figures {
        let fig = hit.node();
        let Some(fig_id) = fig.attribute("id") else {
            tracing::warn!(origin = tree.origin(), "figure without id, skipped");
            continue;
        };
        records.push(FigureCaptionRecord {
            pmid: ids.pmid.clone(),
            pmc: ids.pmc.clone(),
            fig_caption: extract_field(fig, CAPTION, Combine::Space, ""),
            fig_id: fig_id.to_string(),
            fig_label: extract_field(fig, LABEL, Combine::Space, ""),
            graphic_ref: extract_optional(fig, GRAPHIC_HREF, Combine::First),
        });
    }
    Some(records)
}
