//! The safe field extractor.
//!
//! Every text field of every record goes through [`extract_field`] (or one
//! of its siblings), so the default-on-absence policy lives in one place.

use pubmed_oa_xml::{Match, Node, Query, normalize_space};

/// How multiple query matches collapse into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Take the first non-blank match.
    First,
    /// Join every non-blank fragment with a single space.
    Space,
    /// Join every non-blank fragment with `","`.
    Comma,
}

impl Combine {
    fn apply(self, fragments: Vec<String>) -> Option<String> {
        let mut fragments = fragments.into_iter().filter(|f| !f.is_empty());
        match self {
            Combine::First => fragments.next(),
            Combine::Space => join(fragments, " "),
            Combine::Comma => join(fragments, ","),
        }
    }
}

fn join(fragments: impl Iterator<Item = String>, sep: &str) -> Option<String> {
    let all: Vec<String> = fragments.collect();
    (!all.is_empty()).then(|| all.join(sep))
}

/// Evaluate `path` from `ctx` and return every match's whitespace-normalised
/// string value, blanks included. A malformed path yields nothing.
fn evaluate(ctx: Node<'_, '_>, path: &str) -> Vec<String> {
    match Query::parse(path) {
        Ok(query) => query
            .evaluate(ctx)
            .iter()
            .map(|m: &Match<'_, '_>| normalize_space(&m.text()))
            .collect(),
        Err(e) => {
            tracing::debug!(path, error = %e, "query rejected");
            Vec::new()
        }
    }
}

/// Evaluate `path` and combine the matches, or return `default` if there are none.
///
/// Never fails: an invalid path or an empty result both fall back to `default`.
pub fn extract_field(ctx: Node<'_, '_>, path: &str, combine: Combine, default: &str) -> String {
    extract_optional(ctx, path, combine).unwrap_or_else(|| {
        tracing::trace!(path, "field absent, using default");
        default.to_string()
    })
}

/// Like [`extract_field`] but reports absence as `None`.
pub fn extract_optional(ctx: Node<'_, '_>, path: &str, combine: Combine) -> Option<String> {
    combine.apply(evaluate(ctx, path))
}

/// Every non-blank match of `path`, normalised, in document order.
pub fn extract_all(ctx: Node<'_, '_>, path: &str) -> Vec<String> {
    evaluate(ctx, path)
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect()
}
