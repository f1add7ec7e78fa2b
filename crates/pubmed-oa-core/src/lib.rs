use std::path::{Path, PathBuf};

use pubmed_oa_xml::{LoadedDocument, Source, Tree, XmlError};
use thiserror::Error;

pub mod affiliations;
pub mod article;
pub mod authors;
pub mod config_file;
pub mod field;
pub mod figures;
pub mod metadata;
pub mod paragraphs;
pub mod references;
pub mod shape;

// Re-export for convenience
pub use affiliations::{Affiliation, AffiliationIndex};
pub use article::{ArticleRecord, extract_article};
pub use authors::{Author, AuthorAffiliationRecord, extract_author_affiliations, extract_authors, flatten_author_affiliations};
pub use field::{Combine, extract_all, extract_field, extract_optional};
pub use figures::{FigureCaptionRecord, extract_captions};
pub use metadata::{ArticleIds, MetadataRecord, extract_metadata};
pub use paragraphs::{ParagraphRecord, extract_paragraphs, resolve_citations};
pub use references::{Bibliography, CitationRecord};
pub use shape::{Extracted, Shape};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Document(#[from] XmlError),
    #[error("failed to write {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load and parse `source`, then hand the tree to `f`.
fn with_tree<T>(source: Source<'_>, f: impl FnOnce(&Tree<'_>) -> T) -> Result<T, CoreError> {
    let loaded = LoadedDocument::load(source)?;
    let tree = loaded.parse()?;
    Ok(f(&tree))
}

/// Metadata plus authors and affiliations for one document.
pub fn parse_article(source: Source<'_>, include_path: bool) -> Result<ArticleRecord, CoreError> {
    with_tree(source, |tree| {
        let mut article = extract_article(tree);
        if include_path {
            article.metadata.source_path = Some(tree.origin().to_string());
        }
        article
    })
}

pub fn parse_metadata(source: Source<'_>, include_path: bool) -> Result<MetadataRecord, CoreError> {
    with_tree(source, |tree| {
        let mut metadata = extract_metadata(tree);
        if include_path {
            metadata.source_path = Some(tree.origin().to_string());
        }
        metadata
    })
}

pub fn parse_author_affiliations(source: Source<'_>) -> Result<Vec<AuthorAffiliationRecord>, CoreError> {
    with_tree(source, extract_author_affiliations)
}

pub fn parse_affiliations(source: Source<'_>) -> Result<Vec<Affiliation>, CoreError> {
    with_tree(source, |tree| AffiliationIndex::build(tree).into_vec())
}

pub fn parse_references(source: Source<'_>) -> Result<Vec<CitationRecord>, CoreError> {
    with_tree(source, |tree| Bibliography::build(tree).into_records())
}

/// Paragraphs with citations resolved against the same document's bibliography.
pub fn parse_paragraphs(source: Source<'_>) -> Result<Vec<ParagraphRecord>, CoreError> {
    with_tree(source, |tree| {
        let bibliography = Bibliography::build(tree);
        extract_paragraphs(tree, &bibliography)
    })
}

/// `Ok(None)` means the document has no figures.
pub fn parse_captions(source: Source<'_>) -> Result<Option<Vec<FigureCaptionRecord>>, CoreError> {
    with_tree(source, extract_captions)
}

/// Project one document into `shape`.
pub fn parse_shape(source: Source<'_>, shape: Shape, include_path: bool) -> Result<Extracted, CoreError> {
    with_tree(source, |tree| shape.extract(tree, include_path))
}

/// Pretty-print a document, also writing the result to `save` when given.
pub fn pretty_print(source: Source<'_>, save: Option<&Path>) -> Result<String, CoreError> {
    let loaded = LoadedDocument::load(source)?;
    let pretty = loaded.parse()?.serialize(true)?;
    if let Some(path) = save {
        std::fs::write(path, &pretty).map_err(|source| CoreError::Save {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "saved pretty-printed document");
    }
    Ok(pretty)
}
