//! Tree access for JATS documents.
//!
//! Loads a document from a path, a literal string, or an open reader, parses
//! it into a navigable `roxmltree` tree, evaluates path queries against it and
//! writes it back out (compact or pretty-printed) with quick-xml.

mod query;
mod text;
mod writer;

use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use query::{Match, Query, QueryError};
pub use roxmltree::Node;
pub use text::{direct_text, normalize_space, text_content};

/// Origin label used for documents loaded from a literal string.
pub const STRING_ORIGIN: &str = "<string>";

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML in {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: roxmltree::Error,
    },
    #[error("serialization error: {0}")]
    Write(String),
}

/// Where a document comes from.
pub enum Source<'a> {
    /// A file on disk.
    Path(&'a Path),
    /// Literal markup.
    Text(&'a str),
    /// An already-open stream; `name` labels it in error messages.
    Reader {
        name: &'a str,
        reader: &'a mut dyn Read,
    },
}

impl<'a> From<&'a Path> for Source<'a> {
    fn from(path: &'a Path) -> Self {
        Source::Path(path)
    }
}

impl<'a> From<&'a PathBuf> for Source<'a> {
    fn from(path: &'a PathBuf) -> Self {
        Source::Path(path.as_path())
    }
}

/// The raw text of a document plus a label describing where it came from.
///
/// Parsing borrows from this value, so keep it alive for as long as the
/// [`Tree`] is in use.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    origin: String,
    text: String,
}

impl LoadedDocument {
    pub fn load(source: Source<'_>) -> Result<Self, XmlError> {
        match source {
            Source::Path(path) => Self::from_path(path),
            Source::Text(text) => Ok(Self::from_string(text)),
            Source::Reader { name, reader } => Self::from_reader(reader, name),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, XmlError> {
        let text = std::fs::read_to_string(path).map_err(|source| XmlError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            origin: path.display().to_string(),
            text,
        })
    }

    pub fn from_string(text: impl Into<String>) -> Self {
        Self {
            origin: STRING_ORIGIN.to_string(),
            text: text.into(),
        }
    }

    pub fn from_reader<R: Read + ?Sized>(reader: &mut R, name: &str) -> Result<Self, XmlError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| XmlError::Read {
                origin: name.to_string(),
                source,
            })?;
        Ok(Self {
            origin: name.to_string(),
            text,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse the text into a tree.
    ///
    /// DOCTYPE declarations are accepted (JATS files reference the NLM DTDs)
    /// but external entities are never resolved.
    pub fn parse(&self) -> Result<Tree<'_>, XmlError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(&self.text, options).map_err(
            |source| XmlError::Malformed {
                origin: self.origin.clone(),
                source,
            },
        )?;
        tracing::trace!(origin = %self.origin, nodes = doc.descendants().count(), "parsed document");
        Ok(Tree {
            origin: &self.origin,
            doc,
        })
    }
}

/// A parsed, read-only document tree.
#[derive(Debug)]
pub struct Tree<'input> {
    origin: &'input str,
    doc: roxmltree::Document<'input>,
}

impl<'input> Tree<'input> {
    pub fn origin(&self) -> &'input str {
        self.origin
    }

    pub fn document(&self) -> &roxmltree::Document<'input> {
        &self.doc
    }

    /// The document node (parent of the root element).
    pub fn root(&self) -> Node<'_, 'input> {
        self.doc.root()
    }

    /// Evaluate `path` from the document node.
    pub fn query(&self, path: &str) -> Result<Vec<Match<'_, 'input>>, QueryError> {
        Ok(Query::parse(path)?.evaluate(self.root()))
    }

    /// Write the tree back to markup. `pretty` indents element-only content.
    pub fn serialize(&self, pretty: bool) -> Result<String, XmlError> {
        writer::serialize(&self.doc, pretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_string_and_query() {
        let loaded = LoadedDocument::from_string("<article><front><title>T</title></front></article>");
        let tree = loaded.parse().unwrap();
        assert_eq!(tree.origin(), STRING_ORIGIN);
        let hits = tree.query("//title").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text(), "T");
    }

    #[test]
    fn test_load_from_reader() {
        let mut bytes: &[u8] = b"<a><b>x</b></a>";
        let loaded = LoadedDocument::load(Source::Reader {
            name: "stdin",
            reader: &mut bytes,
        })
        .unwrap();
        assert_eq!(loaded.origin(), "stdin");
        assert!(loaded.parse().is_ok());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = LoadedDocument::from_path(Path::new("/definitely/not/here.nxml")).unwrap_err();
        assert!(matches!(err, XmlError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.nxml"));
    }

    #[test]
    fn test_malformed_names_origin() {
        let loaded = LoadedDocument::from_string("<article><front></article>");
        let err = loaded.parse().unwrap_err();
        match err {
            XmlError::Malformed { origin, .. } => assert_eq!(origin, STRING_ORIGIN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_doctype_is_accepted() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE article PUBLIC "-//NLM//DTD JATS (Z39.96) Journal Archiving and Interchange DTD v1.0 20120330//EN" "JATS-archivearticle1.dtd">
<article><front/></article>"#;
        let loaded = LoadedDocument::from_string(xml);
        assert!(loaded.parse().is_ok());
    }

    #[test]
    fn test_bad_query_is_an_error() {
        let loaded = LoadedDocument::from_string("<a/>");
        let tree = loaded.parse().unwrap();
        assert!(tree.query("//a[@").is_err());
    }
}
