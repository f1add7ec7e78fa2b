//! Apply one extractor across many documents and tabulate the results.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pubmed_oa_core::{Shape, parse_shape};
use pubmed_oa_reporting::{Row, Table, to_rows};
use pubmed_oa_xml::Source;
use serde_json::Value;

use crate::IngestError;
use crate::discover::{DiscoveryOptions, list_xml_paths};

const SOURCE_PATH: &str = "source_path";
const ABSTRACT: &str = "abstract";

/// What to do when one document of a batch cannot be loaded or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure and continue with the next document.
    #[default]
    Skip,
    /// Stop the batch at the first failure.
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailurePolicy::Skip => "skip",
            FailurePolicy::Abort => "abort",
        })
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(format!("unknown failure policy '{other}' (expected skip or abort)")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub shape: Shape,
    /// Add a `source_path` column naming each row's document.
    pub include_path: bool,
    /// Drop rows whose `abstract` is empty (article and metadata shapes).
    pub remove_empty_abstract: bool,
    pub on_error: FailurePolicy,
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchProgress<'a> {
    Started {
        index: usize,
        total: usize,
        path: &'a Path,
    },
    Finished {
        index: usize,
        total: usize,
        path: &'a Path,
        rows: usize,
    },
    Failed {
        index: usize,
        total: usize,
        path: &'a Path,
        message: String,
    },
}

/// A document that was skipped under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub table: Table,
    pub failures: Vec<DocumentFailure>,
    /// Documents attempted, failed ones included.
    pub documents: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.documents - self.failures.len()
    }
}

/// Turn command-line inputs into document paths: files are kept as given,
/// directories are expanded by discovery. Order is preserved and repeats dropped.
pub fn expand_inputs(inputs: &[PathBuf], discovery: &DiscoveryOptions) -> Result<Vec<PathBuf>, IngestError> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for input in inputs {
        let input = crate::discover::expand_home(input);
        let found = if input.is_dir() {
            list_xml_paths(&input, discovery)?
        } else {
            vec![input]
        };
        for path in found {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    Ok(paths)
}

/// Run `options.shape` over every document and collect the rows into one table.
///
/// List-valued shapes contribute one row per record; a document without
/// figures contributes no caption rows. Accepts any collection of paths,
/// including a single one (`[path]`).
pub fn run_batch<I, P>(
    paths: I,
    options: &BatchOptions,
    mut progress: impl FnMut(BatchProgress<'_>),
) -> Result<BatchReport, IngestError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let paths: Vec<P> = paths.into_iter().collect();
    let total = paths.len();
    let mut report = BatchReport {
        documents: total,
        ..BatchReport::default()
    };

    for (index, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        progress(BatchProgress::Started { index, total, path });

        let extracted = match parse_shape(Source::Path(path), options.shape, options.include_path) {
            Ok(extracted) => extracted,
            Err(e) => match options.on_error {
                FailurePolicy::Abort => {
                    tracing::error!(path = %path.display(), error = %e, "aborting batch");
                    return Err(IngestError::Aborted {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
                FailurePolicy::Skip => {
                    let message = e.to_string();
                    tracing::warn!(path = %path.display(), error = %message, "skipping document");
                    progress(BatchProgress::Failed {
                        index,
                        total,
                        path,
                        message: message.clone(),
                    });
                    report.failures.push(DocumentFailure {
                        path: path.to_path_buf(),
                        message,
                    });
                    continue;
                }
            },
        };

        let mut rows = to_rows(&extracted)?;
        if options.include_path {
            stamp_source_path(&mut rows, path);
        }
        progress(BatchProgress::Finished {
            index,
            total,
            path,
            rows: rows.len(),
        });
        for row in rows {
            report.table.push_row(row);
        }
    }

    if options.remove_empty_abstract {
        if report.table.has_column(ABSTRACT) {
            let dropped = report.table.retain_non_empty(ABSTRACT);
            tracing::debug!(dropped, "removed rows with empty abstract");
        } else {
            tracing::warn!(shape = %options.shape, "no abstract column, empty-abstract filter not applied");
        }
    }

    tracing::info!(
        documents = report.documents,
        failed = report.failures.len(),
        rows = report.table.len(),
        "batch complete"
    );
    Ok(report)
}

fn stamp_source_path(rows: &mut [Row], path: &Path) {
    for row in rows {
        row.entry(SOURCE_PATH)
            .or_insert_with(|| Value::String(path.display().to_string()));
    }
}
