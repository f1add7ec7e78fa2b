use std::path::PathBuf;

use thiserror::Error;

pub mod batch;
pub mod discover;

pub use batch::{
    BatchOptions, BatchProgress, BatchReport, DocumentFailure, FailurePolicy, expand_inputs,
    run_batch,
};
pub use discover::{DEFAULT_EXTENSIONS, DiscoveryOptions, expand_home, list_xml_paths};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot read directory {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("batch aborted at {}: {source}", path.display())]
    Aborted {
        path: PathBuf,
        #[source]
        source: pubmed_oa_core::CoreError,
    },
    #[error("report error: {0}")]
    Report(#[from] pubmed_oa_reporting::ReportError),
}
