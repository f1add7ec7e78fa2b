use thiserror::Error;

pub mod export;
pub mod table;
pub mod types;

pub use export::{export_table, render_table};
pub use table::{Row, Table, to_rows};
pub use types::ExportFormat;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
