use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::ReportError;
use crate::table::{Table, cell_text};
use crate::types::ExportFormat;

/// Export a table to the given path.
pub fn export_table(table: &Table, format: ExportFormat, path: &Path) -> Result<(), ReportError> {
    let content = render_table(table, format)?;
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::create(path).map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;
    tracing::debug!(path = %path.display(), %format, rows = table.len(), "exported table");
    Ok(())
}

/// Render a table in the given format.
pub fn render_table(table: &Table, format: ExportFormat) -> Result<String, ReportError> {
    match format {
        ExportFormat::Json => export_json(table),
        ExportFormat::Csv => export_csv(table),
        ExportFormat::Markdown => Ok(export_markdown(table)),
    }
}

/// A JSON array of row objects; every object carries every column. Cells a
/// row never had are `""`, values that are themselves null stay `null`.
fn export_json(table: &Table) -> Result<String, ReportError> {
    let rows: Vec<serde_json::Map<String, Value>> = table
        .rows()
        .iter()
        .map(|row| {
            table
                .columns()
                .iter()
                .map(|c| {
                    let cell = row.get(c).cloned().unwrap_or_else(|| Value::String(String::new()));
                    (c.clone(), cell)
                })
                .collect()
        })
        .collect();
    let mut out = serde_json::to_string_pretty(&rows)?;
    out.push('\n');
    Ok(out)
}

fn export_csv(table: &Table) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if !table.columns().is_empty() {
        writer.write_record(table.columns())?;
    }
    for i in 0..table.len() {
        writer.write_record(table.columns().iter().map(|c| cell_text(table.cell(i, c))))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn md_escape(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn export_markdown(table: &Table) -> String {
    if table.columns().is_empty() {
        return String::new();
    }
    let mut out = String::new();
    let header: Vec<String> = table.columns().iter().map(|c| md_escape(c)).collect();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!("|{}\n", "---|".repeat(header.len())));
    for i in 0..table.len() {
        let cells: Vec<String> = table
            .columns()
            .iter()
            .map(|c| md_escape(&cell_text(table.cell(i, c))))
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Row;
    use serde_json::json;

    fn table() -> Table {
        let rows = [
            json!({"ref_id": "r1", "names": ["A B", "C D"], "journal": "Cell, Inc"}),
            json!({"ref_id": "r2", "names": [], "journal": "Pipe | Journal", "extra": {"k": 1}}),
        ];
        Table::from_rows(rows.into_iter().map(|v| match v {
            Value::Object(map) => map,
            _ => Row::new(),
        }))
    }

    #[test]
    fn test_csv_joins_lists_and_quotes() {
        let csv = render_table(&table(), ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ref_id,names,journal,extra");
        assert_eq!(lines[1], r#"r1,A B; C D,"Cell, Inc","#);
        assert_eq!(lines[2], r#"r2,,Pipe | Journal,"{""k"":1}""#);
    }

    #[test]
    fn test_json_fills_missing_with_empty_string() {
        let mut table = table();
        let mut row = Row::new();
        row.insert("ref_id".to_string(), json!("r3"));
        row.insert("journal".to_string(), Value::Null);
        table.push_row(row);

        let out = render_table(&table, ExportFormat::Json).unwrap();
        let parsed: Vec<serde_json::Map<String, Value>> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0]["extra"], json!(""));
        assert_eq!(parsed[2]["names"], json!(""));
        assert_eq!(parsed[2]["journal"], Value::Null);
        assert_eq!(parsed[0]["names"], json!(["A B", "C D"]));
        let keys: Vec<&String> = parsed[1].keys().collect();
        assert_eq!(keys, vec!["ref_id", "names", "journal", "extra"]);
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let md = render_table(&table(), ExportFormat::Markdown).unwrap();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| ref_id | names | journal | extra |");
        assert_eq!(lines[1], "|---|---|---|---|");
        assert!(lines[3].contains("Pipe \\| Journal"));
    }

    #[test]
    fn test_empty_table() {
        let empty = Table::new();
        assert_eq!(render_table(&empty, ExportFormat::Csv).unwrap(), "");
        assert_eq!(render_table(&empty, ExportFormat::Markdown).unwrap(), "");
        assert_eq!(render_table(&empty, ExportFormat::Json).unwrap(), "[]\n");
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        export_table(&table(), ExportFormat::Csv, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("ref_id,names,journal,extra\n"));

        let missing = dir.path().join("no/such/dir/out.csv");
        let err = export_table(&table(), ExportFormat::Csv, &missing).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }
}
