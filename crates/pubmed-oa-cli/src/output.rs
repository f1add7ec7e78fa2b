use std::io::Write;

use owo_colors::OwoColorize;
use pubmed_oa_ingest::BatchReport;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the end-of-batch summary: counts, then one line per skipped document.
pub fn print_batch_summary(
    w: &mut dyn Write,
    report: &BatchReport,
    color: ColorMode,
) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  Documents: {}", report.documents)?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Parsed:".green(), report.succeeded())?;
    } else {
        writeln!(w, "  Parsed: {}", report.succeeded())?;
    }
    writeln!(w, "  Rows: {}", report.table.len())?;

    if !report.failures.is_empty() {
        if color.enabled() {
            writeln!(w, "  {} {}", "Failed:".red(), report.failures.len())?;
        } else {
            writeln!(w, "  Failed: {}", report.failures.len())?;
        }
        writeln!(w)?;
        for failure in &report.failures {
            let line = format!("{}: {}", failure.path.display(), truncate(&failure.message, 160));
            if color.enabled() {
                writeln!(w, "  {} {}", "x".red(), line.dimmed())?;
            } else {
                writeln!(w, "  x {}", line)?;
            }
        }
    }
    writeln!(w)?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
