use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pubmed_oa_core::config_file::{self, ConfigFile};
use pubmed_oa_core::{Extracted, Shape};
use pubmed_oa_ingest::{BatchOptions, BatchProgress, DiscoveryOptions, FailurePolicy};
use pubmed_oa_reporting::{ExportFormat, Table};
use pubmed_oa_xml::Source;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod output;

use output::ColorMode;

/// Extract metadata, authors, references, paragraphs and figure captions
/// from PubMed Open Access (JATS) articles
#[derive(Parser, Debug)]
#[command(name = "pubmed-oa", version, about, long_about = None)]
struct Cli {
    /// Log extraction details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List article files under a directory
    List {
        /// Directory to search recursively
        dir: PathBuf,

        /// Comma-separated file extensions to match (default: nxml,xml)
        #[arg(long, value_delimiter = ',')]
        ext: Vec<String>,

        /// Descend into hidden files and directories
        #[arg(long)]
        include_hidden: bool,
    },

    /// Parse one article into a record shape
    Parse {
        /// Path to the .nxml/.xml article
        file: PathBuf,

        /// article, metadata, authors, affiliations, references, paragraphs or captions
        #[arg(long)]
        shape: Option<Shape>,

        /// json, csv or markdown
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Include the document path in article/metadata records
        #[arg(long)]
        include_path: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse many articles into one table
    Batch {
        /// Article files and/or directories to search
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// article, metadata, authors, affiliations, references, paragraphs or captions
        #[arg(long)]
        shape: Option<Shape>,

        /// json, csv or markdown
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Add a source_path column
        #[arg(long)]
        include_path: bool,

        /// Drop rows whose abstract is empty
        #[arg(long)]
        remove_empty_abstract: bool,

        /// What to do with an unreadable or malformed document: skip or abort
        #[arg(long)]
        on_error: Option<FailurePolicy>,

        /// Write the table to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Pretty-print an article
    Pretty {
        /// Path to the .nxml/.xml article
        file: PathBuf,

        /// Also write the pretty-printed document here
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config_file::load_config();

    match cli.command {
        Command::List {
            dir,
            ext,
            include_hidden,
        } => list(&dir, ext, include_hidden, &config),
        Command::Parse {
            file,
            shape,
            format,
            include_path,
            output,
        } => parse(&file, shape, format, include_path, output, &config),
        Command::Batch {
            paths,
            shape,
            format,
            include_path,
            remove_empty_abstract,
            on_error,
            output,
            no_color,
        } => {
            let batch_config = config.batch.clone().unwrap_or_default();
            let options = BatchOptions {
                shape: shape.unwrap_or_default(),
                include_path: include_path || batch_config.include_path.unwrap_or(false),
                remove_empty_abstract: remove_empty_abstract
                    || batch_config.remove_empty_abstract.unwrap_or(false),
                on_error: resolve_on_error(on_error, &config)?,
            };
            let use_color = !no_color
                && config
                    .output
                    .as_ref()
                    .and_then(|o| o.color)
                    .unwrap_or(true);
            batch(&paths, options, format, output, ColorMode(use_color), &config)
        }
        Command::Pretty { file, save } => pretty(&file, save.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

// Resolve configuration: CLI flags > env vars > config file > defaults

fn resolve_format(flag: Option<ExportFormat>, config: &ConfigFile) -> anyhow::Result<ExportFormat> {
    if let Some(format) = flag {
        return Ok(format);
    }
    let configured = std::env::var("PUBMED_OA_FORMAT")
        .ok()
        .or_else(|| config.output.as_ref().and_then(|o| o.format.clone()));
    match configured {
        Some(value) => value.parse().map_err(anyhow::Error::msg),
        None => Ok(ExportFormat::default()),
    }
}

fn resolve_on_error(flag: Option<FailurePolicy>, config: &ConfigFile) -> anyhow::Result<FailurePolicy> {
    if let Some(policy) = flag {
        return Ok(policy);
    }
    let configured = std::env::var("PUBMED_OA_ON_ERROR")
        .ok()
        .or_else(|| config.batch.as_ref().and_then(|b| b.on_error.clone()));
    match configured {
        Some(value) => value.parse().map_err(anyhow::Error::msg),
        None => Ok(FailurePolicy::default()),
    }
}

fn discovery_options(ext: Vec<String>, include_hidden: bool, config: &ConfigFile) -> DiscoveryOptions {
    let configured = config.discovery.clone().unwrap_or_default();
    let mut options = DiscoveryOptions::default();
    if !ext.is_empty() {
        options.extensions = ext;
    } else if let Some(extensions) = configured.extensions {
        options.extensions = extensions;
    }
    options.include_hidden = include_hidden || configured.include_hidden.unwrap_or(false);
    options
}

fn list(dir: &Path, ext: Vec<String>, include_hidden: bool, config: &ConfigFile) -> anyhow::Result<()> {
    let options = discovery_options(ext, include_hidden, config);
    let paths = pubmed_oa_ingest::list_xml_paths(dir, &options)?;
    let mut stdout = std::io::stdout().lock();
    for path in paths {
        writeln!(stdout, "{}", path.display())?;
    }
    Ok(())
}

fn parse(
    file: &Path,
    shape: Option<Shape>,
    format: Option<ExportFormat>,
    include_path: bool,
    output: Option<PathBuf>,
    config: &ConfigFile,
) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }
    let format = resolve_format(format, config)?;
    let include_path =
        include_path || config.batch.as_ref().and_then(|b| b.include_path).unwrap_or(false);
    let extracted = pubmed_oa_core::parse_shape(Source::Path(file), shape.unwrap_or_default(), include_path)?;

    let content = match format {
        ExportFormat::Json => render_json(&extracted)?,
        other => {
            let table = Table::from_rows(pubmed_oa_reporting::to_rows(&extracted)?);
            pubmed_oa_reporting::render_table(&table, other)?
        }
    };
    emit(&content, output.as_deref())
}

/// Single-document JSON keeps the record's own shape (object, list or null).
fn render_json(extracted: &Extracted) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(extracted)?;
    out.push('\n');
    Ok(out)
}

fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => std::io::stdout().lock().write_all(content.as_bytes())?,
    }
    Ok(())
}

fn batch(
    inputs: &[PathBuf],
    options: BatchOptions,
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
    color: ColorMode,
    config: &ConfigFile,
) -> anyhow::Result<()> {
    let format = resolve_format(format, config)?;
    let discovery = discovery_options(Vec::new(), false, config);
    let paths = pubmed_oa_ingest::expand_inputs(inputs, &discovery)?;
    if paths.is_empty() {
        anyhow::bail!("No article files found");
    }

    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let report = pubmed_oa_ingest::run_batch(&paths, &options, |event| match event {
        BatchProgress::Started { path, .. } => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            bar.set_message(name);
        }
        BatchProgress::Finished { .. } => bar.inc(1),
        BatchProgress::Failed { path, .. } => {
            bar.println(format!("skipped {}", path.display()));
            bar.inc(1);
        }
    });
    bar.finish_and_clear();
    let report = report?;

    let content = pubmed_oa_reporting::render_table(&report.table, format)?;
    emit(&content, output.as_deref())?;

    let mut stderr = std::io::stderr().lock();
    output::print_batch_summary(&mut stderr, &report, color)?;
    Ok(())
}

fn pretty(file: &Path, save: Option<&Path>) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }
    let pretty = pubmed_oa_core::pretty_print(Source::Path(file), save)?;
    std::io::stdout().lock().write_all(pretty.as_bytes())?;
    Ok(())
}
