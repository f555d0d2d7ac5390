//! PDF Compose CLI tool
//!
//! A command-line front end for merging, normalizing and stamping PDFs.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use lopdf::Document;
use std::path::PathBuf;
use std::process;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pdf_compose::compose::Attachment;
use pdf_compose::date::{parse_date_expression, resolve_date};
use pdf_compose::direction::{FirstNonEmptyField, ScriptMajority};
use pdf_compose::pdf::{document_info, merge_files, page_count, validate, MergeOptions};
use pdf_compose::{
    Composer, CompositionRequest, Direction, DirectionClassifier, EngineConfig, PageSize, TemplateConfig,
};

/// PDF Compose - Merge, normalize and brand PDF documents
#[derive(Parser)]
#[command(name = "pdf-compose")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Compose a receipt with an attachment, printing the result as JSON
    pdf-compose compose rendered.pdf --attachment invoice.pdf --code RCPT-0042

    # Mirror the layout when most sample text is right-to-left
    pdf-compose compose rendered.pdf --sample \"$CUSTOMER\" --sample \"$NOTES\"

    # Merge and normalize numbered PDFs in order
    pdf-compose merge -o merged.pdf \"[0-9]*.pdf\"

    # Check a file before using it as an attachment
    pdf-compose validate upload.pdf")]
struct Cli {
    /// Config file path (default: ./pdf-compose.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    Forward,
    Mirrored,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Forward => Direction::Forward,
            DirectionArg::Mirrored => Direction::Mirrored,
        }
    }
}

/// How `--sample` text picks a direction
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Right-to-left letters outnumber all others across every sample
    Majority,
    /// The first sample containing letters decides
    FirstField,
}

#[derive(clap::Args)]
struct StampArgs {
    /// Layout direction (overrides --sample)
    #[arg(long, value_enum)]
    direction: Option<DirectionArg>,

    /// Sample text used to infer the direction; repeat in priority order
    #[arg(long)]
    sample: Vec<String>,

    /// Direction inference policy for --sample
    #[arg(long, value_enum, default_value = "majority")]
    policy: PolicyArg,

    /// Document code printed in the footer
    #[arg(long, default_value = "")]
    code: String,

    /// Issue date ("today", "2026-01-14" or "14/01/2026")
    #[arg(long, default_value = "today")]
    date: String,

    /// Built-in template preset ("receipt" or "rfq")
    #[arg(long)]
    template: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a content PDF with its attachment and insert, then stamp it
    Compose {
        /// Content PDF produced upstream
        content: PathBuf,

        /// Optional PDF appended after the content
        #[arg(long)]
        attachment: Option<PathBuf>,

        /// Leave out the configured insert
        #[arg(long)]
        no_insert: bool,

        /// Output base name, without extension
        #[arg(long)]
        name: Option<String>,

        /// Output directory (overrides the config file)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        stamp: StampArgs,
    },

    /// Merge PDF files and normalize every page to A4
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Stamp the overlay onto an existing PDF
    Stamp {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        stamp: StampArgs,
    },

    /// Check whether a file is a usable PDF
    Validate {
        /// File to check
        input: PathBuf,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Compose { content, attachment, no_insert, name, output_dir, stamp } => {
            cmd_compose(cli.config, content, attachment, no_insert, name, output_dir, stamp)
        }
        Commands::Merge { inputs, output } => cmd_merge(inputs, output),
        Commands::Stamp { input, output, stamp } => cmd_stamp(cli.config, input, output, stamp),
        Commands::Validate { input } => cmd_validate(input),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Load the config file and apply the template preset, if any
fn load_config(path: Option<PathBuf>, template: Option<&str>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => EngineConfig::load(),
    };

    if let Some(name) = template {
        config.template = match TemplateConfig::preset(name) {
            Some(template) => template,
            None => bail!("Unknown template preset: {}", name),
        };
    }

    Ok(config)
}

impl StampArgs {
    fn direction(&self) -> Direction {
        if let Some(direction) = self.direction {
            return direction.into();
        }
        let samples: Vec<&str> = self.sample.iter().map(String::as_str).collect();
        match self.policy {
            PolicyArg::Majority => ScriptMajority.classify(&samples),
            PolicyArg::FirstField => FirstNonEmptyField.classify(&samples),
        }
    }

    fn issue_date(&self) -> Result<chrono::NaiveDate> {
        let expr = parse_date_expression(&self.date)?;
        Ok(resolve_date(&expr))
    }
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            for entry in glob(&pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => warn!("glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            // Sort each pattern's matches; explicit argument order is kept
            matched.sort();
            paths.extend(matched);
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

fn cmd_compose(
    config_path: Option<PathBuf>,
    content: PathBuf,
    attachment: Option<PathBuf>,
    no_insert: bool,
    name: Option<String>,
    output_dir: Option<PathBuf>,
    stamp: StampArgs,
) -> Result<()> {
    let mut config = load_config(config_path, stamp.template.as_deref())?;
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let composer = Composer::new(config).context("Failed to set up composer")?;

    let request = CompositionRequest {
        content,
        attachment: attachment.map(Attachment::Path),
        include_insert: !no_insert,
        direction: stamp.direction(),
        document_code: stamp.code.clone(),
        issue_date: stamp.issue_date()?,
        output_name: name,
    };

    let result = composer.compose(&request).context("Composition failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn cmd_merge(inputs: Vec<String>, output: PathBuf) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    info!("Merging {} PDF files...", inputs.len());

    let options = MergeOptions {
        input_paths: inputs,
        output_path: output.clone(),
        reference: PageSize::A4,
    };
    let pages = merge_files(&options).context("Merge failed")?;

    info!("Merged {} pages to: {}", pages, output.display());
    Ok(())
}

fn cmd_stamp(config_path: Option<PathBuf>, input: PathBuf, output: PathBuf, stamp: StampArgs) -> Result<()> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }

    let config = load_config(config_path, stamp.template.as_deref())?;
    let composer = Composer::new(config).context("Failed to set up composer")?;

    let mut document = Document::load(&input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let report = composer.stamp(&mut document, stamp.direction(), &stamp.code, &stamp.issue_date()?)?;

    document.compress();
    document
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Stamped {} pages to: {}", report.stamped, output.display());
    if !report.skipped.is_empty() {
        warn!("Pages not A4, left unstamped: {:?}", report.skipped);
    }
    Ok(())
}

fn cmd_validate(input: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;

    if !validate(&bytes) {
        bail!("{} is not a valid PDF", input.display());
    }

    println!("{}: valid, {} pages", input.display(), page_count(&bytes)?);
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let bytes = std::fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    let info = document_info(&bytes)?;

    println!("File: {}", input.display());
    println!("Version: {}", info.version);
    println!("Pages: {}", info.page_count);

    if let Some(title) = info.title {
        println!("Title: {}", title);
    }
    if let Some(author) = info.author {
        println!("Author: {}", author);
    }

    Ok(())
}
