//! plandoc CLI - business-plan document codec and paginator

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use plandoc::paginate::{measure_document, MeasureRequest};
use plandoc::render::to_json;
use plandoc::{
    Block, BreakPolicy, CodecOptions, DocumentCodec, DocumentNode, EstimatingMeasurer, HeightMap,
    HeightMeasurer, JsonFormat, PaginationOptions, Paginator, PlanDocument, PortableContentItem,
    SectionSubmission, SubmissionMeta,
};

#[derive(Parser)]
#[command(name = "plandoc")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Encode, decode and paginate business-plan documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an editor tree (JSON) into portable items
    Encode {
        /// Editor tree JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Wrap the items in a block with this title
        #[arg(short, long)]
        title: Option<String>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Decode portable items or a block (JSON) into an editor tree
    Decode {
        /// Items or block JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Keep unmatched markers open to the end of the line
        #[arg(long)]
        legacy_markers: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Build the save payload for one section
    Payload {
        /// Editor tree JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Section identifier
        #[arg(short, long)]
        section: String,

        /// Section title
        #[arg(short, long)]
        title: String,

        /// Author name
        #[arg(short, long, env = "PLANDOC_AUTHOR", default_value = "anonymous")]
        author: String,

        /// Checklist state, e.g. "1,0,1"
        #[arg(long)]
        checks: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Paginate a plan document (JSON)
    Paginate {
        /// Plan document JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Measured heights JSON (estimated if not specified)
        #[arg(long, value_name = "FILE")]
        heights: Option<PathBuf>,

        /// Pagination options JSON
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,

        /// Force page breaks before sections 0 and 1
        #[arg(long)]
        legacy_breaks: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show plan document information
    Info {
        /// Plan document JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            title,
            compact,
        } => cmd_encode(&input, output.as_deref(), title, compact),
        Commands::Decode {
            input,
            output,
            legacy_markers,
            compact,
        } => cmd_decode(&input, output.as_deref(), legacy_markers, compact),
        Commands::Payload {
            input,
            section,
            title,
            author,
            checks,
            output,
        } => cmd_payload(
            &input,
            &section,
            &title,
            &author,
            checks.as_deref(),
            output.as_deref(),
        ),
        Commands::Paginate {
            input,
            heights,
            layout,
            legacy_breaks,
            output,
        } => cmd_paginate(
            &input,
            heights.as_deref(),
            layout.as_deref(),
            legacy_breaks,
            output.as_deref(),
        ),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn format_of(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&text)?)
}

fn emit(text: &str, output: Option<&Path>) -> CliResult {
    if let Some(path) = output {
        fs::write(path, text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn cmd_encode(input: &Path, output: Option<&Path>, title: Option<String>, compact: bool) -> CliResult {
    let tree: DocumentNode = read_json(input)?;
    let codec = DocumentCodec::default();

    let json = match title {
        Some(title) => to_json(&codec.encode_block(title, &tree), format_of(compact))?,
        None => to_json(&codec.encode(&tree), format_of(compact))?,
    };
    emit(&json, output)
}

/// Either a bare item array or a whole block.
#[derive(Deserialize)]
#[serde(untagged)]
enum DecodeInput {
    Block(Block),
    Items(Vec<PortableContentItem>),
}

fn cmd_decode(input: &Path, output: Option<&Path>, legacy_markers: bool, compact: bool) -> CliResult {
    let mut options = CodecOptions::new();
    if legacy_markers {
        options = options.legacy_markers();
    }
    let codec = DocumentCodec::new(options);

    let tree = match read_json::<DecodeInput>(input)? {
        DecodeInput::Block(block) => codec.decode_block(&block),
        DecodeInput::Items(items) => codec.decode(&items),
    };
    emit(&to_json(&tree, format_of(compact))?, output)
}

fn parse_checks(list: &str) -> CliResult<Vec<bool>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "1" | "true" | "y" => Ok(true),
            "0" | "false" | "n" => Ok(false),
            other => Err(format!("invalid check value '{}'", other).into()),
        })
        .collect()
}

fn cmd_payload(
    input: &Path,
    section: &str,
    title: &str,
    author: &str,
    checks: Option<&str>,
    output: Option<&Path>,
) -> CliResult {
    let tree: DocumentNode = read_json(input)?;
    let checks = checks.map(parse_checks).transpose()?.unwrap_or_default();

    let block = DocumentCodec::default().encode_block(title, &tree);
    let submission = SectionSubmission::prepare(
        section,
        checks,
        SubmissionMeta::today(author),
        std::slice::from_ref(&block),
    );

    match submission {
        Some(submission) => emit(&to_json(&submission, JsonFormat::Pretty)?, output),
        None => {
            eprintln!(
                "{} section '{}' is empty, nothing to submit",
                "Skipped:".yellow(),
                section
            );
            Ok(())
        }
    }
}

/// Estimating measurer that advances a progress bar.
struct ProgressMeasurer {
    inner: EstimatingMeasurer,
    bar: ProgressBar,
}

impl HeightMeasurer for ProgressMeasurer {
    fn measure(&mut self, request: &MeasureRequest<'_>) -> plandoc::Result<f32> {
        let height = self.inner.measure(request)?;
        self.bar.inc(1);
        Ok(height)
    }
}

fn estimate_heights(doc: &PlanDocument) -> CliResult<HeightMap> {
    let bar = ProgressBar::new(doc.item_count() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    bar.set_message("Measuring items...");

    let mut measurer = ProgressMeasurer {
        inner: EstimatingMeasurer::new(),
        bar,
    };
    let heights = measure_document(doc, &mut measurer)?;
    measurer.bar.finish_and_clear();
    Ok(heights)
}

fn cmd_paginate(
    input: &Path,
    heights: Option<&Path>,
    layout: Option<&Path>,
    legacy_breaks: bool,
    output: Option<&Path>,
) -> CliResult {
    let doc: PlanDocument = read_json(input)?;

    let heights = match heights {
        Some(path) => read_json::<HeightMap>(path)?,
        None => estimate_heights(&doc)?,
    };
    heights.validate(&doc)?;

    let mut options = match layout {
        Some(path) => read_json::<PaginationOptions>(path)?,
        None => PaginationOptions::a4(),
    };
    if legacy_breaks {
        options = options.with_break_policy(BreakPolicy::legacy_export());
    }

    let pages = Paginator::new(options).paginate(heights.sections());
    log::info!("{} item(s) on {} page(s)", heights.item_count(), pages.len());
    emit(&to_json(&pages, JsonFormat::Pretty)?, output)
}

fn cmd_info(input: &Path) -> CliResult {
    let doc: PlanDocument = read_json(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Title".bold(), doc.title);
    println!("{}: {}", "Sections".bold(), doc.section_count());

    for section in &doc.sections {
        println!(
            "  {} {} ({} item(s))",
            "├─".dimmed(),
            section.title,
            section.items.len()
        );
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let items = doc.sections.iter().flat_map(|s| s.items.iter());
    let (mut text, mut images, mut tables, mut words) = (0, 0, 0, 0);
    for item in items {
        match item {
            PortableContentItem::Text { value } => {
                text += 1;
                words += value.split_whitespace().count();
            }
            PortableContentItem::Image { .. } => images += 1,
            PortableContentItem::Table { .. } => tables += 1,
        }
    }

    println!("{}: {}", "Text items".bold(), text);
    println!("{}: {}", "Images".bold(), images);
    println!("{}: {}", "Tables".bold(), tables);
    println!("{}: {}", "Words".bold(), words);

    let heights = measure_document(&doc, &mut EstimatingMeasurer::new())?;
    let pages = Paginator::new(PaginationOptions::a4()).paginate(heights.sections());
    println!("{}: {}", "Estimated pages".bold(), pages.len());

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "plandoc".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Business-plan document codec and paginator");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/plandoc".dimmed());
    println!("License: MIT");
}
