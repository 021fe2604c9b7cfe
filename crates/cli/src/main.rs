//! CLI tool for compiling markdown into PPTX slide decks.

use anyhow::{Context, Result};
use clap::Parser;
use deck_core::{markdown, Typography};
use deck_pptx::{BasePackage, DeckAssembler};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Compile constrained markdown into PPTX slide decks.
#[derive(Parser, Debug)]
#[command(name = "deck-compile")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input markdown file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Template .pptx whose layouts are reused; its slides are discarded
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Print the parsed slide plan as JSON instead of writing a deck
    #[arg(long)]
    print_plan: bool,

    /// Title font size in points
    #[arg(long)]
    title_size: Option<u32>,

    /// Body font size in points
    #[arg(long)]
    body_size: Option<u32>,

    /// Disable shrink-to-fit body text
    #[arg(long)]
    no_autofit: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let assembler = DeckAssembler::new().with_typography(typography_from(&args));

    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        match process_file(input_path, &args, &assembler) {
            Ok(Some(output_path)) => {
                if args.verbose {
                    eprintln!("Written to: {}", output_path.display());
                }
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("Error processing {}: {}", input_path.display(), e);
            }
        }
    }

    Ok(())
}

/// Build the typography policy from the command line.
fn typography_from(args: &Args) -> Typography {
    let mut typography = Typography::default();
    if let Some(size) = args.title_size {
        typography.title_size = Some(size);
    }
    if let Some(size) = args.body_size {
        typography.body_size = Some(size);
    }
    if args.no_autofit {
        typography.autofit_body = false;
    }
    typography
}

/// Compile a single markdown file. Returns the output path, or `None`
/// when only the plan was printed.
fn process_file(
    input_path: &Path,
    args: &Args,
    assembler: &DeckAssembler,
) -> Result<Option<PathBuf>> {
    let source = std::fs::read_to_string(input_path)
        .with_context(|| format!("Failed to read {}", input_path.display()))?;

    let plan = markdown::parse(&source)
        .with_context(|| format!("Failed to parse {}", input_path.display()))?;

    log::debug!("parsed {} slides", plan.len());

    if args.print_plan {
        let json = serde_json::to_string_pretty(&plan).context("Failed to encode plan")?;
        println!("{}", json);
        return Ok(None);
    }

    // A template is consumed per assembly, so it is re-opened per input.
    let base = match &args.template {
        Some(template_path) => {
            let file = File::open(template_path)
                .with_context(|| format!("Failed to open {}", template_path.display()))?;
            BasePackage::from_template(BufReader::new(file))
                .with_context(|| format!("Failed to read template {}", template_path.display()))?
        }
        None => BasePackage::blank(),
    };

    let deck = assembler
        .assemble(&plan, base)
        .with_context(|| "Failed to assemble deck")?;

    if args.verbose {
        eprintln!("  Assembled {} slides", deck.slide_count());
    }

    let bytes = deck.into_bytes().context("Failed to serialize deck")?;

    let output_path = get_output_path(input_path, args.output.as_ref())?;
    write_output(&output_path, &bytes)?;

    Ok(Some(output_path))
}

/// Determine the output path for a compiled deck.
fn get_output_path(input_path: &Path, output_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("presentation");

    let output_filename = format!("{}.pptx", stem);

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => {
            if let Some(parent) = input_path.parent() {
                parent.join(output_filename)
            } else {
                PathBuf::from(output_filename)
            }
        }
    };

    Ok(output_path)
}

/// Write the deck bytes to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
