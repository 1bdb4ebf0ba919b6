//! PDF Image Recompressor CLI
//!
//! Command-line interface for shrinking the images inside PDFs.

use anyhow::Context;
use clap::Parser;
use squash_pdf::{file_ops::compress_pdf_file, inspect_images, CompressOptions};
use std::path::PathBuf;

/// Recompress the embedded images of a PDF to reduce its size
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output PDF file path
    #[arg(short, long, required_unless_present = "list")]
    output: Option<PathBuf>,

    /// List the images in the input and whether they would be recompressed
    #[arg(short, long)]
    list: bool,

    /// Keep Title, Author, Subject, Keywords, Producer and Creator
    #[arg(long)]
    keep_metadata: bool,

    /// Worker threads for image jobs (default: one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    if args.list {
        let bytes = std::fs::read(&args.input)
            .with_context(|| format!("Failed to read {}", args.input.display()))?;
        let images = inspect_images(&bytes)?;
        println!("{} image streams", images.len());
        for img in images {
            let verdict = match &img.eligibility {
                Ok(()) => "candidate".to_string(),
                Err(reason) => format!("skip: {}", reason),
            };
            println!(
                "  {} {} R  {}x{}  {}  {}  {} bpc  {} bytes  {}",
                img.object_id.0,
                img.object_id.1,
                img.width,
                img.height,
                img.filter,
                img.color_space,
                img.bits_per_component
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "?".into()),
                img.size_bytes,
                verdict
            );
        }
        return Ok(());
    }

    let Some(output) = args.output else {
        anyhow::bail!("--output is required");
    };

    let options = CompressOptions {
        strip_metadata: !args.keep_metadata,
        ..CompressOptions::default()
    };

    let summary = compress_pdf_file(&args.input, &output, &options)
        .with_context(|| format!("Failed to compress {}", args.input.display()))?;

    println!(
        "Done! {} candidate images: {} recompressed, {} kept, {} skipped ({} bytes saved)",
        summary.candidates,
        summary.replaced,
        summary.unchanged,
        summary.skipped,
        summary.bytes_saved()
    );
    println!("Output saved to: {:?}", output);

    Ok(())
}
