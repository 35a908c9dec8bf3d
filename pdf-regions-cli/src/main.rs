use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_regions::{
    crop_page_region, page_boxes, BoundsPolicy, ComposeOptions, CompositionRequest, Compositor,
    NormalizedRect, SelectionData,
};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdfregions",
    about = "Mask and overlay regions of existing PDF pages",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply mask and paste regions to a PDF
    Compose {
        /// Input PDF file
        input: PathBuf,

        /// JSON file with `customSelections` and `pastedSelections`
        #[arg(short, long)]
        selections: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Draw plain white masks without the "[Masked]" label
        #[arg(long)]
        no_label: bool,

        /// What to do with regions reaching outside the page (clamp, reject)
        #[arg(short, long, default_value = "clamp")]
        bounds: BoundsPolicy,
    },

    /// Get page count and page sizes of a PDF file
    Info {
        /// Input PDF file
        input: PathBuf,
    },

    /// Crop a rendered page image into a paste payload
    Crop {
        /// Rendered page image (PNG or JPEG)
        input: PathBuf,

        /// Normalized region as left,top,width,height
        #[arg(short, long, value_parser = parse_rect, allow_hyphen_values = true)]
        rect: NormalizedRect,

        /// Output file for the data URL (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_rect(value: &str) -> std::result::Result<NormalizedRect, String> {
    let parts = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number '{}': {}", part.trim(), e))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match parts.as_slice() {
        &[left, top, width, height] => Ok(NormalizedRect::new(left, top, width, height)),
        _ => Err(format!(
            "expected left,top,width,height but got {} values",
            parts.len()
        )),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdf_regions=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compose {
            input,
            selections,
            output,
            no_label,
            bounds,
        } => {
            let pdf = fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let json = fs::read_to_string(&selections)
                .with_context(|| format!("Failed to read {}", selections.display()))?;
            let selections = SelectionData::from_json(&json)?;

            let mut options = ComposeOptions::default().with_bounds(bounds);
            if no_label {
                options = options.without_label();
            }
            debug!("Composing {} with {:?}", input.display(), options);

            let composed = Compositor::new(options).compose(CompositionRequest::new(pdf, selections))?;
            fs::write(&output, &composed.bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            let report = &composed.report;
            println!("✓ Composed PDF written to: {}", output.display());
            println!("  Pages:         {}", report.pages);
            println!("  Masks drawn:   {}", report.masks_drawn);
            println!("  Pastes drawn:  {}", report.pastes_drawn);
            if report.ignored_regions > 0 {
                println!("  Ignored:       {} (past the last page)", report.ignored_regions);
            }
            for skipped in &report.skipped {
                println!(
                    "  Skipped paste {} on page {}: {}",
                    skipped.id, skipped.page_number, skipped.reason
                );
            }
        }

        Commands::Info { input } => {
            let pdf = fs::read(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let boxes = page_boxes(&pdf)?;

            println!("PDF Information for: {}", input.display());
            println!("==========================================");
            println!("Pages: {}", boxes.len());
            for (index, page) in boxes.iter().enumerate() {
                println!(
                    "  Page {}: {:.2} x {:.2} points (origin {:.2}, {:.2})",
                    index + 1,
                    page.width,
                    page.height,
                    page.origin.x,
                    page.origin.y
                );
            }
        }

        Commands::Crop {
            input,
            rect,
            output,
        } => {
            let bitmap = image::open(&input)
                .with_context(|| format!("Failed to open image {}", input.display()))?;
            let data_url = crop_page_region(&bitmap, &rect)?;

            if let Some(output_path) = output {
                fs::write(&output_path, &data_url)
                    .with_context(|| format!("Failed to write {}", output_path.display()))?;
                println!("✓ Paste payload written to: {}", output_path.display());
            } else {
                println!("{}", data_url);
            }
        }
    }

    Ok(())
}
