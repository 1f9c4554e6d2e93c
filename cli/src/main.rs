//! expdf CLI - atomic PDF image and region text extraction

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use expdf::parser::XObject;
use expdf::{
    process_into, ContentKind, Destination, DirectoryDestination, ExtractConfig, ImageEncoding,
    Outcome, PageSelection, PdfDocument, SourceInput,
};

#[derive(Parser)]
#[command(name = "expdf")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Extract embedded images or region text from PDF documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one extraction per input file
    Extract {
        /// Input PDF files
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// What to extract from each page (required unless --config sets it)
        #[arg(short, long, value_enum)]
        content: Option<Content>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Image output format
        #[arg(long, value_enum, default_value = "tiff")]
        encoding: Encoding,

        /// Record where each image is painted
        #[arg(long)]
        image_location: bool,

        /// Record the pixel size of each image
        #[arg(long)]
        image_size: bool,

        /// JSON property file (overrides the flags above)
        #[arg(long, value_name = "FILE", env = "EXPDF_CONFIG")]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "expdf_output")]
        output: PathBuf,

        /// Do not write attribute sidecar files
        #[arg(long)]
        no_sidecars: bool,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Content {
    /// Raster images from each page's resource table
    Image,
    /// Text inside the capture region
    Text,
}

impl From<Content> for ContentKind {
    fn from(content: Content) -> Self {
        match content {
            Content::Image => ContentKind::Image,
            Content::Text => ContentKind::Text,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Encoding {
    Tiff,
    Png,
}

impl From<Encoding> for ImageEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Tiff => ImageEncoding::Tiff,
            Encoding::Png => ImageEncoding::Png,
        }
    }
}

/// Settings shared by every file of one `extract` run.
struct ExtractArgs {
    content: Option<Content>,
    pages: Option<String>,
    encoding: Encoding,
    image_location: bool,
    image_size: bool,
    config: Option<PathBuf>,
}

impl ExtractArgs {
    fn into_config(self) -> Result<ExtractConfig, Box<dyn std::error::Error>> {
        if let Some(path) = self.config {
            let json = std::fs::read_to_string(&path)?;
            return Ok(ExtractConfig::from_json(&json)?);
        }

        let content = self.content.ok_or(
            "--content is required unless --config supplies CONTENT_TO_EXTRACT",
        )?;
        let pages = match self.pages {
            Some(p) => PageSelection::parse(&p)?,
            None => PageSelection::All,
        };
        Ok(ExtractConfig::new(content.into())
            .with_pages(pages)
            .with_image_encoding(self.encoding.into())
            .with_image_location(self.image_location)
            .with_image_size(self.image_size))
    }
}

/// Destination wrapper that reports each outcome on the terminal.
struct Reporting<'a> {
    inner: DirectoryDestination,
    progress: &'a ProgressBar,
    units: usize,
    failed: usize,
}

impl Destination for Reporting<'_> {
    fn deliver(&mut self, outcome: Outcome) -> expdf::Result<()> {
        let name = outcome.original().name.clone();
        match &outcome {
            Outcome::Committed { units, .. } => {
                self.units += units.len();
                self.progress
                    .println(format!("{} {} ({} units)", "Extracted".green(), name, units.len()));
            }
            Outcome::Failed { message, .. } => {
                self.failed += 1;
                self.progress
                    .println(format!("{} {}: {}", "Failed".red(), name, message));
            }
        }
        self.inner.deliver(outcome)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            inputs,
            content,
            pages,
            encoding,
            image_location,
            image_size,
            config,
            output,
            no_sidecars,
        } => {
            let args = ExtractArgs {
                content,
                pages,
                encoding,
                image_location,
                image_size,
                config,
            };
            cmd_extract(&inputs, args, &output, !no_sidecars)
        }
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

fn cmd_extract(
    inputs: &[PathBuf],
    args: ExtractArgs,
    output: &Path,
    sidecars: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.into_config()?;
    log::debug!("Extraction config: {:?}", config);

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut destination = Reporting {
        inner: DirectoryDestination::new(output).with_sidecars(sidecars),
        progress: &pb,
        units: 0,
        failed: 0,
    };

    for input in inputs {
        pb.set_message(input.display().to_string());
        let source = SourceInput::from_path(input)?;
        process_into(source, &config, &mut destination)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!(
        "\n{} {} units from {} files into {}",
        "Done!".green().bold(),
        destination.units,
        inputs.len() - destination.failed,
        output.display()
    );

    if destination.failed > 0 {
        return Err(format!("{} of {} files failed", destination.failed, inputs.len()).into());
    }
    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = PdfDocument::open(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), doc.version());
    println!("{}: {}", "Pages".bold(), doc.page_count());

    println!();
    println!("{}", "Resource Tables".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for (i, page) in doc.pages().enumerate() {
        let page_box = page.page_box();
        let summary = match page.xobjects() {
            Ok(entries) => {
                let images = entries.iter().filter(|e| e.object.is_image()).count();
                let forms = entries
                    .iter()
                    .filter(|e| matches!(e.object, XObject::Form(_)))
                    .count();
                format!(
                    "{} images, {} forms, {} other",
                    images,
                    forms,
                    entries.len() - images - forms
                )
            }
            Err(e) => format!("{}", e.to_string().red()),
        };
        println!(
            "{} {} ({:.0}x{:.0}pt): {}",
            "Page".bold(),
            i + 1,
            page_box.width(),
            page_box.height(),
            summary
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "expdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Atomic PDF image and region text extraction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/expdf".dimmed());
    println!("License: MIT");
}
