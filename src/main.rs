use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use darkroom::gallery::LazyDir;
use darkroom::{Collection, Config, OutputFormat, ResizeError};

#[derive(Parser)]
#[command(name = "darkroom")]
#[command(about = "On-demand photo transformation cache")]
#[command(long_about = "\
On-demand photo transformation cache

Your filesystem is the data source: each subdirectory of the gallery root is
a gallery, its image files are photos, and an optional info.txt sidecar
carries titles, descriptions, and per-photo overrides. Renditions are
computed once per parameter set and cached under the cache root; editing a
source photo invalidates its renditions automatically.")]
struct Cli {
    /// Path to darkroom.toml (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List galleries under the root
    Galleries,
    /// List the photos of one gallery
    Photos { gallery: String },
    /// Print raw dimensions and EXIF of a photo as JSON
    Properties { gallery: String, photo: String },
    /// Produce (or serve from cache) one rendition of a photo
    Resize {
        gallery: String,
        photo: String,
        /// Target width; derived from the aspect ratio when omitted
        #[arg(long)]
        width: Option<u32>,
        /// Target height; derived from the aspect ratio when omitted
        #[arg(long)]
        height: Option<u32>,
        /// Encoding quality 1-100
        #[arg(long)]
        quality: Option<u8>,
        /// Rotation in counter-clockwise degrees
        #[arg(long)]
        rotation: Option<f64>,
        /// Output format (jpeg|png|gif); detected when omitted
        #[arg(long)]
        format: Option<String>,
        /// Write the bytes here instead of only reporting the cache path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, String> {
    match path {
        Some(path) => Config::load(path).map_err(|e| format!("{}: {e}", path.display())),
        None => Ok(Config::default()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };
    let collection = Collection::new(&config);

    match run(&collection, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::NotFound(message)) => {
            eprintln!("error: {message}");
            ExitCode::from(2)
        }
        Err(CliError::Failed(message)) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

enum CliError {
    /// Gallery or photo does not exist (exit code 2).
    NotFound(String),
    /// Anything else (exit code 1).
    Failed(String),
}

impl From<ResizeError> for CliError {
    fn from(e: ResizeError) -> Self {
        if e.is_not_found() {
            CliError::NotFound(e.to_string())
        } else {
            CliError::Failed(e.to_string())
        }
    }
}

impl From<darkroom::gallery::GalleryError> for CliError {
    fn from(e: darkroom::gallery::GalleryError) -> Self {
        use darkroom::gallery::GalleryError;
        match e {
            GalleryError::NotFound(_) | GalleryError::PhotoNotFound { .. } => {
                CliError::NotFound(e.to_string())
            }
            other => CliError::Failed(other.to_string()),
        }
    }
}

async fn run(collection: &Collection, command: Command) -> Result<(), CliError> {
    match command {
        Command::Galleries => {
            for name in collection.names().map_err(CliError::from)? {
                let gallery = collection.get(&name)?;
                match gallery.description() {
                    Some(desc) => println!("{}\t{}\t{}", name, gallery.title(), desc),
                    None => println!("{}\t{}", name, gallery.title()),
                }
            }
            Ok(())
        }
        Command::Photos { gallery } => {
            let gallery = collection.get(&gallery)?;
            for name in gallery.names()? {
                let photo = gallery.get(&name)?;
                match photo.annotation() {
                    Some(annotation) => println!("{name}\t{annotation}"),
                    None => println!("{name}"),
                }
            }
            Ok(())
        }
        Command::Properties { gallery, photo } => {
            let photo = collection.get(&gallery)?.get(&photo)?;
            let props = photo.properties()?;
            let json = serde_json::to_string_pretty(&props)
                .map_err(|e| CliError::Failed(e.to_string()))?;
            println!("{json}");
            Ok(())
        }
        Command::Resize {
            gallery,
            photo,
            width,
            height,
            quality,
            rotation,
            format,
            output,
        } => {
            let format = match format {
                Some(name) => Some(
                    OutputFormat::parse(&name).map_err(|e| CliError::Failed(e.to_string()))?,
                ),
                None => None,
            };
            let photo = collection.get(&gallery)?.get(&photo)?;
            let rendition = photo.resize(width, height, quality, rotation, format).await?;

            if let Some(path) = output {
                std::fs::write(&path, &rendition.bytes)
                    .map_err(|e| CliError::Failed(format!("{}: {e}", path.display())))?;
                println!("{} -> {}", rendition.name, path.display());
            } else {
                println!(
                    "{}\t{}\t{} bytes",
                    rendition.name,
                    rendition.format,
                    rendition.bytes.len()
                );
            }
            tracing::info!(stats = %collection.resizer().stats(), "done");
            Ok(())
        }
    }
}
