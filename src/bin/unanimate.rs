use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use unanimate::{
    ArchiveBuilder, ContainerFormat, ExtractionConfig, ExtractionPipeline, OperationType,
    OutputFormat, ProgressCallback, ProgressInfo,
};

const CLI_AFTER_HELP: &str = "Examples:\n  unanimate extract dance.gif --out frames/dance\n  unanimate extract logo.gif --out frames/logo --prefix logo --json\n  unanimate extract logo.gif --out frames/logo --archive logo.zip --progress\n  unanimate archive frames/dance --out frames_dance.zip\n  unanimate completions zsh > _unanimate";

#[derive(Debug, Parser)]
#[command(
    name = "unanimate",
    version,
    about = "Extract every frame of an animated image and bundle them into a ZIP",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow writing into existing output directories and files.
    #[arg(long, global = true)]
    overwrite: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract every frame to an output directory.
    #[command(
        about = "Extract all frames",
        after_help = "Examples:\n  unanimate extract dance.gif --out frames\n  unanimate extract dance.gif --out frames --prefix dance --format tiff"
    )]
    Extract {
        /// Input animated image (GIF, APNG, WebP).
        input: PathBuf,
        /// Output directory for frame images.
        #[arg(long)]
        out: PathBuf,
        /// Name frames `{prefix}_1`, `{prefix}_2`, ... instead of `frame_0000`.
        #[arg(long)]
        prefix: Option<String>,
        /// Output image format (png, bmp, tiff, qoi).
        #[arg(long, default_value = "png")]
        format: String,
        /// Leading component of each frame's relative path in JSON output.
        #[arg(long)]
        path_prefix: Option<String>,
        /// Print the extraction result as JSON.
        #[arg(long)]
        json: bool,
        /// Also write a ZIP of the extracted frames to this path.
        #[arg(long)]
        archive: Option<PathBuf>,
        /// Accept any input extension, not only `.gif`.
        #[arg(long)]
        any_extension: bool,
    },

    /// Bundle an output directory into a ZIP archive.
    #[command(
        about = "Archive extracted frames",
        after_help = "Examples:\n  unanimate archive frames/dance --out frames_dance.zip"
    )]
    Archive {
        /// Directory of extracted frames.
        dir: PathBuf,
        /// Output ZIP path. Defaults to `frames_<dir name>.zip`.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_output_format(value: &str) -> Option<OutputFormat> {
    match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => Some(OutputFormat::Png),
        "bmp" => Some(OutputFormat::Bmp),
        "tif" | "tiff" => Some(OutputFormat::Tiff),
        "qoi" => Some(OutputFormat::Qoi),
        _ => None,
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "unanimate=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Drives an indicatif bar from library progress callbacks.
struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn finish(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(bar) = bar.take() {
                bar.finish_with_message("done");
            }
        }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        let bar = slot.get_or_insert_with(|| {
            let bar = match info.total {
                Some(total) => ProgressBar::new(total),
                None => ProgressBar::new_spinner(),
            };
            let template = match info.total {
                Some(_) => "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                None => "{spinner:.green} {pos} frame(s) {msg}",
            };
            if let Ok(style) = ProgressStyle::with_template(template) {
                bar.set_style(style.progress_chars("##-"));
            }
            bar
        });

        let message = match info.operation {
            OperationType::FrameExtraction => "extracting",
            OperationType::ArchiveBuild => "archiving",
            _ => "",
        };
        bar.set_message(message);
        bar.set_position(info.current);
    }
}

fn base_config(
    global: &GlobalOptions,
    progress: &Option<Arc<TerminalProgress>>,
) -> ExtractionConfig {
    let mut config = ExtractionConfig::new();
    if let Some(progress) = progress {
        config = config.with_progress(progress.clone());
    }
    if global.verbose {
        log::debug!("Using configuration {config:?}");
    }
    config
}

fn write_archive(
    config: ExtractionConfig,
    dir: &Path,
    out: &Path,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    ensure_writable_path(out, overwrite)?;
    let bytes = ArchiveBuilder::new(config).build_to_vec(dir)?;
    fs::write(out, bytes)?;
    println!("{} {}", "saved".green().bold(), out.display());
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let progress = cli
        .global
        .progress
        .then(|| Arc::new(TerminalProgress::new()));

    match cli.command {
        Commands::Extract {
            input,
            out,
            prefix,
            format,
            path_prefix,
            json,
            archive,
            any_extension,
        } => {
            let file_name = input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !any_extension
                && !ContainerFormat::is_supported_file_name(
                    &file_name,
                    ContainerFormat::DEFAULT_ALLOWED_EXTENSIONS,
                )
            {
                return Err(format!(
                    "only GIF files are accepted: {} (use --any-extension)",
                    input.display()
                )
                .into());
            }

            let output_format = parse_output_format(&format)
                .ok_or(format!("unsupported --format: {format}"))?;

            if out.exists() {
                if !cli.global.overwrite {
                    return Err(format!(
                        "output directory already exists: {} (use --overwrite)",
                        out.display()
                    )
                    .into());
                }
                eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    format!("writing into existing directory {}", out.display()).yellow()
                );
            }

            let mut config = base_config(&cli.global, &progress).with_output_format(output_format);
            if let Some(path_prefix) = path_prefix {
                config = config.with_path_prefix(path_prefix);
            }

            let pipeline = ExtractionPipeline::new(config.clone());
            let result = pipeline.run(&input, &out, prefix.as_deref());
            if let Some(progress) = &progress {
                progress.finish();
            }
            let result = result?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.to_json())?);
            } else {
                if cli.global.verbose {
                    for frame in result.frames() {
                        eprintln!("saved frame {} -> {}", frame.ordinal(), frame.relative_path());
                    }
                }
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "Extracted {} frame(s) to {}",
                        result.total_frames(),
                        out.display()
                    )
                    .green()
                );
            }

            if let Some(archive) = archive {
                write_archive(
                    base_config(&cli.global, &None),
                    &out,
                    &archive,
                    cli.global.overwrite,
                )?;
            }
        }
        Commands::Archive { dir, out } => {
            let out = match out {
                Some(out) => out,
                None => {
                    let folder = dir
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .ok_or("cannot derive an archive name; pass --out")?;
                    PathBuf::from(unanimate::archive_file_name(&folder))
                }
            };
            let result = write_archive(
                base_config(&cli.global, &progress),
                &dir,
                &out,
                cli.global.overwrite,
            );
            if let Some(progress) = &progress {
                progress.finish();
            }
            result?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "unanimate", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
