use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use frameseek::{FfmpegLogLevel, StreamOptions, StreamProbe, VideoStream};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  frameseek probe input.mp4 --json\n  frameseek frame input.mp4 120 --out frame.png\n  frameseek frames input.mp4 --out frames --every 10 --progress\n  frameseek timestamp input.mp4 0 1 2\n  frameseek accelerators input.mp4\n  frameseek completions zsh > _frameseek";

#[derive(Debug, Parser)]
#[command(
    name = "frameseek",
    version,
    about = "Decode video frames by index and report exact timestamps",
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
    /// Show library logging output (also enabled by RUST_LOG).
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Hardware accelerator to decode with (e.g. cuda, vaapi, videotoolbox); software if omitted.
    #[arg(long, global = true)]
    accelerator: Option<String>,

    /// Expected container type, or "any" to accept whatever FFmpeg detects.
    #[arg(long, global = true, default_value = "mp4")]
    container: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print stream metadata.
    #[command(
        about = "Print stream metadata",
        visible_alias = "info",
        after_help = "Examples:\n  frameseek probe input.mp4\n  frameseek probe input.mkv --container mkv --json"
    )]
    Probe {
        /// Input video path or URL.
        input: String,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decode one frame and save it as an image.
    #[command(
        about = "Save a single frame",
        after_help = "Examples:\n  frameseek frame input.mp4 0 --out first.png\n  frameseek frame input.mp4 600 --out frame.jpg --accelerator vaapi"
    )]
    Frame {
        /// Input video path or URL.
        input: String,
        /// Zero-based frame index.
        #[arg(allow_negative_numbers = true)]
        index: i64,
        /// Output image path; the format follows the extension.
        #[arg(long)]
        out: PathBuf,
    },

    /// Export a range of frames to a directory.
    #[command(
        about = "Export a range of frames",
        after_help = "Examples:\n  frameseek frames input.mp4 --out frames --every 10 --ext jpg\n  frameseek frames input.mp4 --out frames --start 120 --end 240 --progress"
    )]
    Frames {
        /// Input video path or URL.
        input: String,
        /// Output directory for the frame images.
        #[arg(long)]
        out: PathBuf,
        /// First frame (inclusive).
        #[arg(long, default_value_t = 0)]
        start: u64,
        /// Last frame (inclusive); defaults to the last frame.
        #[arg(long)]
        end: Option<u64>,
        /// Export every Nth frame.
        #[arg(long, default_value_t = 1)]
        every: u64,
        /// Output image extension (png, jpg, jpeg, bmp, tiff).
        #[arg(long, default_value = "png")]
        ext: String,
    },

    /// Print presentation timestamps of frames.
    #[command(
        about = "Print frame timestamps",
        after_help = "Examples:\n  frameseek timestamp input.mp4 0\n  frameseek timestamp input.mp4 0 30 59 --json"
    )]
    Timestamp {
        /// Input video path or URL.
        input: String,
        /// Zero-based frame indices.
        #[arg(required = true, allow_negative_numbers = true)]
        indices: Vec<i64>,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// List hardware accelerators.
    #[command(
        about = "List hardware accelerators",
        after_help = "Without an input, lists the device types in this FFmpeg build.\nWith an input, lists the ones its video codec advertises."
    )]
    Accelerators {
        /// Optional video whose codec should be queried.
        input: Option<String>,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let from_env = EnvFilter::try_from_default_env().ok();
    if !verbose && from_env.is_none() {
        return;
    }

    let filter = from_env.unwrap_or_else(|| EnvFilter::new("debug"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    value.parse().ok()
}

/// `None` means the container is not checked.
fn parse_container(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

fn stream_options(global: &GlobalOptions) -> StreamOptions {
    let mut options = match parse_container(&global.container) {
        Some(container) => StreamOptions::new().with_container_type(container),
        None => StreamOptions::new().with_any_container(),
    };
    if let Some(accelerator) = &global.accelerator {
        options = options.with_accelerator(accelerator.clone());
    }
    options
}

/// Frame indices `start..=end` stepping by `every`.
fn frame_selection(start: u64, end: u64, every: u64) -> Result<Vec<u64>, String> {
    if every == 0 {
        return Err("--every must be greater than 0".to_string());
    }
    if start > end {
        return Err(format!("--start ({start}) must be <= --end ({end})"));
    }
    Ok((start..=end).step_by(every as usize).collect())
}

fn frame_file_name(index: u64, extension: &str) -> String {
    format!(
        "frame_{index:06}.{}",
        extension.trim_start_matches('.').to_ascii_lowercase()
    )
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

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global.verbose);

    if let Some(level) = &global.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        frameseek::set_ffmpeg_log_level(parsed);
    }

    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;
    let options = stream_options(&cli.global);

    match cli.command {
        Commands::Probe { input, json } => {
            let metadata = StreamProbe::probe_with_options(&input, &options)?;

            if json {
                let payload = json!({
                    "container": metadata.container,
                    "stream_index": metadata.stream_index,
                    "decoder": metadata.decoder_name,
                    "codec": metadata.codec,
                    "width": metadata.width,
                    "height": metadata.height,
                    "pixel_format": metadata.pixel_format(),
                    "native_pixel_format": metadata.native_pixel_format,
                    "time_base": [metadata.time_base.numerator(), metadata.time_base.denominator()],
                    "frame_rate": [metadata.frame_rate.numerator(), metadata.frame_rate.denominator()],
                    "fps": metadata.frames_per_second(),
                    "start_time": metadata.start_time,
                    "total_frames": metadata.total_frames,
                    "duration_seconds": metadata.duration.map(|duration| duration.as_secs_f64()),
                    "hardware_accelerator": metadata.hardware_accelerator,
                    "supported_accelerators": metadata.supported_accelerators,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Container: {}", metadata.container);
                println!("Decoder: {} [{}]", metadata.decoder_name, metadata.codec);
                println!(
                    "Video: {}x{} @ {:.3} fps, {} -> {}",
                    metadata.width,
                    metadata.height,
                    metadata.frames_per_second(),
                    metadata.native_pixel_format,
                    metadata.pixel_format(),
                );
                println!(
                    "Time base: {}/{}",
                    metadata.time_base.numerator(),
                    metadata.time_base.denominator()
                );
                println!("Frames: {}", metadata.total_frames);
                if let Some(duration) = metadata.duration {
                    println!("Duration: {:.3}s", duration.as_secs_f64());
                }
                println!(
                    "Hardware: {} (codec supports: {})",
                    metadata.hardware_accelerator.as_deref().unwrap_or("software"),
                    metadata.hardware_accelerators_supported_by_codec(),
                );
            }
        }
        Commands::Frame { input, index, out } => {
            ensure_writable_path(&out, cli.global.overwrite)?;
            let mut stream = VideoStream::open_with_options(&input, &options)?;
            stream.save_frame(index, &out)?;
            println!(
                "{} {}",
                "success:".green().bold(),
                format!("saved frame {index} to {}", out.display()).green()
            );
        }
        Commands::Frames {
            input,
            out,
            start,
            end,
            every,
            ext,
        } => {
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

            let mut stream = VideoStream::open_with_options(&input, &options)?;
            let total = stream.total_frames();
            let end = match end {
                Some(end) => end,
                None if total > 0 => total - 1,
                None => return Err("frame count is unknown; pass --end".into()),
            };
            let selection = frame_selection(start, end, every)?;

            fs::create_dir_all(&out)?;

            let progress_bar = if cli.global.progress {
                let pb = ProgressBar::new(selection.len() as u64);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                )?;
                pb.set_style(style.progress_chars("##-"));
                Some(pb)
            } else {
                None
            };

            let mut exported = 0_u64;
            for index in selection {
                let output_path = out.join(frame_file_name(index, &ext));
                if output_path.exists() && !cli.global.overwrite {
                    return Err(format!(
                        "output file already exists: {} (use --overwrite)",
                        output_path.display()
                    )
                    .into());
                }

                let frame_index = i64::try_from(index)?;
                stream.save_frame(frame_index, &output_path)?;
                exported += 1;

                if let Some(pb) = &progress_bar {
                    pb.inc(1);
                }
                if cli.global.verbose {
                    eprintln!("saved frame {index} -> {}", output_path.display());
                }
            }

            if let Some(pb) = progress_bar {
                pb.finish_with_message("done");
            }

            let stats = stream.decode_stats();
            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "exported {exported} frame(s) to {} ({} seeks, {} frames decoded)",
                    out.display(),
                    stats.seeks,
                    stats.frames_decoded
                )
                .green()
            );
        }
        Commands::Timestamp {
            input,
            indices,
            json,
        } => {
            let mut stream = VideoStream::open_with_options(&input, &options)?;

            let mut rows = Vec::with_capacity(indices.len());
            for index in indices {
                let timestamp = stream.timestamp(index)?;
                rows.push((index, timestamp));
            }

            if json {
                let payload: Vec<_> = rows
                    .iter()
                    .map(|(index, timestamp)| {
                        json!({
                            "index": index,
                            "ticks": timestamp.ticks(),
                            "time_base": [timestamp.time_base().numerator(), timestamp.time_base().denominator()],
                            "seconds": timestamp.seconds(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (index, timestamp) in rows {
                    println!(
                        "frame {index}: {} x {}/{} = {:.2}s",
                        timestamp.ticks(),
                        timestamp.time_base().numerator(),
                        timestamp.time_base().denominator(),
                        timestamp.seconds()
                    );
                }
            }
        }
        Commands::Accelerators { input } => {
            let accelerators = match input {
                Some(input) => {
                    StreamProbe::probe_with_options(&input, &options.with_software_decoding())?
                        .supported_accelerators
                }
                None => frameseek::available_accelerators(),
            };

            if accelerators.is_empty() {
                println!("{}", "no hardware accelerators available".yellow());
            } else {
                for name in accelerators {
                    println!("{name}");
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "frameseek", &mut std::io::stdout());
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
