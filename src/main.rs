use clap::{Parser, Subcommand};
use picpress::imaging::{Quality, ResizeRequest, ResizeStyle, Speed};
use picpress::{ErrorKind, TranscodeError, TranscodeRequest, config, output};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "picpress")]
#[command(about = "Re-encode and resize a single image")]
#[command(long_about = "\
Re-encode and resize a single image

The input format is detected from the file's leading bytes, falling back to
its extension. The output format comes from --format, then the output
extension, then the input format.

Resize styles (-m):
  default  keep the source dimensions
  fill     cover the box, then center-crop to it
  fit      fit inside the box, preserving aspect ratio
  exact    stretch to exactly WxH

A zero width or height in -r means \"derive from the other axis\" for fill and
fit; exact needs both.

Exit status is 0 on success, otherwise one of:
  1 other   2 invalid format   3 cannot infer format   4 invalid method
  5 image   6 io               7 compress
  64 unusable command line (unknown flag, missing argument, non-numeric value)

Run 'picpress gen-config' to generate a documented picpress.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional; stock defaults apply when it's absent)
    #[arg(long, default_value = "picpress.toml", global = true)]
    config: PathBuf,

    /// Log each pipeline stage to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcode one image, optionally resizing it
    Compress(CompressArgs),
    /// Print an image's format and dimensions without decoding it
    Identify {
        path: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print a stock picpress.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct CompressArgs {
    /// Input image
    #[arg(short, long)]
    input: PathBuf,

    /// Output path
    #[arg(short, long)]
    output: PathBuf,

    /// Output format (jpeg, jpg, png, webp, avif, gif, bmp, tiff)
    #[arg(short, long)]
    format: Option<String>,

    /// Encoding quality, clamped to 1-100 [default: from config]
    #[arg(short, long, allow_negative_numbers = true)]
    quality: Option<i64>,

    /// Encoder speed; higher is faster, clamped to 0-255 [default: from config]
    #[arg(short, long, allow_negative_numbers = true)]
    speed: Option<i64>,

    /// Target box as WxH; 0 on one axis derives it from the other
    #[arg(short, long, value_parser = parse_resize)]
    resize: Option<(u32, u32)>,

    /// Resize style: default, fill, fit or exact [default: config resize.style when -r is given]
    #[arg(short = 'm', long)]
    method: Option<String>,
}

/// Exit status for a command line clap can't parse. Kept clear of the 1-7
/// range so it never reads as a transcode failure.
const EXIT_USAGE: u8 = 64;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(usage_status(&err));
        }
    };
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Compress(args) => {
            let config = match config::load_config(&cli.config) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("error: {}: {}", cli.config.display(), err);
                    return exit_code(ErrorKind::Other);
                }
            };
            build_request(args, &config).and_then(|request| {
                picpress::transcode(&request)
                    .map(|report| output::print_transcode_report(&request, &report))
            })
        }
        Command::Identify { path, json } => picpress::identify(&path).and_then(|info| {
            if json {
                let text = serde_json::to_string_pretty(&info)
                    .map_err(|e| TranscodeError::Other(e.to_string()))?;
                println!("{}", text);
            } else {
                output::print_identify(&info);
            }
            Ok(())
        }),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            exit_code(err.kind())
        }
    }
}

/// `picpress=debug` when verbose; otherwise whatever `RUST_LOG` asks for.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("picpress=debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(kind: ErrorKind) -> ExitCode {
    ExitCode::from(exit_status(kind))
}

fn exit_status(kind: ErrorKind) -> u8 {
    kind.code().unsigned_abs() as u8
}

/// `--help` and `--version` also arrive as errors; those exit 0.
fn usage_status(err: &clap::Error) -> u8 {
    if err.use_stderr() { EXIT_USAGE } else { 0 }
}

fn clamp_u8(value: i64) -> u8 {
    value.clamp(0, i64::from(u8::MAX)) as u8
}

/// Flags override config; config fills whatever the flags leave out.
fn build_request(
    args: CompressArgs,
    config: &config::Config,
) -> Result<TranscodeRequest, TranscodeError> {
    let (width, height) = args.resize.unwrap_or((0, 0));
    let style = match (args.method.as_deref(), args.resize) {
        (Some(method), _) => method.parse::<ResizeStyle>()?,
        (None, Some(_)) => config.resize.style,
        (None, None) => ResizeStyle::Default,
    };
    Ok(TranscodeRequest {
        format: args.format,
        quality: args
            .quality
            .map(|q| Quality::new(clamp_u8(q)))
            .unwrap_or_else(|| config.quality()),
        speed: args
            .speed
            .map(|s| Speed(clamp_u8(s)))
            .unwrap_or_else(|| config.speed()),
        resize: ResizeRequest::new(style, width, height),
        resample: config.resample_options(),
        ..TranscodeRequest::new(args.input, args.output)
    })
}

/// Parse `WxH` (also `W*H` or `W,H`). Either side may be `0`.
fn parse_resize(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X', '*', ','])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("bad dimension '{}': {}", v, e))
    };
    Ok((parse(w)?, parse(h)?))
}
