use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use watermark_patch::archive::repair_archive;
use watermark_patch::yolo::DEFAULT_MODEL_PATH;
use watermark_patch::{BatchProcessor, RepairConfig, SearchRegion, YoloDetector};

#[derive(Parser)]
#[command(
    name = "wm-patch",
    about = "Repair watermarks by patching from a clean lower-resolution copy",
    version,
    after_help = "The input ZIP must contain pairs named <id>-wm.<ext> and <id>-orig.<ext>.\n\
                  Each repaired image is written under its -wm name, re-encoded as JPEG."
)]
struct Cli {
    /// Input ZIP archive with image pairs
    input: PathBuf,

    /// Output ZIP archive (default: repaired_<input name>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the text report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Detection model (ONNX)
    #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Detection confidence threshold (0.0-1.0]
    #[arg(short, long, default_value = "0.5")]
    threshold: f32,

    /// Search region ratios: left top right bottom
    #[arg(
        long,
        num_args = 4,
        value_names = ["X0", "Y0", "X1", "Y1"],
        default_values_t = [0.0, 0.5, 1.0, 1.0]
    )]
    search_region: Vec<f64>,

    /// Widen the detected box by this ratio of its width
    #[arg(long, default_value = "0.2")]
    width_expansion: f64,

    /// Heighten the detected box by this ratio of its height
    #[arg(long, default_value = "0.1")]
    height_expansion: f64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), level))
        .with_writer(std::io::stderr)
        .init();

    let &[x0, y0, x1, y1] = cli.search_region.as_slice() else {
        eprintln!("Error: --search-region takes exactly four ratios");
        process::exit(1);
    };
    let config = RepairConfig {
        confidence_threshold: cli.threshold,
        search_region: SearchRegion::new(x0, y0, x1, y1),
        width_expansion: cli.width_expansion,
        height_expansion: cli.height_expansion,
    };
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    let detector = match YoloDetector::load(&cli.model) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            eprintln!("Fatal: {e}");
            process::exit(1);
        }
    };

    let input = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error: cannot read {}: {e}", cli.input.display());
            process::exit(1);
        }
    };

    let processor = match BatchProcessor::new(detector, config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let (archive, output) = match repair_archive(&processor, &input, |_| {}) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let output_path = cli.output.unwrap_or_else(|| {
        let name = cli
            .input
            .file_name()
            .map_or_else(|| "input.zip".into(), |f| f.to_string_lossy().into_owned());
        cli.input.with_file_name(format!("repaired_{name}"))
    });
    if let Err(e) = std::fs::write(&output_path, archive) {
        eprintln!("Error: cannot write {}: {e}", output_path.display());
        process::exit(1);
    }

    let report = output.report();
    if let Some(path) = &cli.report {
        if let Err(e) = std::fs::write(path, &report) {
            eprintln!("Error: cannot write report {}: {e}", path.display());
            process::exit(1);
        }
    }
    if !cli.quiet {
        println!("{report}");
        eprintln!();
        eprint!("[Summary] Repaired: {}", output.succeeded());
        if output.failed() > 0 {
            eprint!(", Failed: {}", output.failed());
        }
        eprintln!(
            " (Total: {}) -> {}",
            output.results.len(),
            output_path.display()
        );
    }

    if output.failed() > 0 {
        process::exit(1);
    }
}

/// Pick the log filter: a valid `RUST_LOG` wins over the `-q`/`-v` level.
fn log_filter(rust_log: Option<&str>, level: Level) -> EnvFilter {
    match rust_log.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        _ => EnvFilter::default().add_directive(level.into()),
    }
}
