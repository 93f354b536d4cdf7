use anyhow::Context;
use clap::{Parser, Subcommand};
use image::ImageReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::sync::broadcast::error::RecvError;

use codescan::{
    CodeDetector, CodeEvent, CodeKind, Frame, FrameSource, ReplaySource, Scanner, ScannerConfig,
    Status,
};

#[derive(Parser)]
#[command(name = "codescan")]
#[command(about = "Detect QR codes and barcodes in live camera frames")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a camera (or a replayed image directory) until stopped
    Scan {
        /// Camera device index
        #[arg(short, long, default_value_t = 0)]
        device: u32,

        /// Play the images in this directory instead of opening a camera
        #[arg(long, value_name = "DIR")]
        replay: Option<PathBuf>,

        /// Restart the replay from the first image when it runs out
        #[arg(long = "loop", requires = "replay")]
        loop_replay: bool,

        /// Run detection on every Nth frame
        #[arg(long)]
        frame_skip: Option<u32>,

        /// Requested capture width
        #[arg(long)]
        width: Option<u32>,

        /// Requested capture height
        #[arg(long)]
        height: Option<u32>,

        /// Requested frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<f64>,
    },

    /// Run the detection methods once on image files
    Detect {
        /// Input image files
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        /// Save intermediate images to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let mut config = match &args.config {
        Some(path) => ScannerConfig::load(path)?,
        None => ScannerConfig::default(),
    };

    match args.command {
        Command::Scan {
            device,
            replay,
            loop_replay,
            frame_skip,
            width,
            height,
            fps,
            seconds,
        } => {
            if let Some(n) = frame_skip {
                config.frame_skip = n;
            }
            if let Some(w) = width {
                config.capture.width = w;
            }
            if let Some(h) = height {
                config.capture.height = h;
            }
            if let Some(f) = fps {
                config.capture.fps = f;
            }

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;

            match replay {
                Some(dir) => {
                    let source = ReplaySource::from_dir(&dir)?.with_looping(loop_replay);
                    runtime.block_on(scan(source, device, config, seconds))
                }
                None => runtime.block_on(scan_camera(device, config, seconds)),
            }
        }
        Command::Detect { images, debug_out } => detect_images(&images, &config, debug_out),
    }
}

#[cfg(feature = "camera")]
async fn scan_camera(device: u32, config: ScannerConfig, seconds: Option<f64>) -> anyhow::Result<()> {
    scan(codescan::source::CameraSource, device, config, seconds).await
}

#[cfg(not(feature = "camera"))]
async fn scan_camera(_device: u32, _config: ScannerConfig, _seconds: Option<f64>) -> anyhow::Result<()> {
    Err(codescan::DeviceError::Unsupported)
        .context("Rebuild with `--features camera`, or use --replay DIR")
}

async fn scan<S: FrameSource>(
    source: S,
    device: u32,
    config: ScannerConfig,
    seconds: Option<f64>,
) -> anyhow::Result<()> {
    let (scanner, mut events) = Scanner::builder(source).with_config(config).build();
    let scanner = Arc::new(scanner);
    scanner.start(device)?;

    let deadline = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs_f64(s)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut frames_seen = 0u64;
    let mut frames_open = true;
    loop {
        tokio::select! {
            Some(event) = events.codes.recv() => print_code(&event),
            status = events.status.recv() => match status {
                Some(status) => {
                    println!("{}", status);
                    if !matches!(status, Status::Started { .. }) {
                        break;
                    }
                }
                None => break,
            },
            frame = events.frames.recv(), if frames_open => match frame {
                Ok(_) => frames_seen += 1,
                Err(RecvError::Lagged(n)) => log::debug!("preview skipped {} frame(s)", n),
                Err(RecvError::Closed) => frames_open = false,
            },
            _ = &mut ctrl_c => {
                println!("Stopping scanner...");
                break;
            }
            _ = &mut deadline => break,
        }
    }

    let stopper = Arc::clone(&scanner);
    tokio::task::spawn_blocking(move || stopper.stop()).await??;

    while let Ok(event) = events.codes.try_recv() {
        print_code(&event);
    }
    while let Ok(status) = events.status.try_recv() {
        println!("{}", status);
    }
    println!("Previewed {} frame(s)", frames_seen);

    Ok(())
}

fn print_code(event: &CodeEvent) {
    let when = event.detected_at.format(&Rfc3339).unwrap_or_default();
    let label = match event.code.kind {
        CodeKind::Qr => "QR code",
        CodeKind::Barcode => "Barcode",
    };
    println!(
        "[{}] {} detected: {} (frame {}, {})",
        when, label, event.code.data, event.frame_index, event.code.source
    );
}

fn detect_images(
    images: &[PathBuf],
    config: &ScannerConfig,
    debug_out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut detector = CodeDetector::from_config(&config.detection);
    if let Some(dir) = debug_out {
        detector = detector.with_debug(dir)?;
    }
    log::info!("detection methods: {:?}", detector.method_names());

    for (i, path) in images.iter().enumerate() {
        let img = ImageReader::open(path)?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
        log::info!("{}: {}x{}", path.display(), img.width(), img.height());

        let frame = Frame::new(i as u64 + 1, img);
        let codes = detector.detect(&frame);

        println!("\n=== {} ===", path.display());
        if codes.is_empty() {
            println!("No codes detected.");
            continue;
        }
        for code in &codes {
            println!("  {} {} ({})", code.kind, code.data, code.source);
        }
    }

    Ok(())
}
