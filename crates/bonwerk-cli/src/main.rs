// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bonwerk: command-line receipt printing.
//
// Each invocation opens one session, runs one operation and closes the
// session again.

mod data_dir;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;

use bonwerk_core::error::Result;
use bonwerk_core::human_errors::{describe_status, humanize_error};
use bonwerk_core::{
    Alignment, BarcodeOptions, BarcodeType, Endpoint, FontSize, PdfOptions, PrintJob, TextOptions,
    TransportKind,
};
use bonwerk_print::SessionCoordinator;

#[derive(Debug, Parser)]
#[command(name = "bonwerk", version, about = "Print to ESC/POS receipt printers")]
struct Cli {
    /// Config file (defaults to $XDG_DATA_HOME/bonwerk/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Browse the local network for printers.
    Discover {
        /// Scan window in milliseconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Print a block of text.
    Text {
        #[command(flatten)]
        target: Target,
        text: String,
        #[arg(long, value_parser = parse_lower::<FontSize>, default_value = "normal")]
        size: FontSize,
        #[arg(long, value_parser = parse_lower::<Alignment>, default_value = "left")]
        align: Alignment,
        #[arg(long)]
        bold: bool,
        #[command(flatten)]
        position: Position,
    },
    /// Print a 1D barcode.
    Barcode {
        #[command(flatten)]
        target: Target,
        data: String,
        #[arg(long = "type", default_value = "CODE128")]
        barcode_type: BarcodeType,
        /// Narrow module width in dots.
        #[arg(long)]
        width: Option<u8>,
        /// Bar height in dots.
        #[arg(long)]
        height: Option<u8>,
        /// Print the human-readable digits under the bars.
        #[arg(long)]
        hri: bool,
        #[command(flatten)]
        position: Position,
    },
    /// Rasterise and print one page of a PDF file.
    Pdf {
        #[command(flatten)]
        target: Target,
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Raster width in dots.
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        no_dither: bool,
        #[arg(long)]
        no_compress: bool,
        /// Threshold 1-100, or 0 for automatic.
        #[arg(long, default_value_t = 0)]
        level: u8,
        #[command(flatten)]
        position: Position,
    },
    /// Query paper and cover state.
    Status {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Debug, Args)]
struct Target {
    /// IP address or host, or device path for bluetooth/usb.
    #[arg(short, long)]
    address: String,
    #[arg(long, value_parser = parse_lower::<TransportKind>, default_value = "network")]
    kind: TransportKind,
    #[arg(short, long)]
    port: Option<u16>,
    /// Connect timeout in milliseconds.
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Debug, Args)]
struct Position {
    /// Dots from the left margin.
    #[arg(long)]
    h_pos: Option<u16>,
    /// Dots of paper to feed first.
    #[arg(long)]
    v_pos: Option<u16>,
}

/// Parse a lowercase serde enum name (`center`, `xlarge`, `bluetooth`).
fn parse_lower<T: DeserializeOwned>(s: &str) -> std::result::Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unrecognised value `{s}`"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let human = humanize_error(&e);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            tracing::debug!(error = %e, retriable = human.retriable, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = data_dir::load_config(cli.config.as_deref())?;
    let coordinator = SessionCoordinator::new(config.clone());
    coordinator.initialize();

    match cli.command {
        Command::Discover { timeout } => {
            let devices = coordinator
                .discover(timeout.map(Duration::from_millis))
                .await?;
            if devices.is_empty() {
                eprintln!("no printers found");
            }
            for device in devices {
                println!("{device}");
            }
            Ok(())
        }
        Command::Status { target } => {
            open_session(&coordinator, target).await?;
            let result = coordinator.get_status().await;
            coordinator.disconnect().await?;
            let status = result?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            if let Some(note) = describe_status(&status) {
                eprintln!("{note}");
            }
            Ok(())
        }
        Command::Text {
            target,
            text,
            size,
            align,
            bold,
            position,
        } => {
            let job = PrintJob::Text(TextOptions {
                text,
                font_size: size,
                alignment: align,
                bold,
                horizontal_position: position.h_pos,
                vertical_position: position.v_pos,
            });
            print_one(&coordinator, target, job).await
        }
        Command::Barcode {
            target,
            data,
            barcode_type,
            width,
            height,
            hri,
            position,
        } => {
            let job = PrintJob::Barcode(BarcodeOptions {
                data,
                barcode_type,
                width: width.unwrap_or(config.default_barcode_width),
                height: height.unwrap_or(config.default_barcode_height),
                horizontal_position: position.h_pos,
                vertical_position: position.v_pos,
                hri,
            });
            print_one(&coordinator, target, job).await
        }
        Command::Pdf {
            target,
            file,
            page,
            width,
            no_dither,
            no_compress,
            level,
            position,
        } => {
            let bytes = tokio::fs::read(&file).await?;
            let job = PrintJob::Pdf(PdfOptions {
                base64: STANDARD.encode(&bytes),
                width: width.unwrap_or(config.default_pdf_width),
                horizontal_position: position.h_pos,
                vertical_position: position.v_pos,
                page,
                dithering: !no_dither,
                compress: !no_compress,
                level,
            });
            print_one(&coordinator, target, job).await
        }
    }
}

async fn open_session(coordinator: &SessionCoordinator, target: Target) -> Result<()> {
    let endpoint = Endpoint::new(target.kind, target.address, target.port);
    coordinator
        .connect(endpoint, target.timeout.map(Duration::from_millis))
        .await?;
    Ok(())
}

/// Connect, send `job`, and disconnect whether or not the print succeeded.
async fn print_one(coordinator: &SessionCoordinator, target: Target, job: PrintJob) -> Result<()> {
    open_session(coordinator, target).await?;
    let result = coordinator.print(job).await;
    coordinator.disconnect().await?;
    result
}
