//! pserv-codec - compress, decompress and inspect PServ payloads
//!
//! # Commands
//!
//! - `pserv-codec compress <in> <out>` - Compress a file
//! - `pserv-codec decompress <in> <out>` - Decompress a file
//! - `pserv-codec size <in>` - Print the decompressed size of a PRS or BC0 file
//! - `pserv-codec disassemble <in>` - Print one line per opcode of a PRS or BC0 file
//!
//! Defaults come from `config/codecoptions.txt`; command line flags win.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pserv_compression::{
    bc0_compress, bc0_decompress_size, bc0_disassemble, compress, decompress, prs_compress,
    prs_decompress_size, prs_disassemble, CompressionType,
};
use pserv_config::CodecConfig;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// pserv-codec - PRS/BC0 codec tool
#[derive(Parser)]
#[command(name = "pserv-codec")]
#[command(about = "Compress, decompress and inspect PServ payloads")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    options: CodecOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CodecOptions {
    /// Compression method: none, zlib, bzip2, prs or bc0
    #[arg(long, global = true)]
    codec: Option<CompressionType>,

    /// PRS search depth
    #[arg(long, global = true)]
    level: Option<usize>,

    /// Fail if output would exceed this many bytes (0 = unbounded)
    #[arg(long, global = true)]
    max_output_size: Option<usize>,

    /// Options file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    Compress { input: PathBuf, output: PathBuf },

    /// Decompress a file
    Decompress { input: PathBuf, output: PathBuf },

    /// Print the decompressed size of a PRS or BC0 file
    Size { input: PathBuf },

    /// Print one line per opcode of a PRS or BC0 file
    Disassemble { input: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.options.config {
        Some(path) => CodecConfig::load_from_file(path),
        None => CodecConfig::load_default(),
    };
    let (mut config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (CodecConfig::default(), Some(e)),
    };

    // RUST_LOG takes precedence over the options file
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Some(e) = load_error {
        warn!("Failed to load codec options: {}", e);
        warn!("Using default configuration");
    }

    if let Some(codec) = cli.options.codec {
        config.codec = codec;
    }
    if let Some(level) = cli.options.level {
        config.prs_level = level;
    }
    if let Some(max_output_size) = cli.options.max_output_size {
        config.max_output_size = max_output_size;
    }
    config.display();

    match cli.command {
        Commands::Compress { input, output } => {
            let data = read_input(&input)?;
            let compressed = compress_with_progress(&data, &config)?;
            fs::write(&output, &compressed)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                "Compressed {} bytes into {} bytes ({})",
                data.len(),
                compressed.len(),
                config.codec
            );
        }
        Commands::Decompress { input, output } => {
            let data = read_input(&input)?;
            let decompressed = decompress(&data, config.codec, config.max_output_size)
                .with_context(|| format!("Failed to decompress {}", input.display()))?;
            fs::write(&output, &decompressed)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                "Decompressed {} bytes into {} bytes ({})",
                data.len(),
                decompressed.len(),
                config.codec
            );
        }
        Commands::Size { input } => {
            let data = read_input(&input)?;
            let size = match config.codec {
                CompressionType::Prs => prs_decompress_size(&data, config.max_output_size)?,
                CompressionType::Bc0 => bc0_decompress_size(&data, config.max_output_size)?,
                other => bail!("size is not supported for {}", other),
            };
            println!("{}", size);
        }
        Commands::Disassemble { input } => {
            let data = read_input(&input)?;
            let mut stdout = BufWriter::new(io::stdout().lock());
            let size = match config.codec {
                CompressionType::Prs => prs_disassemble(&mut stdout, &data)?,
                CompressionType::Bc0 => bc0_disassemble(&mut stdout, &data)?,
                other => bail!("disassemble is not supported for {}", other),
            };
            stdout.flush()?;
            info!("Stream decompresses to {} bytes", size);
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn compress_with_progress(data: &[u8], config: &CodecConfig) -> Result<Vec<u8>> {
    let mut report = |input: usize, output: usize| {
        debug!("{} / {} bytes in, {} bytes out", input, data.len(), output);
    };
    let compressed = match config.codec {
        CompressionType::Prs => prs_compress(data, config.prs_level, Some(&mut report))?,
        CompressionType::Bc0 => bc0_compress(data, Some(&mut report)),
        other => compress(data, other, config.prs_level)?,
    };
    Ok(compressed)
}
