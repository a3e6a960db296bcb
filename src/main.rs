use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{Level, info, warn};

use spinor_sim::bus::SpiBus;
use spinor_sim::flash::{FlashConfig, FlashDevice};
use spinor_sim::host::logging::{setup_logging_file, setup_logging_stdio};
use spinor_sim::script::{self, format_bytes};

/// SPI NOR flash simulator
/// Replays a transaction script against a bit-level flash model
#[derive(Parser)]
#[command(name = "spinor-sim")]
#[command(about = "Drive a bit-level SPI NOR flash model edge by edge")]
struct Args {
    /// Transaction script, one chip select cycle per line
    script: PathBuf,

    /// Binary image to preload into the array
    #[arg(long)]
    image: Option<PathBuf>,

    /// Offset of the preloaded image, parsed as hex
    #[arg(long, value_parser = parse_hex, default_value = "0")]
    image_offset: usize,

    /// Fill a range with random data before running: START LEN, parsed as hex.
    /// May be repeated
    #[arg(long, num_args = 2, value_names = ["START", "LEN"], value_parser = parse_hex)]
    random_fill: Vec<usize>,

    /// Seed for --random-fill
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Byte left behind by a block erase, parsed as hex
    #[arg(long, value_parser = parse_hex_byte, default_value = "ff")]
    erase_value: u8,

    /// Power-on contents of the array, parsed as hex
    #[arg(long, value_parser = parse_hex_byte, default_value = "00")]
    fill: u8,

    /// Write the final array contents to this file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Log matched commands and addresses from the device (implies DEBUG level)
    #[arg(long)]
    debug: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_hex(s: &str) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let s = s.trim_start_matches("0x");
    Ok(usize::from_str_radix(s, 16)?)
}

fn parse_hex_byte(s: &str) -> Result<u8, Box<dyn std::error::Error + Send + Sync>> {
    let s = s.trim_start_matches("0x");
    Ok(u8::from_str_radix(s, 16)?)
}

impl Args {
    /// `--debug` output is logged at DEBUG, so it raises the level unless
    /// `--verbose` already has.
    fn log_level(&self) -> Level {
        if self.verbose {
            Level::TRACE
        } else if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    fn random_fill_ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.random_fill
            .chunks_exact(2)
            .map(|range| (range[0], range[1]))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = args.log_level();
    match &args.log_file {
        Some(path) => setup_logging_file(level, path)?,
        None => setup_logging_stdio(level),
    }

    let text = fs::read_to_string(&args.script)?;
    let transactions = script::parse(&text)?;
    info!(
        "Loaded {} transactions from {:?}",
        transactions.len(),
        args.script
    );

    let mut flash = FlashDevice::with_config(FlashConfig {
        erase_value: args.erase_value,
        fill_value: args.fill,
        debug: args.debug,
    });
    if let Some(image) = &args.image {
        flash.load_image(image, args.image_offset)?;
    }
    let mut rng = StdRng::seed_from_u64(args.seed);
    for (start, len) in args.random_fill_ranges() {
        let filled = flash.random_fill(start, len, &mut rng)?;
        info!("Random fill: {filled} bytes at {start:#08x}");
    }

    let mut bus = SpiBus::new();
    let start_time = Instant::now();
    for transaction in &transactions {
        let mut rx = vec![0u8; transaction.rx_len];
        bus.transfer(&mut flash, &transaction.tx, &mut rx);

        if rx.is_empty() {
            println!("> {}", format_bytes(&transaction.tx));
        } else {
            println!("> {} | < {}", format_bytes(&transaction.tx), format_bytes(&rx));
        }
        if let Some(fault) = flash.take_fault() {
            warn!("line {}: {fault}", transaction.line);
        }
    }

    let elapsed = start_time.elapsed();
    info!("Simulation completed:");
    info!("  Bus edges: {}", bus.edges());
    info!("  Time elapsed: {:?}", elapsed);
    info!(
        "  Latches: write enable = {}, sleeping = {}",
        flash.write_enabled(),
        flash.sleeping()
    );

    if let Some(dump) = &args.dump {
        flash.save_image(dump)?;
        info!("Array written to {:?}", dump);
    }

    Ok(())
}
