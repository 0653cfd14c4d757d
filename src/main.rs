use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use common::cli::GlobalOpts;
use memory::{Memory, SegmentId};
use ppu::Translator;
use tracing::info;

/// Translates a raw big-endian PPU code image to HIR and prints it.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[clap(flatten)]
    global: GlobalOpts,

    /// Raw big-endian PowerPC code
    input: PathBuf,

    /// Guest address the image is loaded at
    #[arg(long, default_value = "0x10000", value_parser = parse_address)]
    base: u32,

    /// Translate at most this many instructions
    #[arg(long)]
    count: Option<usize>,

    /// Name of the emitted function
    #[arg(long, default_value = "block")]
    name: String,
}

fn parse_address(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

/// Maps the image at `base` and reads its words back through guest memory.
fn load(memory: &Memory, base: u32, image: &[u8], count: Option<usize>) -> Result<Vec<u32>> {
    let words = image.len() / 4;
    let words = count.map_or(words, |count| count.min(words));
    if words == 0 {
        bail!("image holds no complete instruction");
    }

    let size = u32::try_from(words * 4).context("image larger than the guest address space")?;
    if memory.segment(SegmentId::MainMemory).alloc_fixed(base, size) == 0 {
        bail!("cannot map {size:#x} bytes at {base:#010x} in main memory");
    }

    for (i, chunk) in image.chunks_exact(4).take(words).enumerate() {
        let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        memory.write32(base + 4 * i as u32, word);
    }
    Ok((0..words as u32).map(|i| memory.read32(base + 4 * i)).collect())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.global.init_logging()?;

    let image = fs::read(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;
    let memory = Arc::new(Memory::new().context("setting up guest memory")?);
    let words = load(&memory, cli.base, &image, cli.count)?;
    info!("loaded {} instructions at {:#010x}", words.len(), cli.base);

    let mut translator = Translator::new(cli.name.as_str(), memory.clone());
    let translated = translator.translate_block(cli.base, &words);
    let function = translator.finish();
    print!("{function}");

    translated.with_context(|| format!("translating {}", cli.input.display()))
}
