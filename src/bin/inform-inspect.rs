use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};

use inform_protocol::utils::logging::init_logging;
use inform_protocol::{InformConfig, InformKey, PacketReader};

/// Decode an inform packet and print its cleartext payload.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Device key as 32 hex digits, or "default" for the factory key.
    key: String,
    /// Packet file to read, or "-" for stdin.
    packet: PathBuf,
    /// Protocol variant to decode with.
    #[arg(short, long)]
    variant: Option<String>,
    /// Fall back to the other known variants if decoding fails.
    #[arg(short, long)]
    detect: bool,
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the header fields as JSON before the payload.
    #[arg(long)]
    header: bool,
    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<Level>,
}

fn load_config(cli: &Cli) -> Result<InformConfig> {
    let mut config = match &cli.config {
        Some(path) => InformConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => InformConfig::default(),
    };
    config.apply_env();

    if let Some(variant) = &cli.variant {
        config.decoder.variant = variant.clone();
    }
    if cli.detect {
        config.decoder.detect_variant = true;
    }
    if let Some(level) = cli.log_level {
        config.logging.log_level = level;
    }

    config.validate_strict()?;
    Ok(config)
}

fn parse_key(text: &str) -> Result<InformKey> {
    if text.eq_ignore_ascii_case("default") {
        return Ok(InformKey::factory_default());
    }
    InformKey::from_hex(text).context("Failed to parse key")
}

fn open_packet(path: &Path) -> Result<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open packet {}", path.display()))?;
    Ok(Box::new(file))
}

/// Classic 16-bytes-per-row dump with an ASCII column.
fn hex_dump(data: &[u8], out: &mut impl Write) -> io::Result<()> {
    for (row, chunk) in data.chunks(16).enumerate() {
        write!(out, "{:08x}  ", row * 16)?;
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => write!(out, "{b:02x} ")?,
                None => write!(out, "   ")?,
            }
            if i == 7 {
                write!(out, " ")?;
            }
        }
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        writeln!(out, " |{ascii}|")?;
    }
    Ok(())
}

fn looks_like_json(data: &[u8]) -> bool {
    matches!(
        data.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b'[')
    ) && std::str::from_utf8(data).is_ok()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _guard = init_logging(&config.logging)?;

    let key = parse_key(&cli.key)?;
    let reader = PacketReader::from_config(&config.decoder)?;
    let packet = reader.read(open_packet(&cli.packet)?)?;
    info!(
        mac = %packet.mac,
        flags = %packet.variant().describe(packet.flags),
        "Read packet"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.header {
        serde_json::to_writer_pretty(&mut out, &packet.summary())?;
        writeln!(out)?;
    }

    let data = reader.decode(&packet, key.as_bytes())?;
    debug!(len = data.len(), "Decoded payload");

    if looks_like_json(&data) {
        out.write_all(&data)?;
        writeln!(out)?;
    } else {
        hex_dump(&data, &mut out)?;
    }
    Ok(())
}
