use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use mediaredact::{BoxIndex, BoxKey, ByteRange, FourCC};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "List the payload byte ranges of ISOBMFF boxes")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Box type to look for (4 chars, Latin-1 allowed, e.g. tkhd or ©xyz)
    #[arg(long = "type", conflicts_with = "uuid")]
    typ: Option<String>,

    /// Extended type of uuid boxes to look for, as 32 hex digits
    #[arg(long)]
    uuid: Option<String>,

    /// Print flat [start, end, ...] offsets instead of one range per line
    #[arg(long, action = ArgAction::SetTrue)]
    flat: bool,

    /// Emit JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    file: &'a str,
    key: String,
    ranges: &'a [ByteRange],
}

fn parse_key(args: &Args) -> anyhow::Result<BoxKey> {
    if let Some(u) = &args.uuid {
        let bytes = hex::decode(u.replace('-', "")).context("--uuid is not hex")?;
        let uuid: [u8; 16] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("--uuid must be 16 bytes"))?;
        return Ok(BoxKey::Uuid(uuid));
    }
    match &args.typ {
        Some(t) => FourCC::from_latin1(t)
            .map(BoxKey::FourCC)
            .with_context(|| format!("'{t}' is not a 4-character box type")),
        None => bail!("one of --type or --uuid is required"),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        let level = if args.verbose { "trace" } else { "warn" };
        format!("mediaredact={level}")
    });
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let key = parse_key(&args)?;
    let mut index = BoxIndex::open(&args.path).with_context(|| format!("opening {}", args.path))?;
    let ranges = index.ranges(&key)?;

    if args.json {
        let report = Report { file: &args.path, key: key.to_string(), ranges: &ranges };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.flat {
        println!("{:?}", mediaredact::range::flatten(&ranges));
        return Ok(());
    }

    for r in &ranges {
        println!("{key} {:#x}..{:#x} ({} bytes)", r.start, r.end, r.len());
    }
    Ok(())
}
