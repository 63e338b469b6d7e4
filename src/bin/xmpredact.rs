use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use mediaredact::{BoxIndex, SensitiveTags, XmpScan, XmpSource, scan, scan_file};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Judge from the file's magic bytes
    Auto,
    /// The file is a bare XMP packet
    Raw,
    /// JPEG or TIFF/DNG with EXIF/APP1 XMP
    Exif,
    /// MP4/ISOBMFF with XMP in udta or a uuid box
    Iso,
}

#[derive(Parser, Debug)]
#[command(version, about = "Print XMP identity fields and the byte ranges of sensitive tags")]
struct Args {
    /// Media file path
    path: PathBuf,

    /// How to find the XMP packet
    #[arg(long, value_enum, default_value_t = SourceKind::Auto)]
    source: SourceKind,

    /// Tag to redact (repeatable); defaults to the exif:GPS* properties
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// JSON file with an array of tag names to redact
    #[arg(long, conflicts_with = "tags")]
    tags_file: Option<PathBuf>,

    /// Emit JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn load_tags(args: &Args) -> anyhow::Result<SensitiveTags> {
    if let Some(path) = &args.tags_file {
        let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        return Ok(SensitiveTags::from_json(f)?);
    }
    if args.tags.is_empty() {
        Ok(SensitiveTags::gps())
    } else {
        Ok(SensitiveTags::new(&args.tags))
    }
}

fn run(args: &Args, tags: &SensitiveTags) -> anyhow::Result<XmpScan> {
    if args.source == SourceKind::Auto {
        return Ok(scan_file(&args.path, tags)?);
    }
    let file = File::open(&args.path).with_context(|| format!("opening {}", args.path.display()))?;
    let result = match args.source {
        SourceKind::Raw => scan(XmpSource::RawXml(file), tags)?,
        SourceKind::Exif => scan(XmpSource::exif(file)?, tags)?,
        SourceKind::Iso | SourceKind::Auto => {
            let mut index = BoxIndex::new(file)?;
            scan(XmpSource::iso(&mut index)?, tags)?
        }
    };
    Ok(result)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        let level = if args.verbose { "debug" } else { "warn" };
        format!("mediaredact={level}")
    });
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let tags = load_tags(&args)?;
    let result = run(&args, &tags)
        .with_context(|| format!("refusing to report ranges for {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let doc = &result.document;
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("format:               {}", show(&doc.format));
    println!("document id:          {}", show(&doc.document_id));
    println!("instance id:          {}", show(&doc.instance_id));
    println!("original document id: {}", show(&doc.original_document_id));
    println!("redaction ranges:     {}", result.ranges.len());
    for r in &result.ranges {
        println!("  {}..{} ({} bytes)", r.start, r.end, r.len());
    }
    Ok(())
}
