//! CLI binary for cardscan.
//!
//! A thin shim over the library crate that maps CLI flags to `ScanConfig`,
//! picks a local [`FsStore`] root, and prints results.

use anyhow::{bail, Context, Result};
use cardscan::{
    analyze, process_many, recognize_text, CardStore, FsStore, OcrConfig, OverlayTier, ScanConfig,
};
use clap::Parser;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a card, translate it, and store both images locally
  cardscan luffy.jpg

  # Several cards at once
  cardscan scans/*.jpg --out-dir ./collection

  # Extraction only — print the card record as JSON, store nothing
  cardscan luffy.jpg --analyze-only --json

  # Alternate OCR backend — raw text, no card record
  cardscan luffy.jpg --ocr-only

  # Browse what has been stored
  cardscan --list
  cardscan --show 4f7c9a60-…

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          Key for the extraction and image-edit endpoints
  AZURE_VISION_ENDPOINT   OCR endpoint base URL (only with --ocr-only)
  AZURE_VISION_KEY        OCR subscription key   (only with --ocr-only)

SETUP:
  1. Set API key:   export OPENAI_API_KEY=sk-...
  2. Scan a card:   cardscan photo.jpg
"#;

/// Analyse trading-card photographs and generate English overlays.
#[derive(Parser, Debug)]
#[command(
    name = "cardscan",
    version,
    about = "Analyse trading-card photographs and generate English-translated overlays",
    arg_required_else_help = true,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Card photographs to process (JPEG, PNG, or WebP).
    inputs: Vec<PathBuf>,

    /// Root directory for stored images and metadata.
    #[arg(long, env = "CARDSCAN_OUT_DIR", default_value = "./cards")]
    out_dir: PathBuf,

    /// API key for the vision endpoints.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Extraction model.
    #[arg(long, env = "CARDSCAN_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Longest-edge bound (px) for the extraction copy.
    #[arg(long, env = "CARDSCAN_MAX_EDGE", default_value_t = 1024)]
    max_edge: u32,

    /// JPEG quality (1–100) for the extraction copy.
    #[arg(long, env = "CARDSCAN_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Overlay output tier: small, medium, large, auto.
    #[arg(long, env = "CARDSCAN_OVERLAY_SIZE", value_enum, default_value = "auto")]
    overlay_size: OverlaySizeArg,

    /// Number of cards processed concurrently.
    #[arg(short, long, env = "CARDSCAN_CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// Extraction only: print the card record, skip overlay and storage.
    #[arg(long)]
    analyze_only: bool,

    /// Alternate OCR backend only: print recognized text, no card record.
    #[arg(long, conflicts_with = "analyze_only")]
    ocr_only: bool,

    /// OCR endpoint base URL (with --ocr-only).
    #[arg(long, env = "AZURE_VISION_ENDPOINT")]
    ocr_endpoint: Option<String>,

    /// OCR subscription key (with --ocr-only).
    #[arg(long, env = "AZURE_VISION_KEY", hide_env_values = true)]
    ocr_key: Option<String>,

    /// List stored card metadata, most recent first.
    #[arg(long, conflicts_with_all = ["analyze_only", "ocr_only"])]
    list: bool,

    /// Show one stored metadata row by id.
    #[arg(long, value_name = "ID")]
    show: Option<String>,

    /// Print structured JSON instead of text summaries.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and requested data.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OverlaySizeArg {
    Small,
    Medium,
    Large,
    Auto,
}

impl From<OverlaySizeArg> for OverlayTier {
    fn from(v: OverlaySizeArg) -> Self {
        match v {
            OverlaySizeArg::Small => OverlayTier::Small,
            OverlaySizeArg::Medium => OverlayTier::Medium,
            OverlaySizeArg::Large => OverlayTier::Large,
            OverlaySizeArg::Auto => OverlayTier::Auto,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let store = FsStore::new(&cli.out_dir);

    // ── Metadata browsing (no API key needed) ────────────────────────────
    if cli.list {
        return list_cards(&store, cli.json).await;
    }
    if let Some(ref id) = cli.show {
        return show_card(&store, id, cli.json).await;
    }

    if cli.inputs.is_empty() {
        bail!("no input images given (see --help)");
    }

    // ── OCR-only mode ────────────────────────────────────────────────────
    if cli.ocr_only {
        return ocr_only(&cli).await;
    }

    let config = build_config(&cli)?;

    // ── Analyze-only mode ────────────────────────────────────────────────
    if cli.analyze_only {
        for path in &cli.inputs {
            let bytes = read_image(path)?;
            let card = analyze(&bytes, &config)
                .await
                .with_context(|| format!("analysis failed for {}", path.display()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                print_card_summary(path, &card);
            }
        }
        return Ok(());
    }

    // ── Full pipeline ────────────────────────────────────────────────────
    let mut images = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        images.push((read_image(path)?, content_type_for(path).to_string()));
    }

    let results = process_many(&images, &config, &store, cli.concurrency).await;

    let mut failed = 0usize;
    for (path, result) in cli.inputs.iter().zip(results) {
        match result {
            Ok(outcome) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&outcome.metadata)?);
                } else if !cli.quiet {
                    println!(
                        "{} {}  {}",
                        green("✔"),
                        bold(outcome.card.display_name()),
                        dim(&outcome.metadata.translated_image_url),
                    );
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}  {} stage: {e}", red("✗"), path.display(), e.stage());
            }
        }
    }

    if failed > 0 {
        bail!("{failed}/{} cards failed", cli.inputs.len());
    }
    Ok(())
}

/// Map CLI args to `ScanConfig`.
fn build_config(cli: &Cli) -> Result<ScanConfig> {
    let api_key = cli
        .api_key
        .clone()
        .context("no API key — set OPENAI_API_KEY or pass --api-key")?;

    ScanConfig::builder(api_key)
        .model(&cli.model)
        .max_long_edge(cli.max_edge)
        .jpeg_quality(cli.jpeg_quality)
        .overlay_tier(cli.overlay_size.clone().into())
        .build()
        .context("invalid configuration")
}

async fn ocr_only(cli: &Cli) -> Result<()> {
    let endpoint = cli
        .ocr_endpoint
        .clone()
        .context("no OCR endpoint — set AZURE_VISION_ENDPOINT or pass --ocr-endpoint")?;
    let key = cli
        .ocr_key
        .clone()
        .context("no OCR key — set AZURE_VISION_KEY or pass --ocr-key")?;

    // The extraction key is unused on this path; OCR carries its own
    // credential, so any placeholder satisfies the builder.
    let config = ScanConfig::builder("ocr-only")
        .ocr(OcrConfig::new(endpoint, key))
        .build()
        .context("invalid configuration")?;

    for path in &cli.inputs {
        let bytes = read_image(path)?;
        let text = recognize_text(&bytes, &config)
            .await
            .with_context(|| format!("OCR failed for {}", path.display()))?;
        if cli.inputs.len() > 1 && !cli.quiet {
            eprintln!("{}", dim(&path.display().to_string()));
        }
        println!("{text}");
    }
    Ok(())
}

async fn list_cards(store: &FsStore, json: bool) -> Result<()> {
    let rows = store.list_metadata().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        eprintln!("no cards stored yet");
        return Ok(());
    }
    for row in rows {
        println!(
            "{}  {}  {}  {}",
            dim(&row.created_at.format("%Y-%m-%d %H:%M").to_string()),
            row.id,
            bold(&row.card_name),
            dim(row.rarity.as_deref().unwrap_or("-")),
        );
    }
    Ok(())
}

async fn show_card(store: &FsStore, id: &str, json: bool) -> Result<()> {
    match store.get_metadata(id).await? {
        Some(row) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&row)?);
            } else {
                println!("{}", bold(&row.card_name));
                if let Some(jp) = &row.card_name_japanese {
                    println!("  Japanese:   {jp}");
                }
                println!("  Type:       {}", row.card_type.as_deref().unwrap_or("-"));
                println!("  Color:      {}", row.color.as_deref().unwrap_or("-"));
                if let Some(cost) = row.cost {
                    println!("  Cost:       {cost}");
                }
                if let Some(power) = row.power {
                    println!("  Power:      {power}");
                }
                println!("  Rarity:     {}", row.rarity.as_deref().unwrap_or("-"));
                println!("  Original:   {}", row.original_image_url);
                println!("  Translated: {}", row.translated_image_url);
            }
            Ok(())
        }
        None => bail!("no stored card with id '{id}'"),
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

fn print_card_summary(path: &Path, card: &cardscan::CardRecord) {
    println!("{}  {}", dim(&path.display().to_string()), bold(card.display_name()));
    if let Some(ref jp) = card.name_japanese {
        println!("  Japanese:  {jp}");
    }
    if let Some(ref t) = card.card_type {
        println!("  Type:      {t}");
    }
    if let Some(cost) = card.cost {
        println!("  Cost:      {cost}");
    }
    if let Some(power) = card.power {
        println!("  Power:     {power}");
    }
    if let Some(ref effect) = card.effect_main_english {
        println!("  Effect:    {effect}");
    }
    if let Some(conf) = card.confidences.name {
        println!("  Confidence: {conf:.2}");
    }
}
