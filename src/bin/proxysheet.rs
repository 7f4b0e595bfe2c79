//! CLI binary for proxysheet.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! `SheetConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use proxysheet::{
    build_sheet, clean_dirs, convert_all, fetch_deck, group_printings, parse_deck, CancelToken,
    CompressOutcome, CompressionPreset, ConvertStatus, ProgressCallback, ScryfallClient,
    SheetConfig, SheetOutput, SheetProgressCallback,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar for conversion plus one log line
/// per image and per rendered page. Works with out-of-order completion.
struct CliProgressCallback {
    bar: ProgressBar,
    failed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            failed: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize, unit: &str, prefix: &str) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  \
             ⏱ {{elapsed_precise}}  ETA {{eta_precise}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(style);
        self.bar.set_prefix(prefix.to_string());
        self.bar.reset_eta();
    }
}

impl SheetProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_items: usize) {
        self.activate_bar(total_items, "images", "Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_items} images…"))
        ));
    }

    fn on_item_complete(&self, status: &ConvertStatus, _total_items: usize) {
        let mark = match status {
            ConvertStatus::Converted { .. } => green("✓"),
            ConvertStatus::Skipped { .. } => dim("·"),
            ConvertStatus::Failed { .. } => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                red("✗")
            }
            ConvertStatus::Cancelled { .. } => yellow("⊘"),
        };
        let line = status.to_string();
        let line = if status.is_failure() { red(&line) } else { line };
        self.bar.println(format!("  {mark} {line}"));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, converted: usize, skipped: usize, failed: usize) {
        self.bar.println(format!(
            "{} {} converted, {} skipped, {}",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&converted.to_string()),
            skipped,
            if failed == 0 {
                dim("0 failed")
            } else {
                red(&format!("{failed} failed"))
            },
        ));
    }

    fn on_page_rendered(&self, page_num: usize, total_pages: usize, placements: usize) {
        if page_num == 1 {
            self.activate_bar(total_pages, "pages", "Rendering");
        }
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{placements} cards")),
        ));
        self.bar.inc(1);
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Download a deck, convert it and build the sheet in one go
  proxysheet fetch deck.txt && proxysheet run

  # Resize everything in imagens/ into cartas/ at 600 DPI
  proxysheet convert imagens cartas

  # Build the PDF from already-converted cards, without Ghostscript
  proxysheet sheet cartas -o cartas_A4.pdf --no-compress

  # Show the printings available for one card
  proxysheet search "Lightning Bolt" --lang en --lang pt

  # Empty both working folders
  proxysheet clean

FILE NAMES:
  A "(Nx)" token anywhere in a card's file name prints it N times:
  "(4x)Lightning Bolt.png" fills four grid cells.

ENVIRONMENT VARIABLES:
  PROXYSHEET_DPI           Print resolution (72–1200, default 600)
  PROXYSHEET_WORKERS       Concurrent image conversions
  PROXYSHEET_GHOSTSCRIPT   Path to the Ghostscript executable
  PROXYSHEET_PRESET        Ghostscript preset (prepress, printer, ebook, screen)
  PROXYSHEET_LANGS         Comma-separated printing languages (default en,pt)
  RUST_LOG                 Override the log filter
"#;

/// Build printable A4 proxy sheets from trading-card images.
#[derive(Parser, Debug)]
#[command(
    name = "proxysheet",
    version,
    about = "Build printable A4 proxy sheets from trading-card images",
    long_about = "Search Scryfall for card printings, download the artwork, resize it to \
exact card size at print resolution and lay it out nine to a page on A4 PDFs with cut guides.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PROXYSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PROXYSHEET_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PROXYSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Print results as JSON on stdout.
    #[arg(long, global = true, env = "PROXYSHEET_JSON")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resize source images to print-ready card PNGs.
    Convert {
        /// Folder of source images.
        #[arg(default_value = "imagens", env = "PROXYSHEET_INPUT")]
        input: PathBuf,
        /// Folder for the normalized PNGs.
        #[arg(default_value = "cartas", env = "PROXYSHEET_CARDS")]
        output: PathBuf,
        #[command(flatten)]
        sheet: SheetArgs,
    },
    /// Lay converted cards out on A4 pages and write the PDF.
    Sheet {
        /// Folder of normalized card PNGs.
        #[arg(default_value = "cartas", env = "PROXYSHEET_CARDS")]
        cards: PathBuf,
        /// PDF to write.
        #[arg(short, long, default_value = "cartas_A4.pdf", env = "PROXYSHEET_PDF")]
        output: PathBuf,
        /// Where the Ghostscript copy goes. Default: <output>_compressed.pdf.
        #[arg(long, env = "PROXYSHEET_COMPRESSED_PDF")]
        compressed_output: Option<PathBuf>,
        #[command(flatten)]
        sheet: SheetArgs,
    },
    /// Convert, then build the sheet.
    Run {
        #[arg(default_value = "imagens", env = "PROXYSHEET_INPUT")]
        input: PathBuf,
        #[arg(default_value = "cartas", env = "PROXYSHEET_CARDS")]
        cards: PathBuf,
        #[arg(short, long, default_value = "cartas_A4.pdf", env = "PROXYSHEET_PDF")]
        output: PathBuf,
        #[command(flatten)]
        sheet: SheetArgs,
    },
    /// List the printings of a card grouped by edition.
    Search {
        /// Exact card name.
        name: String,
        #[command(flatten)]
        net: NetArgs,
        /// Also report each image's size (one HEAD request per printing).
        #[arg(long)]
        sizes: bool,
    },
    /// Download one image per deck-list entry.
    Fetch {
        /// Deck list file, or "-" for stdin.
        deck: PathBuf,
        /// Download folder.
        #[arg(short, long, default_value = "imagens", env = "PROXYSHEET_INPUT")]
        dir: PathBuf,
        #[command(flatten)]
        net: NetArgs,
    },
    /// Empty the download and card folders.
    Clean {
        #[arg(default_values = ["imagens", "cartas"])]
        dirs: Vec<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
struct SheetArgs {
    /// Print resolution of the converted images (72–1200).
    #[arg(long, env = "PROXYSHEET_DPI", default_value_t = 600,
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    dpi: u32,

    /// Card width in millimetres.
    #[arg(long, env = "PROXYSHEET_CARD_WIDTH", default_value_t = 63.0)]
    card_width: f64,

    /// Card height in millimetres.
    #[arg(long, env = "PROXYSHEET_CARD_HEIGHT", default_value_t = 88.0)]
    card_height: f64,

    /// Grid columns per page.
    #[arg(long, env = "PROXYSHEET_COLUMNS", default_value_t = 3)]
    columns: u32,

    /// Grid rows per page.
    #[arg(long, env = "PROXYSHEET_ROWS", default_value_t = 3)]
    rows: u32,

    /// Concurrent image conversions. Default: number of CPUs.
    #[arg(short, long, env = "PROXYSHEET_WORKERS")]
    workers: Option<usize>,

    /// Skip the Ghostscript pass.
    #[arg(long, env = "PROXYSHEET_NO_COMPRESS")]
    no_compress: bool,

    /// Ghostscript -dPDFSETTINGS preset.
    #[arg(long, env = "PROXYSHEET_PRESET", value_enum, default_value = "prepress")]
    preset: PresetArg,

    /// Ghostscript executable. Default: gs / gswin64c on PATH.
    #[arg(long, env = "PROXYSHEET_GHOSTSCRIPT")]
    ghostscript: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct NetArgs {
    /// Printing languages in preference order.
    #[arg(long = "lang", env = "PROXYSHEET_LANGS", value_delimiter = ',',
          default_values = ["en", "pt"])]
    langs: Vec<String>,

    /// HTTP timeout in seconds.
    #[arg(long, env = "PROXYSHEET_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PresetArg {
    Prepress,
    Printer,
    Ebook,
    Screen,
    Default,
}

impl From<PresetArg> for CompressionPreset {
    fn from(v: PresetArg) -> Self {
        match v {
            PresetArg::Prepress => CompressionPreset::Prepress,
            PresetArg::Printer => CompressionPreset::Printer,
            PresetArg::Ebook => CompressionPreset::Ebook,
            PresetArg::Screen => CompressionPreset::Screen,
            PresetArg::Default => CompressionPreset::Default,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar already prints one line per image and page.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ctrl-C stops dispatching new work ────────────────────────────────
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} Interrupted, finishing work in progress…", yellow("⊘"));
                cancel.cancel();
            }
        });
    }

    let progress = || -> Option<ProgressCallback> {
        show_progress.then(|| CliProgressCallback::new() as Arc<dyn SheetProgressCallback>)
    };

    match &cli.command {
        Command::Convert {
            input,
            output,
            sheet,
        } => {
            let config = sheet_config(sheet, progress(), &cancel)?;
            let report = convert_all(input, output, &config)
                .await
                .context("Conversion failed")?;
            drop(config);

            if cli.json {
                print_json(&report)?;
            } else if !cli.quiet && !show_progress {
                for status in &report.statuses {
                    eprintln!("{status}");
                }
                eprintln!(
                    "Converted {}, skipped {}, failed {} in {}ms ({}x{} px)",
                    report.converted(),
                    report.skipped(),
                    report.failed(),
                    report.duration_ms,
                    report.target_px.0,
                    report.target_px.1
                );
            }
        }

        Command::Sheet {
            cards,
            output,
            compressed_output,
            sheet,
        } => {
            let config = sheet_config(sheet, progress(), &cancel)?;
            let result = build_sheet(cards, output, compressed_output.as_deref(), &config)
                .await
                .context("Sheet generation failed")?;
            drop(config);
            report_sheet(&cli, &result)?;
        }

        Command::Run {
            input,
            cards,
            output,
            sheet,
        } => {
            let config = sheet_config(sheet, progress(), &cancel)?;
            let result = proxysheet::run(input, cards, output, &config)
                .await
                .context("Run failed")?;
            drop(config);

            if cli.json {
                print_json(&result)?;
            } else {
                if !cli.quiet && !show_progress {
                    eprintln!(
                        "Converted {}, skipped {}, failed {}",
                        result.convert.converted(),
                        result.convert.skipped(),
                        result.convert.failed()
                    );
                }
                report_sheet(&cli, &result.sheet)?;
            }
        }

        Command::Search { name, net, sizes } => {
            let client = ScryfallClient::new(net.timeout).context("HTTP client setup failed")?;
            let printings = client
                .search_printings(name, &net.langs)
                .await
                .with_context(|| format!("Search for '{name}' failed"))?;
            let groups = group_printings(printings);

            if cli.json {
                print_json(&groups)?;
                return Ok(());
            }
            for group in &groups {
                println!("{}", bold(&group.name));
                for edition in &group.editions {
                    let langs: Vec<&str> = [&edition.primary, &edition.alternate]
                        .into_iter()
                        .flatten()
                        .map(|c| c.lang.as_str())
                        .collect();
                    let url = edition
                        .preferred()
                        .and_then(|c| c.max_quality_image_url())
                        .unwrap_or("-");
                    let size = match (*sizes, url) {
                        (true, u) if u != "-" => match client.image_size_mb(u).await {
                            Ok(mb) => format!("  {}", dim(&format!("{mb:.2} MB"))),
                            Err(_) => format!("  {}", dim("size unknown")),
                        },
                        _ => String::new(),
                    };
                    println!(
                        "  {} #{:<6} [{}]  {}{}",
                        edition.set_name,
                        edition.collector_number,
                        langs.join("/"),
                        dim(url),
                        size
                    );
                }
            }
        }

        Command::Fetch { deck, dir, net } => {
            let text = read_deck(deck)?;
            let entries = parse_deck(&text);
            if entries.is_empty() {
                anyhow::bail!("No cards found in deck list {}", deck.display());
            }
            let config = SheetConfig::builder()
                .languages(net.langs.clone())
                .download_timeout_secs(net.timeout)
                .cancel_token(cancel.clone())
                .build()
                .context("Invalid configuration")?;
            let client = ScryfallClient::from_config(&config).context("HTTP client setup failed")?;

            let statuses = fetch_deck(&client, &entries, dir, &config)
                .await
                .context("Fetch failed")?;
            if cli.json {
                print_json(&statuses)?;
            } else if !cli.quiet {
                for status in &statuses {
                    let mark = if status.is_failure() { red("✗") } else { green("✓") };
                    eprintln!("  {mark} {status}");
                }
                let failed = statuses.iter().filter(|s| s.is_failure()).count();
                eprintln!(
                    "{} {}/{} cards fetched into {}",
                    if failed == 0 { green("✔") } else { cyan("⚠") },
                    statuses.len() - failed,
                    statuses.len(),
                    bold(&dir.display().to_string())
                );
            }
        }

        Command::Clean { dirs } => {
            let statuses = clean_dirs(dirs);
            if cli.json {
                print_json(&statuses)?;
            } else if !cli.quiet {
                for status in &statuses {
                    eprintln!("{status}");
                }
                eprintln!("{} Folders cleaned", green("✔"));
            }
        }
    }

    Ok(())
}

/// Map CLI args to `SheetConfig`.
fn sheet_config(
    args: &SheetArgs,
    progress: Option<ProgressCallback>,
    cancel: &CancelToken,
) -> Result<SheetConfig> {
    let mut builder = SheetConfig::builder()
        .dpi(args.dpi)
        .card_size_mm(args.card_width, args.card_height)
        .grid(args.columns, args.rows)
        .compress(!args.no_compress)
        .preset(args.preset.clone().into())
        .cancel_token(cancel.clone());

    if let Some(n) = args.workers {
        builder = builder.workers(n);
    }
    if let Some(ref gs) = args.ghostscript {
        builder = builder.ghostscript(gs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn report_sheet(cli: &Cli, output: &SheetOutput) -> Result<()> {
    if cli.json {
        return print_json(output);
    }
    if cli.quiet {
        return Ok(());
    }
    match &output.compression {
        CompressOutcome::Compressed { bytes, .. } => eprintln!(
            "   compressed to {}",
            dim(&format!("{:.1} MB", *bytes as f64 / (1024.0 * 1024.0)))
        ),
        CompressOutcome::Skipped { reason } => eprintln!("   {}", dim(reason)),
        CompressOutcome::Failed { error } => eprintln!("   {}", red(&error.to_string())),
    }
    eprintln!(
        "{}  {} pages  {} cards  {}ms  →  {}",
        if output.render.placements_skipped == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        output.render.pages,
        output.render.placements_drawn,
        output.duration_ms,
        bold(&output.final_artifact().display().to_string()),
    );
    Ok(())
}

fn read_deck(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read deck list from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deck list {}", path.display()))
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialise output")?
    );
    Ok(())
}
