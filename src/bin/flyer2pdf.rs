//! CLI binary for flyer2pdf.
//!
//! A thin shim over the library crate: subcommands map onto catalog calls
//! and `JobConfig`, and results are printed for humans or as JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flyer2pdf::{
    acquire, probe_file, CatalogConfig, CatalogSource, DownloadProgressCallback,
    FilesystemProfile, JobConfig, LeclercCatalog, ProgressCallback, Prospectus,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Live progress bar over the page downloads, then a spinner while the PDF
/// is written.
struct CliProgressCallback {
    bar: ProgressBar,
    resumed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Fetching page list…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            resumed: AtomicUsize::new(0),
        })
    }
}

impl DownloadProgressCallback for CliProgressCallback {
    fn on_download_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Downloading");
        self.bar.reset_eta();
    }

    fn on_page_resumed(&self, _index: u32) {
        self.resumed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_page_complete(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_download_complete(&self, total_pages: usize) {
        let resumed = self.resumed.load(Ordering::Relaxed);
        self.bar.println(format!(
            "{} {} images saved{}",
            green("✓"),
            bold(&total_pages.to_string()),
            if resumed > 0 {
                dim(&format!("  ({resumed} from a previous run)"))
            } else {
                String::new()
            }
        ));
    }

    fn on_assembly_start(&self, pages: usize) {
        self.bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        self.bar.set_prefix("Assembling");
        self.bar.set_message(format!("{pages} pages → PDF"));
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Current hypermarket flyers
  flyer2pdf list

  # Stores near a postal code
  flyer2pdf stores 75011

  # Download one flyer for one store
  flyer2pdf download --prospectus 24S12 --store 1234 -o ~/Flyers

  # Page size of a JPEG without decoding it
  flyer2pdf probe 000.jpg

ENVIRONMENT VARIABLES:
  WOOSMAP_KEY             Override the Woosmap key used by `stores`
  FLYER2PDF_OUTPUT_DIR    Default for --output-dir
  FLYER2PDF_CONCURRENCY   Default for --concurrency
  RUST_LOG                Overrides -v/-q log filtering
"#;

/// Download store flyers as a single PDF.
#[derive(Parser, Debug)]
#[command(
    name = "flyer2pdf",
    version,
    about = "Download paginated store flyers and bind them into a PDF",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "FLYER2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "FLYER2PDF_QUIET")]
    quiet: bool,

    /// Catalog API timeout in seconds.
    #[arg(long, global = true, env = "FLYER2PDF_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the flyers currently published.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Find stores near a postal code or town.
    Stores {
        /// Postal code or town name.
        query: String,

        /// Which matching locality to use (1-based).
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        locality: u64,

        /// Woosmap public key. Defaults to the one the store-finder widget uses.
        #[arg(long, env = "WOOSMAP_KEY", hide_env_values = true)]
        locator_key: Option<String>,
    },
    /// Download a flyer for a store and write it as a PDF.
    Download(DownloadArgs),
    /// Print the pixel size of a JPEG file.
    Probe {
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Flyer id as shown by `list`.
    #[arg(long)]
    prospectus: String,

    /// Store id (sign code) as shown by `stores`.
    #[arg(long)]
    store: String,

    /// Directory the PDF is written to.
    #[arg(short, long, env = "FLYER2PDF_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Parent of the per-flyer working directory.
    #[arg(long, env = "FLYER2PDF_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Maximum simultaneous page downloads.
    #[arg(short, long, env = "FLYER2PDF_CONCURRENCY", default_value_t = 3)]
    concurrency: usize,

    /// Attempts per page before the job fails.
    #[arg(long, env = "FLYER2PDF_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Base delay between attempts, doubled each retry (0 = retry at once).
    #[arg(long, env = "FLYER2PDF_RETRY_BACKOFF_MS", default_value_t = 0)]
    retry_backoff_ms: u64,

    /// Per-request timeout for page downloads, in seconds.
    #[arg(long, env = "FLYER2PDF_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Keep the downloaded images after the PDF is written.
    #[arg(long)]
    keep_pages: bool,

    /// Filename rules: windows, linux, macos. Defaults to the host.
    #[arg(long, env = "FLYER2PDF_FILESYSTEM")]
    filesystem: Option<FilesystemProfile>,

    /// Print the job result as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FLYER2PDF_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs during downloads.
    let show_progress = match &cli.command {
        Command::Download(args) => !cli.quiet && !args.no_progress && !args.json,
        _ => false,
    };
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

    match cli.command {
        Command::List { json } => {
            let catalog = catalog(cli.api_timeout, None)?;
            let prospectuses = catalog
                .list_prospectuses()
                .await
                .context("Failed to list flyers")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&prospectuses)
                        .context("Failed to serialise flyer list")?
                );
            } else if prospectuses.is_empty() {
                eprintln!("No flyers published right now");
            } else {
                for p in &prospectuses {
                    println!("{:<10} {}", bold(&p.id), p.label());
                }
            }
        }

        Command::Stores {
            query,
            locality,
            locator_key,
        } => {
            let catalog = catalog(cli.api_timeout, locator_key)?;
            let localities = catalog
                .search_localities(&query)
                .await
                .context("Locality search failed")?;
            if localities.is_empty() {
                anyhow::bail!("No locality matches '{query}'");
            }
            let chosen = usize::try_from(locality - 1)
                .ok()
                .and_then(|i| localities.get(i))
                .with_context(|| {
                    format!("--locality {locality} out of range (1-{})", localities.len())
                })?;
            if !cli.quiet {
                for (i, l) in localities.iter().enumerate() {
                    let marker = if (i + 1) as u64 == locality { cyan("▶") } else { " ".into() };
                    eprintln!("{marker} {}. {}", i + 1, l.description);
                }
            }
            let position = catalog
                .locality_position(&chosen.public_id)
                .await
                .context("Locality lookup failed")?;
            let stores = catalog
                .nearby_stores(position)
                .await
                .context("Store search failed")?;
            for s in &stores {
                println!("{:<8} {}", bold(&s.sign_code), s.name);
            }
        }

        Command::Download(args) => {
            let catalog = catalog(cli.api_timeout, None)?;
            let prospectus = find_prospectus(&catalog, &args.prospectus).await?;

            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn DownloadProgressCallback>)
            } else {
                None
            };
            let config = build_config(&args, progress)?;

            let output = acquire(&catalog, &prospectus, &args.store, &config)
                .await
                .context("Download failed")?;
            drop(config);

            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?
                );
            } else if !cli.quiet {
                eprintln!(
                    "{}  {} pages  {}x{}  {}ms  →  {}",
                    green("✔"),
                    output.pages,
                    output.page_size.width,
                    output.page_size.height,
                    output.stats.total_duration_ms,
                    bold(&output.output_path.display().to_string()),
                );
            }
        }

        Command::Probe { file } => {
            let dims = probe_file(&file)
                .await
                .with_context(|| format!("Failed to probe {}", file.display()))?;
            println!("{}x{}", dims.width, dims.height);
        }
    }

    Ok(())
}

fn catalog(timeout_secs: u64, locator_key: Option<String>) -> Result<LeclercCatalog> {
    let mut config = CatalogConfig {
        request_timeout_secs: timeout_secs,
        ..CatalogConfig::default()
    };
    if locator_key.is_some() {
        config.locator_key = locator_key;
    }
    LeclercCatalog::new(config).context("Failed to set up catalog client")
}

async fn find_prospectus(catalog: &LeclercCatalog, id: &str) -> Result<Prospectus> {
    let all = catalog
        .list_prospectuses()
        .await
        .context("Failed to list flyers")?;
    all.into_iter()
        .find(|p| p.id == id)
        .with_context(|| format!("No current flyer with id '{id}' (see `flyer2pdf list`)"))
}

/// Map CLI args to `JobConfig`.
fn build_config(args: &DownloadArgs, progress: Option<ProgressCallback>) -> Result<JobConfig> {
    let mut builder = JobConfig::builder()
        .concurrency(args.concurrency)
        .max_attempts(args.max_attempts)
        .retry_backoff_ms(args.retry_backoff_ms)
        .request_timeout_secs(args.download_timeout)
        .output_dir(&args.output_dir)
        .work_root(&args.work_dir)
        .keep_pages(args.keep_pages);

    if let Some(profile) = args.filesystem {
        builder = builder.filesystem(profile);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
