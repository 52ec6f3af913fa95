use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use enorekcah::types::ReportSummary;
use enorekcah::{CrawlConfig, HeadlessBrowser, detail, merge, store, summary};

#[derive(Parser)]
#[command(name = "enorekcah")]
#[command(about = "A hackerone.com hacktivity scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest the hacktivity listing for one team into a summary collection
    Summaries {
        #[arg(help = "Team handle, e.g. 'curl'")]
        team: String,

        #[arg(
            short = 'o',
            long = "out",
            default_value = "hacktivity_summaries.json",
            help = "Output file (overwritten)"
        )]
        out: PathBuf,

        #[arg(long, default_value_t = 100, help = "Scroll-and-recount cycle cap")]
        max_scroll_attempts: u32,

        #[arg(
            long,
            default_value_t = 2000,
            help = "Milliseconds to wait after each scroll for lazy loading"
        )]
        settle_delay_ms: u64,
    },
    /// Harvest report bodies for every URL in a summary collection
    Bodies {
        #[arg(
            short = 'i',
            long = "input",
            default_value = "hacktivity_summaries.json",
            help = "Summary collection to take report URLs from"
        )]
        input: PathBuf,

        #[arg(
            short = 'o',
            long = "out",
            default_value = "report_bodies.json",
            help = "Output file (overwritten)"
        )]
        out: PathBuf,

        #[arg(
            long,
            default_value_t = 2,
            help = "Concurrent detail-page sessions"
        )]
        concurrency: usize,

        #[arg(long, default_value_t = 30, help = "Per-page timeout in seconds")]
        timeout_secs: u64,
    },
    /// Join a summary collection with a body collection by report URL
    Merge {
        #[arg(
            long,
            default_value = "hacktivity_summaries.json",
            help = "Summary collection (authoritative side of the join)"
        )]
        summaries: PathBuf,

        #[arg(
            long,
            default_value = "report_bodies.json",
            help = "Body collection"
        )]
        bodies: PathBuf,

        #[arg(
            short = 'o',
            long = "out",
            default_value = "reports_combined.json",
            help = "Output file (overwritten)"
        )]
        out: PathBuf,
    },
}

fn exit_on_error<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> T {
    result.unwrap_or_else(|e| {
        log::error!("{}: {}", context, e);
        process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Summaries {
            team,
            out,
            max_scroll_attempts,
            settle_delay_ms,
        } => {
            let config = CrawlConfig {
                max_scroll_attempts,
                settle_delay: Duration::from_millis(settle_delay_ms),
                ..CrawlConfig::default()
            };

            let browser = exit_on_error(
                HeadlessBrowser::launch(&config).await,
                "Error launching browser",
            );
            let result = summary::harvest_summaries(&browser, &config, &team).await;
            browser.shutdown().await;

            let summaries = exit_on_error(result, "Error harvesting summaries");
            exit_on_error(
                store::save_records(&out, &summaries),
                "Error writing summary collection",
            );
            println!(
                "Saved {} summaries for team {} to {}",
                summaries.len(),
                team,
                out.display()
            );
        }

        Commands::Bodies {
            input,
            out,
            concurrency,
            timeout_secs,
        } => {
            let summaries: Vec<ReportSummary> = exit_on_error(
                store::load_records(&input),
                "Error reading summary collection",
            );
            let urls: Vec<String> = summaries.into_iter().map(|s| s.url).collect();
            if urls.is_empty() {
                println!("No report URLs in {}. Run 'summaries' first.", input.display());
                return;
            }

            let config = CrawlConfig {
                detail_concurrency: concurrency,
                page_timeout: Duration::from_secs(timeout_secs),
                ..CrawlConfig::default()
            };

            let browser = exit_on_error(
                HeadlessBrowser::launch(&config).await,
                "Error launching browser",
            );
            let bodies = detail::harvest_bodies(&browser, &config, &urls).await;
            browser.shutdown().await;

            exit_on_error(
                store::save_records(&out, &bodies),
                "Error writing body collection",
            );
            println!(
                "Saved {} bodies (of {} report URLs) to {}",
                bodies.len(),
                urls.len(),
                out.display()
            );
        }

        Commands::Merge {
            summaries,
            bodies,
            out,
        } => {
            let summary_records = exit_on_error(
                store::load_records(&summaries),
                "Error reading summary collection",
            );
            let body_records = exit_on_error(
                store::load_records(&bodies),
                "Error reading body collection",
            );

            let merged = merge::merge(summary_records, body_records);
            let stats = merge::MergeStats::from_merged(&merged);

            exit_on_error(
                store::save_records(&out, &merged),
                "Error writing merged collection",
            );
            println!("Merged {} reports into {}", merged.len(), out.display());
            print!("{}", stats);
        }
    }
}
