mod clean;
mod db;
mod geo;
mod jitter;
mod listing;
mod pipeline;
mod settings;
mod stats;
mod table;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use geo::NominatimClient;
use pipeline::{RunOptions, RunOutcome};
use settings::Settings;

#[derive(Parser)]
#[command(name = "immo_pipeline", about = "Clean and geocode scraped real-estate listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw table, geocode it and write the enriched table
    Run {
        /// Raw listings CSV (default from settings)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Cleaned output CSV (default from settings)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Ignore the persisted geocode cache
        #[arg(long)]
        fresh: bool,
        /// Look up again places that previously had no result
        #[arg(long)]
        retry_unresolved: bool,
        /// Write the cleaned table without coordinates
        #[arg(long)]
        skip_geocode: bool,
        /// Run even if the input is unchanged since the last run
        #[arg(long)]
        force: bool,
    },
    /// Market summary of a cleaned table
    Stats {
        /// Cleaned CSV (default: configured output)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Number of departments to rank
        #[arg(short = 'n', long, default_value_t = stats::DEFAULT_TOP)]
        top: usize,
    },
    /// Inspect or reset the persisted geocode cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Entry counts and age
    Stats,
    /// Delete every cached place
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            fresh,
            retry_unresolved,
            skip_geocode,
            force,
        } => {
            if let Some(p) = input {
                settings.input = p;
            }
            if let Some(p) = output {
                settings.output = p;
            }
            let opts = RunOptions {
                fresh,
                retry_unresolved,
                skip_geocode,
                force,
            };
            info!(input = ?settings.input, output = ?settings.output, ?opts, "Starting run");

            let conn = db::connect(&settings.cache_db)?;
            db::init_schema(&conn)?;
            let geocoder = NominatimClient::new(
                &settings.nominatim_url,
                &settings.user_agent,
                settings.request_timeout(),
            )?;

            match pipeline::run_with(&conn, &settings, &geocoder, opts).await? {
                RunOutcome::UpToDate(last) => {
                    println!(
                        "{:?} is up to date (run {} at {}: {} -> {} rows, {} geocoded). Use --force to rebuild.",
                        settings.output,
                        last.run_id,
                        last.finished_at,
                        last.rows_in,
                        last.rows_out,
                        last.geocoded
                    );
                }
                RunOutcome::Completed(summary) => {
                    summary.print();
                    println!("Wrote {:?}", settings.output);
                }
            }
            Ok(())
        }
        Commands::Stats { input, top } => {
            let path = input.unwrap_or_else(|| settings.output.clone());
            let table = table::read_table(&path)?;
            if table.records.is_empty() {
                println!("No listings in {:?}.", path);
                return Ok(());
            }
            let summary = stats::MarketSummary::from_records(&table.records, top);
            print!("{}", summary.render_markdown());
            Ok(())
        }
        Commands::Cache { action } => {
            let conn = db::connect(&settings.cache_db)?;
            db::init_schema(&conn)?;
            match action {
                CacheAction::Stats => {
                    let s = db::cache_stats(&conn)?;
                    println!("Entries:    {}", s.entries);
                    println!("Resolved:   {}", s.resolved);
                    println!("Unresolved: {}", s.unresolved);
                    println!("Oldest:     {}", s.oldest.as_deref().unwrap_or("-"));
                    println!("Newest:     {}", s.newest.as_deref().unwrap_or("-"));
                }
                CacheAction::Clear => {
                    let removed = db::clear_geocode_cache(&conn)?;
                    println!("Removed {} cached places from {:?}", removed, settings.cache_db);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
