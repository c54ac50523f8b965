mod collector;
mod error;
mod export;
mod fetcher;
mod parser;
mod settings;
mod store;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::collector::{Collection, HttpListing};
use crate::export::ExportReport;
use crate::fetcher::{Fetcher, PageSource};
use crate::parser::{Extraction, Markers};
use crate::settings::Settings;
use crate::store::Store;

#[derive(Parser)]
#[command(name = "toolpedia", about = "Futurepedia AI tool scraper and field extractor")]
struct Cli {
    /// Directory holding categories/, data/ and csv/ (default: TOOLPEDIA_ROOT or .)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scroll a category listing and save its tool identifiers
    CollectLinks { category: String },
    /// Print the tools saved for a category
    ListTools { category: String },
    /// Fetch one tool page, save and print its text
    FetchOne {
        tool: String,
        /// Fetch again even if the page is already saved
        #[arg(long)]
        force: bool,
    },
    /// Fetch every not-yet-saved tool of a category
    FetchAll { category: String },
    /// Print the saved text of a tool page
    ShowRaw { tool: String },
    /// Print the fields extracted from a saved tool page
    ShowFields {
        tool: String,
        /// Page layout without an "Added on" block
        #[arg(long)]
        no_date: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write csv/<category>.csv
    ExportCsv {
        category: String,
        #[arg(long)]
        no_date: bool,
    },
    /// Write csv/all.csv from every saved tool page
    ExportAll {
        #[arg(long)]
        no_date: bool,
    },
    /// Guess a tool identifier from its display name
    ToolSlug {
        #[arg(required = true)]
        name: Vec<String>,
    },
    /// Show collection and fetch progress
    Stats { category: Option<String> },
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

    let mut settings = Settings::load().context("Failed to load settings")?;
    if let Some(root) = cli.root {
        settings.root = root;
    }
    let store = Store::new(&settings.root);

    let result = match cli.command {
        Commands::CollectLinks { category } => {
            let fetcher = Fetcher::new(&settings)?;
            let mut listing = HttpListing::new(fetcher, &category);
            println!("Scrolling {} listing...", category);
            let collection = collector::collect(&mut listing, &settings)
                .await
                .with_context(|| format!("Failed to collect links for {}", category))?;
            store.write_category(&category, collection.tools())?;
            match &collection {
                Collection::Complete(tools) => {
                    println!("Saved {} tools to {}", tools.len(), store.category_path(&category).display());
                }
                Collection::Incomplete { tools, expected } => {
                    tracing::warn!(
                        "Collection incomplete: {} of {} tools found",
                        tools.len(),
                        expected
                    );
                    println!(
                        "Saved {} of {} tools to {} (incomplete)",
                        tools.len(),
                        expected,
                        store.category_path(&category).display()
                    );
                }
            }
            Ok(())
        }
        Commands::ListTools { category } => {
            let tools = store.read_category(&category)?;
            for tool in &tools {
                println!("{}", tool);
            }
            Ok(())
        }
        Commands::FetchOne { tool, force } => {
            let tool = utils::tool_from_url(&tool)
                .with_context(|| format!("{:?} is not a tool identifier or tool URL", tool))?;
            if store.has_raw(&tool) && !force {
                tracing::info!("{} already saved, use --force to fetch again", tool);
            } else {
                let fetcher = Fetcher::new(&settings)?;
                let text = fetcher
                    .fetch_tool(&tool)
                    .await
                    .with_context(|| format!("Failed to fetch {}", fetcher.tool_url(&tool)))?;
                store.write_raw(&tool, &text)?;
            }
            println!("{}", store.read_raw(&tool)?);
            Ok(())
        }
        Commands::FetchAll { category } => {
            let tools = store.read_category(&category)?;
            if tools.is_empty() {
                println!("No tools listed for {}. Run 'collect-links' first.", category);
                return Ok(());
            }
            let site = Arc::new(Fetcher::new(&settings)?);
            println!("Fetching {} tools of {}...", tools.len(), category);
            let stats = fetcher::fetch_all(&store, site, tools, &settings, interrupted()).await?;
            println!(
                "Done: {} fetched, {} already saved, {} failed.",
                stats.fetched,
                stats.skipped,
                stats.failures.len()
            );
            for (tool, error) in &stats.failures {
                println!("  {}: {}", tool, error);
            }
            if stats.interrupted {
                println!("Interrupted; run again to resume.");
            }
            Ok(())
        }
        Commands::ShowRaw { tool } => {
            println!("{}", store.read_raw(&tool)?);
            Ok(())
        }
        Commands::ShowFields { tool, no_date, json } => {
            let raw = store.read_raw(&tool)?;
            let extraction = parser::extract(&raw, Markers::for_layout(!no_date));
            if json {
                let value = serde_json::json!({
                    "tool": tool,
                    "status": extraction.status(),
                    "record": extraction.record(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print_fields(&extraction);
            }
            Ok(())
        }
        Commands::ExportCsv { category, no_date } => {
            let report = export::export_category(&store, &category, Markers::for_layout(!no_date))?;
            print_report(&report);
            Ok(())
        }
        Commands::ExportAll { no_date } => {
            let report = export::export_store(&store, Markers::for_layout(!no_date))?;
            print_report(&report);
            Ok(())
        }
        Commands::ToolSlug { name } => {
            println!("{}", utils::tool_to_url(&name.join(" ")));
            Ok(())
        }
        Commands::Stats { category } => print_stats(&store, category.as_deref()),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn print_fields(extraction: &Extraction) {
    println!("Status: {}", extraction.status());
    let Some(record) = extraction.record() else {
        return;
    };
    println!("Description: {}", record.description.as_deref().unwrap_or("-"));
    println!("Added on: {}", record.date.as_deref().unwrap_or("-"));
    println!("Features: {:?}", record.features);
    println!("Use cases: {:?}", record.use_cases);
    println!("Categories: {:?}", record.categories);
}

fn print_report(report: &ExportReport) {
    for (tool, reason) in &report.skipped {
        println!("Description for {} not found: {}", tool, reason);
    }
    for (tool, missing) in &report.partial {
        let names: Vec<String> = missing.iter().map(|f| f.to_string()).collect();
        println!("{} is missing {}", tool, names.join(", "));
    }
    if let Some(path) = &report.path {
        println!(
            "Wrote {} rows to {} ({} skipped, {} partial).",
            report.rows,
            path.display(),
            report.skipped.len(),
            report.partial.len()
        );
    }
}

fn print_stats(store: &Store, category: Option<&str>) -> anyhow::Result<()> {
    let categories = match category {
        Some(c) => vec![c.to_string()],
        None => store.list_categories()?,
    };

    println!("{:<32} | {:>6} | {:>7} | {:>7}", "Category", "Tools", "Fetched", "Missing");
    println!("{}", "-".repeat(61));
    for name in &categories {
        let tools = store.read_category(name)?;
        let fetched = tools.iter().filter(|t| store.has_raw(t)).count();
        println!(
            "{:<32} | {:>6} | {:>7} | {:>7}",
            truncate(name, 29),
            tools.len(),
            fetched,
            tools.len() - fetched
        );
    }

    println!(
        "\n{} categories | {} saved tool pages",
        categories.len(),
        store.list_raw_tools()?.len()
    );
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
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
