mod analyst;
mod db;
mod extractor;
mod finnhub;

use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};

const DEFAULT_SYMBOLS: &str = "AAPL,MSFT,GOOGL";

#[derive(Parser)]
#[command(
    name = "company_insights",
    about = "Fetch company financials, generate analyst narratives, extract insight cards"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Fetch annual financials from Finnhub
    Fetch {
        /// Comma-separated stock symbols
        #[arg(short, long, default_value = DEFAULT_SYMBOLS)]
        symbols: String,
    },
    /// Generate analyst narratives for companies that lack one
    Analyze {
        /// Max companies to analyze (default: all pending)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract categorized insight items from stored narratives
    Extract {
        /// Max narratives to extract (default: all pending)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Fetch + analyze + extract in one pipeline
    Run {
        /// Comma-separated stock symbols
        #[arg(short, long, default_value = DEFAULT_SYMBOLS)]
        symbols: String,
    },
    /// Print company cards with financials and categorized lists
    Show {
        /// Single symbol to display (default: all)
        #[arg(short, long)]
        symbol: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show pipeline statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            println!("Schema ready.");
            Ok(())
        }
        Commands::Fetch { symbols } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let count = fetch_symbols(&conn, &symbols).await?;
            println!("Saved financials for {} companies.", count);
            Ok(())
        }
        Commands::Analyze { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pending = db::fetch_unanalyzed(&conn, limit)?;
            if pending.is_empty() {
                println!("No companies awaiting analysis. Run 'fetch' first.");
                return Ok(());
            }
            println!("Generating narratives for {} companies...", pending.len());
            let stats = analyst::analyze_streaming(&conn, pending).await?;
            println!(
                "Done: {} narratives ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Extract { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pending = db::fetch_unextracted(&conn, limit)?;
            if pending.is_empty() {
                println!("No narratives awaiting extraction. Run 'analyze' first.");
                return Ok(());
            }
            println!("Extracting {} narratives...", pending.len());
            let counts = extract_narratives(&conn, &pending)?;
            counts.print();
            Ok(())
        }
        Commands::Run { symbols } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;

            // Phase 1: financials
            let count = fetch_symbols(&conn, &symbols).await?;
            println!("Saved financials for {} companies.", count);

            // Phase 2: narratives
            let pending = db::fetch_unanalyzed(&conn, None)?;
            if !pending.is_empty() {
                println!("Generating narratives for {} companies...", pending.len());
                let stats = analyst::analyze_streaming(&conn, pending).await?;
                println!(
                    "Generated {} narratives ({} ok, {} errors).",
                    stats.total, stats.ok, stats.errors
                );
            }

            // Phase 3: extraction
            let unextracted = db::fetch_unextracted(&conn, None)?;
            if unextracted.is_empty() {
                println!("Nothing to extract (all narratives failed or already done).");
                return Ok(());
            }
            println!("Extracting {} narratives...", unextracted.len());
            let counts = extract_narratives(&conn, &unextracted)?;
            counts.print();
            Ok(())
        }
        Commands::Show { symbol, json } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let cards = db::fetch_cards(&conn, symbol.as_deref())?;
            if cards.is_empty() {
                println!("No companies found.");
                return Ok(());
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&cards)?);
            } else {
                for card in &cards {
                    print_card(card);
                }
                println!("{} companies", cards.len());
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Companies:  {}", s.companies);
            println!("Narratives: {}", s.narratives);
            println!("Errors:     {}", s.errors);
            println!("Extracted:  {}", s.extracted);
            println!("Items:      {}", s.items);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn fetch_symbols(conn: &rusqlite::Connection, symbols: &str) -> Result<usize> {
    let api_key = std::env::var("FINNHUB_API_KEY")
        .map_err(|_| anyhow::anyhow!("FINNHUB_API_KEY environment variable must be set"))?;
    let client = reqwest::Client::new();

    let mut count = 0;
    for symbol in symbols.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(facts) = finnhub::fetch_financials(&client, &api_key, symbol).await? {
            db::upsert_company(conn, &facts)?;
            count += 1;
        }
    }
    Ok(count)
}

struct ExtractCounts {
    companies: usize,
    insights: usize,
    recommendations: usize,
    next_steps: usize,
}

impl ExtractCounts {
    fn print(&self) {
        println!(
            "Saved {} companies: {} insights, {} recommendations, {} next steps.",
            self.companies, self.insights, self.recommendations, self.next_steps,
        );
    }
}

fn extract_narratives(
    conn: &rusqlite::Connection,
    narratives: &[db::StoredNarrative],
) -> Result<ExtractCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(narratives.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ExtractCounts {
        companies: 0,
        insights: 0,
        recommendations: 0,
        next_steps: 0,
    };

    for chunk in narratives.chunks(500) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|n| {
                let result = extractor::extract(&n.symbol, n.narrative.as_deref());
                (n.company_id, result)
            })
            .collect();

        let mut rows = Vec::new();
        for (company_id, result) in results {
            counts.companies += 1;
            counts.insights += result.insights.len();
            counts.recommendations += result.recommendations.len();
            counts.next_steps += result.next_steps.len();
            push_items(&mut rows, company_id, "insight", result.insights);
            push_items(&mut rows, company_id, "recommendation", result.recommendations);
            push_items(&mut rows, company_id, "next_step", result.next_steps);
        }

        db::save_insight_items(conn, &rows)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn push_items(
    rows: &mut Vec<db::InsightItemRow>,
    company_id: i64,
    category: &'static str,
    items: Vec<String>,
) {
    for (position, item) in items.into_iter().enumerate() {
        rows.push(db::InsightItemRow {
            company_id,
            category,
            position: position as i64,
            item,
        });
    }
}

fn print_card(card: &db::Card) {
    println!("\n{} (FY{})", card.facts.symbol, fiscal_year_label(card));
    println!("  Revenue:     {}", format_usd(card.facts.revenue));
    println!("  Net Income:  {}", format_usd(card.facts.net_income));
    println!("  Assets:      {}", format_usd(card.facts.assets));
    println!("  Liabilities: {}", format_usd(card.facts.liabilities));

    print_list("Key Insights", &card.insights, false);
    print_list("Recommendations", &card.recommendations, true);
    print_list("Next Steps", &card.next_steps, false);
}

fn fiscal_year_label(card: &db::Card) -> String {
    card.facts
        .fiscal_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_list(heading: &str, items: &[String], numbered: bool) {
    println!("  {}:", heading);
    for (i, item) in items.iter().enumerate() {
        if numbered {
            println!("    {}. {}", i + 1, item);
        } else {
            println!("    - {}", item);
        }
    }
}

/// "$383,285,000,000", or "N/A" for a metric the filing did not report.
fn format_usd(amount: Option<i64>) -> String {
    let Some(amount) = amount else {
        return "N/A".to_string();
    };
    let (sign, magnitude) = if amount < 0 {
        ("-", amount.unsigned_abs())
    } else {
        ("", amount.unsigned_abs())
    };

    let digits = magnitude.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}${}", sign, grouped)
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

// ── Tests ──
