//! jpxbrl CLI - fact extraction from EDINET / TDnet XBRL filings

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use jpxbrl::classify::find_quarter;
use jpxbrl::{
    classify, Catalog, FactRecord, FactResolver, Parser, ReportAssembler, ReportKind,
    ResolverConfig,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Fact-resolution engine for Japanese securities-report XBRL
#[derive(ClapParser)]
#[command(name = "jpxbrl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a fact record from one or more instance documents
    Extract {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Report shape (security, forecast)
        #[arg(short, long, default_value = "security")]
        report: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Account-item catalog (defaults to the built-in one)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Resolver configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show consolidation, season, quarter and context identifiers
    Classify {
        /// Input file
        input: PathBuf,

        /// Resolver configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the expanded account-item catalog
    Catalog {
        /// Catalog file (defaults to the built-in one)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Benchmark report assembly
    Bench {
        /// Input file
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "100")]
        iterations: usize,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("Failed to load catalog {}", path.display())),
        None => Catalog::builtin().context("Built-in catalog is invalid"),
    }
}

fn load_config(path: Option<&Path>) -> Result<ResolverConfig> {
    match path {
        Some(path) => ResolverConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ResolverConfig::default()),
    }
}

fn print_record(input: &Path, record: &FactRecord) {
    println!("{} {}", "✓".green().bold(), input.display());
    println!(
        "  Code: {}  Year: {}  Month: {}  Quarter: {}  Consolidated: {}",
        record.code.as_deref().unwrap_or("-"),
        record.year.map_or("-".to_string(), |y| y.to_string()),
        record.month.map_or("-".to_string(), |m| m.to_string()),
        record.quarter,
        record.consolidation
    );
    for (name, value) in &record.values {
        match value {
            Some(value) => println!("  {:<40} {}", name, value),
            None => println!("  {:<40} {}", name, "-".dimmed()),
        }
    }
    if !record.segments.is_empty() {
        println!("  Segments: {}", record.segments.len());
        for segment in &record.segments {
            println!(
                "    {:<40} sales {:>10}  operating profit {:>10}",
                segment.display_name,
                segment.sales.map_or("-".to_string(), |v| v.to_string()),
                segment.operating_profit.map_or("-".to_string(), |v| v.to_string())
            );
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Extract {
            inputs,
            report,
            json,
            catalog,
            config,
        } => {
            let kind: ReportKind = report.parse()?;
            let catalog = load_catalog(catalog.as_deref())?;
            let config = load_config(config.as_deref())?;
            let assembler = ReportAssembler::for_kind(kind, catalog, config)
                .context("Catalog does not cover the report fields")?;

            let results = assembler.assemble_files(&inputs);
            let mut failures = 0;
            let mut records = Vec::new();

            for (input, result) in inputs.iter().zip(results) {
                match result {
                    Ok(record) if json => records.push(record),
                    Ok(record) => print_record(input, &record),
                    Err(e) => {
                        failures += 1;
                        eprintln!("{} {} - {}", "✗".red().bold(), input.display(), e);
                    }
                }
            }

            if json {
                let output = match records.as_slice() {
                    [single] => serde_json::to_string_pretty(single)?,
                    many => serde_json::to_string_pretty(many)?,
                };
                println!("{}", output);
            }

            if failures > 0 {
                std::process::exit(1);
            }
        }

        Commands::Classify { input, config } => {
            let config = load_config(config.as_deref())?;
            let doc = Parser::new()
                .parse_file(&input)
                .with_context(|| format!("Failed to parse {}", input.display()))?;

            let classification = classify(&doc, &config)?;
            let contexts = classification.contexts(&config)?;
            let catalog = Catalog::builtin()?;
            let fiscal_year_end = catalog
                .get("current_fiscal_year_end_date")
                .and_then(|item| FactResolver::new(&doc, &config).resolve_unscoped(item));
            let quarter = find_quarter(&doc, &contexts, fiscal_year_end)?;

            println!("{} {}", "✓".green().bold(), input.display());
            println!(
                "  Consolidation: {} ({})",
                classification.consolidation.token(),
                contexts.consolidation_suffix
            );
            println!("  Season: {}", classification.season.token());
            println!("  Quarter: {}", quarter);
            println!("  Duration: {}", contexts.duration.join(", "));
            println!("  Prior duration: {}", contexts.prior_duration.join(", "));
            println!("  Instant: {}", contexts.instant.join(", "));
            println!("  Forecast: {}", contexts.forecast(quarter).join(", "));
            println!("  Filing date: {}", contexts.filing_date_instant.join(", "));
        }

        Commands::Catalog { catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;
            println!("{}", catalog.to_json()?);
        }

        Commands::Bench { input, iterations } => {
            let doc = Parser::new()
                .parse_file(&input)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            let assembler = ReportAssembler::for_kind(
                ReportKind::SecurityReport,
                Catalog::builtin()?,
                ResolverConfig::default(),
            )?;

            // Warmup
            for _ in 0..3 {
                let _ = assembler.assemble(&doc)?;
            }

            let mut times = Vec::with_capacity(iterations.max(1));
            let mut resolved = 0;

            for _ in 0..iterations.max(1) {
                let start = Instant::now();
                let record = assembler.assemble(&doc)?;
                times.push(start.elapsed());
                resolved = record.values.values().filter(|v| v.is_some()).count();
            }

            times.sort();
            let min = times[0];
            let max = times[times.len() - 1];
            let median = times[times.len() / 2];
            let mean = times.iter().sum::<std::time::Duration>() / times.len() as u32;

            println!("Benchmark Results for {}", input.display());
            println!("  Iterations: {}", times.len());
            println!("  Elements: {}", doc.len());
            println!("  Resolved fields: {}", resolved);
            println!("  Min:    {:.3}ms", min.as_secs_f64() * 1000.0);
            println!("  Median: {:.3}ms", median.as_secs_f64() * 1000.0);
            println!("  Mean:   {:.3}ms", mean.as_secs_f64() * 1000.0);
            println!("  Max:    {:.3}ms", max.as_secs_f64() * 1000.0);
        }
    }

    Ok(())
}
