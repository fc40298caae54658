//! Rateload CLI - bulk upload tax ratings from delimited text files
//!
//! # Main Commands
//!
//! ```bash
//! rateload serve                       # Start HTTP server (port 3000)
//! rateload load ratings.txt -r refs.txt  # Run the full pipeline on a file
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! rateload parse ratings.txt           # Just parse a file to JSON
//! rateload check ratings.txt -r refs.txt # Dry-run validation, no writes
//! ```

use clap::{Parser, Subcommand};
use rateload::{
    parse_file, process_upload, validate_row, InMemoryRatingStore, InMemoryReferenceData,
    UploadArchive, UploadJob, UploadState,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rateload")]
#[command(about = "Bulk upload tax ratings from pipe- or tab-delimited text files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a delimited file and output its rows as JSON
    Parse {
        /// Input text file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dry-run validation: report per-row errors without writing anything
    Check {
        /// Input text file
        input: PathBuf,

        /// Reference data seed file (kind|code|name per line)
        #[arg(short, long)]
        refs: PathBuf,
    },

    /// Full pipeline: parse, validate and create rating records
    Load {
        /// Input text file
        input: PathBuf,

        /// Reference data seed file (kind|code|name per line)
        #[arg(short, long)]
        refs: PathBuf,

        /// User recorded as the upload owner
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Skip archiving the finished job to the data directory
        #[arg(long)]
        no_archive: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Reference data seed file (kind|code|name per line)
        #[arg(short, long)]
        refs: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Check { input, refs } => cmd_check(&input, &refs),

        Commands::Load {
            input,
            refs,
            user,
            no_archive,
        } => cmd_load(&input, &refs, &user, no_archive),

        Commands::Serve { port, refs } => cmd_serve(port, refs.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let outcome = parse_file(input)?;

    eprintln!(
        "   Delimiter: '{}'",
        match outcome.delimiter {
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        }
    );
    eprintln!("   Columns: {}", outcome.headers.join(", "));
    eprintln!("✅ Parsed {} data rows", outcome.rows.len());

    let rows: Vec<serde_json::Value> = outcome
        .rows
        .iter()
        .map(|r| {
            serde_json::json!({
                "rowNumber": r.number,
                "fields": r.fields,
            })
        })
        .collect();

    let json = serde_json::to_string_pretty(&rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_check(input: &Path, refs_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", input.display());

    let refs = InMemoryReferenceData::from_seed_file(refs_path)?;
    eprintln!(
        "   Reference data: {} issuers, {} instruments",
        refs.issuer_count(),
        refs.instrument_count()
    );

    let outcome = parse_file(input)?;

    let mut valid = 0;
    let mut invalid = 0;

    for row in &outcome.rows {
        let result = validate_row(&row.fields, &refs);
        if result.is_valid() {
            valid += 1;
        } else {
            invalid += 1;
            if invalid <= 10 {
                eprintln!("\n❌ Row {} invalid:", row.number);
                for err in &result.errors {
                    eprintln!("   - {}", err);
                }
            }
        }
    }

    eprintln!("\n📊 Results: {} valid, {} invalid", valid, invalid);

    if invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_load(
    input: &Path,
    refs_path: &Path,
    user: &str,
    no_archive: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {}", input.display());

    let refs = InMemoryReferenceData::from_seed_file(refs_path)?;
    let store = InMemoryRatingStore::new();
    let bytes = fs::read(input)?;

    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.txt");
    let mut job = UploadJob::new(file_name, user);
    rateload::audit::record_created(&job);

    let results = process_upload(&mut job, &bytes, &refs, &store)?;

    eprintln!("\n📊 Upload {}", job.id);
    eprintln!("   State:        {}", job.state);
    eprintln!("   Total rows:   {}", job.total_rows);
    eprintln!("   OK:           {}", job.ok_count);
    eprintln!("   Errors:       {}", job.error_count);
    eprintln!("   Success rate: {}%", job.success_rate());

    if !job.error_summary.is_empty() {
        eprintln!("\n❌ Errors:");
        for (row, message) in job.error_summary.iter().take(10) {
            eprintln!("   Row {}: {}", row, message);
        }
        if job.error_summary.len() > 10 {
            eprintln!("   ... and {} more", job.error_summary.len() - 10);
        }
    }

    let failed = job.state == UploadState::Error;

    if !no_archive {
        let mut archive = UploadArchive::new();
        archive.save(job, results)?;
        eprintln!("\n💾 Archived");
    }

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

async fn cmd_serve(port: u16, refs_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let refs = match refs_path {
        Some(path) => {
            let refs = InMemoryReferenceData::from_seed_file(path)?;
            eprintln!(
                "📇 Reference data: {} issuers, {} instruments",
                refs.issuer_count(),
                refs.instrument_count()
            );
            refs
        }
        None => {
            eprintln!("⚠️  No reference data seed given: every row will fail issuer/instrument checks");
            InMemoryReferenceData::new()
        }
    };

    let state = Arc::new(rateload::server::AppState::new(
        Arc::new(refs),
        Arc::new(InMemoryRatingStore::new()),
    ));

    rateload::server::start_server(port, state).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
