//! rowgraph CLI - Convert flat rows into nested documents
//!
//! # Main Commands
//!
//! ```bash
//! rowgraph convert input.csv -m mapping.json     # Rows to documents (JSON array)
//! rowgraph check mapping.json                    # Validate a mapping, show its list tree
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! rowgraph parse input.csv                       # Just parse CSV to raw rows
//! rowgraph example-mapping                       # Print an example mapping
//! ```
//!
//! The mapping path may also come from `ROWGRAPH_MAPPING` (a `.env` file is read
//! at startup).

use clap::{Parser, Subcommand};
use rowgraph::{
    example_mapping, parse_json_rows, validation, Converter, Document, Mapping, Row,
    StderrSink,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rowgraph")]
#[command(about = "Assemble nested documents from flat rows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV or JSON row file into documents
    Convert {
        /// Input file (.json: array of flat objects, anything else: CSV)
        input: PathBuf,

        /// Mapping configuration file
        #[arg(short, long, env = "ROWGRAPH_MAPPING")]
        mapping: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep going when a document fails; failed documents are left out
        #[arg(long)]
        lenient: bool,

        /// Wrap each document with its root key
        #[arg(long)]
        with_keys: bool,

        /// Validate every document against this JSON Schema
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Only print warnings and errors
        #[arg(short, long)]
        quiet: bool,
    },

    /// Validate a mapping configuration
    Check {
        /// Mapping configuration file
        #[arg(env = "ROWGRAPH_MAPPING")]
        mapping: PathBuf,
    },

    /// Parse a CSV file and output raw rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show example mapping configuration
    ExampleMapping,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            mapping,
            delimiter,
            output,
            lenient,
            with_keys,
            schema,
            quiet,
        } => cmd_convert(
            &input,
            &mapping,
            delimiter,
            output.as_deref(),
            lenient,
            with_keys,
            schema.as_deref(),
            quiet,
        ),

        Commands::Check { mapping } => cmd_check(&mapping),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::ExampleMapping => cmd_example_mapping(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_convert(
    input: &Path,
    mapping_path: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
    lenient: bool,
    with_keys: bool,
    schema: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let mapping = Mapping::from_path(mapping_path)?;
    eprintln!("   Mapping: {} ({} lists)", mapping_path.display(), mapping.rules().len());

    let rows = read_rows(input, delimiter)?;
    if rows.is_empty() {
        return Err(rowgraph::ConvertError::EmptyInput.into());
    }

    let sink = StderrSink { quiet };
    let converter = Converter::new(&mapping).with_sink(&sink);

    let (documents, failed) = if lenient {
        let (outcomes, stats) = converter.convert_groups(rows);
        let documents: Vec<Document> = outcomes.into_iter().filter_map(|o| o.result.ok()).collect();
        print_stats(&stats);
        (documents, stats.failed_groups)
    } else {
        let result = converter.convert(rows)?;
        print_stats(&result.stats);
        (result.documents, 0)
    };

    if let Some(schema_path) = schema {
        let schema = validation::load_schema(schema_path)?;
        let bodies: Vec<&Value> = documents.iter().map(|d| &d.body).collect();
        let failures = validation::validate_documents(&schema, bodies)?;

        eprintln!("\n✔️  Validation:");
        if failures.is_empty() {
            eprintln!("   ✅ All {} documents valid!", documents.len());
        } else {
            eprintln!("   ❌ Invalid: {}", failures.len());
            for (i, errors) in failures.iter().take(5) {
                eprintln!("\n   Document {}:", documents[*i].label());
                for err in errors.iter().take(3) {
                    eprintln!("     - {}", err);
                }
            }
        }
    }

    let json = if with_keys {
        serde_json::to_string_pretty(&documents)?
    } else {
        let bodies: Vec<&Value> = documents.iter().map(|d| &d.body).collect();
        serde_json::to_string_pretty(&bodies)?
    };
    write_output(&json, output)?;

    if failed > 0 {
        return Err(format!("{} documents failed", failed).into());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn print_stats(stats: &rowgraph::ConvertStats) {
    eprintln!("   Rows: {} ({} without root key)", stats.rows, stats.dropped_rows);
    eprintln!("   Documents: {} of {}", stats.documents, stats.groups);
    if stats.skips > 0 {
        eprintln!("   ⚠️  {} list entries skipped for missing keys", stats.skips);
    }
    if stats.dropped_entries > 0 {
        eprintln!("   ⚠️  {} fields dropped", stats.dropped_entries);
    }
}

fn read_rows(input: &Path, delimiter: Option<char>) -> Result<Vec<Row>, Box<dyn std::error::Error>> {
    let is_json = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let content = fs::read_to_string(input)?;
        return Ok(parse_json_rows(&content)?);
    }

    let result = rowgraph::parser::parse_file(input, delimiter)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    Ok(result.rows)
}

fn cmd_check(mapping_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", mapping_path.display());

    let mapping = Mapping::from_path(mapping_path)?;
    print_hierarchy(&mapping);

    eprintln!("✅ Mapping is valid");
    Ok(())
}

fn print_hierarchy(mapping: &Mapping) {
    if !mapping.root_keys().is_empty() {
        println!("root keys: {}", mapping.root_keys().join(", "));
    }
    for rule in mapping.rules() {
        let mut depth = 0;
        let mut parent = rule.parent;
        while let Some(p) = parent {
            depth += 1;
            parent = mapping.rule(p).parent;
        }

        let keys: Vec<&str> = rule.key_fields.iter().map(|k| k.relative.as_str()).collect();
        println!(
            "{}{} [{}] {:?}{}",
            "  ".repeat(depth),
            rule.path,
            keys.join(", "),
            rule.policy,
            if rule.dedupe { "" } else { " (no dedupe)" }
        );
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = rowgraph::parser::parse_file(input, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_example_mapping() -> Result<(), Box<dyn std::error::Error>> {
    let json = example_mapping().to_json()?;
    println!("{}", json);
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
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
