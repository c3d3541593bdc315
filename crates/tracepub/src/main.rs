//! `tracepub` reads an API-test trace log from stdin and publishes it into
//! a spreadsheet, updating existing rows and appending unknown tests.

use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracepub_common::{Dimension, Item, Location};
use tracepub_core::{Mode, PublishOptions, publish};
use tracepub_parse::TraceReader;
use tracepub_sheets::SheetsGateway;

/// Environment variable consulted before the token file.
const TOKEN_ENV: &str = "TRACEPUB_TOKEN";

#[derive(Parser, Debug)]
#[command(
    name = "tracepub",
    about = "Publish API-test traces from stdin to a spreadsheet"
)]
struct Cli {
    /// The spreadsheet id where traces are published.
    spreadsheet: String,

    /// Cell holding the first test identifier, e.g. 'Sheet1!A2'.
    first_test_location: String,

    /// Cell where the first trace message is written, e.g. 'Sheet1!D2'.
    first_msg_location: String,

    /// Cell of the first OK/NOK result, e.g. 'Sheet1!C2'.
    #[arg(long)]
    result: Option<String>,

    /// Cell of the first assertions summary, e.g. 'Sheet1!F2'.
    #[arg(long)]
    asserts: Option<String>,

    /// Also list passed assertions in the assertions column.
    #[arg(long, requires = "asserts")]
    include_passed: bool,

    /// How traces map to cells: one cell per message, per profile, or per
    /// test.
    #[arg(long, default_value = "message")]
    mode: String,

    /// Axis along which successive tests follow each other in the sheet.
    #[arg(long, value_enum, default_value = "rows")]
    dimension: DimensionArg,

    /// File holding the API bearer token; the TRACEPUB_TOKEN environment
    /// variable takes precedence.
    #[arg(long, default_value = "./sheets-token.txt")]
    token_file: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DimensionArg {
    Rows,
    Columns,
}

impl From<DimensionArg> for Dimension {
    fn from(value: DimensionArg) -> Self {
        match value {
            DimensionArg::Rows => Dimension::Rows,
            DimensionArg::Columns => Dimension::Columns,
        }
    }
}

fn location(input: &str, what: &str) -> Result<Location> {
    input
        .parse()
        .with_context(|| format!("invalid {what} '{input}'"))
}

fn lookup_token(file: &PathBuf) -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        return Ok(token.trim().to_string());
    }
    let token = std::fs::read_to_string(file)
        .with_context(|| format!("could not read token file {}", file.display()))?;
    Ok(token.trim().to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut options = PublishOptions::new(
        location(&cli.first_test_location, "first test location")?,
        location(&cli.first_msg_location, "first message location")?,
    );
    options.result_location = cli
        .result
        .as_deref()
        .map(|loc| location(loc, "result location"))
        .transpose()?;
    options.asserts_location = cli
        .asserts
        .as_deref()
        .map(|loc| location(loc, "asserts location"))
        .transpose()?;
    options.mode = cli.mode.parse::<Mode>()?;
    options.dimension = cli.dimension.into();
    options.include_passed_assertions = cli.include_passed;

    tracing::info!("reading trace log from stdin");
    let stdin = std::io::stdin();
    let items: Vec<Item> = TraceReader::new(BufReader::new(stdin.lock()))
        .collect::<Result<_, _>>()
        .context("could not parse the trace log")?;
    tracing::info!(items = items.len(), "trace log parsed");

    let token = lookup_token(&cli.token_file)?;
    let gateway = SheetsGateway::new(&cli.spreadsheet, token)?;

    let summary = publish(&gateway, items, &options)?;
    tracing::info!(
        written = summary.tests_written,
        appended = summary.tests_created,
        skipped_items = summary.items_skipped,
        "done"
    );
    Ok(())
}
