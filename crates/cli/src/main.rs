//! # gridlink-cli
//!
//! Command-line interface for listing, fetching and querying sheets and
//! reports.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gridlink_http::{Client, ClientConfig, Crud, ObjectRef, Resource, ENV_TOKEN};
use gridlink_sheet::{Aggregate, CellValue, IndexSpec, Row, RowFilter};
use indexmap::IndexMap;
use tracing_subscriber::EnvFilter;

/// gridlink - query spreadsheet API sheets and reports from the shell
#[derive(Parser)]
#[command(name = "gridlink")]
#[command(author, version, about = "Spreadsheet API client", long_about = None)]
struct Cli {
    /// API token (defaults to GRIDLINK_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// API root (defaults to GRIDLINK_API_ROOT or the public API)
    #[arg(long, global = true)]
    api_root: Option<String>,

    /// Reject unknown fields in API responses
    #[arg(long, global = true)]
    strict: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Work with sheets
    Sheets {
        #[command(subcommand)]
        action: Action,
    },
    /// Work with reports
    Reports {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand)]
enum Action {
    /// Print id and name of every object
    List,
    /// Print the rows of one object as JSON
    Get(GetArgs),
}

#[derive(Args)]
struct GetArgs {
    /// Object id or name
    #[arg(value_name = "ID|NAME")]
    target: String,

    /// Build an index over these columns (repeatable)
    #[arg(long = "index", value_name = "COL[,COL...]")]
    indexes: Vec<String>,

    /// Mark every given index unique
    #[arg(long)]
    unique: bool,

    /// Only print rows where COL equals VALUE (repeatable); quote VALUE to match text
    #[arg(long = "where", value_name = "COL=VALUE")]
    filters: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = Client::new(client_config(&cli)?).context("Failed to create API client")?;

    match &cli.command {
        Command::Sheets { action } => run(&client.sheets(), action).await,
        Command::Reports { action } => run(&client.reports(), action).await,
    }
}

/// Build the client configuration from the environment plus CLI overrides.
fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.token {
        Some(token) => ClientConfig::from_lookup(|key| {
            if key == ENV_TOKEN {
                Some(token.clone())
            } else {
                std::env::var(key).ok()
            }
        }),
        None => ClientConfig::from_env(),
    }
    .context("Failed to read client configuration")?;

    let config = match &cli.api_root {
        Some(root) => config.api_root(root),
        None => config,
    };
    let config = if cli.strict {
        config.strict_validation(true)
    } else {
        config
    };
    tracing::debug!("Using API root {}", config.api_root);
    Ok(config)
}

async fn run<R: Resource>(crud: &Crud<'_, R>, action: &Action) -> Result<()> {
    match action {
        Action::List => {
            let objects = crud
                .list()
                .await
                .with_context(|| format!("Failed to list {}s", R::KIND.to_lowercase()))?;
            for obj in objects {
                let id = obj
                    .object_id()
                    .map_or_else(|| "-".to_string(), |id| id.to_string());
                println!("{id}\t{}", obj.object_name());
            }
            Ok(())
        }
        Action::Get(args) => {
            let specs = parse_specs(&args.indexes, args.unique)?;
            let obj = crud
                .get_indexed(object_ref(&args.target), specs)
                .await
                .with_context(|| format!("Failed to fetch {} '{}'", R::KIND, args.target))?;

            let rows = if args.filters.is_empty() {
                obj.as_list()
            } else {
                let filter = parse_filter(&obj, &args.filters)?;
                obj.get_rows(&filter)
                    .context("Query failed")?
                    .into_iter()
                    .map(Row::as_mapping)
                    .collect::<Vec<IndexMap<_, _>>>()
            };
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
    }
}

/// Numeric targets are ids, everything else is a name.
fn object_ref(target: &str) -> ObjectRef<'_> {
    target
        .parse::<i64>()
        .map_or(ObjectRef::Name(target), ObjectRef::Id)
}

/// Parse `--index` values into index specs.
fn parse_specs(indexes: &[String], unique: bool) -> Result<Vec<IndexSpec>> {
    indexes
        .iter()
        .map(|columns| {
            let columns: Vec<&str> = columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .collect();
            anyhow::ensure!(!columns.is_empty(), "Empty --index value");
            Ok(IndexSpec::new(columns, unique))
        })
        .collect()
}

/// Parse `--where COL=VALUE` terms, typing each value by its column.
fn parse_filter<A: Aggregate>(aggregate: &A, terms: &[String]) -> Result<RowFilter> {
    let mut filter = RowFilter::new();
    for term in terms {
        let (title, raw) = term.split_once('=').with_context(|| {
            format!("Invalid filter format: '{term}'. Expected COL=VALUE format")
        })?;
        let column = aggregate
            .get_column(title)
            .with_context(|| format!("Unknown column in filter: '{title}'"))?;
        filter = match parse_cli_value(raw) {
            Some(value) => match &column.column_type {
                Some(column_type) => filter.with(title, value.coerce(column_type)),
                None => filter.with(title, value),
            },
            None => filter.with_empty(title),
        };
    }
    Ok(filter)
}

/// Parse a CLI value string into a cell value; `null` means an empty cell.
///
/// A value wrapped in single or double quotes is always text.
fn parse_cli_value(s: &str) -> Option<CellValue> {
    if let Some(text) = unquote(s) {
        Some(CellValue::Text(text.to_string()))
    } else if s.eq_ignore_ascii_case("null") {
        None
    } else if s.eq_ignore_ascii_case("true") {
        Some(CellValue::Bool(true))
    } else if s.eq_ignore_ascii_case("false") {
        Some(CellValue::Bool(false))
    } else if let Some(n) = plain_number(s) {
        Some(CellValue::Number(n))
    } else {
        Some(CellValue::Text(s.to_string()))
    }
}

fn unquote(s: &str) -> Option<&str> {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| s.strip_prefix(quote)?.strip_suffix(quote))
}

// Plain decimal notation only: `01234`, `1e3` and `inf` stay text.
fn plain_number(s: &str) -> Option<f64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    let plain = !int.is_empty()
        && int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
        && !(int.len() > 1 && int.starts_with('0'));
    if plain {
        s.parse().ok()
    } else {
        None
    }
}
