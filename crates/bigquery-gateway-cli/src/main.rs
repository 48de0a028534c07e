use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use bigquery_gateway::config::parse_dataset_list;
use bigquery_gateway::logging::LogContextBuilder;
use bigquery_gateway::{
    ConnectionConfig, LogContext, ParameterValue, QueryGateway, QueryParameters,
};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

const DEFAULT_LOG_FILE: &str = "bq-gateway.log";

/// Run queries against BigQuery, and inspect its tables.
#[derive(Debug, Parser)]
#[command(name = "bq-gateway", version, about, long_about = None)]
struct Cli {
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    project: String,
    #[arg(long, env = "BIGQUERY_LOCATION", default_value = "US")]
    location: String,
    /// Service account key. Ambient credentials are used when omitted.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    key_file: Option<PathBuf>,
    /// Dataset to list tables from, may be repeated.
    #[arg(long = "dataset", env = "BIGQUERY_DATASETS", value_delimiter = ',')]
    datasets: Vec<String>,
    /// Log file, appended to at debug level alongside stderr.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,
    /// Log to stderr at debug level.
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a standard SQL query, printing the rows as a JSON array.
    Query {
        sql: String,
        /// Named parameter, as `name=value` or `name:TYPE=value`
        /// (TYPE is one of STRING, INT64, FLOAT64, BOOL, DATE, TIMESTAMP, NUMERIC, JSON).
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, ParameterValue)>,
    },
    /// List every table in the configured datasets.
    Tables,
    /// Print the DDL of a table.
    Describe { table: String },
    /// Print the schema of a table.
    Schema { table: String },
}

fn parse_param(arg: &str) -> anyhow::Result<(String, ParameterValue)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected 'name=value', got '{arg}'"))?;

    let (name, ty) = match key.split_once(':') {
        Some((name, ty)) => (name, Some(ty)),
        None => (key, None),
    };

    if name.is_empty() {
        return Err(anyhow!("parameter name is empty in '{arg}'"));
    }

    let value = match ty.map(str::to_ascii_uppercase).as_deref() {
        None | Some("STRING") => ParameterValue::from(value),
        Some("INT64") => ParameterValue::Int64(value.parse()?),
        Some("FLOAT64") => ParameterValue::Float64(value.parse()?),
        Some("BOOL") => ParameterValue::Bool(value.parse()?),
        Some("DATE") => ParameterValue::Date(Box::from(value)),
        Some("TIMESTAMP") => ParameterValue::Timestamp(Box::from(value)),
        Some("NUMERIC") => ParameterValue::Numeric(Box::from(value)),
        Some("JSON") => ParameterValue::Json(serde_json::from_str(value)?),
        Some(other) => return Err(anyhow!("unsupported parameter type '{other}'")),
    };

    Ok((name.to_owned(), value))
}

fn log_context(cli: &Cli) -> LogContextBuilder {
    let console_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    LogContext::builder("bq-gateway")
        .level(console_level)
        .file_level(LevelFilter::DEBUG)
        .log_file(&cli.log_file)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log = log_context(&cli).build()?;

    let datasets = cli
        .datasets
        .iter()
        .flat_map(|dataset| parse_dataset_list(dataset))
        .map(str::to_owned);

    let config = ConnectionConfig::new(cli.project, cli.location, cli.key_file, datasets)?;
    let gateway = QueryGateway::connect(config, log).context("failed to connect to BigQuery")?;

    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::Query { sql, params } => {
            let params: QueryParameters = params.into_iter().collect();
            let result = gateway.execute_query(&sql, Some(&params))?;
            serde_json::to_writer_pretty(&mut stdout, &result.rows)?;
        }
        Command::Tables => {
            let tables = gateway.list_tables()?;
            serde_json::to_writer_pretty(&mut stdout, &tables)?;
        }
        Command::Describe { table } => {
            let result = gateway.describe_table(&table)?;
            serde_json::to_writer_pretty(&mut stdout, &result.rows)?;
        }
        Command::Schema { table } => {
            let schema = gateway.table_schema(&table)?;
            serde_json::to_writer_pretty(&mut stdout, &schema)?;
        }
    }

    writeln!(stdout)?;
    Ok(())
}
