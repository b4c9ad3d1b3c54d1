//! rowlink CLI
//!
//! Inspects tables the way rowlink sees them and runs the simple
//! operations that need no record type.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rowlink::{Aggregate, AggregateOp, Client, ClientOptions, ConnectionConfig, DeleteOutcome, TableMetadata};

/// Inspect and operate on MySQL tables through rowlink.
#[derive(Parser)]
#[command(name = "rowlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server host.
    #[arg(long, env = "ROWLINK_HOST", default_value = "localhost")]
    host: String,

    /// Server port.
    #[arg(long, env = "ROWLINK_PORT", default_value_t = rowlink::config::DEFAULT_PORT)]
    port: u16,

    /// Database (schema) name.
    #[arg(short, long, env = "ROWLINK_DATABASE")]
    database: String,

    /// User name.
    #[arg(short, long, env = "ROWLINK_USER")]
    user: String,

    /// Password.
    #[arg(long, env = "ROWLINK_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the discovered metadata of a table.
    Describe {
        /// Table name.
        table: String,

        /// Print JSON instead of a listing.
        #[arg(long)]
        json: bool,
    },

    /// Run COUNT, SUM, AVG, MIN or MAX over a column.
    Aggregate {
        /// Table name.
        table: String,

        /// Aggregate function.
        #[arg(short, long, default_value = "count")]
        op: AggregateOp,

        /// Column (defaults to the primary key).
        #[arg(short, long)]
        column: Option<String>,

        /// Raw `where` fragment.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Delete the rows matching a filter.
    Delete {
        /// Table name.
        table: String,

        /// Raw `where` fragment.
        #[arg(short, long)]
        filter: String,
    },

    /// Create a table from alternating column names and definitions.
    CreateTable {
        /// Table name.
        table: String,

        /// Column name, definition, column name, definition, ...
        #[arg(required = true, num_args = 2..)]
        definitions: Vec<String>,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        table: String,
    },
}

#[derive(Serialize)]
struct ColumnView<'a> {
    name: &'a str,
    declared_type: &'a str,
    normalized_type: Option<&'a str>,
    nullable: bool,
    key: &'a str,
    default: Option<&'a str>,
    extra: &'a str,
    updatable: bool,
}

#[derive(Serialize)]
struct TableView<'a> {
    database: &'a str,
    table: &'a str,
    primary_key: &'a str,
    columns: Vec<ColumnView<'a>>,
}

impl<'a> From<&'a TableMetadata> for TableView<'a> {
    fn from(meta: &'a TableMetadata) -> Self {
        Self {
            database: &meta.database,
            table: &meta.table,
            primary_key: &meta.primary_key,
            columns: meta
                .columns
                .iter()
                .map(|c| ColumnView {
                    name: &c.name,
                    declared_type: &c.declared_type,
                    normalized_type: meta.column_type(&c.name),
                    nullable: c.nullable,
                    key: &c.key_role,
                    default: c.default_expression.as_deref(),
                    extra: &c.extra,
                    updatable: meta.is_updatable(&c.name),
                })
                .collect(),
        }
    }
}

fn print_table(view: &TableView<'_>) {
    println!("\n{}.{} (primary key: {})", view.database, view.table, view.primary_key);
    println!("{:-<72}", "");
    for column in &view.columns {
        println!(
            " {} {:<24} {:<20} {:<4} {}",
            if column.updatable { "[W]" } else { "[ ]" },
            column.name,
            column.declared_type,
            column.key,
            column.extra
        );
    }
    println!();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ConnectionConfig::new(cli.host, cli.port, cli.database, cli.user, cli.password);
    let driver = rowlink_mysql::connect(&config)
        .with_context(|| format!("connecting to {}:{}", config.host, config.port))?;
    let client = Client::with_options(
        config,
        Some(std::sync::Arc::new(driver)),
        ClientOptions {
            workers: 1,
            ..ClientOptions::default()
        },
    );

    match cli.command {
        Commands::Describe { table, json } => {
            let meta = client.table(&table).metadata()?;
            let view = TableView::from(meta.as_ref());
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_table(&view);
            }
        }

        Commands::Aggregate {
            table,
            op,
            column,
            filter,
        } => {
            let value = client
                .table(&table)
                .aggregate(&Aggregate::new(op, column), filter.as_deref())?;
            println!("{value}");
        }

        Commands::Delete { table, filter } => match client.table(&table).delete(&filter)? {
            DeleteOutcome::Deleted(n) => info!("Deleted {n} row(s) from {table}."),
            DeleteOutcome::NoEffect => info!("No row of {table} matched."),
        },

        Commands::CreateTable { table, definitions } => {
            let definitions: Vec<&str> = definitions.iter().map(String::as_str).collect();
            client.create_table(&table, &definitions)?;
            info!("Created table {table}.");
        }

        Commands::DropTable { table } => {
            client.drop_table(&table)?;
            info!("Dropped table {table}.");
        }
    }

    Ok(())
}
