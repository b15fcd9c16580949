use clap::{Parser, Subcommand, ValueEnum};
use perfboard::config::{DashboardConfig, PeriodSource};
use perfboard::dashboard::Dashboard;
use perfboard::table_print::{print_period_tables, print_table};
use perfboard::{Dimension, PerfError, Selection};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "perfboard")]
#[command(about = "Compare employee performance across monthly extracts", long_about = None)]
struct Cli {
    /// Period extract as NAME=PATH, earliest first (repeat for each month)
    #[arg(long = "period", global = true)]
    periods: Vec<String>,
    /// Unnamed extracts, earliest first; named June, July, August
    #[arg(long = "file", global = true, conflicts_with = "periods")]
    files: Vec<PathBuf>,
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Rows above the header in each extract
    #[arg(long, global = true)]
    header_offset: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the values a dimension can be filtered by
    Options {
        #[arg(long, value_enum)]
        dimension: Dimension,
    },
    /// Show the selected employees side by side across periods
    Compare {
        #[arg(long, value_enum)]
        dimension: Dimension,
        /// Chosen value (an employee code for the agent dimension)
        #[arg(long = "value", required = true)]
        values: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// One table per period instead of the merged view
        #[arg(long)]
        by_period: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

fn build_config(cli: &Cli) -> Result<DashboardConfig, PerfError> {
    let mut config = match &cli.config {
        Some(path) => {
            dotenv::dotenv().ok();
            let mut config = DashboardConfig::from_file(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            config
        }
        None => DashboardConfig::from_env()?,
    };
    if !cli.periods.is_empty() {
        config.periods = cli
            .periods
            .iter()
            .map(|spec| PeriodSource::parse(spec))
            .collect::<Result<_, _>>()?;
    } else if !cli.files.is_empty() {
        config.periods = PeriodSource::with_default_names(&cli.files)?;
    }
    if let Some(offset) = cli.header_offset {
        config.header_offset = offset;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), PerfError> {
    let config = build_config(&cli)?;
    let mut dashboard = Dashboard::new(config)?;

    match cli.command {
        Commands::Options { dimension } => {
            for value in dashboard.options(dimension)? {
                println!("{}", value);
            }
        }
        Commands::Compare {
            dimension,
            values,
            format,
            by_period,
        } => {
            let selection = Selection::parse(dimension, &values);
            if by_period {
                let tables = dashboard.compare_by_period(&selection)?;
                if tables.is_empty() {
                    println!("No data found for this selection.");
                } else if format == OutputFormat::Json {
                    let by_name: serde_json::Map<String, serde_json::Value> = tables
                        .iter()
                        .map(|t| (t.period.clone(), t.table.to_json()))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&by_name)?);
                } else if format == OutputFormat::Csv {
                    for t in &tables {
                        println!("# {}", t.period);
                        t.table.write_csv(std::io::stdout())?;
                    }
                } else {
                    print_period_tables(&tables);
                }
                return Ok(());
            }

            match dashboard.compare(&selection)? {
                None => println!("No data found for this selection."),
                Some(table) => match format {
                    OutputFormat::Table => print_table(&table),
                    OutputFormat::Csv => table.write_csv(std::io::stdout())?,
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table.to_json())?),
                },
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    perfboard::init_tracing("perfboard");
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(schema_fault = e.is_schema_fault(), "{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
