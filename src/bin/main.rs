//! analytics-export CLI - Export a sessions-per-country report
//!
//! Usage:
//!   analytics-export run --start <date> --end <date> [file|db ...]
//!   analytics-export check-config
//!
//! Examples:
//!   analytics-export run --start 2023-01-01 --end 2023-01-31 file --format csv --path sessions.csv
//!   analytics-export run --start 2023-01-01 --end 2023-01-31 db --engine sqlite --db-name ga.db
//!   analytics-export --config prod.toml run --start 2023-01-01 --end 2023-01-31

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use analytics_export::auth::provider_from_settings;
use analytics_export::config::{
    DatabaseConfig, Destination, Engine, Settings, DEFAULT_CONNECT_TIMEOUT,
};
use analytics_export::report::ReportClient;
use analytics_export::{DateRange, Error, FileFormat, Pipeline};

#[derive(Parser)]
#[command(name = "analytics-export")]
#[command(about = "Export a sessions-per-country analytics report to a file or database")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ANALYTICS_EXPORT_CONFIG, ./analytics-export.toml,
    /// then ~/.config/analytics-export/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the report and write it to the destination
    Run {
        /// First day of the report (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day of the report, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Destination; the config file's [destination] when omitted
        #[command(subcommand)]
        destination: Option<DestinationArg>,
    },

    /// Validate the configuration and print the resolved destination
    CheckConfig,
}

#[derive(Subcommand)]
enum DestinationArg {
    /// Write a JSON or CSV file
    File {
        /// Output format: json (raw response) or csv (country, sessions)
        #[arg(short, long)]
        format: String,

        /// Output path
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Append rows to the analytics_data table
    Db {
        /// Database engine: sqlite, mysql or postgresql
        #[arg(short, long)]
        engine: String,

        /// Database name (file path for sqlite)
        #[arg(long)]
        db_name: String,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(short, long)]
        user: Option<String>,

        /// Password (or set ANALYTICS_EXPORT_DB_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
}

impl DestinationArg {
    fn resolve(self) -> Result<Destination, Error> {
        match self {
            DestinationArg::File { format, path } => {
                let format: FileFormat = format.parse()?;
                Ok(Destination::File { format, path })
            }
            DestinationArg::Db {
                engine,
                db_name,
                host,
                port,
                user,
                password,
            } => {
                let engine: Engine = engine.parse()?;
                let config = DatabaseConfig {
                    engine,
                    host,
                    port,
                    user,
                    password,
                    db_name,
                    connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                }
                .with_env_password();
                config.validate()?;
                Ok(Destination::Database(config))
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run {
            start,
            end,
            destination,
        } => cmd_run(&settings, &start, &end, destination),
        Commands::CheckConfig => cmd_check_config(&settings),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "analytics_export=info",
        1 => "analytics_export=debug",
        _ => "analytics_export=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_settings(path: Option<&std::path::Path>) -> Result<Settings, Error> {
    let settings = match path {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    Ok(settings)
}

fn resolve_destination(
    settings: &Settings,
    arg: Option<DestinationArg>,
) -> Result<Destination, Error> {
    match arg {
        Some(arg) => arg.resolve(),
        None => settings.destination()?.ok_or_else(|| {
            Error::config("no destination: pass `file` or `db`, or add a [destination] section")
        }),
    }
}

fn prepare_run(
    settings: &Settings,
    start: &str,
    end: &str,
    arg: Option<DestinationArg>,
) -> Result<(DateRange, Pipeline), Error> {
    let range = DateRange::parse(start, end)?;
    let destination = resolve_destination(settings, arg)?;
    let provider = provider_from_settings(&settings.report)?;
    let client = ReportClient::from_settings(&settings.report)?;
    Ok((range, Pipeline::new(provider, Box::new(client), destination)))
}

fn cmd_run(settings: &Settings, start: &str, end: &str, arg: Option<DestinationArg>) -> ExitCode {
    let (range, pipeline) = match prepare_run(settings, start, end, arg) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(pipeline.run(&range)) {
        Ok(summary) => {
            println!(
                "Data successfully saved to {} ({} records)",
                summary.destination, summary.records
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn check_config(settings: &Settings) -> Result<Option<Destination>, Error> {
    settings.report.resolved_view_id()?;
    settings.report.timeout()?;
    provider_from_settings(&settings.report)?;
    Ok(settings.destination()?)
}

fn cmd_check_config(settings: &Settings) -> ExitCode {
    match check_config(settings) {
        Ok(destination) => {
            println!("view id:     {}", settings.report.view_id.as_deref().unwrap_or_default());
            println!("endpoint:    {}", settings.report.endpoint);
            match destination {
                Some(destination) => println!("destination: {}", destination),
                None => println!("destination: (none, pass `file` or `db` to `run`)"),
            }
            println!("Configuration OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            ExitCode::FAILURE
        }
    }
}
