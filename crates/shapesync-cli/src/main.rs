//! shapesync CLI - stream data points into MySQL/MariaDB.

use clap::{Parser, Subcommand};
use serde::Serialize;
use shapesync::subscriber::{ReceiveResponse, RecordedStatement};
use shapesync::{Config, DataPoint, DryRunStore, Subscriber, SyncError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "shapesync")]
#[command(about = "Keep a MySQL/MariaDB schema in sync with incoming data points")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream JSON-lines data points into the target database
    Receive {
        /// Input file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },

    /// List the shapes of the tables already in the target
    Discover,

    /// Test the target database connection
    HealthCheck,

    /// Print the SQL a data-point stream would execute, without connecting
    Render {
        /// Input file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },
}

/// Totals for a processed data-point stream.
#[derive(Debug, Default, Serialize)]
struct StreamSummary {
    records: u64,
    migration_statements: u64,
    upserts: u64,
    rows_affected: u64,
    duration_seconds: f64,
}

impl StreamSummary {
    fn add(&mut self, response: &ReceiveResponse) {
        self.records += 1;
        self.migration_statements += response.migration_statements as u64;
        if let Some(rows) = response.rows_affected {
            self.upserts += 1;
            self.rows_affected += rows;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), SyncError> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format);

    // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
    let cancel_token = setup_signal_handler()?;

    match cli.command {
        Commands::Receive { ref input } => {
            let config = load_config(&cli)?;
            let subscriber = Subscriber::new();
            let init = subscriber.init(&config).await?;
            info!("{}", init.message);

            let result = stream_data_points(&subscriber, input, &cancel_token, |_| {}).await;
            subscriber.dispose().await;
            let summary = result?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("\nReceive completed!");
                println!("  Records: {}", summary.records);
                println!("  Migration statements: {}", summary.migration_statements);
                println!("  Upserts: {}", summary.upserts);
                println!("  Rows affected: {}", summary.rows_affected);
                println!("  Duration: {:.2}s", summary.duration_seconds);
            }
        }

        Commands::Discover => {
            let config = load_config(&cli)?;
            let subscriber = Subscriber::new();
            subscriber.init(&config).await?;
            let discovered = subscriber.discover_shapes().await;
            subscriber.dispose().await;
            let discovered = discovered?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&discovered)?);
            } else {
                println!("Discovered {} shapes:", discovered.shapes.len());
                for shape in &discovered.shapes {
                    println!(
                        "  {} ({} properties, keys: {})",
                        shape.entity_key,
                        shape.properties.len(),
                        shape.keys.join(", ")
                    );
                }
            }
        }

        Commands::HealthCheck => {
            let config = load_config(&cli)?;
            let start = Instant::now();
            let response = Subscriber::test_connection(&config).await?;
            let latency_ms = start.elapsed().as_millis();

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("Health Check Results:");
                println!("  Target (MySQL): OK ({}ms)", latency_ms);
                println!("    {}", response.message);
            }
        }

        Commands::Render { input } => {
            let store = Arc::new(DryRunStore::new());
            let subscriber = Subscriber::new();
            subscriber.attach(store.clone()).await?;

            let mut rendered: Vec<RecordedStatement> = Vec::new();
            let output_json = cli.output_json;
            let summary = stream_data_points(&subscriber, &input, &cancel_token, |_| {
                for statement in store.take() {
                    if output_json {
                        rendered.push(statement);
                    } else {
                        print_statement(&statement);
                    }
                }
            })
            .await?;

            if output_json {
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else {
                println!(
                    "-- {} records, {} migration statements, {} upserts",
                    summary.records, summary.migration_statements, summary.upserts
                );
            }
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, SyncError> {
    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);
    Ok(config)
}

fn print_statement(statement: &RecordedStatement) {
    println!("{}", statement.sql);
    if !statement.params.is_empty() {
        let params = serde_json::to_string(&statement.params).unwrap_or_default();
        println!("-- params: {}", params);
    }
    println!();
}

type InputLines = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

async fn open_input(input: &str) -> Result<InputLines, SyncError> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if input == "-" {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        Box::new(BufReader::new(tokio::fs::File::open(input).await?))
    };
    Ok(reader.lines())
}

/// Feed every JSON line of the input through the subscriber, in order.
///
/// Stops at the first failing record. Cancellation is checked between records.
async fn stream_data_points(
    subscriber: &Subscriber,
    input: &str,
    cancel: &CancellationToken,
    mut on_record: impl FnMut(&ReceiveResponse),
) -> Result<StreamSummary, SyncError> {
    let start = Instant::now();
    let mut lines = open_input(input).await?;
    let mut summary = StreamSummary::default();
    let mut line_no = 0u64;

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        line_no += 1;

        if line.trim().is_empty() {
            continue;
        }

        let dp = DataPoint::from_json(&line).map_err(|e| {
            error!("Invalid data point on line {}", line_no);
            e
        })?;

        let response = subscriber.receive_data_point(&dp).await.map_err(|e| {
            error!("Data point on line {} for {} failed", line_no, dp.entity_key());
            e
        })?;

        summary.add(&response);
        on_record(&response);
    }

    summary.duration_seconds = start.elapsed().as_secs_f64();
    Ok(summary)
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout carries only results
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, SyncError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Stopping after the current record..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Stopping after the current record..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, SyncError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping after the current record...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
