//! Noise TRNG CLI
//!
//! Command-line interface for generating values from ambient noise and
//! inspecting the generator.

use clap::{Parser, Subcommand};
use noise_trng::{
    config::{FileConfig, SourceBackend},
    QualityReport, TrueRandomGenerator,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "noise-trng", version, about = "Ambient noise true random number generator")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Noise backend, overriding the configuration file.
    #[arg(long, global = true, value_enum)]
    backend: Option<SourceBackend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print random values, one per line.
    Generate {
        /// Number of values.
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        /// Print values in [0, 1) instead of 32-bit integers.
        #[arg(long)]
        normalized: bool,
    },
    /// Generate values and print quality statistics.
    Quality {
        /// Number of values to generate first.
        #[arg(short = 'n', long, default_value_t = 1000)]
        count: usize,
    },
    /// Print the generator status.
    Status,
    /// Print values until interrupted.
    Stream {
        /// Pause between values in milliseconds.
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
    /// Serve Prometheus metrics until interrupted.
    #[cfg(feature = "metrics")]
    Serve {
        /// Port, overriding the configuration file.
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut file_config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), "{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => FileConfig::default(),
    };
    if let Some(backend) = cli.backend {
        file_config.source.backend = backend;
    }

    info!("Noise TRNG v{}", noise_trng::VERSION);

    let generator = match TrueRandomGenerator::from_file_config(&file_config) {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            error!("Failed to open generator: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(cli.command, &generator, &file_config);
    generator.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(
    command: Command,
    generator: &Arc<TrueRandomGenerator>,
    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))] file_config: &FileConfig,
) -> Result<(), String> {
    match command {
        Command::Generate { count, normalized } => {
            if normalized {
                for value in generator.normalized_sequence(count) {
                    println!("{:.10}", value);
                }
            } else {
                for value in generator.generate_sequence(count) {
                    println!("{}", value);
                }
            }
            Ok(())
        }
        Command::Quality { count } => {
            generator.generate_sequence(count);
            print_quality(&generator.quality_metrics())?;
            let stats = toml::to_string(&generator.stats()).map_err(|e| e.to_string())?;
            println!("\n[stats]\n{}", stats);
            Ok(())
        }
        Command::Status => {
            println!("source: {}", generator.describe());
            println!("status: {}", generator.status());
            println!("pool bytes: {}", generator.entropy_estimate());
            println!("queued samples: {}", generator.queue_len());
            Ok(())
        }
        Command::Stream { interval_ms } => stream(generator, Duration::from_millis(interval_ms)),
        #[cfg(feature = "metrics")]
        Command::Serve { port } => serve(Arc::clone(generator), file_config, port),
    }
}

fn print_quality(report: &QualityReport) -> Result<(), String> {
    match report {
        QualityReport::InsufficientData { sample_size } => {
            warn!(sample_size, "Not enough history for quality metrics");
            println!("status = \"insufficient_data\"\nsample_size = {}", sample_size);
        }
        QualityReport::Measured(metrics) => {
            let text = toml::to_string(metrics).map_err(|e| e.to_string())?;
            print!("{}", text);
        }
    }
    Ok(())
}

fn stream(generator: &TrueRandomGenerator, interval: Duration) -> Result<(), String> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .map_err(|e| format!("Failed to install Ctrl-C handler: {}", e))?;

    info!(source = %generator.describe(), "Streaming values, press Ctrl-C to stop");
    let mut emitted = 0u64;
    while running.load(Ordering::SeqCst) {
        println!("{}", generator.next_u32());
        emitted += 1;
        std::thread::sleep(interval);
    }

    info!(emitted, "Stream stopped");
    Ok(())
}

#[cfg(feature = "metrics")]
fn serve(
    generator: Arc<TrueRandomGenerator>,
    file_config: &FileConfig,
    port: Option<u16>,
) -> Result<(), String> {
    use noise_trng::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

    let mut server_config =
        MetricsServerConfig::from_config(&file_config.metrics).map_err(|e| e.to_string())?;
    if let Some(port) = port {
        server_config.bind_addr.set_port(port);
    }
    let registry = MetricsRegistry::new().map_err(|e| e.to_string())?;
    let server = MetricsServer::new(server_config, registry, generator);

    let runtime = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    runtime
        .block_on(server.run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        }))
        .map_err(|e| e.to_string())
}
