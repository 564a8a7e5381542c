// openio-exporter - version 0.1.0
// Prometheus exporter for gridinit-supervised processes with tracing logging

mod cli;
mod commands;
mod handlers;
mod state;

use anyhow::Context;
use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, ValueEnum};
use openio_exporter::config::{validate_effective_config, HEALTH_PATH};
use openio_exporter::{Collector, Config, ExporterMetrics, HealthStats};
use prometheus::Registry;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, signal, sync::Mutex};
use tracing::{debug, error, info, Level};

use cli::{resolve_config, Args, Commands, LogLevel};
use handlers::{health_handler, metrics_handler, root_handler};
use state::AppState;

/// Initializes tracing logging subsystem with configured log level
fn setup_logging(config: &Config) {
    let level = config
        .log_level
        .as_deref()
        .and_then(|s| LogLevel::from_str(s, true).ok())
        .unwrap_or(LogLevel::Info);

    let log_level = match level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };

    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", level);
}

/// Configures the rayon pool used for parallel stat lookups.
fn setup_parallelism(config: &Config) {
    if let Some(threads) = config.parallelism {
        if threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .unwrap_or_else(|e| error!("Failed to set rayon thread pool: {}", e));
            debug!("Rayon thread pool configured with {} threads", threads);
        }
    }
}

/// Resolves once SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// -------------------------------------------------------------------
/// MAIN APPLICATION ENTRY POINT
/// -------------------------------------------------------------------
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    if args.check_config {
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        return commands::show_config(&config, args.config_format.clone());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if !matches!(command, Commands::Config { .. }) {
            setup_logging(&config);
        }

        return match command {
            // The status command runs on the runtime, keep it off the async main
            Commands::Check => {
                let config = config.clone();
                tokio::task::spawn_blocking(move || commands::command_check(&config)).await?
            }
            Commands::Config {
                output,
                format,
                commented,
            } => commands::command_config(output.clone(), format.clone(), *commented),
            Commands::Test {
                iterations,
                verbose,
                format,
            } => {
                validate_effective_config(&config)?;
                setup_parallelism(&config);
                let (iterations, verbose, format) = (*iterations, *verbose, format.clone());
                let config = config.clone();
                tokio::task::spawn_blocking(move || {
                    commands::command_test(iterations, verbose, format, &config)
                })
                .await?
            }
        };
    }

    // Validate config before starting exporter
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&config);
    info!("Starting openio-exporter {}", env!("CARGO_PKG_VERSION"));

    setup_parallelism(&config);

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let metrics = ExporterMetrics::new(
        &registry,
        config.namespace(),
        config.enable_telemetry.unwrap_or(true),
    )
    .context("failed to register metrics")?;
    debug!("All metrics registered successfully");

    let collector = Collector::from_config(&config);
    match &config.report_file {
        Some(path) => info!("Reading status report from {}", path.display()),
        None => info!(
            "Collecting from `{} {}` (timeout {}s)",
            config.status_command(),
            config.status_args().join(" "),
            config.command_timeout().as_secs()
        ),
    }

    let state = Arc::new(AppState {
        registry,
        metrics,
        collector: Arc::new(collector),
        config: Arc::new(config.clone()),
        health_stats: Arc::new(HealthStats::new()),
        scrape_lock: Mutex::new(()),
    });

    // Configure HTTP server routes
    let bind_ip_str = config.bind_addr();
    let port = config.port();
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", bind_ip_str, port))?;

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route(config.metrics_path(), get(metrics_handler));

    // Conditionally add health endpoint
    if config.enable_health.unwrap_or(true) {
        app = app.route(HEALTH_PATH, get(health_handler));
    }

    let app = app.with_state(state);

    if config.enable_tls.unwrap_or(false) {
        // Paths are present, validate_effective_config() checked them
        let cert_path = config.tls_cert_path.clone().unwrap_or_default();
        let key_path = config.tls_key_path.clone().unwrap_or_default();

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .with_context(|| format!("failed to load TLS material {cert_path} / {key_path}"))?;

        info!(
            "openio-exporter listening on https://{}:{}{}",
            bind_ip_str,
            port,
            config.metrics_path()
        );

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
            }
        }
    } else {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!(
            "openio-exporter listening on http://{}:{}{}",
            bind_ip_str,
            port,
            config.metrics_path()
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("Server error: {}", e);
                e
            })?;
    }

    info!("openio-exporter stopped gracefully");
    Ok(())
}
