extern crate clap;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colored::Colorize;
use log::debug;
use speedtest_cli::display_mode::DisplayMode;
use speedtest_cli::errors::{format_error_for_display, ErrorKind, SpeedTestError};
use speedtest_cli::measurements::MeasurementResult;
use speedtest_cli::progress::{Dots, ProgressCallback, Silent};
use speedtest_cli::results::{BandwidthResults, ClientSummary, ServerSummary, SpeedTestResults};
use speedtest_cli::speedtest::client::Client;
use speedtest_cli::speedtest::error::FetchError;
use speedtest_cli::speedtest::servers::Server;
use speedtest_cli::speedtest::tests::engine::ThroughputEngine;
use speedtest_cli::speedtest::tests::latency::{
    measure_latencies, measure_latency, DEFAULT_ERROR_LATENCY,
    DEFAULT_LATENCY_MEASURE_TIMES,
};
use speedtest_cli::speedtest::transport::TransportOptions;
use std::io::IsTerminal;
use std::net::IpAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

/// Servers probed for latency when none is chosen explicitly.
const AUTO_SELECT_CANDIDATES: usize = 5;

#[derive(Parser)]
#[command(author, version = env!("SPEEDTEST_VERSION"), about, long_about = None)]
struct Cli {
    /// Print the available servers, closest first, and exit
    #[arg(long)]
    list: bool,

    /// Test against this server id instead of picking the fastest nearby
    #[arg(long, value_name = "ID")]
    server: Option<u64>,

    /// Use HTTPS for speedtest.net endpoints
    #[arg(long)]
    secure: bool,

    /// Local address to bind outgoing connections to
    #[arg(long, value_name = "IP")]
    source: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    timeout: u64,

    /// Only print ping, download and upload figures
    #[arg(long)]
    simple: bool,

    /// Do not draw progress dots
    #[arg(long)]
    no_progress: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[tokio::main]
async fn main() {
    let cli: Cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    if let Err(error) = run(&cli).await {
        eprintln!("{}", format_error_for_display(&error));
        process::exit(error.exit_code());
    }
}

async fn run(cli: &Cli) -> Result<(), SpeedTestError> {
    let mode = DisplayMode::detect(cli.json, cli.simple);
    let client = Client::with_options(&transport_options(cli)?)?;

    if cli.list {
        let servers = client.servers().await?;
        if mode == DisplayMode::Json {
            print_json(servers.as_ref())?;
        } else {
            print!("{}", servers);
        }
        return Ok(());
    }

    let config = client.config().await?;
    if mode == DisplayMode::Full {
        println!(
            "{} {} {}",
            "Testing from".bold().white(),
            config.client.isp.bright_blue(),
            format!("({})", config.client.ip).bright_blue()
        );
        if cli.server.is_none() {
            println!("Selecting best server based on ping...");
        }
    }

    let server = select_server(&client, cli.server).await?;
    let latency_ms = server.latency_millis().unwrap_or_default();

    match mode {
        DisplayMode::Full => println!(
            "{} {} ({}) [{:.2} km]: {} ms",
            "Hosted by".bold().white(),
            server.sponsor.bright_blue(),
            server.name,
            server.distance_km,
            latency_ms
        ),
        DisplayMode::Simple => println!("Ping: {} ms", latency_ms),
        DisplayMode::Json => {}
    }

    let progress: Arc<dyn ProgressCallback> =
        if mode.shows_progress(cli.no_progress, std::io::stdout().is_terminal()) {
            Arc::new(Dots)
        } else {
            Arc::new(Silent)
        };
    let engine = ThroughputEngine::new(client.transport()).with_progress(progress);

    let download = engine.download(&server).await;
    print_speed(mode, "Download", &download);

    let upload = engine.upload(&server).await;
    print_speed(mode, "Upload", &upload);

    if mode == DisplayMode::Json {
        let results = SpeedTestResults::new(
            ClientSummary::from(&config.client),
            ServerSummary::from(&server),
            BandwidthResults::from(&download),
            BandwidthResults::from(&upload),
        );
        print_json(&results)?;
    }

    Ok(())
}

fn transport_options(cli: &Cli) -> Result<TransportOptions, SpeedTestError> {
    let source = match &cli.source {
        Some(source) => Some(source.parse::<IpAddr>().map_err(|e| {
            SpeedTestError::config(format!("invalid source address `{}`", source))
                .with_source(e)
        })?),
        None => None,
    };

    Ok(TransportOptions {
        secure: cli.secure,
        source,
        timeout: Duration::from_secs(cli.timeout),
    })
}

/// The forced server with its latency measured, or the lowest latency server
/// among the closest few.
async fn select_server(
    client: &Client,
    forced: Option<u64>,
) -> Result<Server, SpeedTestError> {
    let transport = client.transport();

    if let Some(id) = forced {
        let mut server = client.find_server(id).await?;
        let latency = measure_latency(
            &server,
            transport.as_ref(),
            DEFAULT_LATENCY_MEASURE_TIMES,
            DEFAULT_ERROR_LATENCY,
        )
        .await;
        server.latency = Some(latency);
        return Ok(server);
    }

    let candidates = client.closest_servers(AUTO_SELECT_CANDIDATES).await?;
    debug!("Probing {} candidate servers", candidates.len());

    let ranked = measure_latencies(
        &candidates,
        transport.as_ref(),
        DEFAULT_LATENCY_MEASURE_TIMES,
        DEFAULT_ERROR_LATENCY,
    )
    .await;

    ranked
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::NoServersAvailable.into())
}

fn print_speed(mode: DisplayMode, label: &str, result: &MeasurementResult) {
    let speed = format!("{:.2} Mbit/s", result.megabits_per_second());

    match mode {
        DisplayMode::Full => println!(
            "{} {}",
            format!("{}:", label).bold().white(),
            speed.bright_cyan()
        ),
        DisplayMode::Simple => println!("{}: {}", label, speed),
        DisplayMode::Json => {}
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), SpeedTestError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        SpeedTestError::new(ErrorKind::Unknown, "failed to encode results").with_source(e)
    })?;
    println!("{}", json);
    Ok(())
}
