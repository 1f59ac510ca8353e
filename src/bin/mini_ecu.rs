use clap::{App, Arg};
use colored::*;
use mini_ecu::cli::UartRxIsr;
use mini_ecu::{Ecu, EcuConfig, LogLevel};
use std::io::Read;
use std::thread;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("mini-ecu")
        .version("0.1.0")
        .author("Mini ECU Team")
        .about("Simulated engine control unit with CAN telemetry and a live terminal")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("log-level")
                .short("l")
                .long("log-level")
                .value_name("LEVEL")
                .help("Minimum severity written to the terminal log")
                .takes_value(true)
                .possible_values(&["error", "warn", "info", "debug"]),
        )
        .arg(
            Arg::with_name("step-ms")
                .long("step-ms")
                .value_name("MS")
                .help("Vehicle model step and telemetry period")
                .takes_value(true)
                .validator(|v| match v.parse::<u64>() {
                    Ok(ms) if ms > 0 => Ok(()),
                    _ => Err("Step period must be a positive number of milliseconds".into()),
                }),
        )
        .arg(
            Arg::with_name("no-can-log")
                .long("no-can-log")
                .help("Start with CAN RX logging switched off"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Host diagnostics on stderr (-v info, -vv debug)"),
        )
        .get_matches();

    let max_level = match matches.occurrences_of("verbose") {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(max_level)
        .init();

    let mut config = match matches.value_of("config") {
        Some(path) => EcuConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => EcuConfig::default(),
    };
    if let Some(level) = matches.value_of("log-level") {
        config.log_level = level.parse::<LogLevel>()?;
    }
    if let Some(ms) = matches.value_of("step-ms") {
        config.step_period_ms = ms.parse()?;
    }
    if matches.is_present("no-can-log") {
        config.can_rx_logging = false;
    }

    eprintln!("{}", "Mini ECU simulator".bright_blue().bold());
    eprintln!("{} {}", "Press".dimmed(), "Ctrl+C to stop".yellow());

    let mut ecu = Ecu::new(config, std::io::stdout(), std::io::stdout())?;
    if let Some(isr) = ecu.take_uart_isr() {
        spawn_uart_reader(isr)?;
    }

    ecu.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await?;

    eprintln!("{}", "Mini ECU stopped".bright_blue());
    Ok(())
}

/// Stand-in for the UART receive interrupt: every byte read from stdin is
/// handed to the ISR side of the terminal ring.
fn spawn_uart_reader(mut isr: UartRxIsr) -> std::io::Result<()> {
    thread::Builder::new()
        .name("uart-rx".into())
        .spawn(move || {
            for byte in std::io::stdin().lock().bytes() {
                match byte {
                    Ok(b) => {
                        isr.on_byte(b);
                    }
                    Err(e) => {
                        error!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
            info!(dropped = isr.dropped(), "stdin closed");
        })?;
    Ok(())
}
