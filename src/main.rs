//! hsk-link - packet link to housekeeping boards over serial
//!
//! Usage:
//!   hsk-link                          Ping all boards and monitor traffic
//!   hsk-link send --dst 3 --cmd 2     Send one packet and show replies
//!   hsk-link ports                    List serial ports
//!   hsk-link init-config [PATH]       Write a default config file

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use hsk_link::config::{self, Config};
use hsk_link::error::{Error, PacketError, Result};
use hsk_link::logging;
use hsk_link::protocol::{Dispatcher, Packet};
use hsk_link::session::{Event, Session};
use hsk_link::transport::SerialTransport;
use hsk_link::ConsoleHandler;
use serialport::SerialPortType;
use std::error::Error as _;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        config: config_file,
        port,
        baud,
        command,
        ..
    } = cli;

    match command.unwrap_or(Command::Monitor) {
        Command::Ports => {
            list_ports();
            Ok(())
        }
        Command::InitConfig { path } => init_config(path),
        Command::Monitor => {
            let config = load_config(config_file, port, baud)?;
            run_link(config, None, None)
        }
        Command::Send {
            dst,
            cmd,
            payload,
            checksum,
            listen_ms,
        } => {
            let config = load_config(config_file, port, baud)?;
            let mut packet = Packet::new(dst, config.link.local_address, cmd, payload)?;
            if let Some(checksum) = checksum {
                packet = packet.with_checksum(checksum);
            }
            run_link(config, Some(packet), Some(Duration::from_millis(listen_ms)))
        }
    }
}

/// Load the config file and apply command-line overrides
fn load_config(path: Option<PathBuf>, port: Option<String>, baud: Option<u32>) -> Result<Config> {
    let mut config = config::load(path.as_deref())?;
    if let Some(port) = port {
        config.serial.port = port;
    }
    if let Some(baud) = baud {
        config.serial.baud_rate = baud;
    }
    config.validate()?;
    Ok(config)
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = config::config_path(path.as_deref());
    if path.exists() {
        return Err(Error::ConfigRead {
            path,
            source: io::Error::new(io::ErrorKind::AlreadyExists, "file already exists"),
        });
    }
    config::save(&Config::default(), &path)?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}

fn list_ports() {
    let ports = SerialTransport::list();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        match port.port_type {
            SerialPortType::UsbPort(usb) => println!(
                "{}  usb {:04x}:{:04x} {}",
                port.port_name,
                usb.vid,
                usb.pid,
                usb.product.unwrap_or_default()
            ),
            _ => println!("{}", port.port_name),
        }
    }
}

// ============================================================================
// Link
// ============================================================================

/// Open the port and run a session until Ctrl-C, disconnect or `listen` elapses
///
/// Without an outbound packet, the session starts with a broadcast ping.
fn run_link(config: Config, outbound: Option<Packet>, listen: Option<Duration>) -> Result<()> {
    let port = if config.serial.port.is_empty() {
        info!("Auto-detecting {}...", config.device.name);
        SerialTransport::detect(&config.device)?
    } else {
        config.serial.port.clone()
    };

    let rt = tokio::runtime::Runtime::new().map_err(|e| Error::Runtime { source: e })?;

    rt.block_on(async move {
        let shutdown = Arc::new(AtomicBool::new(false));
        spawn_shutdown_handler(shutdown.clone());

        if let Some(listen) = listen {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(listen).await;
                shutdown.store(true, Ordering::SeqCst);
            });
        }

        // Handlers are not Send: build the session on the blocking thread
        let session = tokio::task::spawn_blocking(move || {
            run_session(&config, &port, outbound, &shutdown)
        });

        session
            .await
            .map_err(|e| Error::Io(io::Error::other(e.to_string())))?
    })
}

fn run_session(
    config: &Config,
    port: &str,
    outbound: Option<Packet>,
    shutdown: &AtomicBool,
) -> Result<()> {
    let transport = SerialTransport::open(port, config.serial.baud_rate)?;
    info!(
        "Link open: {} @ {} baud, local address {}",
        port, config.serial.baud_rate, config.link.local_address
    );

    let dispatcher = Dispatcher::from_config(&config.link).with_fallback(ConsoleHandler::new());
    let mut session = Session::new(transport, &config.link, dispatcher);

    match outbound {
        Some(packet) => session.send(&packet)?,
        None => session.ping_all()?,
    }

    let reset_on_bad_destination = config.link.reset_on_bad_destination;
    let result = session.run(shutdown, |session, event| {
        report_event(session, event, reset_on_bad_destination)
    });

    if !shutdown.load(Ordering::Relaxed) && result.is_ok() {
        warn!("Device disconnected");
    }
    print_summary(&session);
    result
}

fn report_event(session: &mut Session<SerialTransport>, event: Event, reset_on_bad_destination: bool) {
    match event {
        // Logged by the console handler
        Event::Packet(_) => {}
        Event::Unhandled(packet) => debug!(src = packet.src(), "Unhandled {}", packet.command()),
        Event::Frame(e) => warn!("{}", e),
        Event::Rejected(e) => {
            warn!("{}", e);
            if reset_on_bad_destination && matches!(e, PacketError::UnknownDestination { .. }) {
                info!("Broadcasting reset");
                if let Err(e) = session.reset_all() {
                    warn!("Reset failed: {}", e);
                }
            }
        }
    }
}

fn print_summary(session: &Session<SerialTransport>) {
    println!("{}", session.stats().snapshot());
    println!("Known devices: {:?}", session.known_devices().as_slice());

    let errors = session.error_log();
    if !errors.is_empty() {
        println!("Error reports ({} dropped):", errors.dropped());
        for entry in errors.iter() {
            println!(
                "  device #{}: {} for cmd {} ({} -> {})",
                entry.reporter,
                entry.report.error,
                entry.report.cmd,
                entry.report.src,
                entry.report.dst
            );
        }
    }
}

/// Set `shutdown` on Ctrl-C (and SIGTERM on unix)
fn spawn_shutdown_handler(shutdown: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Cannot listen for SIGTERM: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    shutdown.store(true, Ordering::SeqCst);
                    return;
                }
            };

            tokio::select! {
                _ = sigterm.recv() => {},
                _ = tokio::signal::ctrl_c() => {},
            }
            shutdown.store(true, Ordering::SeqCst);
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.store(true, Ordering::SeqCst);
        });
    }
}
