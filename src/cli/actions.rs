use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::ArgMatches;
use std::{
    io::{self, Write},
    path::Path,
    time::Duration,
};

use crate::{
    cli::config::PortProfile,
    protocol::{
        discovery,
        port::{CancelToken, Connector, SerialPort},
        runtime::{parity_from_char, SerialConfig},
    },
    utils::sleep::Sleeper,
    Error,
};

const READ_BUF_SIZE: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Print every discovered port, one per line or as a JSON array.
pub fn list_ports(json: bool) -> Result<()> {
    let mut ports = discovery::list_ports().context("Failed to enumerate serial ports")?;
    ports.sort_by(|a, b| a.port_path.cmp(&b.port_path));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &ports)?;
        writeln!(out)?;
    } else if ports.is_empty() {
        log::info!("No serial ports found");
    } else {
        for port in &ports {
            writeln!(out, "{port}")?;
        }
    }
    Ok(())
}

/// Port name and line configuration from `--config` plus flag overrides.
pub fn resolve_port(matches: &ArgMatches) -> Result<(String, SerialConfig)> {
    let mut profile = match matches.get_one::<String>("config") {
        Some(path) => PortProfile::from_file(Path::new(path))?,
        None => PortProfile::default(),
    };
    if let Some(port) = matches.get_one::<String>("port") {
        profile.port_name = port.clone();
    }
    if profile.port_name.is_empty() {
        return Err(anyhow!("No port given, use --port or a profile with port_name"));
    }

    let mut config = profile.to_serial_config();
    if let Some(&baud) = matches.get_one::<u32>("baud") {
        config.baud = baud;
    }
    if let Some(&parity) = matches.get_one::<char>("parity") {
        config.parity = parity_from_char(parity);
    }
    if let Some(&bits) = matches.get_one::<u8>("data-bits") {
        config.data_bits = bits;
    }
    if let Some(&bits) = matches.get_one::<u8>("stop-bits") {
        config.stop_bits = bits;
    }
    if let Some(&attempts) = matches.get_one::<u32>("reconnect-attempts") {
        config.reconnect.max_attempts = Some(attempts);
    }
    Ok((profile.port_name, config))
}

/// Write hex-encoded bytes once. A short write is reported, not retried.
pub fn send<C: Connector, S: Sleeper>(port: &mut SerialPort<C, S>, hex_str: &str) -> Result<usize> {
    let bytes = hex::decode(hex_str.trim()).with_context(|| format!("Invalid hex data {hex_str:?}"))?;
    let written = port.write(&bytes)?;
    if written < bytes.len() {
        log::warn!(
            "Short write on {}: {}/{} bytes",
            port.port_name(),
            written,
            bytes.len()
        );
    }
    println!("sent {}/{} bytes: {}", written, bytes.len(), hex::encode(&bytes[..written]));
    Ok(written)
}

/// Print received chunks until Ctrl-C.
pub fn monitor<C: Connector, S: Sleeper>(port: &mut SerialPort<C, S>) -> Result<()> {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Failed to install Ctrl-C handler")?;
    port.set_cancel_token(Some(cancel.clone()));

    let stdout = io::stdout();
    monitor_until(port, &cancel, &mut stdout.lock())
}

/// Poll-then-read loop behind `monitor`, writing one line per chunk.
pub fn monitor_until<C: Connector, S: Sleeper, W: Write>(
    port: &mut SerialPort<C, S>,
    cancel: &CancelToken,
    out: &mut W,
) -> Result<()> {
    let mut buf = [0u8; READ_BUF_SIZE];
    while !cancel.is_cancelled() {
        if port.wait_readable(POLL_INTERVAL)?.is_none() {
            continue;
        }
        match port.read(&mut buf) {
            Ok(n) => {
                writeln!(
                    out,
                    "{} {}",
                    Local::now().format("%H:%M:%S%.3f"),
                    hex::encode(&buf[..n])
                )?;
            }
            Err(Error::Cancelled) => break,
            Err(err) => return Err(err.into()),
        }
    }
    log::info!("Monitor on {} stopped", port.port_name());
    Ok(())
}
