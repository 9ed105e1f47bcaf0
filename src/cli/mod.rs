pub mod actions;
pub mod config;

use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}

pub fn build_command() -> Command {
    Command::new("ttylink")
        .about("List serial ports and talk to one as a raw byte stream")
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .short('l')
                .help("List all available serial ports and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Print the port list as JSON")
                .action(clap::ArgAction::SetTrue)
                .requires("list-ports"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Port profile (.toml or .json); flags override its values")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Port name (ttyUSB0) or device path (/dev/ttyUSB0)")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud")
                .long("baud")
                .short('b')
                .help("Baud rate")
                .value_name("BAUD")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("parity")
                .long("parity")
                .help("Parity: N, E or O")
                .value_name("PARITY")
                .value_parser(clap::value_parser!(char)),
        )
        .arg(
            Arg::new("data-bits")
                .long("data-bits")
                .help("Data bits (5-8)")
                .value_name("BITS")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("stop-bits")
                .long("stop-bits")
                .help("Stop bits (1 or 2)")
                .value_name("BITS")
                .value_parser(clap::value_parser!(u8)),
        )
        .arg(
            Arg::new("reconnect-attempts")
                .long("reconnect-attempts")
                .help("Give up after this many reconnect attempts (default: retry forever)")
                .value_name("N")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("send")
                .long("send")
                .short('s')
                .help("Write hex-encoded bytes to the port, e.g. 0103000a0001")
                .value_name("HEX"),
        )
        .arg(
            Arg::new("monitor")
                .long("monitor")
                .short('m')
                .help("Print received bytes as hex until Ctrl-C")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Write logs to this file instead of stderr")
                .value_name("FILE"),
        )
}

/// Dispatch the parsed command line.
pub fn run(matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("list-ports") {
        return actions::list_ports(matches.get_flag("json"));
    }

    let send = matches.get_one::<String>("send");
    let monitor = matches.get_flag("monitor");
    if send.is_none() && !monitor {
        build_command().print_help()?;
        println!();
        return Ok(());
    }

    let (port_name, config) = actions::resolve_port(matches)?;
    let mut port = crate::SerialPort::with_config(port_name, config);
    port.initialize()?;

    if let Some(hex_str) = send {
        actions::send(&mut port, hex_str)?;
    }
    if monitor {
        actions::monitor(&mut port)?;
    }
    Ok(())
}
