use chrono::Local;
use log::LevelFilter;
use std::io::{self, Write};

use env_logger::{Builder, Target};

/// Environment variable naming a log file, used when `--log-file` is absent.
pub const LOG_FILE_ENV: &str = "TTYLINK_LOG_FILE";

/// Install the process logger. Logs go to stderr unless a log file is given
/// (argument first, then `TTYLINK_LOG_FILE`). `RUST_LOG` always overrides the
/// default level.
pub fn init_logger(log_file: Option<&str>) {
    let log_file = log_file
        .map(str::to_owned)
        .or_else(|| std::env::var(LOG_FILE_ENV).ok());

    if let Some(path) = log_file {
        if let Err(err) = init_file_logger(&path) {
            eprintln!("Failed to initialize file logger at '{path}': {err}");
            init_stderr_logger();
        }
    } else {
        init_stderr_logger();
    }
}

fn init_stderr_logger() {
    Builder::new()
        .filter_level(LevelFilter::Warn)
        .target(Target::Stderr)
        .parse_default_env()
        .init();
}

fn init_file_logger(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(file)))
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .init();

    log::info!("File logger initialized at {path}");

    Ok(())
}
