//! Raw-mode line settings.
//!
//! [`line_settings`] builds the `termios` that `initialize` activates. It starts
//! from an all-zero structure (so no input translation survives from whatever
//! the device was set to before), keeps the device's previous speed, and then
//! layers the configured framing on top.

use std::{io, mem};

use serialport::{DataBits, Parity, StopBits};

use crate::protocol::runtime::SerialConfig;

/// Baud rates that are applied. Anything else leaves the device's speed alone.
pub const STANDARD_RATES: [u32; 11] = [
    4800, 9600, 19200, 38400, 57600, 115200, 230400, 921600, 1000000, 1152000, 3000000,
];

pub fn speed_for(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        921600 => libc::B921600,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        1000000 => libc::B1000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        1152000 => libc::B1152000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        3000000 => libc::B3000000,
        _ => return None,
    };
    Some(speed)
}

pub fn zeroed() -> libc::termios {
    // SAFETY: termios is a plain C struct of integers and arrays; all-zero is valid.
    unsafe { mem::zeroed() }
}

pub fn input_speed(tio: &libc::termios) -> libc::speed_t {
    // SAFETY: reads a field of a valid termios.
    unsafe { libc::cfgetispeed(tio) }
}

pub fn output_speed(tio: &libc::termios) -> libc::speed_t {
    // SAFETY: reads a field of a valid termios.
    unsafe { libc::cfgetospeed(tio) }
}

fn set_speed(tio: &mut libc::termios, input: libc::speed_t, output: libc::speed_t) -> io::Result<()> {
    // SAFETY: both calls only write into `tio`.
    let rc = unsafe { libc::cfsetispeed(tio, input) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let rc = unsafe { libc::cfsetospeed(tio, output) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Compute the raw-mode settings for `config`, given the settings captured from
/// the device before reconfiguration.
pub fn line_settings(config: &SerialConfig, prior: &libc::termios) -> io::Result<libc::termios> {
    let mut tio = zeroed();
    set_speed(&mut tio, input_speed(prior), output_speed(prior))?;

    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !libc::CSIZE;
    tio.c_cflag |= match config.data_bits() {
        DataBits::Five => libc::CS5,
        DataBits::Six => libc::CS6,
        DataBits::Seven => libc::CS7,
        DataBits::Eight => libc::CS8,
    };

    match config.parity {
        Parity::Odd => tio.c_cflag |= libc::PARENB | libc::PARODD,
        Parity::Even => {
            tio.c_cflag |= libc::PARENB;
            tio.c_cflag &= !libc::PARODD;
        }
        Parity::None => tio.c_cflag &= !libc::PARENB,
    }

    match speed_for(config.baud) {
        Some(speed) => set_speed(&mut tio, speed, speed)?,
        None => log::warn!(
            "Baud rate {} is not a standard rate, keeping the current line speed",
            config.baud
        ),
    }

    match config.stop_bits() {
        StopBits::Two => tio.c_cflag |= libc::CSTOPB,
        StopBits::One => tio.c_cflag &= !libc::CSTOPB,
    }

    tio.c_cc[libc::VTIME] = config.read_timeout_ds as libc::cc_t;
    tio.c_cc[libc::VMIN] = config.min_read_size as libc::cc_t;

    tio.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ECHOE | libc::ISIG);
    tio.c_oflag &= !libc::OPOST;

    Ok(tio)
}
