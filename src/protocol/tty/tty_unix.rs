use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    os::unix::{
        fs::OpenOptionsExt,
        io::{AsRawFd, RawFd},
    },
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    error::{Error, Result},
    protocol::{
        port::{Connector, Link},
        runtime::{OpenMode, SerialConfig},
        tty::termios::line_settings,
    },
};

/// Opens device nodes and puts them in raw mode through termios.
#[derive(Debug, Default, Clone, Copy)]
pub struct TermiosConnector;

impl Connector for TermiosConnector {
    type Link = TtyLink;

    fn connect(&mut self, path: &Path, config: &SerialConfig) -> Result<TtyLink> {
        TtyLink::open(path, config)
    }
}

/// An open, configured tty. Dropping it writes back the settings captured at
/// open time (unless disabled) and closes the descriptor.
pub struct TtyLink {
    file: File,
    path: PathBuf,
    saved: libc::termios,
    restore_on_close: bool,
    readiness: libc::pollfd,
}

impl TtyLink {
    pub fn open(path: &Path, config: &SerialConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(open_flags(config.open_mode))
            .open(path)
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;
        // From here on every early return drops `file`, which closes the node.
        let fd = file.as_raw_fd();
        let configure_err = |source| Error::Configure {
            path: path.to_path_buf(),
            source,
        };

        let saved = get_attr(fd).map_err(configure_err)?;
        let settings = line_settings(config, &saved).map_err(configure_err)?;

        // SAFETY: fd is open for the lifetime of `file`.
        if unsafe { libc::tcflush(fd, libc::TCIFLUSH) } != 0 {
            log::debug!(
                "Input flush on {} failed: {}",
                path.display(),
                io::Error::last_os_error()
            );
        }
        set_attr(fd, &settings).map_err(configure_err)?;

        if config.low_latency {
            if let Err(err) = low_latency::enable(fd) {
                log::debug!("Low latency mode unavailable on {}: {}", path.display(), err);
            }
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            saved,
            restore_on_close: config.restore_on_close,
            readiness: libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings the device had before it was opened.
    pub fn saved_settings(&self) -> &libc::termios {
        &self.saved
    }

    /// Settings currently active on the device.
    pub fn current_settings(&self) -> io::Result<libc::termios> {
        get_attr(self.file.as_raw_fd())
    }
}

impl Read for TtyLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for TtyLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        // SAFETY: fd is open for the lifetime of `self.file`.
        if unsafe { libc::tcdrain(self.file.as_raw_fd()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Link for TtyLink {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<Option<usize>> {
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        let mut fds = [self.readiness];
        // SAFETY: `fds` is a valid array of one pollfd.
        let ready = unsafe { libc::poll(fds.as_mut_ptr(), 1, millis) };
        if ready < 0 {
            return Err(io::Error::last_os_error());
        }
        if ready == 0 {
            return Ok(None);
        }
        let mut available: libc::c_int = 0;
        // SAFETY: FIONREAD writes one c_int.
        if unsafe { libc::ioctl(self.file.as_raw_fd(), libc::FIONREAD, &mut available) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Some(available.max(0) as usize))
    }
}

impl Drop for TtyLink {
    fn drop(&mut self) {
        if self.restore_on_close {
            if let Err(err) = set_attr(self.file.as_raw_fd(), &self.saved) {
                log::debug!("Restoring settings on {} failed: {}", self.path.display(), err);
            }
        }
    }
}

impl std::fmt::Debug for TtyLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyLink")
            .field("path", &self.path)
            .field("fd", &self.file.as_raw_fd())
            .finish_non_exhaustive()
    }
}

/// Extra open flags on top of read/write access.
fn open_flags(mode: OpenMode) -> libc::c_int {
    match mode {
        OpenMode::NonBlocking => libc::O_NONBLOCK,
        OpenMode::NoControllingTerminal => libc::O_NOCTTY,
    }
}

fn get_attr(fd: RawFd) -> io::Result<libc::termios> {
    let mut tio = super::termios::zeroed();
    // SAFETY: tcgetattr fills the termios we own.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(tio)
}

fn set_attr(fd: RawFd, tio: &libc::termios) -> io::Result<()> {
    // SAFETY: tcsetattr only reads `tio`.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, tio) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(target_os = "linux")]
mod low_latency {
    use std::{io, os::unix::io::RawFd};

    // Layout of `struct serial_struct` from <linux/serial.h>.
    #[repr(C)]
    struct SerialStruct {
        kind: libc::c_int,
        line: libc::c_int,
        port: libc::c_uint,
        irq: libc::c_int,
        flags: libc::c_int,
        xmit_fifo_size: libc::c_int,
        custom_divisor: libc::c_int,
        baud_base: libc::c_int,
        close_delay: libc::c_ushort,
        io_type: libc::c_char,
        reserved_char: [libc::c_char; 1],
        hub6: libc::c_int,
        closing_wait: libc::c_ushort,
        closing_wait2: libc::c_ushort,
        iomem_base: *mut libc::c_uchar,
        iomem_reg_shift: libc::c_ushort,
        port_high: libc::c_uint,
        iomap_base: libc::c_ulong,
    }

    const ASYNC_LOW_LATENCY: libc::c_int = 1 << 13;

    pub fn enable(fd: RawFd) -> io::Result<()> {
        // SAFETY: all-zero is a valid serial_struct; the kernel fills it in.
        let mut settings: SerialStruct = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(fd, libc::TIOCGSERIAL, &mut settings) } < 0 {
            return Err(io::Error::last_os_error());
        }
        settings.flags |= ASYNC_LOW_LATENCY;
        if unsafe { libc::ioctl(fd, libc::TIOCSSERIAL, &settings) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod low_latency {
    use std::{io, os::unix::io::RawFd};

    pub fn enable(_fd: RawFd) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "low latency mode is Linux only",
        ))
    }
}
