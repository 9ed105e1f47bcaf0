//! Serial port lifecycle.
//!
//! A [`SerialPort`] is created from configuration alone and does no I/O until
//! [`SerialPort::initialize`] is called. Reads and writes are plain blocking
//! calls on the owned handle. A read that returns zero bytes means the device
//! went away (hot-unplug); the port then drops the handle, moves to
//! [`PortState::Reconnecting`] and calls `initialize` again every
//! `ReconnectPolicy::delay` until the device is back, before repeating the read.
//!
//! The handle is opened through a [`Connector`], so the state machine can be
//! driven without hardware. [`TermiosConnector`] is the real one.

use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    error::{Error, Result},
    protocol::{
        runtime::{parity_to_char, SerialConfig},
        tty::TermiosConnector,
    },
    utils::sleep::{Sleeper, ThreadSleeper},
};

/// An open byte-stream handle. Dropping it releases the device.
pub trait Link: io::Read + io::Write + Send {
    /// Wait until data is readable. `None` on timeout, otherwise the number of
    /// bytes already buffered (may be zero if the peer hung up).
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<Option<usize>>;
}

/// Opens and configures a device node.
pub trait Connector {
    type Link: Link;

    fn connect(&mut self, path: &Path, config: &SerialConfig) -> Result<Self::Link>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Closed,
    Reconnecting,
    Ready,
}

/// Stops a reconnect loop from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Resolve a port name to its device node. Bare names such as `ttyUSB0`
/// live under `/dev`; anything containing a `/` is used as given.
pub fn device_path(port_name: &str) -> PathBuf {
    if port_name.contains('/') {
        PathBuf::from(port_name)
    } else {
        Path::new("/dev").join(port_name)
    }
}

pub struct SerialPort<C: Connector = TermiosConnector, S: Sleeper = ThreadSleeper> {
    port_name: String,
    config: SerialConfig,
    connector: C,
    sleeper: S,
    link: Option<C::Link>,
    state: PortState,
    cancel: Option<CancelToken>,
}

impl SerialPort {
    /// 8N1 at `baud_rate` on the real termios backend.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self::with_config(port_name, SerialConfig::new(baud_rate))
    }

    pub fn with_config(port_name: impl Into<String>, config: SerialConfig) -> Self {
        SerialPort::with_connector(port_name, config, TermiosConnector)
    }
}

impl<C: Connector> SerialPort<C, ThreadSleeper> {
    pub fn with_connector(port_name: impl Into<String>, config: SerialConfig, connector: C) -> Self {
        Self::from_parts(port_name, config, connector, ThreadSleeper)
    }
}

impl<C: Connector, S: Sleeper> SerialPort<C, S> {
    /// Build a port with a custom pause between reconnect attempts.
    pub fn from_parts(
        port_name: impl Into<String>,
        config: SerialConfig,
        connector: C,
        sleeper: S,
    ) -> Self {
        Self {
            port_name: port_name.into(),
            config,
            connector,
            sleeper,
            link: None,
            state: PortState::Closed,
            cancel: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn set_cancel_token(&mut self, token: Option<CancelToken>) {
        self.cancel = token;
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn state(&self) -> PortState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Open and configure the device. Any handle held from before is released
    /// first; on failure the port is left closed.
    pub fn initialize(&mut self) -> Result<()> {
        self.close();
        self.open_link()
    }

    /// One blocking read into `buf`. Zero bytes from the device triggers the
    /// reconnect loop; errors from the read call itself are returned as is.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        let mut count = self.link_mut()?.read(buf)?;
        while count == 0 {
            log::warn!("{} returned no data, reconnecting", self.port_name);
            self.reconnect()?;
            count = self.link_mut()?.read(buf)?;
        }
        log::trace!("{} read {} bytes", self.port_name, count);
        Ok(count)
    }

    /// One write call. Short writes are reported, not retried.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let count = self.link_mut()?.write(buf)?;
        log::trace!("{} wrote {}/{} bytes", self.port_name, count, buf.len());
        Ok(count)
    }

    pub fn wait_readable(&mut self, timeout: Duration) -> Result<Option<usize>> {
        Ok(self.link_mut()?.wait_readable(timeout)?)
    }

    /// Release the handle. Safe on a port that is already closed or was never opened.
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            log::debug!("{} closed", self.port_name);
        }
        self.state = PortState::Closed;
    }

    fn link_mut(&mut self) -> Result<&mut C::Link> {
        self.link.as_mut().ok_or(Error::NotOpen)
    }

    fn open_link(&mut self) -> Result<()> {
        if self.port_name.is_empty() {
            return Err(Error::EmptyPortName);
        }
        let path = device_path(&self.port_name);
        let link = self.connector.connect(&path, &self.config)?;
        self.link = Some(link);
        self.state = PortState::Ready;
        log::debug!(
            "{} ready at {} {}{}{}",
            path.display(),
            self.config.baud,
            self.config.data_bits,
            parity_to_char(self.config.parity),
            self.config.stop_bits
        );
        Ok(())
    }

    fn reconnect(&mut self) -> Result<()> {
        self.link = None;
        self.state = PortState::Reconnecting;

        let policy = self.config.reconnect;
        let mut attempts: u32 = 0;
        loop {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                self.state = PortState::Closed;
                return Err(Error::Cancelled);
            }
            attempts += 1;
            match self.open_link() {
                Ok(()) => {
                    log::info!("{} reconnected after {} attempt(s)", self.port_name, attempts);
                    return Ok(());
                }
                Err(err) => {
                    log::debug!("{} reconnect attempt {} failed: {}", self.port_name, attempts, err);
                    if policy.max_attempts.is_some_and(|max| attempts >= max) {
                        self.state = PortState::Closed;
                        return Err(Error::ReconnectExhausted { attempts });
                    }
                    self.sleeper.sleep(policy.delay);
                }
            }
        }
    }
}

impl<C: Connector, S: Sleeper> Drop for SerialPort<C, S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: Connector, S: Sleeper> io::Read for SerialPort<C, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        SerialPort::read(self, buf).map_err(io::Error::from)
    }
}

impl<C: Connector, S: Sleeper> io::Write for SerialPort<C, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SerialPort::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.link_mut().map_err(io::Error::from)?.flush()
    }
}

impl<C: Connector, S: Sleeper> std::fmt::Debug for SerialPort<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("port_name", &self.port_name)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
