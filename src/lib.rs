//! ttylink: serial port discovery and raw byte-stream access for POSIX hosts
//!
//! Two pieces make up the library:
//!
//! - [`list_ports`] / [`Discovery`] enumerate serial device nodes and attach the
//!   USB vendor/product ids and descriptor strings the kernel exposes for them.
//! - [`SerialPort`] opens one device, puts it into raw mode at the configured
//!   line settings and offers blocking reads and writes. A read that sees the
//!   device disappear keeps re-initializing the port until it comes back.
//!
//! ```no_run
//! use ttylink::{list_ports, SerialPort};
//!
//! for port in list_ports()? {
//!     println!("{port}");
//! }
//!
//! let mut port = SerialPort::new("/dev/ttyUSB0", 115200);
//! port.initialize()?;
//! port.write(b"ping")?;
//! let mut buf = [0u8; 64];
//! let n = port.read(&mut buf)?;
//! println!("{:02x?}", &buf[..n]);
//! # Ok::<(), ttylink::Error>(())
//! ```
//!
//! The command-line front end and its logging setup live in hidden modules.

pub mod error;
pub mod protocol;
pub mod utils;

#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;

pub use error::{Error, Result};
pub use protocol::{
    discovery::{list_ports, Discovery, MalformedIdPolicy, PortDescriptor},
    port::{device_path, CancelToken, Connector, Link, PortState, SerialPort},
    runtime::{parity_from_char, OpenMode, ReconnectPolicy, SerialConfig},
    tty::{TermiosConnector, TtyLink},
};
pub use serialport::Parity;
pub use utils::sleep::{Sleeper, ThreadSleeper};
