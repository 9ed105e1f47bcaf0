//! Serial device discovery.
//!
//! Candidate nodes are picked from the device directory by name prefix. For
//! USB-backed nodes the kernel's tty class directory links each node to its
//! device in sysfs; the USB device directory holding `idVendor`, `idProduct`
//! and the descriptor strings sits one level above the resolved target for
//! `ttyACM*` (CDC ACM interface) and two levels above for `ttyUSB*` (the
//! usb-serial port sits below the interface).

use serde::Serialize;
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// Device node name prefixes that are reported as serial ports.
pub const DEVICE_PREFIXES: [&str; 6] = ["ttyACM", "ttyS", "ttyUSB", "tty.", "cu.", "rfcomm"];

pub const DEFAULT_DEVICE_DIR: &str = "/dev";
pub const DEFAULT_TTY_CLASS_DIR: &str = "/sys/class/tty";

/// One discovered serial port. Ids are zero and strings empty when the device
/// exposes no USB descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortDescriptor {
    pub port_name: String,
    pub port_path: PathBuf,
    pub vendor_id: u16,
    pub product_id: u16,
    pub product: String,
    pub manufacturer: String,
    pub serial_number: String,
}

impl PortDescriptor {
    pub fn has_usb_info(&self) -> bool {
        self.vendor_id != 0 || self.product_id != 0
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {:04x}:{:04x}, {}, {}, {}",
            self.port_path.display(),
            self.product_id,
            self.vendor_id,
            self.manufacturer,
            self.product,
            self.serial_number
        )
    }
}

/// What to do with a device whose `idVendor`/`idProduct` is not hexadecimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedIdPolicy {
    /// Abort the whole listing with [`Error::MalformedAttribute`].
    #[default]
    Fail,
    /// Leave that device out and keep going.
    Skip,
}

#[derive(Debug, Clone)]
pub struct Discovery {
    device_dir: PathBuf,
    tty_class_dir: PathBuf,
    malformed: MalformedIdPolicy,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from(DEFAULT_DEVICE_DIR),
            tty_class_dir: PathBuf::from(DEFAULT_TTY_CLASS_DIR),
            malformed: MalformedIdPolicy::default(),
        }
    }
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `device_dir` and resolve descriptors under `tty_class_dir` instead
    /// of the system locations.
    pub fn with_roots(device_dir: impl Into<PathBuf>, tty_class_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
            tty_class_dir: tty_class_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_malformed_policy(mut self, policy: MalformedIdPolicy) -> Self {
        self.malformed = policy;
        self
    }

    /// List serial ports in directory order. A missing device directory yields
    /// an empty list.
    pub fn list_ports(&self) -> Result<Vec<PortDescriptor>> {
        let entries = match fs::read_dir(&self.device_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} does not exist", self.device_dir.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut ports = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !is_serial_device_name(name) {
                continue;
            }
            match self.describe(&entry.path()) {
                Ok(port) => ports.push(port),
                Err(err @ Error::MalformedAttribute { .. })
                    if self.malformed == MalformedIdPolicy::Skip =>
                {
                    log::warn!("Skipping {name}: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(ports)
    }

    /// Build the descriptor for a single device node.
    pub fn describe(&self, device_path: &Path) -> Result<PortDescriptor> {
        let port_name = device_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut port = PortDescriptor {
            port_name,
            port_path: device_path.to_path_buf(),
            ..PortDescriptor::default()
        };

        if let Some(dir) = self.descriptor_dir(&port.port_name) {
            port.product_id = read_hex_id(&dir.join("idProduct"))?;
            port.vendor_id = read_hex_id(&dir.join("idVendor"))?;
            port.product = read_line(&dir.join("product"));
            port.manufacturer = read_line(&dir.join("manufacturer"));
            port.serial_number = read_line(&dir.join("serial"));
        }
        Ok(port)
    }

    /// Resolve the USB device directory for `port_name`, if it has one.
    pub fn descriptor_dir(&self, port_name: &str) -> Option<PathBuf> {
        let levels = if port_name.starts_with("ttyUSB") {
            2
        } else if port_name.starts_with("ttyACM") {
            1
        } else {
            return None;
        };

        let link = self.tty_class_dir.join(port_name).join("device");
        let target = fs::canonicalize(link).ok()?;
        let mut dir = target.as_path();
        for _ in 0..levels {
            dir = dir.parent()?;
        }
        dir.exists().then(|| dir.to_path_buf())
    }
}

/// List serial ports on this host.
pub fn list_ports() -> Result<Vec<PortDescriptor>> {
    Discovery::default().list_ports()
}

pub fn is_serial_device_name(name: &str) -> bool {
    DEVICE_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// First line of a text attribute; empty if the file is missing or unreadable.
fn read_line(path: &Path) -> String {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| content.lines().next().map(str::to_owned))
        .unwrap_or_default()
}

/// A hexadecimal id attribute. A file that is missing, empty or unreadable
/// reads as 0, the same as a device without USB metadata. Content that is
/// present but not hexadecimal (including non-UTF-8 bytes) is an error.
fn read_hex_id(path: &Path) -> Result<u16> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => {
            log::debug!("Cannot read {}: {}", path.display(), err);
            return Ok(0);
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    let line = content.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return Ok(0);
    }
    let digits = line
        .strip_prefix("0x")
        .or_else(|| line.strip_prefix("0X"))
        .unwrap_or(line);
    u16::from_str_radix(digits, 16).map_err(|_| Error::MalformedAttribute {
        path: path.to_path_buf(),
        content: line.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching_is_case_sensitive() {
        for name in ["ttyACM0", "ttyS12", "ttyUSB3", "tty.usbserial-1410", "cu.usbmodem1", "rfcomm0"] {
            assert!(is_serial_device_name(name), "{name}");
        }
        for name in ["tty0", "tty1", "ttys000", "TTYUSB0", "console", "null", "cu"] {
            assert!(!is_serial_device_name(name), "{name}");
        }
    }

    #[test]
    fn display_pads_lowercase_hex() {
        let port = PortDescriptor {
            port_name: "ttyUSB0".into(),
            port_path: PathBuf::from("/dev/ttyUSB0"),
            vendor_id: 0x0003,
            product_id: 0x1A2B,
            product: "CP2102 USB to UART".into(),
            manufacturer: "Silicon Labs".into(),
            serial_number: "0001".into(),
        };
        let text = port.to_string();
        assert!(text.contains("1a2b:0003"));
        assert_eq!(
            text,
            "/dev/ttyUSB0, 1a2b:0003, Silicon Labs, CP2102 USB to UART, 0001"
        );
    }

    #[test]
    fn display_without_metadata() {
        let port = PortDescriptor {
            port_name: "ttyS0".into(),
            port_path: PathBuf::from("/dev/ttyS0"),
            ..PortDescriptor::default()
        };
        assert_eq!(port.to_string(), "/dev/ttyS0, 0000:0000, , , ");
        assert!(!port.has_usb_info());
    }

    #[test]
    fn hex_ids_parse_and_reject() {
        let dir = tempfile::tempdir().unwrap();

        let ok = dir.path().join("idVendor");
        fs::write(&ok, "10c4\n").unwrap();
        assert_eq!(read_hex_id(&ok).unwrap(), 0x10c4);

        let missing = dir.path().join("idProduct");
        assert_eq!(read_hex_id(&missing).unwrap(), 0);

        let bad = dir.path().join("bad");
        fs::write(&bad, "zz12\n").unwrap();
        assert!(matches!(
            read_hex_id(&bad),
            Err(Error::MalformedAttribute { content, .. }) if content == "zz12"
        ));

        let empty = dir.path().join("empty");
        fs::write(&empty, "\n").unwrap();
        assert_eq!(read_hex_id(&empty).unwrap(), 0);

        let binary = dir.path().join("binary");
        fs::write(&binary, [0xff, 0xfe, 0x0a]).unwrap();
        assert!(matches!(
            read_hex_id(&binary),
            Err(Error::MalformedAttribute { .. })
        ));

        let too_wide = dir.path().join("wide");
        fs::write(&too_wide, "123456\n").unwrap();
        assert!(read_hex_id(&too_wide).is_err());
    }

    #[test]
    fn read_line_trims_terminator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("product");
        fs::write(&path, "FT232R USB UART\r\nignored\n").unwrap();
        assert_eq!(read_line(&path), "FT232R USB UART");
        assert_eq!(read_line(&dir.path().join("serial")), "");
    }
}
